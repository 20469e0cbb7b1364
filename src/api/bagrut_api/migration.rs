use super::*;

use crate::engine::migration::{migrate_document, needs_migration, MigrationDefaults, MigrationOutcome};

// ==========================================
// MigrationReport - 批量迁移结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// 扫描的文档数
    pub scanned: usize,
    /// 成功迁移的文档 id
    pub migrated: Vec<String>,
    /// 迁移失败的文档 (id, 原因)
    pub failed: Vec<(String, String)>,
}

impl BagrutApi {
    // ==========================================
    // 旧结构迁移接口
    // ==========================================

    /// 显式迁移单个记录
    ///
    /// # 返回
    /// - Ok(Migrated): 已从 3 项结构迁移
    /// - Ok(AlreadyCurrent): 已是当前结构
    /// - Err(NotFound): 记录不存在
    pub fn migrate_bagrut(&self, id: &str) -> ApiResult<MigrationOutcome> {
        run("migrate_bagrut", || {
            let doc = self.load_document(id)?;
            self.persist_migration(id, doc)
        })
    }

    /// 扫描整个集合，迁移全部 3 项结构的记录
    ///
    /// 单条失败不中断批处理，失败原因记入报告
    pub fn migrate_all_legacy(&self) -> ApiResult<MigrationReport> {
        run("migrate_all_legacy", || {
            let docs = self.bagrut_collection.find(&Filter::new())?;
            let mut report = MigrationReport {
                scanned: docs.len(),
                ..MigrationReport::default()
            };

            for doc in docs.into_iter().filter(needs_migration) {
                let id = doc.get(ID_FIELD).and_then(Value::as_str).unwrap_or_default().to_string();
                match self.persist_migration(&id, doc) {
                    Ok(MigrationOutcome::Migrated) => report.migrated.push(id),
                    Ok(MigrationOutcome::AlreadyCurrent) => {}
                    Err(e) => {
                        tracing::warn!(bagrut_id = %id, error = %e, "批量迁移单条失败");
                        report.failed.push((id, e.to_string()));
                    }
                }
            }

            tracing::info!(
                scanned = report.scanned,
                migrated = report.migrated.len(),
                failed = report.failed.len(),
                "旧结构批量迁移完成"
            );
            Ok(report)
        })
    }

    /// 评分操作前的迁移步骤
    ///
    /// 失败只记录告警，不阻断后续评分操作
    pub(super) fn ensure_migrated(&self, id: &str) {
        match self.try_migrate(id) {
            Ok(MigrationOutcome::Migrated) => {
                tracing::info!(bagrut_id = %id, "bagrut 已迁移到 4 项阶段演奏结构");
            }
            Ok(MigrationOutcome::AlreadyCurrent) => {}
            Err(e) => {
                tracing::warn!(bagrut_id = %id, error = %e, "bagrut 迁移失败，按现有结构继续");
            }
        }
    }

    /// 记录不存在视为无需迁移
    fn try_migrate(&self, id: &str) -> ApiResult<MigrationOutcome> {
        match self.bagrut_collection.find_one(&Filter::by_id(id))? {
            Some(doc) => self.persist_migration(id, doc),
            None => {
                tracing::debug!(bagrut_id = %id, "记录不存在，跳过迁移");
                Ok(MigrationOutcome::AlreadyCurrent)
            }
        }
    }

    /// 迁移文档并以顶层字段 $set 写回（先解码校验，失败不写入）
    fn persist_migration(&self, id: &str, mut doc: Value) -> ApiResult<MigrationOutcome> {
        let defaults = MigrationDefaults {
            conservatory_name: self.settings.default_conservatory_name.clone(),
        };
        if migrate_document(&mut doc, &defaults) == MigrationOutcome::AlreadyCurrent {
            return Ok(MigrationOutcome::AlreadyCurrent);
        }
        // 迁移结果无法解码时不写回，原文档保持不变
        decode_record(doc.clone())?;

        let mut update = Update::new();
        if let Value::Object(fields) = doc {
            for (key, value) in fields {
                if key != ID_FIELD {
                    update = update.set(key, value);
                }
            }
        }
        self.apply_update(id, update)?;
        Ok(MigrationOutcome::Migrated)
    }
}
