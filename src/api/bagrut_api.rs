// ==========================================
// 音乐学院管理后台 - Bagrut 服务 API
// ==========================================
// 职责: bagrut 记录 CRUD、评分、迁移、子列表维护
// 约定: 每个公开操作的错误都带 "in <operation>:" 前缀
// 并发: 所有写入为定点字段更新；同一字段并发写入为最后写入者生效
// 并发: add_bagrut / update_bagrut 的有效记录检查与写入不在同一事务内；
//       同一学生的并发写入由 documents 表唯一部分索引兜底，后到者得到 Conflict
// ==========================================

mod attachments;
mod grading;
mod migration;

pub use grading::PresentationUpdate;
pub use migration::MigrationReport;

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::error::{ApiError, ApiErrorKind, ApiResult};
use crate::config::BagrutSettings;
use crate::domain::bagrut::BagrutRecord;
use crate::engine::validation::{validate_bagrut, ValidationDefaults};
use crate::repository::{DocumentCollection, Filter, ReturnDocument, Update, ID_FIELD};
use crate::repository::{RepositoryError, StudentLink};

// ==========================================
// BagrutListFilter - 列表查询条件
// ==========================================
/// 列表查询条件
///
/// 默认只返回 isActive=true 的记录；
/// show_inactive=true 时由 is_active（如提供）决定，未提供则不过滤。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BagrutListFilter {
    pub student_id: Option<String>,
    pub teacher_id: Option<String>,
    pub is_active: Option<bool>,
    pub show_inactive: bool,
}

impl BagrutListFilter {
    fn to_filter(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(student_id) = &self.student_id {
            filter = filter.eq("studentId", student_id.as_str());
        }
        if let Some(teacher_id) = &self.teacher_id {
            filter = filter.eq("teacherId", teacher_id.as_str());
        }
        if self.show_inactive {
            if let Some(is_active) = self.is_active {
                filter = filter.eq("isActive", is_active);
            }
        } else {
            filter = filter.eq("isActive", true);
        }
        filter
    }
}

// ==========================================
// BagrutApi - Bagrut 服务
// ==========================================
pub struct BagrutApi {
    bagrut_collection: Arc<dyn DocumentCollection>,
    student_link: Arc<dyn StudentLink>,
    settings: BagrutSettings,
}

impl BagrutApi {
    /// 创建新的 BagrutApi 实例
    ///
    /// # 参数
    /// - bagrut_collection: bagrut 文档集合
    /// - student_link: 学生反向引用维护
    /// - settings: 启动时加载的业务配置
    pub fn new(
        bagrut_collection: Arc<dyn DocumentCollection>,
        student_link: Arc<dyn StudentLink>,
        settings: BagrutSettings,
    ) -> Self {
        Self {
            bagrut_collection,
            student_link,
            settings,
        }
    }

    pub fn settings(&self) -> &BagrutSettings {
        &self.settings
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 按条件列出 bagrut 记录（按插入顺序）
    pub fn list_bagruts(&self, filter: &BagrutListFilter) -> ApiResult<Vec<BagrutRecord>> {
        run("list_bagruts", || {
            let docs = self.bagrut_collection.find(&filter.to_filter())?;
            tracing::debug!(count = docs.len(), "列出 bagrut 记录");
            docs.into_iter().map(decode_record).collect()
        })
    }

    /// 按 ID 查询
    ///
    /// # 返回
    /// - Err(NotFound): 记录不存在（错误信息包含 id）
    pub fn get_bagrut_by_id(&self, id: &str) -> ApiResult<BagrutRecord> {
        run("get_bagrut_by_id", || decode_record(self.load_document(id)?))
    }

    /// 按学生查询有效记录（不存在返回 None，不视为错误）
    pub fn get_bagrut_by_student_id(&self, student_id: &str) -> ApiResult<Option<BagrutRecord>> {
        run("get_bagrut_by_student_id", || self.find_active_for_student(student_id))
    }

    // ==========================================
    // 写入接口
    // ==========================================

    /// 新建 bagrut
    ///
    /// # 步骤
    /// 1. 结构校验 + 默认值填充
    /// 2. 同一学生已有有效记录 → Conflict
    /// 3. 插入并回写学生引用
    pub fn add_bagrut(&self, raw: &Value) -> ApiResult<BagrutRecord> {
        run("add_bagrut", || {
            let mut record = validate_bagrut(raw, &self.validation_defaults())?;
            assign_item_ids(&mut record);

            if self.find_active_for_student(&record.student_id)?.is_some() {
                return Err(active_conflict(&record.student_id));
            }

            let mut doc = serde_json::to_value(&record).map_err(storage_error)?;
            if let Some(obj) = doc.as_object_mut() {
                obj.insert(ID_FIELD.to_string(), Value::String(uuid::Uuid::new_v4().to_string()));
            }
            // 检查与插入之间的并发新建由存储层唯一索引拦截
            let id = self.bagrut_collection.insert_one(doc).map_err(|e| match e {
                RepositoryError::UniqueConstraintViolation(_) => active_conflict(&record.student_id),
                other => other.into(),
            })?;
            self.student_link.link_bagrut_to_student(&record.student_id, &id)?;

            tracing::info!(bagrut_id = %id, student_id = %record.student_id, "新建 bagrut");
            decode_record(self.load_document(&id)?)
        })
    }

    /// 全量更新 bagrut
    ///
    /// 重新校验整份数据，逐字段 $set（保留 _id 与 createdAt）
    ///
    /// # 规则
    /// - 更新后为有效记录时，同一学生不得存在其他有效记录 → Conflict
    /// - studentId 变更时清空原学生引用并回写新学生引用
    pub fn update_bagrut(&self, id: &str, raw: &Value) -> ApiResult<BagrutRecord> {
        run("update_bagrut", || {
            let mut record = validate_bagrut(raw, &self.validation_defaults())?;
            assign_item_ids(&mut record);
            let existing = decode_record(self.load_document(id)?)?;

            if record.is_active && self.has_other_active(&record.student_id, id)? {
                return Err(active_conflict(&record.student_id));
            }

            let doc = serde_json::to_value(&record).map_err(storage_error)?;

            let mut update = Update::new();
            if let Value::Object(fields) = doc {
                for (key, value) in fields {
                    if key == ID_FIELD || key == "createdAt" {
                        continue;
                    }
                    update = update.set(key, value);
                }
            }

            let updated = self
                .bagrut_collection
                .find_one_and_update(&Filter::by_id(id), &update, ReturnDocument::After)?
                .ok_or_else(|| not_found(id))?;

            if existing.student_id != record.student_id {
                self.student_link.unlink_bagrut_from_student(&existing.student_id)?;
                self.student_link.link_bagrut_to_student(&record.student_id, id)?;
                tracing::info!(
                    bagrut_id = %id,
                    from_student = %existing.student_id,
                    to_student = %record.student_id,
                    "bagrut 转移学生"
                );
            }

            tracing::info!(bagrut_id = %id, "更新 bagrut");
            decode_record(updated)
        })
    }

    /// 删除 bagrut 并清空学生引用
    ///
    /// # 返回
    /// - Ok(BagrutRecord): 被删除的记录
    pub fn remove_bagrut(&self, id: &str) -> ApiResult<BagrutRecord> {
        run("remove_bagrut", || {
            let record = decode_record(self.load_document(id)?)?;

            let ack = self.bagrut_collection.delete_one(&Filter::by_id(id))?;
            if ack.deleted_count == 0 {
                return Err(not_found(id));
            }
            self.student_link.unlink_bagrut_from_student(&record.student_id)?;

            tracing::info!(bagrut_id = %id, student_id = %record.student_id, "删除 bagrut");
            Ok(record)
        })
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn validation_defaults(&self) -> ValidationDefaults {
        ValidationDefaults {
            conservatory_name: self.settings.default_conservatory_name.clone(),
        }
    }

    fn find_active_for_student(&self, student_id: &str) -> ApiResult<Option<BagrutRecord>> {
        let filter = Filter::new().eq("studentId", student_id).eq("isActive", true);
        self.bagrut_collection
            .find_one(&filter)?
            .map(decode_record)
            .transpose()
    }

    /// 同一学生是否存在 id 以外的有效记录
    fn has_other_active(&self, student_id: &str, id: &str) -> ApiResult<bool> {
        let filter = Filter::new().eq("studentId", student_id).eq("isActive", true);
        let docs = self.bagrut_collection.find(&filter)?;
        Ok(docs
            .iter()
            .any(|doc| doc.get(ID_FIELD).and_then(Value::as_str) != Some(id)))
    }

    /// 读取原始文档（不存在 → NotFound）
    fn load_document(&self, id: &str) -> ApiResult<Value> {
        self.bagrut_collection
            .find_one(&Filter::by_id(id))?
            .ok_or_else(|| not_found(id))
    }

    /// 定点更新并返回更新后的记录（不存在 → NotFound）
    fn apply_update(&self, id: &str, update: Update) -> ApiResult<BagrutRecord> {
        let update = update.set("updatedAt", Utc::now().to_rfc3339());
        let updated = self
            .bagrut_collection
            .find_one_and_update(&Filter::by_id(id), &update, ReturnDocument::After)?
            .ok_or_else(|| not_found(id))?;
        decode_record(updated)
    }
}

// ==========================================
// 模块内工具函数
// ==========================================

/// 执行操作并附加操作名；失败按大类记录日志
fn run<T>(operation: &'static str, f: impl FnOnce() -> ApiResult<T>) -> ApiResult<T> {
    f().map_err(|err| {
        match err.kind() {
            ApiErrorKind::Storage => tracing::error!(operation, error = %err, "bagrut 操作失败"),
            _ => tracing::debug!(operation, error = %err, "bagrut 操作被拒绝"),
        }
        err.in_operation(operation)
    })
}

/// 为缺少 _id 的子列表元素分配 UUID
fn assign_item_ids(record: &mut BagrutRecord) {
    let ids = record
        .program
        .iter_mut()
        .map(|piece| &mut piece.id)
        .chain(record.accompaniment.accompanists.iter_mut().map(|a| &mut a.id))
        .chain(record.documents.iter_mut().map(|d| &mut d.id));
    for id in ids {
        if id.as_deref().map_or(true, |s| s.trim().is_empty()) {
            *id = Some(uuid::Uuid::new_v4().to_string());
        }
    }
}

fn active_conflict(student_id: &str) -> ApiError {
    ApiError::Conflict(format!("an active bagrut already exists for student {}", student_id))
}

fn not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("bagrut with id={}", id))
}

fn storage_error(err: serde_json::Error) -> ApiError {
    ApiError::StorageError(err.to_string())
}

/// 存储文档 → 类型化记录
fn decode_record(doc: Value) -> ApiResult<BagrutRecord> {
    let id = doc.get(ID_FIELD).and_then(Value::as_str).unwrap_or_default().to_string();
    serde_json::from_value(doc)
        .map_err(|e| ApiError::StorageError(format!("stored bagrut {} is malformed: {}", id, e)))
}
