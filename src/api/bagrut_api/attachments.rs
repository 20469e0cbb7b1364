use super::*;

use crate::engine::validation::{validate_accompanist, validate_document, validate_program_piece};

const DOCUMENTS_PATH: &str = "documents";
const PROGRAM_PATH: &str = "program";
const ACCOMPANISTS_PATH: &str = "accompaniment.accompanists";

impl BagrutApi {
    // ==========================================
    // 子列表接口（附件 / 曲目 / 伴奏者）
    // ==========================================
    // 规则: 每个元素写入前单独校验并分配 _id；删除按 _id 匹配

    /// 添加附件文档
    pub fn add_document(&self, id: &str, raw: &Value) -> ApiResult<BagrutRecord> {
        run("add_document", || {
            let mut document = validate_document(raw)?;
            document.id = Some(new_item_id(document.id.take()));
            self.push_item(id, DOCUMENTS_PATH, &document)
        })
    }

    /// 删除附件文档
    pub fn remove_document(&self, id: &str, document_id: &str) -> ApiResult<BagrutRecord> {
        run("remove_document", || self.pull_item(id, DOCUMENTS_PATH, document_id))
    }

    /// 添加曲目
    pub fn add_program_piece(&self, id: &str, raw: &Value) -> ApiResult<BagrutRecord> {
        run("add_program_piece", || {
            let mut piece = validate_program_piece(raw)?;
            piece.id = Some(new_item_id(piece.id.take()));
            self.push_item(id, PROGRAM_PATH, &piece)
        })
    }

    /// 删除曲目
    pub fn remove_program_piece(&self, id: &str, piece_id: &str) -> ApiResult<BagrutRecord> {
        run("remove_program_piece", || self.pull_item(id, PROGRAM_PATH, piece_id))
    }

    /// 添加伴奏者
    pub fn add_accompanist(&self, id: &str, raw: &Value) -> ApiResult<BagrutRecord> {
        run("add_accompanist", || {
            let mut accompanist = validate_accompanist(raw)?;
            accompanist.id = Some(new_item_id(accompanist.id.take()));
            self.push_item(id, ACCOMPANISTS_PATH, &accompanist)
        })
    }

    /// 删除伴奏者
    pub fn remove_accompanist(&self, id: &str, accompanist_id: &str) -> ApiResult<BagrutRecord> {
        run("remove_accompanist", || self.pull_item(id, ACCOMPANISTS_PATH, accompanist_id))
    }

    fn push_item<T: Serialize>(&self, id: &str, path: &str, item: &T) -> ApiResult<BagrutRecord> {
        let value = serde_json::to_value(item).map_err(storage_error)?;
        let record = self.apply_update(id, Update::new().push(path, value))?;
        tracing::info!(bagrut_id = %id, path, "添加子列表元素");
        Ok(record)
    }

    fn pull_item(&self, id: &str, path: &str, item_id: &str) -> ApiResult<BagrutRecord> {
        let record = self.apply_update(id, Update::new().pull(path, ID_FIELD, item_id))?;
        tracing::info!(bagrut_id = %id, path, item_id = %item_id, "删除子列表元素");
        Ok(record)
    }
}

/// 保留调用方给出的非空 _id，否则生成新的 UUID
fn new_item_id(existing: Option<String>) -> String {
    existing
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
