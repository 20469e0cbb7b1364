// ==========================================
// 音乐学院管理后台 - SQLite 文档集合
// ==========================================
// 存储: documents 表 (collection, id, body JSON)
// 更新: 读-改-写，在同一事务内完成
// 红线: 不含业务逻辑，只负责数据访问
// ==========================================

use crate::db::open_sqlite_connection;
use crate::repository::document_store::{
    DeleteAck, DocumentCollection, Filter, ReturnDocument, Update, UpdateAck, ID_FIELD,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// SqliteDocumentCollection - 文档集合
// ==========================================
/// SQLite 文档集合
/// 职责: 以 JSON 文本存储单个集合的文档
pub struct SqliteDocumentCollection {
    conn: Arc<Mutex<Connection>>,
    collection: String,
}

impl SqliteDocumentCollection {
    /// 创建新的集合实例（独立连接）
    pub fn new(db_path: &str, collection: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            collection: collection.to_string(),
        })
    }

    /// 从已有连接创建集合实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>, collection: &str) -> Self {
        Self {
            conn,
            collection: collection.to_string(),
        }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取候选文档并按过滤条件筛选
    ///
    /// 带 `_id` 条件时走主键查询，否则全集合扫描。
    fn load_matching(
        &self,
        conn: &Connection,
        filter: &Filter,
        limit: Option<usize>,
    ) -> RepositoryResult<Vec<(String, Value)>> {
        let rows: Vec<(String, String)> = match filter.id() {
            Some(id) => conn
                .query_row(
                    "SELECT id, body FROM documents WHERE collection = ?1 AND id = ?2",
                    params![self.collection, id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?
                .into_iter()
                .collect(),
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, body FROM documents WHERE collection = ?1 ORDER BY seq ASC",
                )?;
                let rows = stmt
                    .query_map(params![self.collection], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };

        let mut matched = Vec::new();
        for (id, body) in rows {
            let doc: Value = serde_json::from_str(&body)?;
            if filter.matches(&doc) {
                matched.push((id, doc));
                if limit.is_some_and(|n| matched.len() >= n) {
                    break;
                }
            }
        }
        Ok(matched)
    }

    fn first_match(&self, conn: &Connection, filter: &Filter) -> RepositoryResult<Option<(String, Value)>> {
        Ok(self.load_matching(conn, filter, Some(1))?.into_iter().next())
    }

    fn write_body(&self, conn: &Connection, id: &str, doc: &Value) -> RepositoryResult<()> {
        conn.execute(
            "UPDATE documents SET body = ?1, updated_at = ?2 WHERE collection = ?3 AND id = ?4",
            params![
                serde_json::to_string(doc)?,
                Utc::now().to_rfc3339(),
                self.collection,
                id
            ],
        )?;
        Ok(())
    }

    /// 在事务内更新首个匹配文档
    ///
    /// # 返回
    /// - Ok(None): 未匹配
    /// - Ok(Some((before, after, modified)))
    fn update_first(
        &self,
        filter: &Filter,
        update: &Update,
    ) -> RepositoryResult<Option<(Value, Value, bool)>> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let Some((id, before)) = self.first_match(&tx, filter)? else {
            return Ok(None);
        };

        let mut after = before.clone();
        let modified = update.apply(&mut after)?;
        if modified {
            self.write_body(&tx, &id, &after)?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(Some((before, after, modified)))
    }
}

impl DocumentCollection for SqliteDocumentCollection {
    fn find(&self, filter: &Filter) -> RepositoryResult<Vec<Value>> {
        let conn = self.get_conn()?;
        Ok(self
            .load_matching(&conn, filter, None)?
            .into_iter()
            .map(|(_, doc)| doc)
            .collect())
    }

    fn find_one(&self, filter: &Filter) -> RepositoryResult<Option<Value>> {
        let conn = self.get_conn()?;
        Ok(self.first_match(&conn, filter)?.map(|(_, doc)| doc))
    }

    fn insert_one(&self, mut doc: Value) -> RepositoryResult<String> {
        let obj = doc.as_object_mut().ok_or_else(|| RepositoryError::FieldValueError {
            field: ID_FIELD.to_string(),
            message: "document must be a JSON object".to_string(),
        })?;

        let id = match obj.get(ID_FIELD).and_then(Value::as_str) {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => uuid::Uuid::new_v4().to_string(),
        };
        obj.insert(ID_FIELD.to_string(), Value::String(id.clone()));

        let now = Utc::now().to_rfc3339();
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO documents (collection, id, body, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![self.collection, id, serde_json::to_string(&doc)?, now, now],
        )?;
        Ok(id)
    }

    fn update_one(&self, filter: &Filter, update: &Update) -> RepositoryResult<UpdateAck> {
        Ok(match self.update_first(filter, update)? {
            Some((_, _, modified)) => UpdateAck {
                matched_count: 1,
                modified_count: u64::from(modified),
            },
            None => UpdateAck::default(),
        })
    }

    fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
        return_document: ReturnDocument,
    ) -> RepositoryResult<Option<Value>> {
        Ok(self
            .update_first(filter, update)?
            .map(|(before, after, _)| match return_document {
                ReturnDocument::Before => before,
                ReturnDocument::After => after,
            }))
    }

    fn delete_one(&self, filter: &Filter) -> RepositoryResult<DeleteAck> {
        let conn = self.get_conn()?;
        let Some((id, _)) = self.first_match(&conn, filter)? else {
            return Ok(DeleteAck::default());
        };

        let deleted = conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![self.collection, id],
        )?;
        Ok(DeleteAck {
            deleted_count: deleted as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ensure_schema;
    use serde_json::json;

    fn collection(name: &str) -> SqliteDocumentCollection {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        SqliteDocumentCollection::from_connection(Arc::new(Mutex::new(conn)), name)
    }

    #[test]
    fn test_insert_assigns_id_and_find_by_id() {
        let coll = collection("bagrut");
        let id = coll.insert_one(json!({"studentId": "S1"})).unwrap();
        assert!(!id.is_empty());

        let doc = coll.find_one(&Filter::by_id(&id)).unwrap().unwrap();
        assert_eq!(doc["_id"], json!(id));
        assert_eq!(doc["studentId"], json!("S1"));
    }

    #[test]
    fn test_duplicate_id_is_unique_violation() {
        let coll = collection("bagrut");
        coll.insert_one(json!({"_id": "B1"})).unwrap();
        let err = coll.insert_one(json!({"_id": "B1"})).unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)), "err={:?}", err);
    }

    #[test]
    fn test_collections_are_isolated() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        let bagruts = SqliteDocumentCollection::from_connection(conn.clone(), "bagrut");
        let students = SqliteDocumentCollection::from_connection(conn, "student");

        bagruts.insert_one(json!({"_id": "X"})).unwrap();
        students.insert_one(json!({"_id": "X"})).unwrap();
        assert_eq!(bagruts.find(&Filter::new()).unwrap().len(), 1);
        assert_eq!(students.find(&Filter::new()).unwrap().len(), 1);
    }

    #[test]
    fn test_find_preserves_insertion_order_and_filters() {
        let coll = collection("bagrut");
        coll.insert_one(json!({"_id": "B1", "teacherId": "T1", "isActive": true})).unwrap();
        coll.insert_one(json!({"_id": "B2", "teacherId": "T2", "isActive": true})).unwrap();
        coll.insert_one(json!({"_id": "B3", "teacherId": "T1", "isActive": false})).unwrap();

        let ids: Vec<String> = coll
            .find(&Filter::new().eq("teacherId", "T1"))
            .unwrap()
            .iter()
            .map(|d| d["_id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["B1", "B3"]);
    }

    #[test]
    fn test_update_one_and_find_one_and_update() {
        let coll = collection("bagrut");
        coll.insert_one(json!({"_id": "B1", "notes": "a"})).unwrap();

        let ack = coll
            .update_one(&Filter::by_id("B1"), &Update::new().set("notes", "b"))
            .unwrap();
        assert_eq!(ack, UpdateAck { matched_count: 1, modified_count: 1 });

        let ack = coll
            .update_one(&Filter::by_id("missing"), &Update::new().set("notes", "b"))
            .unwrap();
        assert_eq!(ack.matched_count, 0);

        let before = coll
            .find_one_and_update(&Filter::by_id("B1"), &Update::new().set("notes", "c"), ReturnDocument::Before)
            .unwrap()
            .unwrap();
        assert_eq!(before["notes"], json!("b"));

        let after = coll
            .find_one_and_update(&Filter::by_id("B1"), &Update::new().set("notes", "d"), ReturnDocument::After)
            .unwrap()
            .unwrap();
        assert_eq!(after["notes"], json!("d"));
    }

    #[test]
    fn test_failed_update_leaves_document_unchanged() {
        let coll = collection("bagrut");
        coll.insert_one(json!({"_id": "B1", "notes": "a"})).unwrap();

        let update = Update::new().set("notes", "b").set("notes.inner", 1);
        assert!(coll.update_one(&Filter::by_id("B1"), &update).is_err());

        let doc = coll.find_one(&Filter::by_id("B1")).unwrap().unwrap();
        assert_eq!(doc["notes"], json!("a"));
    }

    #[test]
    fn test_delete_one() {
        let coll = collection("bagrut");
        coll.insert_one(json!({"_id": "B1"})).unwrap();

        assert_eq!(coll.delete_one(&Filter::by_id("B1")).unwrap().deleted_count, 1);
        assert_eq!(coll.delete_one(&Filter::by_id("B1")).unwrap().deleted_count, 0);
        assert!(coll.find_one(&Filter::by_id("B1")).unwrap().is_none());
    }
}
