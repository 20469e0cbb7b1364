// ==========================================
// 音乐学院管理后台 - 学生关联仓储
// ==========================================
// 职责: 维护 student.academicInfo.tests.bagrutId 反向引用
// 红线: 学生不存在只记录告警，不阻断 bagrut 操作
// ==========================================

use crate::repository::document_store::{DocumentCollection, Filter, Update};
use crate::repository::error::RepositoryResult;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

/// 学生记录中 bagrut 引用的字段路径
pub const STUDENT_BAGRUT_REF_PATH: &str = "academicInfo.tests.bagrutId";

// ==========================================
// StudentLink Trait
// ==========================================
/// 学生 ↔ bagrut 关联接口
pub trait StudentLink: Send + Sync {
    /// 写入学生的 bagrut 引用
    fn link_bagrut_to_student(&self, student_id: &str, bagrut_id: &str) -> RepositoryResult<()>;

    /// 清空学生的 bagrut 引用
    fn unlink_bagrut_from_student(&self, student_id: &str) -> RepositoryResult<()>;
}

// ==========================================
// StudentRepository - 学生集合实现
// ==========================================
pub struct StudentRepository {
    students: Arc<dyn DocumentCollection>,
}

impl StudentRepository {
    pub fn new(students: Arc<dyn DocumentCollection>) -> Self {
        Self { students }
    }

    fn set_bagrut_ref(&self, student_id: &str, value: Value) -> RepositoryResult<()> {
        let update = Update::new()
            .set(STUDENT_BAGRUT_REF_PATH, value)
            .set("updatedAt", Utc::now().to_rfc3339());

        let ack = self.students.update_one(&Filter::by_id(student_id), &update)?;
        if ack.matched_count == 0 {
            tracing::warn!(student_id = %student_id, "学生不存在，跳过 bagrut 引用更新");
        }
        Ok(())
    }
}

impl StudentLink for StudentRepository {
    fn link_bagrut_to_student(&self, student_id: &str, bagrut_id: &str) -> RepositoryResult<()> {
        self.set_bagrut_ref(student_id, Value::String(bagrut_id.to_string()))
    }

    fn unlink_bagrut_from_student(&self, student_id: &str) -> RepositoryResult<()> {
        self.set_bagrut_ref(student_id, Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ensure_schema;
    use crate::repository::sqlite_document_store::SqliteDocumentCollection;
    use rusqlite::Connection;
    use serde_json::json;
    use std::sync::Mutex;

    fn setup() -> (Arc<dyn DocumentCollection>, StudentRepository) {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        let students: Arc<dyn DocumentCollection> = Arc::new(SqliteDocumentCollection::from_connection(
            Arc::new(Mutex::new(conn)),
            "student",
        ));
        let repo = StudentRepository::new(students.clone());
        (students, repo)
    }

    #[test]
    fn test_link_and_unlink() {
        let (students, repo) = setup();
        students
            .insert_one(json!({"_id": "S1", "personalInfo": {"fullName": "Noa"}}))
            .unwrap();

        repo.link_bagrut_to_student("S1", "B1").unwrap();
        let doc = students.find_one(&Filter::by_id("S1")).unwrap().unwrap();
        assert_eq!(doc["academicInfo"]["tests"]["bagrutId"], json!("B1"));
        assert_eq!(doc["personalInfo"]["fullName"], json!("Noa"));

        repo.unlink_bagrut_from_student("S1").unwrap();
        let doc = students.find_one(&Filter::by_id("S1")).unwrap().unwrap();
        assert!(doc["academicInfo"]["tests"]["bagrutId"].is_null());
    }

    #[test]
    fn test_missing_student_is_not_an_error() {
        let (_, repo) = setup();
        assert!(repo.link_bagrut_to_student("ghost", "B1").is_ok());
        assert!(repo.unlink_bagrut_from_student("ghost").is_ok());
    }
}
