// ==========================================
// 音乐学院管理后台 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供文档集合访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod document_store;
pub mod error;
pub mod sqlite_document_store;
pub mod student_repo;

/// bagrut 集合名
pub const BAGRUT_COLLECTION: &str = "bagrut";
/// 学生集合名
pub const STUDENT_COLLECTION: &str = "student";

// 重导出核心仓储
pub use document_store::{
    get_path, DeleteAck, DocumentCollection, Filter, ReturnDocument, Update, UpdateAck, ID_FIELD,
};
pub use error::{RepositoryError, RepositoryResult};
pub use sqlite_document_store::SqliteDocumentCollection;
pub use student_repo::{StudentLink, StudentRepository, STUDENT_BAGRUT_REF_PATH};
