// ==========================================
// 音乐学院管理后台 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供控制器调用
// ==========================================

pub mod bagrut_api;
pub mod error;

// 重导出核心类型
pub use bagrut_api::{BagrutApi, BagrutListFilter, MigrationReport, PresentationUpdate};
pub use error::{ApiError, ApiErrorKind, ApiResult, OperationContext};
