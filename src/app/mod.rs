// ==========================================
// 音乐学院管理后台 - 应用层
// ==========================================
// 职责: 装配仓储、配置与API实例
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
