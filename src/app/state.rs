// ==========================================
// 音乐学院管理后台 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 启动: 建表 + 一次性加载业务配置（不在首个请求时懒加载）
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::BagrutApi;
use crate::config::config_manager::{BagrutSettings, ConfigManager};
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::repository::{
    DocumentCollection, SqliteDocumentCollection, StudentRepository, BAGRUT_COLLECTION,
    STUDENT_COLLECTION,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 启动时加载的 bagrut 配置
    pub settings: BagrutSettings,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// bagrut 文档集合
    pub bagrut_collection: Arc<dyn DocumentCollection>,

    /// 学生文档集合
    pub student_collection: Arc<dyn DocumentCollection>,

    /// Bagrut 服务 API
    pub bagrut_api: Arc<BagrutApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开共享连接并建表
    /// 2. 读取 bagrut 配置
    /// 3. 创建集合与API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        // 创建数据库连接（共享连接）
        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("failed to open database: {}", e))?;
        ensure_schema(&conn).map_err(|e| format!("failed to initialize schema: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("failed to create ConfigManager: {}", e))?,
        );
        let settings = config_manager
            .load_bagrut_settings()
            .map_err(|e| format!("failed to load bagrut settings: {}", e))?;
        tracing::info!(
            grade_mismatch_policy = %settings.grade_mismatch_policy,
            conservatory_name = %settings.default_conservatory_name,
            "bagrut 配置已加载"
        );

        // ==========================================
        // Repository 层
        // ==========================================
        let bagrut_collection: Arc<dyn DocumentCollection> = Arc::new(
            SqliteDocumentCollection::from_connection(conn.clone(), BAGRUT_COLLECTION),
        );
        let student_collection: Arc<dyn DocumentCollection> = Arc::new(
            SqliteDocumentCollection::from_connection(conn, STUDENT_COLLECTION),
        );
        let student_repo = Arc::new(StudentRepository::new(student_collection.clone()));

        // ==========================================
        // API 层
        // ==========================================
        let bagrut_api = Arc::new(BagrutApi::new(
            bagrut_collection.clone(),
            student_repo,
            settings.clone(),
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            settings,
            config_manager,
            bagrut_collection,
            student_collection,
            bagrut_api,
        })
    }
}

/// 获取默认数据库路径
///
/// # 优先级
/// 1. 环境变量 BAGRUT_CORE_DB_PATH
/// 2. 用户数据目录下的 bagrut-core/bagrut_core.db
/// 3. ./bagrut_core.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("BAGRUT_CORE_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./bagrut_core.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("bagrut-core");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("bagrut_core.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_bootstraps_fresh_database() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let db_path = temp.path().to_str().unwrap().to_string();

        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.db_path, db_path);
        assert_eq!(state.settings, BagrutSettings::default());
        assert!(state.bagrut_api.list_bagruts(&Default::default()).unwrap().is_empty());
    }
}
