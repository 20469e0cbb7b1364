// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 提供API层集成测试的通用辅助函数
// ==========================================

#[path = "../test_helpers.rs"]
mod test_helpers;

use std::sync::Arc;
use tempfile::NamedTempFile;

use bagrut_core::api::{ApiError, ApiErrorKind, BagrutApi};
use bagrut_core::app::AppState;
use bagrut_core::repository::{DocumentCollection, Filter};
use serde_json::{json, Value};

// ==========================================
// API测试环境
// ==========================================

/// API测试环境
///
/// 通过 AppState 装配，与生产启动路径一致
pub struct ApiTestEnv {
    pub db_path: String,
    pub bagrut_api: Arc<BagrutApi>,

    // 集合（用于测试数据准备与直接断言）
    pub bagrut_collection: Arc<dyn DocumentCollection>,
    pub student_collection: Arc<dyn DocumentCollection>,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    /// 创建新的API测试环境（默认配置）
    pub fn new() -> Result<Self, String> {
        Self::build(None)
    }

    /// 创建带指定成绩不一致策略的测试环境
    pub fn with_policy(policy: &str) -> Result<Self, String> {
        Self::build(Some(policy))
    }

    fn build(policy: Option<&str>) -> Result<Self, String> {
        let (temp_file, db_path) = test_helpers::create_test_db()
            .map_err(|e| format!("创建测试数据库失败: {}", e))?;

        if let Some(policy) = policy {
            let conn = test_helpers::open_test_connection(&db_path)
                .map_err(|e| format!("无法打开数据库: {}", e))?;
            test_helpers::insert_test_config(&conn, policy, "Test Conservatory")
                .map_err(|e| format!("写入测试配置失败: {}", e))?;
        }

        let state = AppState::new(db_path.clone())?;

        Ok(Self {
            db_path,
            bagrut_api: state.bagrut_api.clone(),
            bagrut_collection: state.bagrut_collection.clone(),
            student_collection: state.student_collection.clone(),
            _temp_file: temp_file,
        })
    }

    /// 插入学生记录
    pub fn insert_student(&self, student_id: &str) {
        self.student_collection
            .insert_one(json!({
                "_id": student_id,
                "personalInfo": {"fullName": format!("Student {}", student_id)},
                "academicInfo": {"tests": {}}
            }))
            .expect("插入学生失败");
    }

    /// 读取学生记录
    pub fn student(&self, student_id: &str) -> Value {
        self.student_collection
            .find_one(&Filter::by_id(student_id))
            .expect("查询学生失败")
            .expect("学生不存在")
    }

    /// 直接读取 bagrut 原始文档
    pub fn raw_bagrut(&self, id: &str) -> Value {
        self.bagrut_collection
            .find_one(&Filter::by_id(id))
            .expect("查询 bagrut 失败")
            .expect("bagrut 不存在")
    }

    /// 直接插入原始文档（绕过校验，用于旧结构数据）
    pub fn insert_raw_bagrut(&self, doc: Value) -> String {
        self.bagrut_collection.insert_one(doc).expect("插入 bagrut 失败")
    }
}

// ==========================================
// 断言辅助
// ==========================================

/// 断言错误大类与操作名前缀
pub fn assert_api_error(err: &ApiError, kind: ApiErrorKind, operation: &str) {
    assert_eq!(err.kind(), kind, "unexpected error kind: {}", err);
    assert!(
        err.to_string().starts_with(&format!("in {}: ", operation)),
        "missing operation prefix: {}",
        err
    );
}
