// ==========================================
// 音乐学院管理后台 - Bagrut 核心库
// ==========================================
// 技术栈: Rust + SQLite (JSON 文档集合)
// 系统定位: 毕业考试(bagrut)记录的校验、评分、完成与旧结构迁移
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 文档集合访问
pub mod repository;

// 引擎层 - 评分规则与结构校验
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 启动装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AccompanimentType, GradeLevel, GradeMismatchPolicy, PresentationStatus};

// 领域实体
pub use domain::{
    Accompaniment, Accompanist, BagrutDocument, BagrutRecord, DetailedGrading,
    GradedPresentation, GradingDetails, PresentationSet, ProgramPiece, UngradedPresentation,
};

// 引擎
pub use engine::{
    check_completion_readiness, check_grade_consistency, derive_grade_level, migrate_document,
    sum_detailed_grading, validate_bagrut,
};

// API
pub use api::{ApiError, ApiErrorKind, ApiResult, BagrutApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "Bagrut Core";
