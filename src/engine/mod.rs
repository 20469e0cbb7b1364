// ==========================================
// 音乐学院管理后台 - 规则引擎层
// ==========================================
// 职责: bagrut 评分规则、结构校验、旧结构迁移
// 红线: Engine 不做 I/O, 所有违规必须输出原因
// ==========================================

pub mod completion;
pub mod grade_level;
pub mod migration;
pub mod rubric;
pub mod validation;

// 重导出核心规则
pub use completion::check_completion_readiness;
pub use grade_level::{
    check_grade_consistency, derive_grade_level, grade_level_for, GradeRange, GRADE_LEVEL_TABLE,
};
pub use migration::{migrate_document, needs_migration, MigrationDefaults, MigrationOutcome};
pub use rubric::{detailed_grading_total, grading_details_total, sum_detailed_grading};
pub use validation::{
    validate_accompanist, validate_bagrut, validate_detailed_grading, validate_document,
    validate_grade, validate_grading_details, validate_program_piece, ValidationDefaults,
    Violation,
};
