// ==========================================
// 音乐学院管理后台 - 领域模型层
// ==========================================
// 职责: 定义 bagrut 实体、评分细则、枚举类型
// 红线: 不含数据访问逻辑,不含评分规则计算
// ==========================================

pub mod bagrut;
pub mod grading;
pub mod types;

// 重导出核心类型
pub use bagrut::{
    Accompaniment, Accompanist, BagrutDocument, BagrutRecord, GradedPresentation, PresentationSet,
    ProgramPiece, UngradedPresentation, CURRENT_DOCUMENT_VERSION, GRADED_PRESENTATION_INDEX,
    LEGACY_PRESENTATION_COUNT, PRESENTATION_COUNT,
};
pub use grading::{DetailedGrading, GradingDetails, RubricItem, ScoreItem};
pub use types::{AccompanimentType, GradeLevel, GradeMismatchPolicy, PresentationStatus};
