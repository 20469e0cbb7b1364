// ==========================================
// 音乐学院管理后台 - 成绩等级引擎
// ==========================================
// 职责: 分数 → 等级 查表；分数/等级一致性检查
// 红线: 纯函数，无 I/O
// ==========================================

use crate::domain::types::GradeLevel;

// ==========================================
// GradeRange - 等级区间
// ==========================================
/// 等级区间（展示用整数边界，闭区间）
///
/// 匹配规则: `min <= score < max + 1`，即每档覆盖到下一档下限之前，
/// 小数分数（如 94.5）落入较低一档，六档无缝覆盖 [0, 100]。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeRange {
    pub level: GradeLevel,
    pub min: f64,
    pub max: f64,
}

impl GradeRange {
    pub fn contains(&self, score: f64) -> bool {
        score >= self.min && score < self.max + 1.0
    }
}

/// 等级表（有序，首个匹配生效）
pub const GRADE_LEVEL_TABLE: [GradeRange; 6] = [
    GradeRange { level: GradeLevel::Excellent, min: 95.0, max: 100.0 },
    GradeRange { level: GradeLevel::VeryGood, min: 90.0, max: 94.0 },
    GradeRange { level: GradeLevel::Good, min: 75.0, max: 89.0 },
    GradeRange { level: GradeLevel::Sufficient, min: 55.0, max: 74.0 },
    GradeRange { level: GradeLevel::BarelySufficient, min: 45.0, max: 54.0 },
    GradeRange { level: GradeLevel::Failed, min: 0.0, max: 44.0 },
];

/// 分数对应的等级（未命中任何区间时回退为最低档）
pub fn grade_level_for(score: f64) -> GradeLevel {
    GRADE_LEVEL_TABLE
        .iter()
        .find(|range| range.contains(score))
        .map(|range| range.level)
        .unwrap_or(GradeLevel::Failed)
}

/// 推导等级
///
/// # 返回
/// - None: 输入为空
/// - Some(GradeLevel): 对应等级
pub fn derive_grade_level(score: Option<f64>) -> Option<GradeLevel> {
    score.map(grade_level_for)
}

/// 分数/等级一致性检查
///
/// 任一为空时视为无冲突；仅作信息返回，由调用方决定报错还是自动补全。
pub fn check_grade_consistency(grade: Option<f64>, level: Option<GradeLevel>) -> bool {
    match (grade, level) {
        (Some(grade), Some(level)) => grade_level_for(grade) == level,
        _ => true,
    }
}
