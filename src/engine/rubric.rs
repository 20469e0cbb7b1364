// ==========================================
// 音乐学院管理后台 - 评分细则汇总
// ==========================================
// 规则: 任一必填子项为空 → 总分为空（不做部分求和）
// ==========================================

use crate::domain::grading::{DetailedGrading, GradingDetails};

/// 汇总子项得分
///
/// # 返回
/// - None: 任一子项为空
/// - Some(f64): 精确算术和（不取整）
pub fn sum_detailed_grading<I>(scores: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    scores
        .into_iter()
        .try_fold(0.0, |total, score| score.map(|s| total + s))
}

/// 演奏细则总分（playingSkills + musicalUnderstanding + textKnowledge + playingByHeart）
pub fn detailed_grading_total(grading: &DetailedGrading) -> Option<f64> {
    sum_detailed_grading(grading.entries().iter().map(|(_, points, _)| *points))
}

/// 顶层评分表总分（technique + interpretation + musicality + overall）
pub fn grading_details_total(details: &GradingDetails) -> Option<f64> {
    sum_detailed_grading(details.entries().iter().map(|(_, grade, _)| *grade))
}
