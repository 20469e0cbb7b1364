// ==========================================
// 音乐学院管理后台 - 完成条件检查
// ==========================================
// 条件（全部独立检查，不短路）:
// 1. 4 项阶段演奏全部 completed
// 2. magenBagrut.completed
// 3. 曲目(program)非空
// ==========================================

use crate::domain::bagrut::BagrutRecord;

/// 检查 bagrut 是否满足完成条件
///
/// # 返回
/// 阻塞原因列表；空列表表示可以完成
pub fn check_completion_readiness(bagrut: &BagrutRecord) -> Vec<String> {
    let mut reasons = Vec::new();

    let incomplete: Vec<String> = bagrut
        .presentations
        .completed_flags()
        .iter()
        .enumerate()
        .filter(|(_, completed)| !**completed)
        .map(|(index, _)| (index + 1).to_string())
        .collect();
    if !incomplete.is_empty() {
        reasons.push(format!(
            "not all presentations are completed (incomplete: {})",
            incomplete.join(", ")
        ));
    }

    if !bagrut.magen_bagrut.completed {
        reasons.push("magen bagrut is not completed".to_string());
    }

    if bagrut.program.is_empty() {
        reasons.push("program is empty: at least one program piece is required".to_string());
    }

    reasons
}
