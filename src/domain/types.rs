// ==========================================
// 音乐学院管理后台 - 领域类型定义
// ==========================================
// 依据: 毕业考试(bagrut)评分规则 - 等级表/状态枚举
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 成绩等级 (Grade Level)
// ==========================================
// 序列化格式: 希伯来语标签 (与历史文档一致)
// 顺序: 从高到低
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradeLevel {
    #[serde(rename = "מעולה")]
    Excellent, // 95-100
    #[serde(rename = "טוב מאוד")]
    VeryGood, // 90-94
    #[serde(rename = "טוב")]
    Good, // 75-89
    #[serde(rename = "מספיק")]
    Sufficient, // 55-74
    #[serde(rename = "מספיק בקושי")]
    BarelySufficient, // 45-54
    #[serde(rename = "לא עבר/ה")]
    Failed, // 0-44
}

impl GradeLevel {
    /// 全部等级（从高到低）
    pub const ALL: [GradeLevel; 6] = [
        GradeLevel::Excellent,
        GradeLevel::VeryGood,
        GradeLevel::Good,
        GradeLevel::Sufficient,
        GradeLevel::BarelySufficient,
        GradeLevel::Failed,
    ];

    /// 存储用标签
    pub fn label(&self) -> &'static str {
        match self {
            GradeLevel::Excellent => "מעולה",
            GradeLevel::VeryGood => "טוב מאוד",
            GradeLevel::Good => "טוב",
            GradeLevel::Sufficient => "מספיק",
            GradeLevel::BarelySufficient => "מספיק בקושי",
            GradeLevel::Failed => "לא עבר/ה",
        }
    }

    /// 从标签解析等级
    ///
    /// # 返回
    /// - Some(GradeLevel): 已知标签
    /// - None: 未知标签
    pub fn from_label(label: &str) -> Option<Self> {
        GradeLevel::ALL
            .iter()
            .copied()
            .find(|level| level.label() == label.trim())
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ==========================================
// 阶段演奏状态 (Presentation Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresentationStatus {
    Passed,  // 通过
    Failed,  // 未通过
    #[default]
    NotExamined, // 未考核
}

impl PresentationStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "passed" => Some(PresentationStatus::Passed),
            "failed" => Some(PresentationStatus::Failed),
            "not-examined" => Some(PresentationStatus::NotExamined),
            _ => None,
        }
    }
}

impl fmt::Display for PresentationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresentationStatus::Passed => write!(f, "passed"),
            PresentationStatus::Failed => write!(f, "failed"),
            PresentationStatus::NotExamined => write!(f, "not-examined"),
        }
    }
}

// ==========================================
// 伴奏类型 (Accompaniment Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccompanimentType {
    #[default]
    SoloistAccompanist, // 独奏+伴奏
    Ensemble,           // 重奏/合奏
}

impl AccompanimentType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "soloist-accompanist" => Some(AccompanimentType::SoloistAccompanist),
            "ensemble" => Some(AccompanimentType::Ensemble),
            _ => None,
        }
    }
}

impl fmt::Display for AccompanimentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccompanimentType::SoloistAccompanist => write!(f, "soloist-accompanist"),
            AccompanimentType::Ensemble => write!(f, "ensemble"),
        }
    }
}

// ==========================================
// 成绩/等级冲突处理策略 (Grade Mismatch Policy)
// ==========================================
// 配置项: bagrut/grade_mismatch_policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GradeMismatchPolicy {
    /// 拒绝：调用方给出的等级与分数不符时报冲突
    #[default]
    Reject,
    /// 自动修正：按分数重新推导等级，丢弃调用方的等级
    AutoCorrect,
}

impl GradeMismatchPolicy {
    /// 从字符串解析策略（未知值回退为 Reject）
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "AUTO_CORRECT" => GradeMismatchPolicy::AutoCorrect,
            _ => GradeMismatchPolicy::Reject,
        }
    }

    /// 转换为配置存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            GradeMismatchPolicy::Reject => "REJECT",
            GradeMismatchPolicy::AutoCorrect => "AUTO_CORRECT",
        }
    }
}

impl fmt::Display for GradeMismatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_level_label_roundtrip() {
        for level in GradeLevel::ALL {
            assert_eq!(GradeLevel::from_label(level.label()), Some(level));
        }
        assert_eq!(GradeLevel::from_label("excellent"), None);
    }

    #[test]
    fn test_grade_level_serde_uses_hebrew_label() {
        let json = serde_json::to_string(&GradeLevel::Good).unwrap();
        assert_eq!(json, "\"טוב\"");
        let parsed: GradeLevel = serde_json::from_str("\"מספיק בקושי\"").unwrap();
        assert_eq!(parsed, GradeLevel::BarelySufficient);
    }

    #[test]
    fn test_presentation_status_kebab_case() {
        let json = serde_json::to_string(&PresentationStatus::NotExamined).unwrap();
        assert_eq!(json, "\"not-examined\"");
        assert_eq!(PresentationStatus::from_str("passed"), Some(PresentationStatus::Passed));
        assert_eq!(PresentationStatus::from_str("PASSED"), None);
    }

    #[test]
    fn test_grade_mismatch_policy_from_str() {
        assert_eq!(GradeMismatchPolicy::from_str("auto_correct"), GradeMismatchPolicy::AutoCorrect);
        assert_eq!(GradeMismatchPolicy::from_str("REJECT"), GradeMismatchPolicy::Reject);
        assert_eq!(GradeMismatchPolicy::from_str("whatever"), GradeMismatchPolicy::Reject);
    }
}
