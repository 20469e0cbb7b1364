// ==========================================
// 音乐学院管理后台 - 评分细则领域模型
// ==========================================
// 两套细则:
// - DetailedGrading: 第4次阶段演奏 / 毕业答辩 (20/40/30/10)
// - GradingDetails: 顶层评分表 (20/30/40/10)
// 红线: 满分值固定，不接受调用方覆盖
// ==========================================

use serde::{Deserialize, Serialize};

// ===== 细则满分值 =====
pub const PLAYING_SKILLS_MAX: f64 = 20.0;
pub const MUSICAL_UNDERSTANDING_MAX: f64 = 40.0;
pub const TEXT_KNOWLEDGE_MAX: f64 = 30.0;
pub const PLAYING_BY_HEART_MAX: f64 = 10.0;

// ===== 顶层评分表满分值 =====
pub const TECHNIQUE_MAX: f64 = 20.0;
pub const INTERPRETATION_MAX: f64 = 30.0;
pub const MUSICALITY_MAX: f64 = 40.0;
pub const OVERALL_MAX: f64 = 10.0;

/// 细则项未评定时的标签
pub const NOT_EVALUATED_LABEL: &str = "לא הוערך";

// ==========================================
// RubricItem - 细则单项（按分数计分）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RubricItem {
    pub grade: String,         // 文字评语等级
    pub points: Option<f64>,   // 得分 (None 表示未评)
    pub max_points: f64,       // 满分 (固定)
    pub comments: String,      // 评语
}

impl RubricItem {
    pub fn blank(max_points: f64) -> Self {
        Self {
            grade: NOT_EVALUATED_LABEL.to_string(),
            points: None,
            max_points,
            comments: String::new(),
        }
    }
}

impl Default for RubricItem {
    fn default() -> Self {
        Self::blank(0.0)
    }
}

// ==========================================
// DetailedGrading - 演奏细则
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetailedGrading {
    pub playing_skills: RubricItem,
    pub musical_understanding: RubricItem,
    pub text_knowledge: RubricItem,
    pub playing_by_heart: RubricItem,
}

impl Default for DetailedGrading {
    fn default() -> Self {
        Self {
            playing_skills: RubricItem::blank(PLAYING_SKILLS_MAX),
            musical_understanding: RubricItem::blank(MUSICAL_UNDERSTANDING_MAX),
            text_knowledge: RubricItem::blank(TEXT_KNOWLEDGE_MAX),
            playing_by_heart: RubricItem::blank(PLAYING_BY_HEART_MAX),
        }
    }
}

impl DetailedGrading {
    /// 按固定顺序列出 (字段名, 得分, 满分)
    pub fn entries(&self) -> [(&'static str, Option<f64>, f64); 4] {
        [
            ("playingSkills", self.playing_skills.points, PLAYING_SKILLS_MAX),
            ("musicalUnderstanding", self.musical_understanding.points, MUSICAL_UNDERSTANDING_MAX),
            ("textKnowledge", self.text_knowledge.points, TEXT_KNOWLEDGE_MAX),
            ("playingByHeart", self.playing_by_heart.points, PLAYING_BY_HEART_MAX),
        ]
    }

    /// 恢复固定满分值
    pub fn with_fixed_max_points(mut self) -> Self {
        self.playing_skills.max_points = PLAYING_SKILLS_MAX;
        self.musical_understanding.max_points = MUSICAL_UNDERSTANDING_MAX;
        self.text_knowledge.max_points = TEXT_KNOWLEDGE_MAX;
        self.playing_by_heart.max_points = PLAYING_BY_HEART_MAX;
        self
    }
}

// ==========================================
// ScoreItem - 评分表单项
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreItem {
    pub grade: Option<f64>, // 得分 (None 表示未评)
    pub max_points: f64,
    pub comments: String,
}

impl ScoreItem {
    pub fn blank(max_points: f64) -> Self {
        Self {
            grade: None,
            max_points,
            comments: String::new(),
        }
    }

    pub fn scored(grade: f64, max_points: f64) -> Self {
        Self {
            grade: Some(grade),
            max_points,
            comments: String::new(),
        }
    }
}

impl Default for ScoreItem {
    fn default() -> Self {
        Self::blank(0.0)
    }
}

// ==========================================
// GradingDetails - 顶层评分表
// ==========================================
// 总分 = 四项之和 → finalGrade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GradingDetails {
    pub technique: ScoreItem,
    pub interpretation: ScoreItem,
    pub musicality: ScoreItem,
    pub overall: ScoreItem,
}

impl Default for GradingDetails {
    fn default() -> Self {
        Self {
            technique: ScoreItem::blank(TECHNIQUE_MAX),
            interpretation: ScoreItem::blank(INTERPRETATION_MAX),
            musicality: ScoreItem::blank(MUSICALITY_MAX),
            overall: ScoreItem::blank(OVERALL_MAX),
        }
    }
}

impl GradingDetails {
    /// 按固定顺序列出 (字段名, 得分, 满分)
    pub fn entries(&self) -> [(&'static str, Option<f64>, f64); 4] {
        [
            ("technique", self.technique.grade, TECHNIQUE_MAX),
            ("interpretation", self.interpretation.grade, INTERPRETATION_MAX),
            ("musicality", self.musicality.grade, MUSICALITY_MAX),
            ("overall", self.overall.grade, OVERALL_MAX),
        ]
    }

    /// 恢复固定满分值
    pub fn with_fixed_max_points(mut self) -> Self {
        self.technique.max_points = TECHNIQUE_MAX;
        self.interpretation.max_points = INTERPRETATION_MAX;
        self.musicality.max_points = MUSICALITY_MAX;
        self.overall.max_points = OVERALL_MAX;
        self
    }
}
