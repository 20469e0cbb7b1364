// ==========================================
// 音乐学院管理后台 - 毕业考试(bagrut)领域模型
// ==========================================
// 红线: 每个学生同一时间最多一份有效(isActive) bagrut
// 红线: presentations 固定 4 项，只有第 4 项(索引3)与 magenBagrut 可打分
// 对齐: bagrut 文档集合 (camelCase 字段名)
// ==========================================

use crate::domain::grading::{DetailedGrading, GradingDetails};
use crate::domain::types::{AccompanimentType, GradeLevel, PresentationStatus};
use chrono::{DateTime, Utc};
use serde::de::Error as DeError;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// 当前文档结构版本（4 项 presentations）
pub const CURRENT_DOCUMENT_VERSION: u32 = 2;

/// 阶段演奏总数
pub const PRESENTATION_COUNT: usize = 4;

/// 可打分的阶段演奏索引
pub const GRADED_PRESENTATION_INDEX: usize = 3;

/// 旧结构的阶段演奏数量
pub const LEGACY_PRESENTATION_COUNT: usize = 3;

// ==========================================
// ProgramPiece - 演奏曲目
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgramPiece {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub composer: String,
    pub duration: String,
    pub movement: Option<String>,
    pub youtube_link: Option<String>, // 必须为合法 URL 或 null
}

// ==========================================
// Accompaniment - 伴奏
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Accompanist {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub instrument: String,
    pub phone: Option<String>, // 本地手机号格式
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Accompaniment {
    #[serde(rename = "type")]
    pub accompaniment_type: AccompanimentType,
    pub accompanists: Vec<Accompanist>,
}

// ==========================================
// UngradedPresentation - 阶段演奏 (索引 0-2)
// ==========================================
// 红线: 不携带 grade / gradeLevel
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UngradedPresentation {
    pub completed: bool,
    pub status: PresentationStatus,
    pub date: Option<DateTime<Utc>>,
    pub review: Option<String>,
    pub reviewed_by: Option<String>,
    pub notes: String,
    pub recording_links: Vec<String>,
}

// ==========================================
// GradedPresentation - 可打分演奏 (索引 3 / magenBagrut)
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GradedPresentation {
    pub completed: bool,
    pub status: PresentationStatus,
    pub date: Option<DateTime<Utc>>,
    pub review: Option<String>,
    pub reviewed_by: Option<String>,
    pub grade: Option<f64>,              // 0-100
    pub grade_level: Option<GradeLevel>, // 必须与 grade 推导结果一致
    pub recording_links: Vec<String>,
    pub detailed_grading: DetailedGrading,
}

// ==========================================
// PresentationSet - 4 项阶段演奏
// ==========================================
// 存储格式: 长度为 4 的 JSON 数组
// 读取兼容: 旧文档只有 3 项时补一个空白第 4 项
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PresentationSet {
    pub interim: [UngradedPresentation; 3],
    pub defense: GradedPresentation,
}

impl PresentationSet {
    /// 各项完成标记（按索引顺序）
    pub fn completed_flags(&self) -> [bool; PRESENTATION_COUNT] {
        [
            self.interim[0].completed,
            self.interim[1].completed,
            self.interim[2].completed,
            self.defense.completed,
        ]
    }
}

impl Serialize for PresentationSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(PRESENTATION_COUNT))?;
        for presentation in &self.interim {
            seq.serialize_element(presentation)?;
        }
        seq.serialize_element(&self.defense)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for PresentationSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Vec<Value> = Vec::deserialize(deserializer)?;
        if raw.len() > PRESENTATION_COUNT {
            return Err(D::Error::custom(format!(
                "presentations must contain at most {} entries, got {}",
                PRESENTATION_COUNT,
                raw.len()
            )));
        }

        let mut set = PresentationSet::default();
        for (index, value) in raw.into_iter().enumerate() {
            if index < GRADED_PRESENTATION_INDEX {
                // 多余的 grade/gradeLevel 键在此被丢弃
                set.interim[index] = serde_json::from_value(value).map_err(D::Error::custom)?;
            } else {
                set.defense = serde_json::from_value(value).map_err(D::Error::custom)?;
            }
        }
        Ok(set)
    }
}

// ==========================================
// BagrutDocument - 附件文档
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BagrutDocument {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub file_url: String,
    #[serde(default)]
    pub file_key: Option<String>,
    #[serde(default = "Utc::now")]
    pub upload_date: DateTime<Utc>,
    pub uploaded_by: String,
}

// ==========================================
// BagrutRecord - 毕业考试记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BagrutRecord {
    // ===== 主键 =====
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    // ===== 外部引用 =====
    pub student_id: String,
    pub teacher_id: String,

    // ===== 曲目与伴奏 =====
    #[serde(default)]
    pub program: Vec<ProgramPiece>,
    #[serde(default)]
    pub accompaniment: Accompaniment,

    // ===== 演奏与评分 =====
    #[serde(default)]
    pub presentations: PresentationSet,
    #[serde(default)]
    pub magen_bagrut: GradedPresentation,
    #[serde(default)]
    pub grading_details: GradingDetails,

    // ===== 附件 =====
    #[serde(default)]
    pub documents: Vec<BagrutDocument>,

    // ===== 最终成绩 =====
    #[serde(default)]
    pub final_grade: Option<f64>,
    #[serde(default)]
    pub final_grade_level: Option<GradeLevel>,

    // ===== 完成状态 =====
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub completion_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub teacher_signature: Option<String>,
    #[serde(default)]
    pub conservatory_name: Option<String>,
    #[serde(default)]
    pub notes: String,

    // ===== 生命周期 =====
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl BagrutRecord {
    /// 创建新的空白记录
    pub fn new(student_id: String, teacher_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            student_id,
            teacher_id,
            program: Vec::new(),
            accompaniment: Accompaniment::default(),
            presentations: PresentationSet::default(),
            magen_bagrut: GradedPresentation::default(),
            grading_details: GradingDetails::default(),
            documents: Vec::new(),
            final_grade: None,
            final_grade_level: None,
            is_completed: false,
            completion_date: None,
            teacher_signature: None,
            conservatory_name: None,
            notes: String::new(),
            is_active: true,
            schema_version: CURRENT_DOCUMENT_VERSION,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_presentation_set_serializes_four_entries() {
        let record = BagrutRecord::new("S1".to_string(), "T1".to_string());
        let value = serde_json::to_value(&record).unwrap();
        let presentations = value["presentations"].as_array().unwrap();

        assert_eq!(presentations.len(), PRESENTATION_COUNT);
        assert!(presentations[0].get("grade").is_none());
        assert!(presentations[0].get("notes").is_some());
        assert!(presentations[3].get("grade").is_some());
        assert_eq!(
            presentations[3]["detailedGrading"]["musicalUnderstanding"]["maxPoints"],
            json!(40.0)
        );
    }

    #[test]
    fn test_presentation_set_reads_legacy_three_entries() {
        let raw = json!([
            {"completed": true, "status": "passed", "grade": 80, "gradeLevel": "טוב"},
            {"completed": false},
            {"completed": false, "notes": "n"}
        ]);
        let set: PresentationSet = serde_json::from_value(raw).unwrap();

        assert!(set.interim[0].completed);
        assert_eq!(set.interim[0].status, PresentationStatus::Passed);
        assert_eq!(set.interim[2].notes, "n");
        assert_eq!(set.defense, GradedPresentation::default());
    }

    #[test]
    fn test_presentation_set_rejects_five_entries() {
        let raw = json!([{}, {}, {}, {}, {}]);
        assert!(serde_json::from_value::<PresentationSet>(raw).is_err());
    }

    #[test]
    fn test_record_minimal_json_fills_defaults() {
        let record: BagrutRecord =
            serde_json::from_value(json!({"studentId": "S1", "teacherId": "T1"})).unwrap();
        assert!(record.is_active);
        assert!(record.program.is_empty());
        assert_eq!(record.grading_details, GradingDetails::default());
        assert_eq!(record.schema_version, 0);
    }
}
