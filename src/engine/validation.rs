// ==========================================
// 音乐学院管理后台 - bagrut 结构校验
// ==========================================
// 职责: 字段级约束校验 + 默认值填充
// 规则: 收集全部违规后一次性返回（不在首个错误处短路）
// 红线: 纯函数，无 I/O
// ==========================================

use crate::domain::bagrut::{
    Accompanist, BagrutDocument, BagrutRecord, ProgramPiece, CURRENT_DOCUMENT_VERSION,
    GRADED_PRESENTATION_INDEX, PRESENTATION_COUNT,
};
use crate::domain::grading::{
    DetailedGrading, GradingDetails, INTERPRETATION_MAX, MUSICALITY_MAX,
    MUSICAL_UNDERSTANDING_MAX, OVERALL_MAX, PLAYING_BY_HEART_MAX, PLAYING_SKILLS_MAX,
    TECHNIQUE_MAX, TEXT_KNOWLEDGE_MAX,
};
use crate::domain::types::{AccompanimentType, GradeLevel, PresentationStatus};
use crate::engine::completion::check_completion_readiness;
use crate::engine::grade_level::{check_grade_consistency, derive_grade_level};
use crate::engine::rubric::grading_details_total;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

/// 成绩上下限
pub const GRADE_MIN: f64 = 0.0;
pub const GRADE_MAX: f64 = 100.0;

/// 总分比较容差（子项为小数时的浮点误差）
const SCORE_EPSILON: f64 = 1e-9;

const DETAILED_GRADING_FIELDS: [(&str, f64); 4] = [
    ("playingSkills", PLAYING_SKILLS_MAX),
    ("musicalUnderstanding", MUSICAL_UNDERSTANDING_MAX),
    ("textKnowledge", TEXT_KNOWLEDGE_MAX),
    ("playingByHeart", PLAYING_BY_HEART_MAX),
];

const GRADING_DETAILS_FIELDS: [(&str, f64); 4] = [
    ("technique", TECHNIQUE_MAX),
    ("interpretation", INTERPRETATION_MAX),
    ("musicality", MUSICALITY_MAX),
    ("overall", OVERALL_MAX),
];

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^05\d{8}$").expect("invalid phone regex pattern"))
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^https?://[^\s/?#]+\.[^\s/?#]+(?:[/?#]\S*)?$").expect("invalid url regex pattern")
    })
}

// ==========================================
// Violation - 单条违规
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// 违规收集器
#[derive(Debug, Default)]
struct Violations(Vec<Violation>);

impl Violations {
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(Violation::new(field, message));
    }

    fn into_result<T>(self, value: impl FnOnce() -> Result<T, Vec<Violation>>) -> Result<T, Vec<Violation>> {
        if self.0.is_empty() {
            value()
        } else {
            Err(self.0)
        }
    }
}

/// 校验默认值（由配置提供）
#[derive(Debug, Clone, Default)]
pub struct ValidationDefaults {
    pub conservatory_name: String,
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

// ==========================================
// 字段检查辅助函数
// ==========================================

fn check_required_string(obj: &Map<String, Value>, key: &str, prefix: &str, v: &mut Violations) {
    let path = join_path(prefix, key);
    match obj.get(key) {
        None | Some(Value::Null) => v.push(&path, "is required"),
        Some(Value::String(s)) if s.trim().is_empty() => v.push(&path, "must not be empty"),
        Some(Value::String(_)) => {}
        Some(_) => v.push(&path, "must be a string"),
    }
}

fn check_optional_string(obj: &Map<String, Value>, key: &str, prefix: &str, v: &mut Violations) {
    match obj.get(key) {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(_) => v.push(&join_path(prefix, key), "must be a string"),
    }
}

fn check_bool(obj: &Map<String, Value>, key: &str, prefix: &str, v: &mut Violations) {
    match obj.get(key) {
        None | Some(Value::Bool(_)) => {}
        Some(_) => v.push(&join_path(prefix, key), "must be a boolean"),
    }
}

fn check_number_range(
    obj: &Map<String, Value>,
    key: &str,
    prefix: &str,
    min: f64,
    max: f64,
    v: &mut Violations,
) -> Option<f64> {
    let path = join_path(prefix, key);
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => match value.as_f64() {
            Some(n) if n < min || n > max => {
                v.push(&path, format!("must be between {} and {}, got {}", min, max, n));
                None
            }
            Some(n) => Some(n),
            None => {
                v.push(&path, "must be a number");
                None
            }
        },
    }
}

fn check_date(obj: &Map<String, Value>, key: &str, prefix: &str, v: &mut Violations) {
    match obj.get(key) {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) if DateTime::parse_from_rfc3339(s).is_ok() => {}
        Some(_) => v.push(&join_path(prefix, key), "must be an RFC 3339 date"),
    }
}

fn check_pattern(
    obj: &Map<String, Value>,
    key: &str,
    prefix: &str,
    pattern: &Regex,
    description: &str,
    v: &mut Violations,
) {
    let path = join_path(prefix, key);
    match obj.get(key) {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) if pattern.is_match(s) => {}
        Some(Value::String(s)) => v.push(&path, format!("'{}' is not a valid {}", s, description)),
        Some(_) => v.push(&path, "must be a string"),
    }
}

fn check_enum(
    obj: &Map<String, Value>,
    key: &str,
    prefix: &str,
    is_known: fn(&str) -> bool,
    allowed: &str,
    v: &mut Violations,
) {
    let path = join_path(prefix, key);
    match obj.get(key) {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) if is_known(s) => {}
        Some(other) => v.push(&path, format!("must be one of [{}], got {}", allowed, other)),
    }
}

fn check_grade_level(obj: &Map<String, Value>, key: &str, prefix: &str, v: &mut Violations) -> Option<GradeLevel> {
    let path = join_path(prefix, key);
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => match GradeLevel::from_label(s) {
            Some(level) => Some(level),
            None => {
                v.push(&path, format!("'{}' is not a known grade level", s));
                None
            }
        },
        Some(_) => {
            v.push(&path, "must be a string");
            None
        }
    }
}

fn check_array<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    prefix: &str,
    v: &mut Violations,
) -> Option<&'a Vec<Value>> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(items),
        Some(_) => {
            v.push(&join_path(prefix, key), "must be an array");
            None
        }
    }
}

fn check_object<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    prefix: &str,
    v: &mut Violations,
) -> Option<&'a Map<String, Value>> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Object(inner)) => Some(inner),
        Some(_) => {
            v.push(&join_path(prefix, key), "must be an object");
            None
        }
    }
}

fn check_string_array(obj: &Map<String, Value>, key: &str, prefix: &str, v: &mut Violations) {
    if let Some(items) = check_array(obj, key, prefix, v) {
        for (i, item) in items.iter().enumerate() {
            if !item.is_string() {
                v.push(&format!("{}[{}]", join_path(prefix, key), i), "must be a string");
            }
        }
    }
}

fn check_grade_pair(grade: Option<f64>, level: Option<GradeLevel>, path: &str, v: &mut Violations) {
    if !check_grade_consistency(grade, level) {
        if let (Some(grade), Some(level)) = (grade, level) {
            v.push(
                path,
                format!("grade level '{}' does not match grade {}", level, grade),
            );
        }
    }
}

// ==========================================
// 子结构检查
// ==========================================

fn check_program_piece_value(value: &Value, prefix: &str, v: &mut Violations) {
    let Some(obj) = value.as_object() else {
        v.push(prefix, "must be an object");
        return;
    };
    check_required_string(obj, "title", prefix, v);
    check_required_string(obj, "composer", prefix, v);
    check_required_string(obj, "duration", prefix, v);
    check_optional_string(obj, "movement", prefix, v);
    check_pattern(obj, "youtubeLink", prefix, url_pattern(), "URL", v);
}

fn check_accompanist_value(value: &Value, prefix: &str, v: &mut Violations) {
    let Some(obj) = value.as_object() else {
        v.push(prefix, "must be an object");
        return;
    };
    check_required_string(obj, "name", prefix, v);
    check_required_string(obj, "instrument", prefix, v);
    check_pattern(obj, "phone", prefix, phone_pattern(), "mobile phone number", v);
}

fn check_document_value(value: &Value, prefix: &str, v: &mut Violations) {
    let Some(obj) = value.as_object() else {
        v.push(prefix, "must be an object");
        return;
    };
    check_required_string(obj, "title", prefix, v);
    check_required_string(obj, "fileUrl", prefix, v);
    check_optional_string(obj, "fileKey", prefix, v);
    check_date(obj, "uploadDate", prefix, v);
    check_required_string(obj, "uploadedBy", prefix, v);
}

fn check_detailed_grading_value(obj: &Map<String, Value>, prefix: &str, v: &mut Violations) {
    for (key, max) in DETAILED_GRADING_FIELDS {
        if let Some(item) = check_object(obj, key, prefix, v) {
            let path = join_path(prefix, key);
            check_optional_string(item, "grade", &path, v);
            check_number_range(item, "points", &path, 0.0, max, v);
            check_optional_string(item, "comments", &path, v);
        }
    }
}

fn check_presentation_value(value: &Value, prefix: &str, graded: bool, v: &mut Violations) {
    let Some(obj) = value.as_object() else {
        v.push(prefix, "must be an object");
        return;
    };
    check_bool(obj, "completed", prefix, v);
    check_enum(
        obj,
        "status",
        prefix,
        |s| PresentationStatus::from_str(s).is_some(),
        "passed, failed, not-examined",
        v,
    );
    check_date(obj, "date", prefix, v);
    check_optional_string(obj, "review", prefix, v);
    check_optional_string(obj, "reviewedBy", prefix, v);
    check_string_array(obj, "recordingLinks", prefix, v);

    if graded {
        let grade = check_number_range(obj, "grade", prefix, GRADE_MIN, GRADE_MAX, v);
        let level = check_grade_level(obj, "gradeLevel", prefix, v);
        check_grade_pair(grade, level, &join_path(prefix, "gradeLevel"), v);
        if let Some(detailed) = check_object(obj, "detailedGrading", prefix, v) {
            check_detailed_grading_value(detailed, &join_path(prefix, "detailedGrading"), v);
        }
    } else {
        for key in ["grade", "gradeLevel"] {
            if obj.get(key).is_some_and(|value| !value.is_null()) {
                v.push(
                    &join_path(prefix, key),
                    "is only allowed on the fourth presentation",
                );
            }
        }
        check_optional_string(obj, "notes", prefix, v);
    }
}

// ==========================================
// validate_bagrut - 整体校验
// ==========================================

/// 校验并填充 bagrut 记录
///
/// # 参数
/// - raw: 调用方传入的原始 JSON
/// - defaults: 配置提供的默认值
///
/// # 返回
/// - Ok(BagrutRecord): 已填充默认值的记录（`_id` 被忽略，`updatedAt` 为当前时间，
///   finalGrade 为评分表总分）
/// - Err(Vec<Violation>): 全部字段级违规；字段级通过后再报告记录级违规
pub fn validate_bagrut(raw: &Value, defaults: &ValidationDefaults) -> Result<BagrutRecord, Vec<Violation>> {
    let Some(obj) = raw.as_object() else {
        return Err(vec![Violation::new("", "bagrut must be an object")]);
    };
    let mut v = Violations::default();

    // ===== 外部引用 =====
    check_required_string(obj, "studentId", "", &mut v);
    check_required_string(obj, "teacherId", "", &mut v);

    // ===== 曲目 =====
    if let Some(items) = check_array(obj, "program", "", &mut v) {
        for (i, item) in items.iter().enumerate() {
            check_program_piece_value(item, &format!("program[{}]", i), &mut v);
        }
    }

    // ===== 伴奏 =====
    if let Some(accompaniment) = check_object(obj, "accompaniment", "", &mut v) {
        check_enum(
            accompaniment,
            "type",
            "accompaniment",
            |s| AccompanimentType::from_str(s).is_some(),
            "soloist-accompanist, ensemble",
            &mut v,
        );
        if let Some(items) = check_array(accompaniment, "accompanists", "accompaniment", &mut v) {
            for (i, item) in items.iter().enumerate() {
                check_accompanist_value(item, &format!("accompaniment.accompanists[{}]", i), &mut v);
            }
        }
    }

    // ===== 阶段演奏 =====
    if let Some(items) = check_array(obj, "presentations", "", &mut v) {
        if items.len() != PRESENTATION_COUNT {
            v.push(
                "presentations",
                format!("must contain exactly {} entries, got {}", PRESENTATION_COUNT, items.len()),
            );
        }
        for (i, item) in items.iter().enumerate().take(PRESENTATION_COUNT) {
            check_presentation_value(
                item,
                &format!("presentations[{}]", i),
                i == GRADED_PRESENTATION_INDEX,
                &mut v,
            );
        }
    }
    if let Some(magen) = obj.get("magenBagrut").filter(|value| !value.is_null()) {
        check_presentation_value(magen, "magenBagrut", true, &mut v);
    }

    // ===== 评分表 =====
    if let Some(details) = check_object(obj, "gradingDetails", "", &mut v) {
        for (key, max) in GRADING_DETAILS_FIELDS {
            if let Some(item) = check_object(details, key, "gradingDetails", &mut v) {
                let path = join_path("gradingDetails", key);
                check_number_range(item, "grade", &path, 0.0, max, &mut v);
                check_optional_string(item, "comments", &path, &mut v);
            }
        }
    }

    // ===== 附件 =====
    if let Some(items) = check_array(obj, "documents", "", &mut v) {
        for (i, item) in items.iter().enumerate() {
            check_document_value(item, &format!("documents[{}]", i), &mut v);
        }
    }

    // ===== 最终成绩与完成状态 =====
    let final_grade = check_number_range(obj, "finalGrade", "", GRADE_MIN, GRADE_MAX, &mut v);
    let final_level = check_grade_level(obj, "finalGradeLevel", "", &mut v);
    check_grade_pair(final_grade, final_level, "finalGradeLevel", &mut v);
    check_bool(obj, "isCompleted", "", &mut v);
    check_date(obj, "completionDate", "", &mut v);
    check_optional_string(obj, "teacherSignature", "", &mut v);
    check_optional_string(obj, "conservatoryName", "", &mut v);
    check_optional_string(obj, "notes", "", &mut v);
    check_bool(obj, "isActive", "", &mut v);

    v.into_result(|| {
        let mut doc = obj.clone();
        doc.remove("_id");

        // ===== 默认值填充 =====
        let now = Utc::now().to_rfc3339();
        if !doc.get("createdAt").is_some_and(Value::is_string) {
            doc.insert("createdAt".to_string(), Value::String(now.clone()));
        }
        doc.insert("updatedAt".to_string(), Value::String(now));
        if doc.get("conservatoryName").map_or(true, Value::is_null) {
            doc.insert(
                "conservatoryName".to_string(),
                Value::String(defaults.conservatory_name.clone()),
            );
        }
        if doc.get("notes").map_or(false, Value::is_null) {
            doc.remove("notes");
        }
        doc.insert("schemaVersion".to_string(), Value::from(CURRENT_DOCUMENT_VERSION));

        let record = serde_json::from_value::<BagrutRecord>(Value::Object(doc))
            .map_err(|e| vec![Violation::new("", e.to_string())])?;
        enforce_record_invariants(record)
    })
}

/// 记录级不变量（字段级校验全部通过后执行）
///
/// - 细则与评分表恢复固定满分
/// - finalGrade / finalGradeLevel 由评分表总分推导；调用方给出的值必须一致
/// - isCompleted=true 必须满足完成条件
fn enforce_record_invariants(mut record: BagrutRecord) -> Result<BagrutRecord, Vec<Violation>> {
    let mut v = Violations::default();

    // ===== 固定满分 =====
    record.grading_details = record.grading_details.with_fixed_max_points();
    record.presentations.defense.detailed_grading =
        record.presentations.defense.detailed_grading.clone().with_fixed_max_points();
    record.magen_bagrut.detailed_grading = record.magen_bagrut.detailed_grading.clone().with_fixed_max_points();

    // ===== 最终成绩 =====
    let total = grading_details_total(&record.grading_details);
    let derived_level = derive_grade_level(total);
    match (record.final_grade, total) {
        (Some(supplied), Some(total)) if (supplied - total).abs() > SCORE_EPSILON => v.push(
            "finalGrade",
            format!("must equal the gradingDetails total {}, got {}", total, supplied),
        ),
        (Some(supplied), None) => v.push(
            "finalGrade",
            format!("requires every gradingDetails score to be set, got {}", supplied),
        ),
        _ => {}
    }
    if record.final_grade.is_none() && record.final_grade_level.is_some() && record.final_grade_level != derived_level {
        v.push("finalGradeLevel", "must match the level derived from the gradingDetails total");
    }
    record.final_grade = total;
    record.final_grade_level = derived_level;

    // ===== 完成状态 =====
    if record.is_completed {
        for reason in check_completion_readiness(&record) {
            v.push("isCompleted", format!("cannot be true: {}", reason));
        }
    }

    v.into_result(|| Ok(record))
}

// ==========================================
// 子列表元素校验
// ==========================================

/// 校验单个曲目
pub fn validate_program_piece(raw: &Value) -> Result<ProgramPiece, Vec<Violation>> {
    let mut v = Violations::default();
    check_program_piece_value(raw, "programPiece", &mut v);
    v.into_result(|| {
        serde_json::from_value(raw.clone()).map_err(|e| vec![Violation::new("programPiece", e.to_string())])
    })
}

/// 校验单个伴奏者
pub fn validate_accompanist(raw: &Value) -> Result<Accompanist, Vec<Violation>> {
    let mut v = Violations::default();
    check_accompanist_value(raw, "accompanist", &mut v);
    v.into_result(|| {
        serde_json::from_value(raw.clone()).map_err(|e| vec![Violation::new("accompanist", e.to_string())])
    })
}

/// 校验单个附件文档
pub fn validate_document(raw: &Value) -> Result<BagrutDocument, Vec<Violation>> {
    let mut v = Violations::default();
    check_document_value(raw, "document", &mut v);
    v.into_result(|| {
        serde_json::from_value(raw.clone()).map_err(|e| vec![Violation::new("document", e.to_string())])
    })
}

// ==========================================
// 类型化输入校验（评分更新）
// ==========================================

/// 校验分数范围 [0, 100]
pub fn validate_grade(field: &str, grade: Option<f64>) -> Vec<Violation> {
    match grade {
        Some(g) if !(GRADE_MIN..=GRADE_MAX).contains(&g) || g.is_nan() => vec![Violation::new(
            field,
            format!("must be between {} and {}, got {}", GRADE_MIN, GRADE_MAX, g),
        )],
        _ => Vec::new(),
    }
}

/// 校验演奏细则各项得分不超过固定满分
pub fn validate_detailed_grading(prefix: &str, grading: &DetailedGrading) -> Vec<Violation> {
    score_violations(prefix, &grading.entries())
}

/// 校验评分表各项得分不超过固定满分
pub fn validate_grading_details(details: &GradingDetails) -> Vec<Violation> {
    score_violations("gradingDetails", &details.entries())
}

fn score_violations(prefix: &str, entries: &[(&'static str, Option<f64>, f64)]) -> Vec<Violation> {
    entries
        .iter()
        .filter_map(|(key, score, max)| {
            let score = (*score)?;
            if (0.0..=*max).contains(&score) {
                None
            } else {
                Some(Violation::new(
                    join_path(prefix, key),
                    format!("must be between 0 and {}, got {}", max, score),
                ))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> ValidationDefaults {
        ValidationDefaults {
            conservatory_name: "Test Conservatory".to_string(),
        }
    }

    #[test]
    fn test_minimal_record_gets_defaults() {
        let record = validate_bagrut(&json!({"studentId": "S1", "teacherId": "T1"}), &defaults()).unwrap();

        assert_eq!(record.student_id, "S1");
        assert!(record.is_active);
        assert!(!record.is_completed);
        assert!(record.program.is_empty());
        assert!(record.documents.is_empty());
        assert_eq!(record.conservatory_name.as_deref(), Some("Test Conservatory"));
        assert_eq!(record.schema_version, CURRENT_DOCUMENT_VERSION);
        assert_eq!(record.grading_details, GradingDetails::default());
        assert!(record.id.is_none());
    }

    #[test]
    fn test_collects_every_violation() {
        let raw = json!({
            "teacherId": 42,
            "program": [{"title": "Sonata", "composer": "", "duration": "5:00", "youtubeLink": "not a url"}],
            "accompaniment": {"type": "orchestra", "accompanists": [{"name": "A", "instrument": "piano", "phone": "123"}]},
            "finalGrade": 120
        });
        let violations = validate_bagrut(&raw, &defaults()).unwrap_err();
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();

        assert!(fields.contains(&"studentId"));
        assert!(fields.contains(&"teacherId"));
        assert!(fields.contains(&"program[0].composer"));
        assert!(fields.contains(&"program[0].youtubeLink"));
        assert!(fields.contains(&"accompaniment.type"));
        assert!(fields.contains(&"accompaniment.accompanists[0].phone"));
        assert!(fields.contains(&"finalGrade"));
        assert_eq!(violations.len(), 7, "violations={:?}", violations);
    }

    #[test]
    fn test_valid_patterns_accepted() {
        let raw = json!({
            "studentId": "S1",
            "teacherId": "T1",
            "program": [{"title": "Sonata", "composer": "Mozart", "duration": "5:00",
                         "youtubeLink": "https://www.youtube.com/watch?v=abc"},
                        {"title": "Etude", "composer": "Chopin", "duration": "3:00", "youtubeLink": null}],
            "accompaniment": {"type": "ensemble", "accompanists": [{"name": "A", "instrument": "piano", "phone": "0501234567"}]}
        });
        let record = validate_bagrut(&raw, &defaults()).unwrap();
        assert_eq!(record.program.len(), 2);
        assert_eq!(record.accompaniment.accompaniment_type, AccompanimentType::Ensemble);
    }

    #[test]
    fn test_grade_on_interim_presentation_rejected() {
        let raw = json!({
            "studentId": "S1",
            "teacherId": "T1",
            "presentations": [{"grade": 80}, {}, {}, {"grade": 87, "gradeLevel": "מעולה"}]
        });
        let violations = validate_bagrut(&raw, &defaults()).unwrap_err();
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();

        assert!(fields.contains(&"presentations[0].grade"));
        assert!(fields.contains(&"presentations[3].gradeLevel"));
    }

    #[test]
    fn test_presentations_length_checked() {
        let raw = json!({"studentId": "S1", "teacherId": "T1", "presentations": [{}, {}, {}]});
        let violations = validate_bagrut(&raw, &defaults()).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "presentations");
    }

    #[test]
    fn test_fixed_max_points_restored() {
        let raw = json!({
            "studentId": "S1",
            "teacherId": "T1",
            "presentations": [{}, {}, {}, {"detailedGrading": {"playingSkills": {"points": 15, "maxPoints": 99}}}],
            "magenBagrut": {"detailedGrading": {"playingByHeart": {"points": 5}}},
            "gradingDetails": {"technique": {"grade": 18}}
        });
        let record = validate_bagrut(&raw, &defaults()).unwrap();

        assert_eq!(record.grading_details.technique.max_points, TECHNIQUE_MAX);
        assert_eq!(record.grading_details.technique.grade, Some(18.0));
        let defense = &record.presentations.defense.detailed_grading;
        assert_eq!(defense.playing_skills.max_points, PLAYING_SKILLS_MAX);
        assert_eq!(defense.playing_skills.points, Some(15.0));
        assert_eq!(
            record.magen_bagrut.detailed_grading.playing_by_heart.max_points,
            PLAYING_BY_HEART_MAX
        );
    }

    #[test]
    fn test_final_grade_derived_from_grading_details() {
        let raw = json!({
            "studentId": "S1",
            "teacherId": "T1",
            "gradingDetails": {
                "technique": {"grade": 18}, "interpretation": {"grade": 25},
                "musicality": {"grade": 35}, "overall": {"grade": 8}
            }
        });
        let record = validate_bagrut(&raw, &defaults()).unwrap();
        assert_eq!(record.final_grade, Some(86.0));
        assert_eq!(record.final_grade_level, Some(GradeLevel::Good));

        let mut mismatched = raw.clone();
        mismatched["finalGrade"] = json!(90);
        let violations = validate_bagrut(&mismatched, &defaults()).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "finalGrade");
    }

    #[test]
    fn test_final_grade_without_rubric_rejected() {
        let raw = json!({"studentId": "S1", "teacherId": "T1", "finalGrade": 91, "finalGradeLevel": "טוב מאוד"});
        let violations = validate_bagrut(&raw, &defaults()).unwrap_err();
        assert!(violations.iter().any(|v| v.field == "finalGrade"), "violations={:?}", violations);
    }

    #[test]
    fn test_completed_flag_requires_readiness() {
        let raw = json!({"studentId": "S1", "teacherId": "T1", "isCompleted": true});
        let violations = validate_bagrut(&raw, &defaults()).unwrap_err();

        assert_eq!(violations.len(), 3, "violations={:?}", violations);
        assert!(violations.iter().all(|v| v.field == "isCompleted"));
        assert!(violations.iter().any(|v| v.message.contains("program")));
    }

    #[test]
    fn test_sub_list_validators() {
        assert!(validate_accompanist(&json!({"name": "A", "instrument": "violin"})).is_ok());
        let errs = validate_accompanist(&json!({"name": "", "phone": "0401234567"})).unwrap_err();
        assert_eq!(errs.len(), 3);

        let doc = validate_document(&json!({"title": "t", "fileUrl": "u", "uploadedBy": "T1"})).unwrap();
        assert!(doc.file_key.is_none());
    }

    #[test]
    fn test_typed_score_validation() {
        assert!(validate_grade("grade", Some(100.0)).is_empty());
        assert_eq!(validate_grade("grade", Some(101.0)).len(), 1);

        let mut details = GradingDetails::default();
        details.technique.grade = Some(21.0);
        details.overall.grade = Some(-1.0);
        let violations = validate_grading_details(&details);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].field, "gradingDetails.technique");
    }
}
