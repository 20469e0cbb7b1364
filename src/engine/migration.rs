// ==========================================
// 音乐学院管理后台 - 旧文档结构迁移
// ==========================================
// 旧结构: 3 项 presentations，每项可带 grade/gradeLevel
// 新结构: 4 项 presentations，只有索引 3 带评分字段
// 触发条件: presentations 长度 == 3（结构判定，非版本号判定）
// 红线: 幂等；非 3 项文档原样返回
// ==========================================

use crate::domain::bagrut::{
    GradedPresentation, CURRENT_DOCUMENT_VERSION, LEGACY_PRESENTATION_COUNT,
};
use crate::domain::grading::{DetailedGrading, GradingDetails};
use serde_json::{Map, Value};

/// 迁移结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// 已是当前结构，未做修改
    AlreadyCurrent,
    /// 已从 3 项结构迁移
    Migrated,
}

/// 迁移默认值
#[derive(Debug, Clone, Default)]
pub struct MigrationDefaults {
    pub conservatory_name: String,
}

/// 判断文档是否需要迁移
pub fn needs_migration(doc: &Value) -> bool {
    doc.get("presentations")
        .and_then(Value::as_array)
        .is_some_and(|items| items.len() == LEGACY_PRESENTATION_COUNT)
}

/// 空白的第 4 项阶段演奏
pub fn blank_graded_presentation() -> Value {
    serde_json::to_value(GradedPresentation::default()).unwrap_or_else(|_| Value::Object(Map::new()))
}

fn blank_detailed_grading() -> Value {
    serde_json::to_value(DetailedGrading::default()).unwrap_or_else(|_| Value::Object(Map::new()))
}

fn blank_grading_details() -> Value {
    serde_json::to_value(GradingDetails::default()).unwrap_or_else(|_| Value::Object(Map::new()))
}

/// 缺失或为 null 时写入默认值
fn ensure_field(obj: &mut Map<String, Value>, key: &str, default: impl FnOnce() -> Value) {
    if obj.get(key).map_or(true, Value::is_null) {
        obj.insert(key.to_string(), default());
    }
}

/// 缺失时写入 null（保留已有值）
fn ensure_key(obj: &mut Map<String, Value>, key: &str, default: Value) {
    obj.entry(key.to_string()).or_insert(default);
}

/// 迁移单个文档（原地修改）
///
/// # 步骤
/// 1. 追加空白第 4 项（detailedGrading 满分 20/40/30/10）
/// 2. 索引 0-2 删除 grade/gradeLevel，补齐 notes/recordingLinks
/// 3. 补齐顶层 gradingDetails/conservatoryName/finalGrade/finalGradeLevel/
///    teacherSignature/completionDate/isCompleted 及 magenBagrut 评分字段
/// 4. 写入 schemaVersion
pub fn migrate_document(doc: &mut Value, defaults: &MigrationDefaults) -> MigrationOutcome {
    if !needs_migration(doc) {
        return MigrationOutcome::AlreadyCurrent;
    }
    let Some(obj) = doc.as_object_mut() else {
        return MigrationOutcome::AlreadyCurrent;
    };

    // ===== 阶段演奏 =====
    if let Some(Value::Array(presentations)) = obj.get_mut("presentations") {
        for presentation in presentations.iter_mut() {
            if !presentation.is_object() {
                *presentation = Value::Object(Map::new());
            }
            if let Some(p) = presentation.as_object_mut() {
                p.remove("grade");
                p.remove("gradeLevel");
                ensure_field(p, "notes", || Value::String(String::new()));
                ensure_field(p, "recordingLinks", || Value::Array(Vec::new()));
            }
        }
        presentations.push(blank_graded_presentation());
    }

    // ===== 顶层字段 =====
    ensure_field(obj, "gradingDetails", blank_grading_details);
    ensure_field(obj, "conservatoryName", || {
        Value::String(defaults.conservatory_name.clone())
    });
    ensure_key(obj, "finalGrade", Value::Null);
    ensure_key(obj, "finalGradeLevel", Value::Null);
    ensure_field(obj, "teacherSignature", || Value::String(String::new()));
    ensure_key(obj, "completionDate", Value::Null);
    ensure_field(obj, "isCompleted", || Value::Bool(false));

    // ===== magenBagrut =====
    if !obj.get("magenBagrut").is_some_and(Value::is_object) {
        obj.insert("magenBagrut".to_string(), Value::Object(Map::new()));
    }
    if let Some(Value::Object(magen)) = obj.get_mut("magenBagrut") {
        ensure_key(magen, "grade", Value::Null);
        ensure_key(magen, "gradeLevel", Value::Null);
        ensure_field(magen, "recordingLinks", || Value::Array(Vec::new()));
        ensure_field(magen, "detailedGrading", blank_detailed_grading);
    }

    obj.insert("schemaVersion".to_string(), Value::from(CURRENT_DOCUMENT_VERSION));
    MigrationOutcome::Migrated
}
