use super::*;

use chrono::DateTime;

use crate::domain::bagrut::{GradedPresentation, GRADED_PRESENTATION_INDEX, PRESENTATION_COUNT};
use crate::domain::grading::{DetailedGrading, GradingDetails};
use crate::domain::types::{GradeLevel, GradeMismatchPolicy, PresentationStatus};
use crate::engine::completion::check_completion_readiness;
use crate::engine::grade_level::{derive_grade_level, grade_level_for};
use crate::engine::rubric::{detailed_grading_total, grading_details_total};
use crate::engine::validation::{validate_detailed_grading, validate_grade, validate_grading_details};
use crate::repository::get_path;

// ==========================================
// PresentationUpdate - 演奏更新请求
// ==========================================
/// 阶段演奏 / magenBagrut 更新请求（所有字段可选，未提供的字段不修改）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PresentationUpdate {
    pub completed: Option<bool>,
    pub status: Option<PresentationStatus>,
    pub date: Option<DateTime<Utc>>,
    pub review: Option<String>,
    pub notes: Option<String>,
    pub recording_links: Option<Vec<String>>,
    // ===== 仅索引 3 / magenBagrut 生效 =====
    pub grade: Option<f64>,
    pub grade_level: Option<GradeLevel>,
    pub detailed_grading: Option<DetailedGrading>,
}

impl PresentationUpdate {
    fn has_grading_fields(&self) -> bool {
        self.grade.is_some() || self.grade_level.is_some() || self.detailed_grading.is_some()
    }
}

impl BagrutApi {
    // ==========================================
    // 评分接口
    // ==========================================

    /// 更新单项阶段演奏
    ///
    /// # 参数
    /// - id: bagrut id
    /// - index: 0-3；仅索引 3 可打分
    /// - update: 更新内容
    /// - actor_id: 操作教师（写入 reviewedBy）
    ///
    /// # 规则
    /// - 索引 3: detailedGrading 总分优先于调用方 grade；
    ///   仅有 grade 时推导 gradeLevel，冲突按配置策略处理
    /// - 索引 0-2: 丢弃评分字段，notes 缺失时补空串
    /// - date 取调用方值或当前时间
    pub fn update_presentation(
        &self,
        id: &str,
        index: usize,
        update: &PresentationUpdate,
        actor_id: &str,
    ) -> ApiResult<BagrutRecord> {
        run("update_presentation", || {
            if index >= PRESENTATION_COUNT {
                return Err(ApiError::InvalidInput(format!(
                    "presentation index must be between 0 and {}, got {}",
                    PRESENTATION_COUNT - 1,
                    index
                )));
            }

            self.ensure_migrated(id);
            let doc = self.load_document(id)?;
            let prefix = format!("presentations.{}", index);

            let mut set = if index == GRADED_PRESENTATION_INDEX {
                let record = decode_record(doc)?;
                self.resolve_grading(&prefix, &record.presentations.defense, update)?
            } else {
                if update.has_grading_fields() {
                    tracing::debug!(bagrut_id = %id, index, "忽略非评分阶段演奏的评分字段");
                }
                let stored_notes = get_path(&doc, &format!("{}.notes", prefix)).filter(|v| !v.is_null());
                match (&update.notes, stored_notes) {
                    (Some(notes), _) => Update::new().set(format!("{}.notes", prefix), notes.as_str()),
                    (None, None) => Update::new().set(format!("{}.notes", prefix), ""),
                    (None, Some(_)) => Update::new(),
                }
            };
            set = common_fields(set, &prefix, update, actor_id)?;

            let record = self.apply_update(id, set)?;
            tracing::info!(bagrut_id = %id, index, actor_id = %actor_id, "更新阶段演奏");
            Ok(record)
        })
    }

    /// 更新 magenBagrut（与索引 3 相同的评分规则）
    pub fn update_magen_bagrut(
        &self,
        id: &str,
        update: &PresentationUpdate,
        actor_id: &str,
    ) -> ApiResult<BagrutRecord> {
        run("update_magen_bagrut", || {
            self.ensure_migrated(id);
            let record = decode_record(self.load_document(id)?)?;

            let set = self.resolve_grading("magenBagrut", &record.magen_bagrut, update)?;
            let set = common_fields(set, "magenBagrut", update, actor_id)?;

            let record = self.apply_update(id, set)?;
            tracing::info!(bagrut_id = %id, actor_id = %actor_id, "更新 magenBagrut");
            Ok(record)
        })
    }

    /// 更新评分表并同步最终成绩与第 4 项阶段演奏
    ///
    /// 总分 = technique + interpretation + musicality + overall（任一为空则为空）
    pub fn update_grading_details(
        &self,
        id: &str,
        details: GradingDetails,
        actor_id: &str,
    ) -> ApiResult<BagrutRecord> {
        run("update_grading_details", || {
            self.ensure_migrated(id);

            let details = details.with_fixed_max_points();
            let violations = validate_grading_details(&details);
            if !violations.is_empty() {
                return Err(violations.into());
            }

            let total = grading_details_total(&details);
            let level = derive_grade_level(total);
            let defense = format!("presentations.{}", GRADED_PRESENTATION_INDEX);

            let set = Update::new()
                .set_serialized("gradingDetails", &details)?
                .set_serialized("finalGrade", &total)?
                .set_serialized("finalGradeLevel", &level)?
                .set_serialized(format!("{}.grade", defense), &total)?
                .set_serialized(format!("{}.gradeLevel", defense), &level)?
                .set(format!("{}.reviewedBy", defense), actor_id)
                .set(format!("{}.date", defense), Utc::now().to_rfc3339());

            let record = self.apply_update(id, set)?;
            tracing::info!(bagrut_id = %id, final_grade = ?total, actor_id = %actor_id, "更新评分表");
            Ok(record)
        })
    }

    /// 按已存储的评分表重新计算最终成绩
    pub fn calculate_and_update_final_grade(&self, id: &str) -> ApiResult<BagrutRecord> {
        run("calculate_and_update_final_grade", || {
            self.ensure_migrated(id);
            let record = decode_record(self.load_document(id)?)?;

            let total = grading_details_total(&record.grading_details);
            let set = Update::new()
                .set_serialized("finalGrade", &total)?
                .set_serialized("finalGradeLevel", &derive_grade_level(total))?;

            let record = self.apply_update(id, set)?;
            tracing::info!(bagrut_id = %id, final_grade = ?total, "重新计算最终成绩");
            Ok(record)
        })
    }

    /// 完成 bagrut
    ///
    /// # 返回
    /// - Err(CompletionNotReady): 列出全部未满足的条件
    pub fn complete_bagrut(
        &self,
        id: &str,
        actor_id: &str,
        teacher_signature: Option<&str>,
    ) -> ApiResult<BagrutRecord> {
        run("complete_bagrut", || {
            self.ensure_migrated(id);
            let record = decode_record(self.load_document(id)?)?;

            let reasons = check_completion_readiness(&record);
            if !reasons.is_empty() {
                return Err(ApiError::CompletionNotReady { reasons });
            }

            let set = Update::new()
                .set("isCompleted", true)
                .set("completionDate", Utc::now().to_rfc3339())
                .set("teacherSignature", teacher_signature.unwrap_or_default());

            let record = self.apply_update(id, set)?;
            tracing::info!(bagrut_id = %id, actor_id = %actor_id, "bagrut 已完成");
            Ok(record)
        })
    }

    /// 只读检查完成条件
    ///
    /// # 返回
    /// 阻塞原因列表；空列表表示可以完成
    pub fn check_completion_readiness(&self, id: &str) -> ApiResult<Vec<String>> {
        run("check_completion_readiness", || {
            let record = decode_record(self.load_document(id)?)?;
            Ok(check_completion_readiness(&record))
        })
    }

    // ==========================================
    // 评分规则
    // ==========================================

    /// 计算可打分演奏的 grade / gradeLevel / detailedGrading 写入项
    fn resolve_grading(
        &self,
        prefix: &str,
        stored: &GradedPresentation,
        update: &PresentationUpdate,
    ) -> ApiResult<Update> {
        let mut set = Update::new();

        // ===== 1. 细则总分优先 =====
        if let Some(detailed) = &update.detailed_grading {
            let detailed = detailed.clone().with_fixed_max_points();
            let violations = validate_detailed_grading(&format!("{}.detailedGrading", prefix), &detailed);
            if !violations.is_empty() {
                return Err(violations.into());
            }

            let total = detailed_grading_total(&detailed);
            if update.grade.is_some() {
                tracing::debug!(field = prefix, "细则总分覆盖调用方成绩");
            }
            return Ok(set
                .set_serialized(format!("{}.detailedGrading", prefix), &detailed)?
                .set_serialized(format!("{}.grade", prefix), &total)?
                .set_serialized(format!("{}.gradeLevel", prefix), &derive_grade_level(total))?);
        }

        // ===== 2. 单独成绩 =====
        if let Some(grade) = update.grade {
            let violations = validate_grade(&format!("{}.grade", prefix), Some(grade));
            if !violations.is_empty() {
                return Err(violations.into());
            }
            let level = self.reconcile_level(prefix, grade, update.grade_level)?;
            return Ok(set
                .set(format!("{}.grade", prefix), grade)
                .set_serialized(format!("{}.gradeLevel", prefix), &level)?);
        }

        // ===== 3. 单独等级：与已存成绩比对 =====
        if let Some(level) = update.grade_level {
            let level = match stored.grade {
                Some(grade) => self.reconcile_level(prefix, grade, Some(level))?,
                None => level,
            };
            set = set.set_serialized(format!("{}.gradeLevel", prefix), &level)?;
        }

        Ok(set)
    }

    /// 按配置策略处理成绩与等级不一致
    fn reconcile_level(
        &self,
        prefix: &str,
        grade: f64,
        requested: Option<GradeLevel>,
    ) -> ApiResult<GradeLevel> {
        let derived = grade_level_for(grade);
        match requested {
            Some(level) if level != derived => match self.settings.grade_mismatch_policy {
                GradeMismatchPolicy::Reject => Err(ApiError::Conflict(format!(
                    "{}: grade {} corresponds to grade level '{}', not '{}'",
                    prefix, grade, derived, level
                ))),
                GradeMismatchPolicy::AutoCorrect => {
                    tracing::warn!(
                        field = prefix,
                        grade,
                        requested = %level,
                        derived = %derived,
                        "成绩与等级不一致，按成绩修正等级"
                    );
                    Ok(derived)
                }
            },
            _ => Ok(derived),
        }
    }
}

/// 所有演奏共用的写入项（date 缺省为当前时间，reviewedBy 为操作教师）
fn common_fields(
    mut set: Update,
    prefix: &str,
    update: &PresentationUpdate,
    actor_id: &str,
) -> ApiResult<Update> {
    if let Some(completed) = update.completed {
        set = set.set(format!("{}.completed", prefix), completed);
    }
    if let Some(status) = update.status {
        set = set.set_serialized(format!("{}.status", prefix), &status)?;
    }
    if let Some(review) = &update.review {
        set = set.set(format!("{}.review", prefix), review.as_str());
    }
    if let Some(links) = &update.recording_links {
        set = set.set_serialized(format!("{}.recordingLinks", prefix), links)?;
    }

    let date = update.date.unwrap_or_else(Utc::now);
    Ok(set
        .set(format!("{}.date", prefix), date.to_rfc3339())
        .set(format!("{}.reviewedBy", prefix), actor_id))
}
