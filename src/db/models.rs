use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AttemptStatus, ExamStatus, QuestionType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) full_name: String,
    pub(crate) is_platform_admin: bool,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) end_time: PrimitiveDateTime,
    pub(crate) duration_minutes: i32,
    pub(crate) total_questions: i32,
    pub(crate) total_marks: f64,
    pub(crate) randomize_questions: bool,
    pub(crate) randomize_options: bool,
    pub(crate) allow_answer_change: bool,
    pub(crate) proctored: bool,
    /// Per-exam override of the global attempt ceiling.
    pub(crate) max_attempts: Option<i32>,
    pub(crate) status: ExamStatus,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// A question as linked into one exam; `order_index` comes from `exam_questions`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) marks: f64,
    pub(crate) allow_option_randomization: bool,
    pub(crate) order_index: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub(crate) struct QuestionOption {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) text: String,
    pub(crate) sequence: i32,
    pub(crate) is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Attempt {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) attempt_number: i32,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) time_spent_seconds: Option<i64>,
    /// Exam-level option shuffle decision in effect when the attempt began.
    pub(crate) shuffle_options: bool,
    pub(crate) shuffle_questions: bool,
    pub(crate) seed_version: i16,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct DraftAnswer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) position: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AttemptProgress {
    pub(crate) attempt_id: String,
    pub(crate) current_question_index: i32,
    pub(crate) flagged_question_ids: Json<Vec<String>>,
    pub(crate) draft_answers: Json<HashMap<String, DraftAnswer>>,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AttemptAnswer {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    /// Index into the option order displayed for this attempt, never an option id.
    pub(crate) selected_position: Option<i32>,
    pub(crate) answer_text: Option<String>,
    /// Effective per-question shuffle decision at answer time.
    pub(crate) options_shuffled: bool,
    pub(crate) is_correct: Option<bool>,
    pub(crate) marks_obtained: Option<f64>,
    pub(crate) answered_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamResult {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) total_marks: f64,
    pub(crate) marks_obtained: f64,
    pub(crate) correct_count: i32,
    pub(crate) incorrect_count: i32,
    pub(crate) unattempted_count: i32,
    pub(crate) unresolvable_count: i32,
    pub(crate) pending_count: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct PlatformSettings {
    pub(crate) shuffle_questions_globally: bool,
    pub(crate) max_attempts_per_student: i32,
    pub(crate) allow_retake: bool,
    pub(crate) retake_cooldown_days: i32,
    pub(crate) updated_at: PrimitiveDateTime,
}
