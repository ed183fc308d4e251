use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub(crate) use crate::core::time::format_primitive;
use crate::db::models::{Attempt, AttemptProgress, DraftAnswer, Exam, ExamResult};
use crate::db::types::{AttemptStatus, QuestionType};

/// An option as rendered to the student. Correctness never leaves the server
/// while an attempt is open.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct PaperOption {
    pub(crate) id: String,
    pub(crate) text: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PaperQuestion {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) marks: f64,
    pub(crate) options: Vec<PaperOption>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamSummary {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) total_questions: i32,
    pub(crate) total_marks: f64,
    pub(crate) allow_answer_change: bool,
    pub(crate) proctored: bool,
    pub(crate) end_time: String,
}

impl From<&Exam> for ExamSummary {
    fn from(exam: &Exam) -> Self {
        Self {
            id: exam.id.clone(),
            title: exam.title.clone(),
            description: exam.description.clone(),
            duration_minutes: exam.duration_minutes,
            total_questions: exam.total_questions,
            total_marks: exam.total_marks,
            allow_answer_change: exam.allow_answer_change,
            proctored: exam.proctored,
            end_time: format_primitive(exam.end_time),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ProgressResponse {
    pub(crate) current_question_index: i32,
    pub(crate) flagged_question_ids: Vec<String>,
    pub(crate) draft_answers: HashMap<String, DraftAnswer>,
    pub(crate) updated_at: String,
}

impl From<AttemptProgress> for ProgressResponse {
    fn from(progress: AttemptProgress) -> Self {
        Self {
            current_question_index: progress.current_question_index,
            flagged_question_ids: progress.flagged_question_ids.0,
            draft_answers: progress.draft_answers.0,
            updated_at: format_primitive(progress.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StartAttemptResponse {
    pub(crate) attempt_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) exam: ExamSummary,
    pub(crate) questions: Vec<PaperQuestion>,
    pub(crate) is_resume: bool,
    pub(crate) started_at: String,
    pub(crate) deadline: String,
    pub(crate) elapsed_seconds: i64,
    pub(crate) remaining_seconds: i64,
    pub(crate) progress_save_interval_seconds: u64,
    pub(crate) progress: Option<ProgressResponse>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AnswerSubmit {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[serde(default)]
    #[serde(alias = "selectedPosition")]
    #[validate(range(min = 0, message = "position must be non-negative"))]
    pub(crate) position: Option<i32>,
    #[serde(default)]
    #[serde(alias = "answerText")]
    #[validate(length(max = 20000, message = "text is too long"))]
    pub(crate) text: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerResponse {
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) position: Option<i32>,
    pub(crate) text: Option<String>,
    pub(crate) answered_at: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ProgressUpdate {
    #[serde(alias = "currentQuestionIndex")]
    #[validate(range(min = 0, message = "current_question_index must be non-negative"))]
    pub(crate) current_question_index: i32,
    #[serde(default)]
    #[serde(alias = "flaggedQuestionIds")]
    pub(crate) flagged_question_ids: Vec<String>,
    #[serde(default)]
    #[serde(alias = "draftAnswers")]
    pub(crate) draft_answers: HashMap<String, DraftAnswer>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResultSummary {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) total_marks: f64,
    pub(crate) marks_obtained: f64,
    pub(crate) correct_count: i32,
    pub(crate) incorrect_count: i32,
    pub(crate) unattempted_count: i32,
    pub(crate) unresolvable_count: i32,
    pub(crate) pending_count: i32,
}

impl From<&ExamResult> for ResultSummary {
    fn from(result: &ExamResult) -> Self {
        Self {
            id: result.id.clone(),
            attempt_id: result.attempt_id.clone(),
            total_marks: result.total_marks,
            marks_obtained: result.marks_obtained,
            correct_count: result.correct_count,
            incorrect_count: result.incorrect_count,
            unattempted_count: result.unattempted_count,
            unresolvable_count: result.unresolvable_count,
            pending_count: result.pending_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) attempt_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) submitted_at: String,
    pub(crate) time_spent_seconds: i64,
    pub(crate) result: ResultSummary,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptSummary {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) attempt_number: i32,
    pub(crate) started_at: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) time_spent_seconds: Option<i64>,
    pub(crate) result_id: Option<String>,
}

impl AttemptSummary {
    pub(crate) fn new(attempt: &Attempt, result_id: Option<String>) -> Self {
        Self {
            id: attempt.id.clone(),
            exam_id: attempt.exam_id.clone(),
            status: attempt.status,
            attempt_number: attempt.attempt_number,
            started_at: format_primitive(attempt.started_at),
            submitted_at: attempt.submitted_at.map(format_primitive),
            time_spent_seconds: attempt.time_spent_seconds,
            result_id,
        }
    }
}
