use serde::Serialize;

use crate::db::types::QuestionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ReviewStatus {
    Correct,
    Incorrect,
    Unattempted,
    /// A stored position no longer maps onto the option set.
    Unresolvable,
    /// Free-response answer awaiting manual grading.
    Pending,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ReviewOption {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) is_correct: bool,
    pub(crate) selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ReviewQuestion {
    pub(crate) question_id: String,
    pub(crate) question_text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) marks: f64,
    pub(crate) marks_obtained: Option<f64>,
    /// In the order the student saw them.
    pub(crate) options: Vec<ReviewOption>,
    pub(crate) student_answer_text: Option<String>,
    pub(crate) correct_answer_text: Option<String>,
    pub(crate) status: ReviewStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReviewResponse {
    pub(crate) result_id: String,
    pub(crate) attempt_id: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) student_id: String,
    pub(crate) total_marks: f64,
    pub(crate) marks_obtained: f64,
    pub(crate) submitted_at: Option<String>,
    pub(crate) per_question: Vec<ReviewQuestion>,
}

#[cfg(test)]
mod tests {
    use super::ReviewStatus;

    #[test]
    fn statuses_serialize_snake_case() {
        let value = serde_json::to_value([
            ReviewStatus::Correct,
            ReviewStatus::Unattempted,
            ReviewStatus::Unresolvable,
            ReviewStatus::Pending,
        ])
        .expect("serialize");
        assert_eq!(value, serde_json::json!(["correct", "unattempted", "unresolvable", "pending"]));
    }
}
