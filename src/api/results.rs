use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::attempts::{fetch_exam, load_paper_content};
use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::format_primitive;
use crate::db::models::{ExamResult, User};
use crate::repositories;
use crate::schemas::review::{ReviewOption, ReviewQuestion, ReviewResponse, ReviewStatus};
use crate::services::attempt_error::AttemptError;
use crate::services::reconstruction::Resolution;
use crate::services::scoring::{grade_paper, GradedQuestion};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/:result_id/review", get(review_result))
}

fn ensure_can_review(result: &ExamResult, user: &User) -> Result<(), AttemptError> {
    if result.student_id == user.id || user.is_platform_admin {
        Ok(())
    } else {
        Err(AttemptError::Forbidden)
    }
}

/// Per-question review of a finished attempt, with options in the order the
/// student saw them.
async fn review_result(
    Path(result_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let result = repositories::results::find_by_id(state.db(), &result_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch result"))?
        .ok_or(ApiError::Attempt(AttemptError::NotFound("Result")))?;
    ensure_can_review(&result, &user)?;

    let attempt = repositories::attempts::find_by_id(state.db(), &result.attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
        .ok_or(ApiError::Attempt(AttemptError::NotFound("Attempt")))?;
    let exam = fetch_exam(state.db(), &attempt.exam_id).await?;

    let mut conn =
        state.db().acquire().await.map_err(|e| ApiError::internal(e, "Failed to acquire connection"))?;
    let (questions, options) = load_paper_content(&mut conn, &exam.id).await?;
    let answers = repositories::answers::list_for_attempt(&mut *conn, &attempt.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt answers"))?;

    let (graded, _) = grade_paper(&attempt, questions, options, answers)?;

    Ok(Json(ReviewResponse {
        result_id: result.id,
        attempt_id: attempt.id,
        exam_id: exam.id,
        exam_title: exam.title,
        student_id: result.student_id,
        total_marks: result.total_marks,
        marks_obtained: result.marks_obtained,
        submitted_at: attempt.submitted_at.map(format_primitive),
        per_question: graded.into_iter().map(review_question).collect(),
    }))
}

fn review_question(graded: GradedQuestion) -> ReviewQuestion {
    let GradedQuestion { question, answer, reconstruction, outcome } = graded;

    // Free-response answers may have been marked by hand after submission.
    let manual_grade = answer.as_ref().and_then(|answer| answer.is_correct);
    let status = match (outcome.status, manual_grade) {
        (ReviewStatus::Pending, Some(true)) => ReviewStatus::Correct,
        (ReviewStatus::Pending, Some(false)) => ReviewStatus::Incorrect,
        (status, _) => status,
    };
    let marks_obtained = answer
        .as_ref()
        .and_then(|answer| answer.marks_obtained)
        .or(outcome.marks_obtained);

    let chosen_id = reconstruction.chosen_option_id().map(str::to_string);
    let student_answer_text = match &reconstruction.resolution {
        Resolution::Chosen { option, .. } => Some(option.text.clone()),
        Resolution::Pending { text } => Some(text.clone()),
        Resolution::Unattempted | Resolution::Unresolvable { .. } => None,
    };
    let correct_answer_text = reconstruction
        .displayed
        .iter()
        .find(|option| option.is_correct)
        .map(|option| option.text.clone());

    let options = reconstruction
        .displayed
        .into_iter()
        .map(|option| ReviewOption {
            selected: chosen_id.as_deref() == Some(option.id.as_str()),
            id: option.id,
            text: option.text,
            is_correct: option.is_correct,
        })
        .collect();

    ReviewQuestion {
        question_id: question.id,
        question_text: question.text,
        question_type: question.question_type,
        marks: question.marks,
        marks_obtained,
        options,
        student_answer_text,
        correct_answer_text,
        status,
    }
}
