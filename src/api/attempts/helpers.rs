use std::collections::HashMap;

use sqlx::PgConnection;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::db::models::{Attempt, Exam, Question, QuestionOption};
use crate::repositories;
use crate::services::attempt_error::AttemptError;
use crate::services::eligibility::AttemptPolicy;

pub(crate) async fn fetch_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<Exam, ApiError> {
    repositories::exams::find_by_id(executor, exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or(ApiError::Attempt(AttemptError::NotFound("Exam")))
}

pub(crate) async fn fetch_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Attempt, ApiError> {
    repositories::attempts::find_by_id(executor, attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
        .ok_or(ApiError::Attempt(AttemptError::NotFound("Attempt")))
}

/// Loads the attempt with a row lock held until the transaction ends, so
/// answers and submission on the same attempt cannot interleave.
pub(crate) async fn lock_attempt(
    conn: &mut PgConnection,
    attempt_id: &str,
) -> Result<Attempt, ApiError> {
    repositories::attempts::find_by_id_for_update(conn, attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock attempt"))?
        .ok_or(ApiError::Attempt(AttemptError::NotFound("Attempt")))
}

/// Stored platform settings, falling back to the configured defaults.
pub(crate) async fn resolve_policy(
    state: &AppState,
    executor: impl sqlx::PgExecutor<'_>,
) -> Result<AttemptPolicy, ApiError> {
    let stored = repositories::platform_settings::fetch(executor)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch platform settings"))?;
    Ok(AttemptPolicy::resolve(state.settings().exam(), stored.as_ref()))
}

pub(crate) type PaperContent = (Vec<Question>, HashMap<String, Vec<QuestionOption>>);

pub(crate) async fn load_paper_content(
    conn: &mut PgConnection,
    exam_id: &str,
) -> Result<PaperContent, ApiError> {
    let questions = repositories::questions::list_for_exam(&mut *conn, exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam questions"))?;
    let question_ids: Vec<String> = questions.iter().map(|question| question.id.clone()).collect();
    let options = repositories::questions::list_options_for_questions(&mut *conn, &question_ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question options"))?;
    Ok((questions, options))
}
