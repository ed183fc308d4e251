use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::repositories;
use crate::repositories::answers::UpsertAnswer;
use crate::schemas::attempt::{AnswerResponse, AnswerSubmit, ProgressResponse, ProgressUpdate};
use crate::services::answer_capture::{
    check_answer_change, ensure_owner, ensure_writable, normalize_progress, validate_answer,
};
use crate::services::attempt_error::AttemptError;
use crate::services::attempt_paper::option_shuffle_enabled;
use crate::services::attempt_timing::AttemptClock;

use super::helpers;

pub(super) async fn record_answer(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AnswerSubmit>,
) -> Result<Json<AnswerResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let now = primitive_now_utc();
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to begin transaction"))?;

    let attempt = helpers::lock_attempt(&mut tx, &attempt_id).await?;
    ensure_owner(&attempt, &user.id)?;

    let exam = helpers::fetch_exam(&mut *tx, &attempt.exam_id).await?;
    ensure_writable(&attempt, &AttemptClock::for_attempt(&attempt, &exam), now)?;

    let question = repositories::questions::find_in_exam(&mut *tx, &exam.id, &payload.question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
        .ok_or(ApiError::Attempt(AttemptError::NotFound("Question")))?;
    let options = repositories::questions::list_options(&mut *tx, &question.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question options"))?;

    let validated = validate_answer(&question, options.len(), &payload)?;
    let existing = repositories::answers::find(&mut *tx, &attempt.id, &question.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch previous answer"))?;
    check_answer_change(&exam, existing.as_ref(), &validated)?;

    let answer_id = Uuid::new_v4().to_string();
    let stored = repositories::answers::upsert(
        &mut *tx,
        UpsertAnswer {
            id: &answer_id,
            attempt_id: &attempt.id,
            question_id: &question.id,
            selected_position: validated.selected_position,
            answer_text: validated.answer_text.as_deref(),
            options_shuffled: option_shuffle_enabled(attempt.shuffle_options, &question),
            now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to save answer"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::debug!(
        attempt_id = %stored.attempt_id,
        question_id = %stored.question_id,
        options_shuffled = stored.options_shuffled,
        "Answer recorded"
    );

    Ok(Json(AnswerResponse {
        attempt_id: stored.attempt_id,
        question_id: stored.question_id,
        position: stored.selected_position,
        text: stored.answer_text,
        answered_at: format_primitive(stored.updated_at),
    }))
}

pub(super) async fn update_progress(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ProgressUpdate>,
) -> Result<Json<ProgressResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let attempt = helpers::fetch_attempt(state.db(), &attempt_id).await?;
    ensure_owner(&attempt, &user.id)?;

    let interval = state.settings().exam().progress_save_interval_seconds.max(1);
    let rate_key = format!("attempt-progress:{}", attempt.id);
    let allowed = match state.redis().rate_limit(&rate_key, 1, interval).await {
        Ok(value) => value,
        Err(err) => {
            tracing::error!(error = %err, "Failed to check progress rate limit");
            false
        }
    };
    if !allowed {
        return Err(ApiError::TooManyRequests("Progress save rate limit exceeded"));
    }

    let now = primitive_now_utc();
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to begin transaction"))?;

    // Submission holds the same row lock while it closes the attempt.
    let attempt = helpers::lock_attempt(&mut tx, &attempt.id).await?;
    let exam = helpers::fetch_exam(&mut *tx, &attempt.exam_id).await?;
    ensure_writable(&attempt, &AttemptClock::for_attempt(&attempt, &exam), now)?;

    let question_ids: Vec<String> =
        repositories::questions::list_for_exam(&mut *tx, &exam.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch exam questions"))?
            .into_iter()
            .map(|question| question.id)
            .collect();
    let progress = normalize_progress(payload, &question_ids);

    let saved = repositories::progress::save(
        &mut *tx,
        &attempt.id,
        progress.current_question_index,
        progress.flagged_question_ids,
        progress.draft_answers,
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to save attempt progress"))?
    .ok_or(ApiError::Attempt(AttemptError::AttemptNotOngoing))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit progress"))?;

    Ok(Json(saved.into()))
}
