use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::types::AttemptStatus;
use crate::schemas::attempt::{ResultSummary, SubmitResponse};
use crate::services::answer_capture::ensure_owner;
use crate::services::attempt_error::AttemptError;
use crate::services::attempt_finalize::{finalize_attempt, FinalizeMode};
use crate::services::attempt_timing::AttemptClock;

use super::helpers;

pub(super) async fn submit_attempt(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let now = primitive_now_utc();
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to begin transaction"))?;

    let attempt = helpers::lock_attempt(&mut tx, &attempt_id).await?;
    ensure_owner(&attempt, &user.id)?;
    if attempt.status != AttemptStatus::Ongoing {
        return Err(AttemptError::AttemptNotOngoing.into());
    }

    let exam = helpers::fetch_exam(&mut *tx, &attempt.exam_id).await?;
    let clock = AttemptClock::for_attempt(&attempt, &exam);
    let grace_seconds = state.settings().exam().submit_grace_seconds;

    if !clock.accepts_submission(now, grace_seconds) {
        // Too late to submit, but the attempt still has to close as of its deadline.
        finalize_attempt(&mut tx, &exam, &attempt, FinalizeMode::AutoDeadline, clock.deadline)
            .await
            .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to close expired attempt"))?;
        tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;
        tracing::info!(
            attempt_id = %attempt.id,
            deadline = %format_primitive(clock.deadline),
            "Late submission rejected; attempt closed at its deadline"
        );
        return Err(AttemptError::AttemptExpired.into());
    }

    // Inside the grace period the recorded time never runs past the deadline.
    let submitted_at = now.min(clock.deadline);
    let finalized =
        finalize_attempt(&mut tx, &exam, &attempt, FinalizeMode::ManualSubmit, submitted_at)
            .await
            .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to submit attempt"))?
            .ok_or(ApiError::Attempt(AttemptError::AttemptNotOngoing))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    let attempt = finalized.attempt;
    Ok(Json(SubmitResponse {
        attempt_id: attempt.id.clone(),
        status: attempt.status,
        submitted_at: format_primitive(attempt.submitted_at.unwrap_or(submitted_at)),
        time_spent_seconds: attempt
            .time_spent_seconds
            .unwrap_or_else(|| clock.time_spent_seconds(submitted_at)),
        result: ResultSummary::from(&finalized.result),
    }))
}
