use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::attempt::AttemptSummary;

use super::helpers;

/// The caller's own attempts at one exam, newest first.
pub(super) async fn list_history(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AttemptSummary>>, ApiError> {
    let exam = helpers::fetch_exam(state.db(), &exam_id).await?;

    let attempts = repositories::attempts::list_for_student_exam(state.db(), &exam.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;
    let attempt_ids: Vec<String> = attempts.iter().map(|attempt| attempt.id.clone()).collect();
    let mut result_ids: HashMap<String, String> =
        repositories::results::ids_by_attempts(state.db(), &attempt_ids)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list results"))?
            .into_iter()
            .collect();

    Ok(Json(
        attempts
            .iter()
            .map(|attempt| AttemptSummary::new(attempt, result_ids.remove(&attempt.id)))
            .collect(),
    ))
}
