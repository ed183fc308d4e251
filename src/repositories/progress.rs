use std::collections::HashMap;

use sqlx::types::Json;
use time::PrimitiveDateTime;

use crate::db::models::{AttemptProgress, DraftAnswer};
use crate::db::types::AttemptStatus;

const COLUMNS: &str =
    "attempt_id, current_question_index, flagged_question_ids, draft_answers, updated_at";

pub(crate) async fn create_empty(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    now: PrimitiveDateTime,
) -> Result<AttemptProgress, sqlx::Error> {
    sqlx::query_as::<_, AttemptProgress>(&format!(
        "INSERT INTO attempt_progress (attempt_id, updated_at) VALUES ($1, $2)
         RETURNING {COLUMNS}"
    ))
    .bind(attempt_id)
    .bind(now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Option<AttemptProgress>, sqlx::Error> {
    sqlx::query_as::<_, AttemptProgress>(&format!(
        "SELECT {COLUMNS} FROM attempt_progress WHERE attempt_id = $1"
    ))
    .bind(attempt_id)
    .fetch_optional(executor)
    .await
}

/// Writes progress only while the attempt is still ongoing; `None` once it
/// has been closed.
pub(crate) async fn save(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    current_question_index: i32,
    flagged_question_ids: Vec<String>,
    draft_answers: HashMap<String, DraftAnswer>,
    now: PrimitiveDateTime,
) -> Result<Option<AttemptProgress>, sqlx::Error> {
    sqlx::query_as::<_, AttemptProgress>(&format!(
        "INSERT INTO attempt_progress (
            attempt_id, current_question_index, flagged_question_ids, draft_answers, updated_at
        )
        SELECT $1, $2, $3, $4, $5
        WHERE EXISTS (SELECT 1 FROM exam_attempts WHERE id = $1 AND status = $6)
        ON CONFLICT (attempt_id) DO UPDATE SET
            current_question_index = EXCLUDED.current_question_index,
            flagged_question_ids = EXCLUDED.flagged_question_ids,
            draft_answers = EXCLUDED.draft_answers,
            updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}"
    ))
    .bind(attempt_id)
    .bind(current_question_index)
    .bind(Json(flagged_question_ids))
    .bind(Json(draft_answers))
    .bind(now)
    .bind(AttemptStatus::Ongoing)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn delete(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM attempt_progress WHERE attempt_id = $1")
        .bind(attempt_id)
        .execute(executor)
        .await?;
    Ok(())
}
