use time::PrimitiveDateTime;

use crate::db::models::AttemptAnswer;

const COLUMNS: &str = "\
    id, attempt_id, question_id, selected_position, answer_text, options_shuffled, \
    is_correct, marks_obtained, answered_at, updated_at";

pub(crate) struct UpsertAnswer<'a> {
    pub(crate) id: &'a str,
    pub(crate) attempt_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) selected_position: Option<i32>,
    pub(crate) answer_text: Option<&'a str>,
    pub(crate) options_shuffled: bool,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn find(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    question_id: &str,
) -> Result<Option<AttemptAnswer>, sqlx::Error> {
    sqlx::query_as::<_, AttemptAnswer>(&format!(
        "SELECT {COLUMNS} FROM attempt_answers WHERE attempt_id = $1 AND question_id = $2"
    ))
    .bind(attempt_id)
    .bind(question_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_for_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<AttemptAnswer>, sqlx::Error> {
    sqlx::query_as::<_, AttemptAnswer>(&format!(
        "SELECT {COLUMNS} FROM attempt_answers WHERE attempt_id = $1"
    ))
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

/// One row per (attempt, question); a later answer replaces the earlier one.
/// The shuffle snapshot is refreshed with it.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    answer: UpsertAnswer<'_>,
) -> Result<AttemptAnswer, sqlx::Error> {
    sqlx::query_as::<_, AttemptAnswer>(&format!(
        "INSERT INTO attempt_answers (
            id, attempt_id, question_id, selected_position, answer_text,
            options_shuffled, answered_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$7)
        ON CONFLICT (attempt_id, question_id) DO UPDATE SET
            selected_position = EXCLUDED.selected_position,
            answer_text = EXCLUDED.answer_text,
            options_shuffled = EXCLUDED.options_shuffled,
            updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}"
    ))
    .bind(answer.id)
    .bind(answer.attempt_id)
    .bind(answer.question_id)
    .bind(answer.selected_position)
    .bind(answer.answer_text)
    .bind(answer.options_shuffled)
    .bind(answer.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn record_grade(
    executor: impl sqlx::PgExecutor<'_>,
    answer_id: &str,
    is_correct: Option<bool>,
    marks_obtained: Option<f64>,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE attempt_answers SET is_correct = $1, marks_obtained = $2, updated_at = $3
         WHERE id = $4",
    )
    .bind(is_correct)
    .bind(marks_obtained)
    .bind(now)
    .bind(answer_id)
    .execute(executor)
    .await?;
    Ok(())
}
