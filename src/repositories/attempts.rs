use time::PrimitiveDateTime;

use crate::db::models::Attempt;
use crate::db::types::AttemptStatus;
use crate::services::eligibility::AttemptHistory;

pub(crate) const COLUMNS: &str = "\
    id, exam_id, student_id, status, attempt_number, started_at, submitted_at, \
    time_spent_seconds, shuffle_options, shuffle_questions, seed_version, created_at, updated_at";

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) attempt_number: i32,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) shuffle_options: bool,
    pub(crate) shuffle_questions: bool,
    pub(crate) seed_version: i16,
}

/// Serializes start requests for one (exam, student) until the transaction ends.
pub(crate) async fn lock_start(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    student_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(format!("exam-attempt:{exam_id}:{student_id}"))
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!("SELECT {COLUMNS} FROM exam_attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Row-locks the attempt for the rest of the transaction.
pub(crate) async fn find_by_id_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_ongoing(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    student_id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts \
         WHERE exam_id = $1 AND student_id = $2 AND status = $3"
    ))
    .bind(exam_id)
    .bind(student_id)
    .bind(AttemptStatus::Ongoing)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn history(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    student_id: &str,
) -> Result<AttemptHistory, sqlx::Error> {
    let (terminal_attempts, last_submitted_at): (i64, Option<PrimitiveDateTime>) =
        sqlx::query_as(
            "SELECT COUNT(*), MAX(submitted_at) FROM exam_attempts \
             WHERE exam_id = $1 AND student_id = $2 AND status IN ($3, $4)",
        )
        .bind(exam_id)
        .bind(student_id)
        .bind(AttemptStatus::Submitted)
        .bind(AttemptStatus::Evaluated)
        .fetch_one(executor)
        .await?;

    Ok(AttemptHistory { terminal_attempts, last_submitted_at })
}

pub(crate) async fn next_attempt_number(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    student_id: &str,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "SELECT COALESCE(MAX(attempt_number), 0) + 1 FROM exam_attempts \
         WHERE exam_id = $1 AND student_id = $2",
    )
    .bind(exam_id)
    .bind(student_id)
    .fetch_one(executor)
    .await
}

/// Returns `None` when another ongoing attempt won the race; the partial
/// unique index on ongoing attempts turns that into a no-op insert.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    attempt: CreateAttempt<'_>,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "INSERT INTO exam_attempts (
            id, exam_id, student_id, status, attempt_number, started_at,
            shuffle_options, shuffle_questions, seed_version, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$6,$6)
        ON CONFLICT DO NOTHING
        RETURNING {COLUMNS}"
    ))
    .bind(attempt.id)
    .bind(attempt.exam_id)
    .bind(attempt.student_id)
    .bind(AttemptStatus::Ongoing)
    .bind(attempt.attempt_number)
    .bind(attempt.started_at)
    .bind(attempt.shuffle_options)
    .bind(attempt.shuffle_questions)
    .bind(attempt.seed_version)
    .fetch_optional(executor)
    .await
}

/// Moves an ongoing attempt to `submitted`. `None` if it was no longer ongoing.
pub(crate) async fn mark_submitted(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    submitted_at: PrimitiveDateTime,
    time_spent_seconds: i64,
    now: PrimitiveDateTime,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "UPDATE exam_attempts
         SET status = $1, submitted_at = $2, time_spent_seconds = $3, updated_at = $4
         WHERE id = $5 AND status = $6
         RETURNING {COLUMNS}"
    ))
    .bind(AttemptStatus::Submitted)
    .bind(submitted_at)
    .bind(time_spent_seconds)
    .bind(now)
    .bind(id)
    .bind(AttemptStatus::Ongoing)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn mark_evaluated(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "UPDATE exam_attempts SET status = $1, updated_at = $2
         WHERE id = $3 AND status = $4
         RETURNING {COLUMNS}"
    ))
    .bind(AttemptStatus::Evaluated)
    .bind(now)
    .bind(id)
    .bind(AttemptStatus::Submitted)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_for_student_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    student_id: &str,
) -> Result<Vec<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts \
         WHERE exam_id = $1 AND student_id = $2 \
         ORDER BY attempt_number DESC"
    ))
    .bind(exam_id)
    .bind(student_id)
    .fetch_all(executor)
    .await
}
