use time::PrimitiveDateTime;

use crate::db::models::ExamResult;
use crate::services::scoring::ScoreSummary;

const COLUMNS: &str = "\
    id, attempt_id, exam_id, student_id, total_marks, marks_obtained, correct_count, \
    incorrect_count, unattempted_count, unresolvable_count, pending_count, created_at";

pub(crate) struct CreateResult<'a> {
    pub(crate) id: &'a str,
    pub(crate) attempt_id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) summary: &'a ScoreSummary,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    result: CreateResult<'_>,
) -> Result<ExamResult, sqlx::Error> {
    sqlx::query_as::<_, ExamResult>(&format!(
        "INSERT INTO exam_results (
            id, attempt_id, exam_id, student_id, total_marks, marks_obtained,
            correct_count, incorrect_count, unattempted_count, unresolvable_count,
            pending_count, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
        RETURNING {COLUMNS}"
    ))
    .bind(result.id)
    .bind(result.attempt_id)
    .bind(result.exam_id)
    .bind(result.student_id)
    .bind(result.summary.total_marks)
    .bind(result.summary.marks_obtained)
    .bind(result.summary.correct_count)
    .bind(result.summary.incorrect_count)
    .bind(result.summary.unattempted_count)
    .bind(result.summary.unresolvable_count)
    .bind(result.summary.pending_count)
    .bind(result.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<ExamResult>, sqlx::Error> {
    sqlx::query_as::<_, ExamResult>(&format!("SELECT {COLUMNS} FROM exam_results WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Result ids keyed by attempt id, for the attempt history listing.
pub(crate) async fn ids_by_attempts(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_ids: &[String],
) -> Result<Vec<(String, String)>, sqlx::Error> {
    if attempt_ids.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_as::<_, (String, String)>(
        "SELECT attempt_id, id FROM exam_results WHERE attempt_id = ANY($1)",
    )
    .bind(attempt_ids)
    .fetch_all(executor)
    .await
}
