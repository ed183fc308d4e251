use crate::db::types::EnrollmentStatus;

/// True when the student holds an active enrollment in any program that
/// includes the exam.
pub(crate) async fn is_actively_enrolled(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    exam_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
            SELECT 1 FROM enrollments e
            JOIN program_exams pe ON pe.program_id = e.program_id
            WHERE e.student_id = $1 AND pe.exam_id = $2 AND e.status = $3
        )",
    )
    .bind(student_id)
    .bind(exam_id)
    .bind(EnrollmentStatus::Active)
    .fetch_one(executor)
    .await
}
