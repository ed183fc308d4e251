use crate::db::models::PlatformSettings;

pub(crate) async fn fetch(
    executor: impl sqlx::PgExecutor<'_>,
) -> Result<Option<PlatformSettings>, sqlx::Error> {
    sqlx::query_as::<_, PlatformSettings>(
        "SELECT shuffle_questions_globally, max_attempts_per_student, allow_retake, \
         retake_cooldown_days, updated_at \
         FROM platform_settings WHERE id = 1",
    )
    .fetch_optional(executor)
    .await
}
