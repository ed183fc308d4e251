use sqlx::PgPool;

use crate::db::models::User;

const COLUMNS: &str = "id, username, full_name, is_platform_admin, is_active, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) struct CreateUser<'a> {
    pub(crate) id: &'a str,
    pub(crate) username: &'a str,
    pub(crate) full_name: &'a str,
    pub(crate) is_platform_admin: bool,
    pub(crate) is_active: bool,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    user: CreateUser<'_>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (
            id, username, full_name, is_platform_admin, is_active, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$6)
        RETURNING {COLUMNS}"
    ))
    .bind(user.id)
    .bind(user.username)
    .bind(user.full_name)
    .bind(user.is_platform_admin)
    .bind(user.is_active)
    .bind(user.created_at)
    .fetch_one(executor)
    .await
}
