use std::collections::HashMap;

use crate::db::models::{Question, QuestionOption};

const QUESTION_COLUMNS: &str = "\
    q.id, q.text, q.question_type, q.marks, q.allow_option_randomization, eq.order_index";

const OPTION_COLUMNS: &str = "id, question_id, text, sequence, is_correct";

/// Questions linked to `exam_id`, in authored display order.
pub(crate) async fn list_for_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM exam_questions eq \
         JOIN questions q ON q.id = eq.question_id \
         WHERE eq.exam_id = $1 \
         ORDER BY eq.order_index, q.id"
    ))
    .bind(exam_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn find_in_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    question_id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM exam_questions eq \
         JOIN questions q ON q.id = eq.question_id \
         WHERE eq.exam_id = $1 AND q.id = $2"
    ))
    .bind(exam_id)
    .bind(question_id)
    .fetch_optional(executor)
    .await
}

/// Options of one question in storage order; callers apply the base order.
pub(crate) async fn list_options(
    executor: impl sqlx::PgExecutor<'_>,
    question_id: &str,
) -> Result<Vec<QuestionOption>, sqlx::Error> {
    sqlx::query_as::<_, QuestionOption>(&format!(
        "SELECT {OPTION_COLUMNS} FROM question_options WHERE question_id = $1"
    ))
    .bind(question_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_options_for_questions(
    executor: impl sqlx::PgExecutor<'_>,
    question_ids: &[String],
) -> Result<HashMap<String, Vec<QuestionOption>>, sqlx::Error> {
    if question_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, QuestionOption>(&format!(
        "SELECT {OPTION_COLUMNS} FROM question_options WHERE question_id = ANY($1)"
    ))
    .bind(question_ids)
    .fetch_all(executor)
    .await?;

    let mut grouped: HashMap<String, Vec<QuestionOption>> = HashMap::new();
    for option in rows {
        grouped.entry(option.question_id.clone()).or_default().push(option);
    }
    Ok(grouped)
}
