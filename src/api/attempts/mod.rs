mod helpers;
mod history;
mod progress;
mod start;
mod submit;

use axum::{routing::get, routing::post, routing::put, Router};

use crate::core::state::AppState;

pub(crate) use helpers::{fetch_exam, load_paper_content};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/exams/:exam_id/start", post(start::start_attempt))
        .route("/exams/:exam_id/history", get(history::list_history))
        .route("/:attempt_id/answers", post(progress::record_answer))
        .route("/:attempt_id/progress", put(progress::update_progress))
        .route("/:attempt_id/submit", post(submit::submit_attempt))
}
