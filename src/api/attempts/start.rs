use axum::{
    extract::{Path, State},
    Json,
};
use sqlx::PgConnection;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::models::{Attempt, AttemptProgress, Exam, User};
use crate::repositories;
use crate::repositories::attempts::CreateAttempt;
use crate::schemas::attempt::{ExamSummary, StartAttemptResponse};
use crate::services::attempt_error::AttemptError;
use crate::services::attempt_finalize::{finalize_attempt, FinalizeMode};
use crate::services::attempt_paper::build_paper;
use crate::services::attempt_timing::AttemptClock;
use crate::services::eligibility::{check_eligibility, check_exam_available};
use crate::services::shuffle::CURRENT_SEED_VERSION;

use super::helpers;

/// A start that finds an expired ongoing attempt closes it and goes round
/// once more; a second expiry in a row means something is wrong.
const MAX_START_PASSES: usize = 2;

enum StartPass {
    Ready(StartAttemptResponse),
    ClosedExpired,
}

pub(super) async fn start_attempt(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<StartAttemptResponse>, ApiError> {
    for _ in 0..MAX_START_PASSES {
        match start_pass(&state, &exam_id, &user).await? {
            StartPass::Ready(response) => return Ok(Json(response)),
            StartPass::ClosedExpired => continue,
        }
    }

    Err(ApiError::internal(
        format!("exam_id={exam_id} student_id={}", user.id),
        "Attempt start did not settle",
    ))
}

/// One start transaction: lock, eligibility, then resume or create.
async fn start_pass(state: &AppState, exam_id: &str, user: &User) -> Result<StartPass, ApiError> {
    let now = primitive_now_utc();
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to begin transaction"))?;

    let exam = helpers::fetch_exam(&mut *tx, exam_id).await?;
    check_exam_available(&exam)?;

    repositories::attempts::lock_start(&mut *tx, &exam.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock attempt start"))?;

    let policy = helpers::resolve_policy(state, &mut *tx).await?;
    let enrolled = repositories::enrollments::is_actively_enrolled(&mut *tx, &user.id, &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check enrollment"))?;
    if !enrolled {
        return Err(AttemptError::NotEnrolled.into());
    }

    let ongoing = repositories::attempts::find_ongoing(&mut *tx, &exam.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch ongoing attempt"))?;

    if let Some(attempt) = &ongoing {
        let clock = AttemptClock::for_attempt(attempt, &exam);
        if clock.is_expired(now) {
            finalize_attempt(&mut tx, &exam, attempt, FinalizeMode::AutoDeadline, clock.deadline)
                .await
                .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to close expired attempt"))?;
            tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;
            tracing::info!(
                attempt_id = %attempt.id,
                exam_id = %exam.id,
                "Expired attempt closed at its deadline before a new start"
            );
            return Ok(StartPass::ClosedExpired);
        }
    }

    let history = repositories::attempts::history(&mut *tx, &exam.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count previous attempts"))?;
    check_eligibility(&exam, &policy, enrolled, history, now)?;

    let (attempt, is_resume) = match ongoing {
        Some(attempt) => (attempt, true),
        None => {
            let attempt_number =
                repositories::attempts::next_attempt_number(&mut *tx, &exam.id, &user.id)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to number attempt"))?;
            let attempt_id = Uuid::new_v4().to_string();
            let created = repositories::attempts::create(
                &mut *tx,
                CreateAttempt {
                    id: &attempt_id,
                    exam_id: &exam.id,
                    student_id: &user.id,
                    attempt_number,
                    started_at: now,
                    shuffle_options: policy.shuffle_options_for(&exam),
                    shuffle_questions: policy.shuffle_questions_for(&exam),
                    seed_version: CURRENT_SEED_VERSION.as_i16(),
                },
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to create attempt"))?;

            match created {
                Some(attempt) => {
                    repositories::progress::create_empty(&mut *tx, &attempt.id, now)
                        .await
                        .map_err(|e| ApiError::internal(e, "Failed to create attempt progress"))?;
                    (attempt, false)
                }
                None => (recover_concurrent_start(&mut tx, &exam, user).await?, true),
            }
        }
    };

    let progress = repositories::progress::find(&mut *tx, &attempt.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt progress"))?;
    let response = paper_response(state, &mut tx, &exam, &attempt, progress, is_resume, now).await?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    if is_resume {
        metrics::record_attempt_event("resumed");
        tracing::info!(attempt_id = %attempt.id, exam_id = %exam.id, "Attempt resumed");
    } else {
        metrics::record_attempt_event("started");
        tracing::info!(
            attempt_id = %attempt.id,
            exam_id = %exam.id,
            attempt_number = attempt.attempt_number,
            shuffle_options = attempt.shuffle_options,
            "Attempt started"
        );
    }

    Ok(StartPass::Ready(response))
}

/// The insert lost to a concurrent start; the winner's ongoing attempt is the
/// one to resume.
async fn recover_concurrent_start(
    conn: &mut PgConnection,
    exam: &Exam,
    user: &User,
) -> Result<Attempt, ApiError> {
    let existing = repositories::attempts::find_ongoing(conn, &exam.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to re-read ongoing attempt"))?;

    match existing {
        Some(attempt) => {
            tracing::warn!(
                attempt_id = %attempt.id,
                exam_id = %exam.id,
                "Concurrent attempt start resolved to the existing attempt"
            );
            Ok(attempt)
        }
        None => Err(ApiError::internal(
            format!("exam_id={} student_id={}", exam.id, user.id),
            "Attempt insert conflicted without an ongoing attempt",
        )),
    }
}

async fn paper_response(
    state: &AppState,
    conn: &mut PgConnection,
    exam: &Exam,
    attempt: &Attempt,
    progress: Option<AttemptProgress>,
    is_resume: bool,
    now: PrimitiveDateTime,
) -> Result<StartAttemptResponse, ApiError> {
    let (questions, options) = helpers::load_paper_content(conn, &exam.id).await?;
    let questions = build_paper(attempt, questions, options)?;
    let clock = AttemptClock::for_attempt(attempt, exam);

    Ok(StartAttemptResponse {
        attempt_id: attempt.id.clone(),
        attempt_number: attempt.attempt_number,
        exam: ExamSummary::from(exam),
        questions,
        is_resume,
        started_at: format_primitive(attempt.started_at),
        deadline: format_primitive(clock.deadline),
        elapsed_seconds: clock.elapsed_seconds(now),
        remaining_seconds: clock.remaining_seconds(now),
        progress_save_interval_seconds: state.settings().exam().progress_save_interval_seconds,
        progress: progress.map(Into::into),
    })
}
