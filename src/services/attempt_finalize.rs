use anyhow::{Context, Result};
use sqlx::PgConnection;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::metrics;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Attempt, Exam, ExamResult};
use crate::repositories;
use crate::repositories::results::CreateResult;
use crate::services::attempt_timing::AttemptClock;
use crate::services::reconstruction::report_unresolvable;
use crate::services::scoring::grade_paper;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FinalizeMode {
    ManualSubmit,
    /// The deadline passed with the attempt still open; it is closed as of the
    /// deadline by whichever request notices first.
    AutoDeadline,
}

impl FinalizeMode {
    fn event(self) -> &'static str {
        match self {
            Self::ManualSubmit => "submitted",
            Self::AutoDeadline => "auto_submitted",
        }
    }
}

#[derive(Debug)]
pub(crate) struct FinalizedAttempt {
    pub(crate) attempt: Attempt,
    pub(crate) result: ExamResult,
}

/// Closes an ongoing attempt and grades it. Runs on the caller's transaction;
/// returns `None` when the attempt was no longer ongoing.
pub(crate) async fn finalize_attempt(
    conn: &mut PgConnection,
    exam: &Exam,
    attempt: &Attempt,
    mode: FinalizeMode,
    submitted_at: PrimitiveDateTime,
) -> Result<Option<FinalizedAttempt>> {
    let now = primitive_now_utc();
    let clock = AttemptClock::for_attempt(attempt, exam);
    let time_spent_seconds = clock.time_spent_seconds(submitted_at);

    let Some(submitted) = repositories::attempts::mark_submitted(
        &mut *conn,
        &attempt.id,
        submitted_at,
        time_spent_seconds,
        now,
    )
    .await
    .context("Failed to mark attempt submitted")?
    else {
        return Ok(None);
    };

    repositories::progress::delete(&mut *conn, &attempt.id)
        .await
        .context("Failed to delete attempt progress")?;

    let questions = repositories::questions::list_for_exam(&mut *conn, &exam.id)
        .await
        .context("Failed to load exam questions")?;
    let question_ids: Vec<String> = questions.iter().map(|question| question.id.clone()).collect();
    let options = repositories::questions::list_options_for_questions(&mut *conn, &question_ids)
        .await
        .context("Failed to load question options")?;
    let answers = repositories::answers::list_for_attempt(&mut *conn, &attempt.id)
        .await
        .context("Failed to load attempt answers")?;

    let (graded, summary) =
        grade_paper(&submitted, questions, options, answers).context("Failed to grade attempt")?;
    report_unresolvable(
        &submitted,
        graded.iter().map(|item| (&item.question, &item.reconstruction.resolution)),
    );

    for item in &graded {
        if let Some(answer) = &item.answer {
            repositories::answers::record_grade(
                &mut *conn,
                &answer.id,
                item.outcome.is_correct,
                item.outcome.marks_obtained,
                now,
            )
            .await
            .context("Failed to record answer grade")?;
        }
    }

    let result_id = Uuid::new_v4().to_string();
    let result = repositories::results::create(
        &mut *conn,
        CreateResult {
            id: &result_id,
            attempt_id: &submitted.id,
            exam_id: &submitted.exam_id,
            student_id: &submitted.student_id,
            summary: &summary,
            created_at: now,
        },
    )
    .await
    .context("Failed to create exam result")?;

    let attempt = if summary.needs_manual_grading() {
        submitted
    } else {
        repositories::attempts::mark_evaluated(&mut *conn, &submitted.id, now)
            .await
            .context("Failed to mark attempt evaluated")?
            .unwrap_or(submitted)
    };

    metrics::record_attempt_event(mode.event());
    tracing::info!(
        attempt_id = %attempt.id,
        exam_id = %attempt.exam_id,
        mode = ?mode,
        marks_obtained = summary.marks_obtained,
        total_marks = summary.total_marks,
        pending = summary.pending_count,
        unresolvable = summary.unresolvable_count,
        "Attempt finalized"
    );

    Ok(Some(FinalizedAttempt { attempt, result }))
}
