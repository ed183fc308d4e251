use time::{Duration, PrimitiveDateTime};

use crate::core::time::seconds_between;
use crate::db::models::{Attempt, Exam};

/// The earlier of `started_at + duration` and the exam's end time.
pub(crate) fn attempt_deadline(
    started_at: PrimitiveDateTime,
    duration_minutes: i32,
    exam_end: PrimitiveDateTime,
) -> PrimitiveDateTime {
    let duration_deadline = started_at + Duration::minutes(i64::from(duration_minutes.max(0)));
    if duration_deadline < exam_end {
        duration_deadline
    } else {
        exam_end
    }
}

/// Clock for one attempt. Always derived from the stored `started_at`, so a
/// resume never resets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AttemptClock {
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) deadline: PrimitiveDateTime,
}

impl AttemptClock {
    pub(crate) fn for_attempt(attempt: &Attempt, exam: &Exam) -> Self {
        Self {
            started_at: attempt.started_at,
            deadline: attempt_deadline(attempt.started_at, exam.duration_minutes, exam.end_time),
        }
    }

    pub(crate) fn elapsed_seconds(&self, now: PrimitiveDateTime) -> i64 {
        let until = if now < self.deadline { now } else { self.deadline };
        seconds_between(self.started_at, until)
    }

    pub(crate) fn remaining_seconds(&self, now: PrimitiveDateTime) -> i64 {
        seconds_between(now, self.deadline)
    }

    pub(crate) fn is_expired(&self, now: PrimitiveDateTime) -> bool {
        now > self.deadline
    }

    /// Submissions are accepted up to `grace_seconds` past the deadline to
    /// absorb network latency on the final request.
    pub(crate) fn accepts_submission(&self, now: PrimitiveDateTime, grace_seconds: u64) -> bool {
        let grace = Duration::seconds(i64::try_from(grace_seconds).unwrap_or(i64::MAX));
        now <= self.deadline.saturating_add(grace)
    }

    /// Time spent as recorded on submission; capped at the deadline.
    pub(crate) fn time_spent_seconds(&self, submitted_at: PrimitiveDateTime) -> i64 {
        self.elapsed_seconds(submitted_at)
    }
}
