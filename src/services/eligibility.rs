use time::{Duration, PrimitiveDateTime};

use crate::core::config::ExamSettings;
use crate::db::models::{Exam, PlatformSettings};
use crate::db::types::ExamStatus;
use crate::services::attempt_error::AttemptError;

/// Global attempt rules in effect for one request. Resolved per call and
/// passed in explicitly; nothing here is read from ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AttemptPolicy {
    pub(crate) shuffle_questions_globally: bool,
    pub(crate) max_attempts_per_student: u32,
    pub(crate) allow_retake: bool,
    pub(crate) retake_cooldown_days: u32,
}

impl AttemptPolicy {
    pub(crate) fn from_defaults(settings: &ExamSettings) -> Self {
        Self {
            shuffle_questions_globally: settings.shuffle_questions_globally,
            max_attempts_per_student: settings.max_attempts_per_student,
            allow_retake: settings.allow_retake,
            retake_cooldown_days: settings.retake_cooldown_days,
        }
    }

    /// The stored platform row wins over environment defaults. Negative
    /// numbers in the row are treated as zero.
    pub(crate) fn resolve(defaults: &ExamSettings, stored: Option<&PlatformSettings>) -> Self {
        match stored {
            Some(row) => Self {
                shuffle_questions_globally: row.shuffle_questions_globally,
                max_attempts_per_student: u32::try_from(row.max_attempts_per_student).unwrap_or(0),
                allow_retake: row.allow_retake,
                retake_cooldown_days: u32::try_from(row.retake_cooldown_days).unwrap_or(0),
            },
            None => Self::from_defaults(defaults),
        }
    }

    pub(crate) fn effective_ceiling(&self, exam: &Exam) -> u32 {
        if !self.allow_retake {
            return 1;
        }
        exam.max_attempts
            .and_then(|value| u32::try_from(value).ok())
            .filter(|value| *value > 0)
            .unwrap_or(self.max_attempts_per_student)
    }

    /// Exam-level option shuffle decision, snapshotted on new attempts.
    pub(crate) fn shuffle_options_for(&self, exam: &Exam) -> bool {
        exam.randomize_options && self.shuffle_questions_globally
    }

    pub(crate) fn shuffle_questions_for(&self, exam: &Exam) -> bool {
        exam.randomize_questions && self.shuffle_questions_globally
    }
}

/// Prior terminal attempts of one student on one exam.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct AttemptHistory {
    pub(crate) terminal_attempts: i64,
    pub(crate) last_submitted_at: Option<PrimitiveDateTime>,
}

/// Drafts are invisible to students; archived exams no longer accept attempts.
pub(crate) fn check_exam_available(exam: &Exam) -> Result<(), AttemptError> {
    match exam.status {
        ExamStatus::Draft => Err(AttemptError::NotFound("Exam")),
        ExamStatus::Archived => Err(AttemptError::Closed),
        ExamStatus::Published => Ok(()),
    }
}

pub(crate) fn check_window(exam: &Exam, now: PrimitiveDateTime) -> Result<(), AttemptError> {
    if now < exam.start_time {
        return Err(AttemptError::NotYetOpen { opens_at: exam.start_time });
    }
    if now > exam.end_time {
        return Err(AttemptError::Closed);
    }
    Ok(())
}

/// Whole days until `last_submitted_at + cooldown_days`, rounded up.
/// Zero once the cooldown has elapsed.
pub(crate) fn cooldown_days_remaining(
    last_submitted_at: PrimitiveDateTime,
    cooldown_days: u32,
    now: PrimitiveDateTime,
) -> i64 {
    let available_at = last_submitted_at + Duration::days(i64::from(cooldown_days));
    if now >= available_at {
        return 0;
    }

    let remaining = (available_at - now).whole_seconds();
    let day = Duration::DAY.whole_seconds();
    (remaining + day - 1) / day
}

/// Enrollment, window, ceiling and cooldown, in that order. Availability of
/// the exam itself is checked by the caller before anything else.
pub(crate) fn check_eligibility(
    exam: &Exam,
    policy: &AttemptPolicy,
    enrolled: bool,
    history: AttemptHistory,
    now: PrimitiveDateTime,
) -> Result<(), AttemptError> {
    if !enrolled {
        return Err(AttemptError::NotEnrolled);
    }

    check_window(exam, now)?;

    let limit = policy.effective_ceiling(exam);
    if history.terminal_attempts >= i64::from(limit) {
        return Err(AttemptError::AttemptLimitReached { limit });
    }

    if let Some(last_submitted_at) = history.last_submitted_at {
        if history.terminal_attempts > 0 && policy.retake_cooldown_days > 0 {
            let days_remaining =
                cooldown_days_remaining(last_submitted_at, policy.retake_cooldown_days, now);
            if days_remaining > 0 {
                return Err(AttemptError::CooldownActive { days_remaining });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::test_support::sample_exam as exam;

    fn policy() -> AttemptPolicy {
        AttemptPolicy {
            shuffle_questions_globally: true,
            max_attempts_per_student: 3,
            allow_retake: true,
            retake_cooldown_days: 0,
        }
    }

    const DURING: PrimitiveDateTime = datetime!(2025-03-10 09:30:00);

    #[test]
    fn one_minute_early_is_not_yet_open() {
        let result = check_eligibility(
            &exam(),
            &policy(),
            true,
            AttemptHistory::default(),
            datetime!(2025-03-10 08:59:00),
        );
        assert_eq!(
            result,
            Err(AttemptError::NotYetOpen { opens_at: datetime!(2025-03-10 09:00:00) })
        );
    }

    #[test]
    fn window_bounds_are_inclusive() {
        assert!(check_window(&exam(), datetime!(2025-03-10 09:00:00)).is_ok());
        assert!(check_window(&exam(), datetime!(2025-03-10 10:00:00)).is_ok());
        assert_eq!(
            check_window(&exam(), datetime!(2025-03-10 10:00:01)),
            Err(AttemptError::Closed)
        );
    }

    #[test]
    fn enrollment_is_checked_before_window() {
        let result = check_eligibility(
            &exam(),
            &policy(),
            false,
            AttemptHistory::default(),
            datetime!(2025-03-11 09:00:00),
        );
        assert_eq!(result, Err(AttemptError::NotEnrolled));
    }

    #[test]
    fn fourth_start_hits_attempt_ceiling() {
        let history = AttemptHistory {
            terminal_attempts: 3,
            last_submitted_at: Some(datetime!(2025-03-10 09:10:00)),
        };
        let result = check_eligibility(&exam(), &policy(), true, history, DURING);
        assert_eq!(result, Err(AttemptError::AttemptLimitReached { limit: 3 }));
    }

    #[test]
    fn exam_override_replaces_global_ceiling() {
        let mut exam = exam();
        exam.max_attempts = Some(5);
        let history = AttemptHistory {
            terminal_attempts: 3,
            last_submitted_at: Some(datetime!(2025-03-10 09:10:00)),
        };
        assert!(check_eligibility(&exam, &policy(), true, history, DURING).is_ok());
    }

    #[test]
    fn disabled_retake_allows_a_single_attempt() {
        let policy = AttemptPolicy { allow_retake: false, ..policy() };
        let history = AttemptHistory {
            terminal_attempts: 1,
            last_submitted_at: Some(datetime!(2025-03-10 09:10:00)),
        };
        let result = check_eligibility(&exam(), &policy, true, history, DURING);
        assert_eq!(result, Err(AttemptError::AttemptLimitReached { limit: 1 }));
    }

    #[test]
    fn two_days_into_week_cooldown_leaves_five() {
        let mut exam = exam();
        exam.end_time = datetime!(2025-04-30 00:00:00);
        let policy = AttemptPolicy { retake_cooldown_days: 7, ..policy() };
        let history = AttemptHistory {
            terminal_attempts: 1,
            last_submitted_at: Some(datetime!(2025-03-10 09:30:00)),
        };
        let result =
            check_eligibility(&exam, &policy, true, history, datetime!(2025-03-12 09:30:00));
        assert_eq!(result, Err(AttemptError::CooldownActive { days_remaining: 5 }));
    }

    #[test]
    fn partial_cooldown_days_round_up() {
        let last = datetime!(2025-03-10 09:30:00);
        assert_eq!(cooldown_days_remaining(last, 7, datetime!(2025-03-12 10:00:00)), 5);
        assert_eq!(cooldown_days_remaining(last, 7, datetime!(2025-03-17 09:29:59)), 1);
        assert_eq!(cooldown_days_remaining(last, 7, datetime!(2025-03-17 09:30:00)), 0);
        assert_eq!(cooldown_days_remaining(last, 0, last), 0);
    }

    #[test]
    fn elapsed_cooldown_permits_retake() {
        let mut exam = exam();
        exam.end_time = datetime!(2025-04-30 00:00:00);
        let policy = AttemptPolicy { retake_cooldown_days: 1, ..policy() };
        let history = AttemptHistory {
            terminal_attempts: 1,
            last_submitted_at: Some(datetime!(2025-03-10 09:30:00)),
        };
        assert!(check_eligibility(&exam, &policy, true, history, datetime!(2025-03-12 09:30:00))
            .is_ok());
    }

    #[test]
    fn draft_and_archived_exams_are_unavailable() {
        let mut exam = exam();
        exam.status = ExamStatus::Draft;
        assert_eq!(check_exam_available(&exam), Err(AttemptError::NotFound("Exam")));
        exam.status = ExamStatus::Archived;
        assert_eq!(check_exam_available(&exam), Err(AttemptError::Closed));
        exam.status = ExamStatus::Published;
        assert!(check_exam_available(&exam).is_ok());
    }

    #[test]
    fn stored_platform_settings_win_over_defaults() {
        let defaults = ExamSettings {
            shuffle_questions_globally: true,
            max_attempts_per_student: 3,
            allow_retake: true,
            retake_cooldown_days: 0,
            submit_grace_seconds: 0,
            progress_save_interval_seconds: 2,
        };
        let row = PlatformSettings {
            shuffle_questions_globally: false,
            max_attempts_per_student: 2,
            allow_retake: true,
            retake_cooldown_days: -4,
            updated_at: datetime!(2025-03-01 00:00:00),
        };

        let resolved = AttemptPolicy::resolve(&defaults, Some(&row));
        assert!(!resolved.shuffle_questions_globally);
        assert_eq!(resolved.max_attempts_per_student, 2);
        assert_eq!(resolved.retake_cooldown_days, 0);
        assert_eq!(AttemptPolicy::resolve(&defaults, None), AttemptPolicy::from_defaults(&defaults));
    }

    #[test]
    fn option_shuffle_needs_exam_and_global_flag() {
        let exam = exam();
        assert!(policy().shuffle_options_for(&exam));
        let off = AttemptPolicy { shuffle_questions_globally: false, ..policy() };
        assert!(!off.shuffle_options_for(&exam));
        assert!(!policy().shuffle_questions_for(&exam));
    }
}
