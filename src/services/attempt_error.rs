use thiserror::Error;
use time::PrimitiveDateTime;

/// User-facing failures of the attempt lifecycle. None of them is retried:
/// the same request with the same inputs fails the same way.
#[derive(Debug, Clone, PartialEq, Error)]
pub(crate) enum AttemptError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("You are not enrolled in a program that includes this exam")]
    NotEnrolled,
    #[error("Exam has not opened yet")]
    NotYetOpen { opens_at: PrimitiveDateTime },
    #[error("Exam is closed")]
    Closed,
    #[error("Maximum of {limit} attempts reached")]
    AttemptLimitReached { limit: u32 },
    #[error("Retake available in {days_remaining} day(s)")]
    CooldownActive { days_remaining: i64 },
    #[error("Access denied")]
    Forbidden,
    #[error("Attempt is not in progress")]
    AttemptNotOngoing,
    #[error("Attempt time is over")]
    AttemptExpired,
    #[error("Answers cannot be changed for this exam")]
    AnswerChangeNotAllowed,
    #[error("{0}")]
    InvalidAnswer(String),
    #[error("Unsupported seed version {0}")]
    UnsupportedSeedVersion(i16),
}

impl AttemptError {
    /// Stable machine-readable code for clients.
    pub(crate) fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::NotEnrolled => "not_enrolled",
            Self::NotYetOpen { .. } => "not_yet_open",
            Self::Closed => "closed",
            Self::AttemptLimitReached { .. } => "attempt_limit_reached",
            Self::CooldownActive { .. } => "cooldown_active",
            Self::Forbidden => "forbidden",
            Self::AttemptNotOngoing => "attempt_not_ongoing",
            Self::AttemptExpired => "attempt_expired",
            Self::AnswerChangeNotAllowed => "answer_change_not_allowed",
            Self::InvalidAnswer(_) => "invalid_answer",
            Self::UnsupportedSeedVersion(_) => "unsupported_seed_version",
        }
    }
}
