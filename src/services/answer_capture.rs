use std::collections::{HashMap, HashSet};

use time::PrimitiveDateTime;

use crate::db::models::{Attempt, AttemptAnswer, DraftAnswer, Exam, Question};
use crate::db::types::AttemptStatus;
use crate::schemas::attempt::{AnswerSubmit, ProgressUpdate};
use crate::services::attempt_error::AttemptError;
use crate::services::attempt_timing::AttemptClock;

pub(crate) fn ensure_owner(attempt: &Attempt, user_id: &str) -> Result<(), AttemptError> {
    if attempt.student_id == user_id {
        Ok(())
    } else {
        Err(AttemptError::Forbidden)
    }
}

/// Answers and progress are only accepted on an ongoing attempt before its
/// deadline.
pub(crate) fn ensure_writable(
    attempt: &Attempt,
    clock: &AttemptClock,
    now: PrimitiveDateTime,
) -> Result<(), AttemptError> {
    if attempt.status != AttemptStatus::Ongoing {
        return Err(AttemptError::AttemptNotOngoing);
    }
    if clock.is_expired(now) {
        return Err(AttemptError::AttemptExpired);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ValidatedAnswer {
    pub(crate) selected_position: Option<i32>,
    pub(crate) answer_text: Option<String>,
}

/// Choice questions take a position into the displayed option list; the rest
/// take text. Mixing the two is rejected.
pub(crate) fn validate_answer(
    question: &Question,
    option_count: usize,
    input: &AnswerSubmit,
) -> Result<ValidatedAnswer, AttemptError> {
    if question.question_type.is_choice() {
        if input.text.is_some() {
            return Err(AttemptError::InvalidAnswer(
                "Choice questions are answered by position".to_string(),
            ));
        }
        let position = input
            .position
            .ok_or_else(|| AttemptError::InvalidAnswer("position is required".to_string()))?;
        let in_range = usize::try_from(position).map(|index| index < option_count).unwrap_or(false);
        if !in_range {
            return Err(AttemptError::InvalidAnswer(format!(
                "position must be between 0 and {}",
                option_count.saturating_sub(1)
            )));
        }
        return Ok(ValidatedAnswer { selected_position: Some(position), answer_text: None });
    }

    if input.position.is_some() {
        return Err(AttemptError::InvalidAnswer(
            "Free-response questions are answered with text".to_string(),
        ));
    }
    let text = input
        .text
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| AttemptError::InvalidAnswer("text is required".to_string()))?;

    Ok(ValidatedAnswer { selected_position: None, answer_text: Some(text.to_string()) })
}

/// With answer changes disabled the first answer sticks. Repeating it is
/// accepted so client retries stay harmless.
pub(crate) fn check_answer_change(
    exam: &Exam,
    existing: Option<&AttemptAnswer>,
    incoming: &ValidatedAnswer,
) -> Result<(), AttemptError> {
    match existing {
        Some(previous) if !exam.allow_answer_change => {
            let unchanged = previous.selected_position == incoming.selected_position
                && previous.answer_text == incoming.answer_text;
            if unchanged {
                Ok(())
            } else {
                Err(AttemptError::AnswerChangeNotAllowed)
            }
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NormalizedProgress {
    pub(crate) current_question_index: i32,
    pub(crate) flagged_question_ids: Vec<String>,
    pub(crate) draft_answers: HashMap<String, DraftAnswer>,
}

/// Progress is advisory, so bad input is trimmed rather than rejected: the
/// cursor is clamped to the paper, flags and drafts for unknown questions are
/// dropped, duplicate flags collapse.
pub(crate) fn normalize_progress(
    update: ProgressUpdate,
    question_ids: &[String],
) -> NormalizedProgress {
    let known: HashSet<&str> = question_ids.iter().map(String::as_str).collect();
    let last_index = i32::try_from(question_ids.len().saturating_sub(1)).unwrap_or(i32::MAX);

    let mut seen = HashSet::new();
    let flagged_question_ids = update
        .flagged_question_ids
        .into_iter()
        .filter(|id| known.contains(id.as_str()) && seen.insert(id.clone()))
        .collect();

    let draft_answers = update
        .draft_answers
        .into_iter()
        .filter(|(id, draft)| {
            known.contains(id.as_str()) && (draft.position.is_some() || draft.text.is_some())
        })
        .collect();

    NormalizedProgress {
        current_question_index: update.current_question_index.clamp(0, last_index),
        flagged_question_ids,
        draft_answers,
    }
}
