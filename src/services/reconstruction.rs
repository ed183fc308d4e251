//! Maps stored answer positions back to concrete options.
//!
//! Nothing about the displayed order is persisted. Grading and review rebuild
//! it from the attempt's seed inputs and the enablement decision snapshotted
//! on the answer row, then index into it with the stored position.

use crate::core::metrics;
use crate::db::models::{Attempt, AttemptAnswer, Question, QuestionOption};
use crate::services::attempt_error::AttemptError;
use crate::services::attempt_paper::{displayed_options, option_shuffle_enabled, seed_version};
use crate::services::shuffle::SeedInputs;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Resolution {
    Chosen { option: QuestionOption, is_correct: bool },
    Unattempted,
    /// The stored position does not fit the current option set.
    Unresolvable { position: i32, option_count: usize },
    /// Free-response text; graded by a person.
    Pending { text: String },
}

#[derive(Debug, Clone)]
pub(crate) struct Reconstruction {
    /// Options in the order the student saw them.
    pub(crate) displayed: Vec<QuestionOption>,
    pub(crate) resolution: Resolution,
}

impl Reconstruction {
    pub(crate) fn chosen_option_id(&self) -> Option<&str> {
        match &self.resolution {
            Resolution::Chosen { option, .. } => Some(option.id.as_str()),
            _ => None,
        }
    }
}

/// Enablement to replay for `question`: the answer's snapshot when one exists,
/// otherwise what the attempt would have shown.
pub(crate) fn replay_enabled(
    attempt: &Attempt,
    question: &Question,
    answer: Option<&AttemptAnswer>,
) -> bool {
    match answer {
        Some(answer) => answer.options_shuffled,
        None => option_shuffle_enabled(attempt.shuffle_options, question),
    }
}

pub(crate) fn resolve_answer(
    attempt: &Attempt,
    question: &Question,
    options: Vec<QuestionOption>,
    answer: Option<&AttemptAnswer>,
) -> Result<Reconstruction, AttemptError> {
    let enabled = replay_enabled(attempt, question, answer);
    let displayed = displayed_options(attempt, &question.id, options, enabled)?;

    let resolution = if question.question_type.is_choice() {
        resolve_position(&displayed, answer)
    } else {
        match answer.and_then(|answer| answer.answer_text.as_deref()).map(str::trim) {
            Some(text) if !text.is_empty() => Resolution::Pending { text: text.to_string() },
            _ => Resolution::Unattempted,
        }
    };

    Ok(Reconstruction { displayed, resolution })
}

fn resolve_position(displayed: &[QuestionOption], answer: Option<&AttemptAnswer>) -> Resolution {
    let Some(position) = answer.and_then(|answer| answer.selected_position) else {
        return Resolution::Unattempted;
    };

    let chosen = usize::try_from(position).ok().and_then(|index| displayed.get(index));
    match chosen {
        Some(option) => {
            Resolution::Chosen { option: option.clone(), is_correct: option.is_correct }
        }
        None => Resolution::Unresolvable { position, option_count: displayed.len() },
    }
}

/// Logs and counts the answers of a just-closed attempt that could not be
/// mapped back. Called once per attempt, not on every rebuild.
pub(crate) fn report_unresolvable<'a>(
    attempt: &Attempt,
    resolved: impl IntoIterator<Item = (&'a Question, &'a Resolution)>,
) -> usize {
    let mut reported = 0;
    for (question, resolution) in resolved {
        let Resolution::Unresolvable { position, option_count } = resolution else {
            continue;
        };
        let seed_fingerprint = seed_version(attempt)
            .map(|version| {
                SeedInputs {
                    version,
                    student_id: &attempt.student_id,
                    question_id: &question.id,
                    attempt_id: &attempt.id,
                }
                .fingerprint()
            })
            .unwrap_or_default();
        tracing::warn!(
            attempt_id = %attempt.id,
            question_id = %question.id,
            seed = %seed_fingerprint,
            position,
            option_count,
            "Stored answer position does not match the option set"
        );
        metrics::record_unresolvable_answer();
        reported += 1;
    }
    reported
}
