use std::collections::HashMap;

use crate::db::models::{Attempt, Question, QuestionOption};
use crate::schemas::attempt::{PaperOption, PaperQuestion};
use crate::services::attempt_error::AttemptError;
use crate::services::option_order::resolve_base_order;
use crate::services::shuffle::{self, SeedInputs, SeedVersion};

pub(crate) fn seed_version(attempt: &Attempt) -> Result<SeedVersion, AttemptError> {
    SeedVersion::from_i16(attempt.seed_version)
        .ok_or(AttemptError::UnsupportedSeedVersion(attempt.seed_version))
}

/// Per-question enablement: the attempt snapshot and the question's own flag.
/// Free-response questions have nothing to shuffle.
pub(crate) fn option_shuffle_enabled(attempt_shuffle_options: bool, question: &Question) -> bool {
    attempt_shuffle_options
        && question.allow_option_randomization
        && question.question_type.is_choice()
}

/// Options of one question in the order the student sees them. `enabled` is
/// passed in rather than derived so reconstruction can use the decision that
/// was snapshotted on the answer.
pub(crate) fn displayed_options(
    attempt: &Attempt,
    question_id: &str,
    options: Vec<QuestionOption>,
    enabled: bool,
) -> Result<Vec<QuestionOption>, AttemptError> {
    let base = resolve_base_order(options);
    let inputs = SeedInputs {
        version: seed_version(attempt)?,
        student_id: &attempt.student_id,
        question_id,
        attempt_id: &attempt.id,
    };
    Ok(shuffle::shuffle(&base, &inputs, enabled))
}

/// Display order of the exam's questions for this attempt.
pub(crate) fn order_questions(
    attempt: &Attempt,
    mut questions: Vec<Question>,
) -> Result<Vec<Question>, AttemptError> {
    questions.sort_by(|left, right| {
        left.order_index.cmp(&right.order_index).then_with(|| left.id.cmp(&right.id))
    });
    if !attempt.shuffle_questions || questions.len() < 2 {
        return Ok(questions);
    }

    let seed = shuffle::question_order_seed(
        seed_version(attempt)?,
        &attempt.student_id,
        &attempt.exam_id,
        &attempt.id,
    );
    let mut slots: Vec<Option<Question>> = questions.into_iter().map(Some).collect();
    Ok(shuffle::permutation(slots.len(), seed, true)
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect())
}

/// Renders the whole paper. Start and resume both come through here, so the
/// same attempt always yields the same paper.
pub(crate) fn build_paper(
    attempt: &Attempt,
    questions: Vec<Question>,
    mut options_by_question: HashMap<String, Vec<QuestionOption>>,
) -> Result<Vec<PaperQuestion>, AttemptError> {
    let ordered = order_questions(attempt, questions)?;
    let mut paper = Vec::with_capacity(ordered.len());

    for question in ordered {
        let options = options_by_question.remove(&question.id).unwrap_or_default();
        let enabled = option_shuffle_enabled(attempt.shuffle_options, &question);
        let displayed = displayed_options(attempt, &question.id, options, enabled)?;

        paper.push(PaperQuestion {
            options: displayed
                .into_iter()
                .map(|option| PaperOption { id: option.id, text: option.text })
                .collect(),
            id: question.id,
            text: question.text,
            question_type: question.question_type,
            marks: question.marks,
        });
    }

    Ok(paper)
}
