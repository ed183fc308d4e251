use std::collections::HashMap;

use crate::db::models::{Attempt, AttemptAnswer, Question, QuestionOption};
use crate::schemas::review::ReviewStatus;
use crate::services::attempt_error::AttemptError;
use crate::services::attempt_paper::order_questions;
use crate::services::reconstruction::{resolve_answer, Reconstruction, Resolution};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QuestionOutcome {
    pub(crate) question_id: String,
    pub(crate) status: ReviewStatus,
    /// `None` whenever correctness is unknown: unattempted, unresolvable or
    /// awaiting manual grading.
    pub(crate) is_correct: Option<bool>,
    pub(crate) marks_obtained: Option<f64>,
}

pub(crate) fn outcome_for(question: &Question, resolution: &Resolution) -> QuestionOutcome {
    let (status, is_correct, marks_obtained) = match resolution {
        Resolution::Chosen { is_correct: true, .. } => {
            (ReviewStatus::Correct, Some(true), Some(question.marks))
        }
        Resolution::Chosen { is_correct: false, .. } => {
            (ReviewStatus::Incorrect, Some(false), Some(0.0))
        }
        Resolution::Unattempted => (ReviewStatus::Unattempted, None, Some(0.0)),
        Resolution::Unresolvable { .. } => (ReviewStatus::Unresolvable, None, None),
        Resolution::Pending { .. } => (ReviewStatus::Pending, None, None),
    };

    QuestionOutcome { question_id: question.id.clone(), status, is_correct, marks_obtained }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ScoreSummary {
    pub(crate) total_marks: f64,
    pub(crate) marks_obtained: f64,
    pub(crate) correct_count: i32,
    pub(crate) incorrect_count: i32,
    pub(crate) unattempted_count: i32,
    pub(crate) unresolvable_count: i32,
    pub(crate) pending_count: i32,
}

impl ScoreSummary {
    pub(crate) fn add(&mut self, question_marks: f64, outcome: &QuestionOutcome) {
        self.total_marks += question_marks;
        self.marks_obtained += outcome.marks_obtained.unwrap_or(0.0);
        match outcome.status {
            ReviewStatus::Correct => self.correct_count += 1,
            ReviewStatus::Incorrect => self.incorrect_count += 1,
            ReviewStatus::Unattempted => self.unattempted_count += 1,
            ReviewStatus::Unresolvable => self.unresolvable_count += 1,
            ReviewStatus::Pending => self.pending_count += 1,
        }
    }

    /// Free-response answers keep the attempt in `submitted` until graded.
    pub(crate) fn needs_manual_grading(&self) -> bool {
        self.pending_count > 0
    }
}

/// One question of a finished attempt with everything grading and review need.
#[derive(Debug, Clone)]
pub(crate) struct GradedQuestion {
    pub(crate) question: Question,
    pub(crate) answer: Option<AttemptAnswer>,
    pub(crate) reconstruction: Reconstruction,
    pub(crate) outcome: QuestionOutcome,
}

/// Grades every question of the attempt's paper, in the order it was shown.
/// Pure, so submission and later reviews always agree.
pub(crate) fn grade_paper(
    attempt: &Attempt,
    questions: Vec<Question>,
    mut options_by_question: HashMap<String, Vec<QuestionOption>>,
    answers: Vec<AttemptAnswer>,
) -> Result<(Vec<GradedQuestion>, ScoreSummary), AttemptError> {
    let mut answers_by_question: HashMap<String, AttemptAnswer> =
        answers.into_iter().map(|answer| (answer.question_id.clone(), answer)).collect();

    let mut summary = ScoreSummary::default();
    let mut graded = Vec::new();
    for question in order_questions(attempt, questions)? {
        let options = options_by_question.remove(&question.id).unwrap_or_default();
        let answer = answers_by_question.remove(&question.id);
        let reconstruction = resolve_answer(attempt, &question, options, answer.as_ref())?;
        let outcome = outcome_for(&question, &reconstruction.resolution);

        summary.add(question.marks, &outcome);
        graded.push(GradedQuestion { question, answer, reconstruction, outcome });
    }

    Ok((graded, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::QuestionType;
    use crate::test_support::{sample_option, sample_question};

    fn chosen(is_correct: bool) -> Resolution {
        Resolution::Chosen { option: sample_option("o-1", "q-1", 0, is_correct), is_correct }
    }

    #[test]
    fn correct_choice_earns_full_marks() {
        let question = sample_question("q-1", 0, QuestionType::SingleChoice, true);
        let outcome = outcome_for(&question, &chosen(true));
        assert_eq!(outcome.status, ReviewStatus::Correct);
        assert_eq!(outcome.is_correct, Some(true));
        assert_eq!(outcome.marks_obtained, Some(question.marks));
    }

    #[test]
    fn unresolvable_is_neither_right_nor_wrong() {
        let question = sample_question("q-1", 0, QuestionType::SingleChoice, true);
        let outcome =
            outcome_for(&question, &Resolution::Unresolvable { position: 9, option_count: 4 });
        assert_eq!(outcome.status, ReviewStatus::Unresolvable);
        assert_eq!(outcome.is_correct, None);
        assert_eq!(outcome.marks_obtained, None);
    }

    #[test]
    fn summary_tallies_every_status() {
        let question = sample_question("q-1", 0, QuestionType::SingleChoice, true);
        let resolutions = [
            chosen(true),
            chosen(true),
            chosen(false),
            Resolution::Unattempted,
            Resolution::Unresolvable { position: 7, option_count: 3 },
            Resolution::Pending { text: "essay".to_string() },
        ];

        let mut summary = ScoreSummary::default();
        for resolution in &resolutions {
            summary.add(question.marks, &outcome_for(&question, resolution));
        }

        assert_eq!(summary.total_marks, question.marks * 6.0);
        assert_eq!(summary.marks_obtained, question.marks * 2.0);
        assert_eq!(summary.correct_count, 2);
        assert_eq!(summary.incorrect_count, 1);
        assert_eq!(summary.unattempted_count, 1);
        assert_eq!(summary.unresolvable_count, 1);
        assert_eq!(summary.pending_count, 1);
        assert!(summary.needs_manual_grading());
    }

    #[test]
    fn all_choice_papers_are_fully_graded() {
        let question = sample_question("q-1", 0, QuestionType::TrueFalse, true);
        let mut summary = ScoreSummary::default();
        summary.add(question.marks, &outcome_for(&question, &chosen(false)));
        assert!(!summary.needs_manual_grading());
    }

    #[test]
    fn grading_a_paper_matches_the_rendered_positions() {
        use crate::services::attempt_paper::build_paper;
        use crate::test_support::{sample_answer, sample_attempt};

        let attempt = sample_attempt("att-9", "student-4", true, false);
        let questions = vec![
            sample_question("q-1", 0, QuestionType::SingleChoice, true),
            sample_question("q-2", 1, QuestionType::SingleChoice, true),
            sample_question("q-3", 2, QuestionType::Essay, true),
        ];
        let options: HashMap<String, Vec<QuestionOption>> = ["q-1", "q-2"]
            .into_iter()
            .map(|question_id| {
                let options = (0..4)
                    .map(|index| {
                        let id = format!("{question_id}-o{index}");
                        sample_option(&id, question_id, index, index == 2)
                    })
                    .collect();
                (question_id.to_string(), options)
            })
            .collect();

        let paper = build_paper(&attempt, questions.clone(), options.clone()).expect("paper");
        let correct_position = |question_id: &str| {
            paper
                .iter()
                .find(|question| question.id == question_id)
                .and_then(|question| {
                    question.options.iter().position(|option| option.id.ends_with("-o2"))
                })
                .expect("correct option rendered") as i32
        };
        let answers = vec![
            sample_answer(&attempt.id, "q-1", Some(correct_position("q-1")), None, true),
            sample_answer(&attempt.id, "q-2", Some((correct_position("q-2") + 1) % 4), None, true),
            sample_answer(&attempt.id, "q-3", None, Some("An essay"), false),
        ];

        let (graded, summary) = grade_paper(&attempt, questions, options, answers).expect("grade");
        let statuses: Vec<ReviewStatus> = graded.iter().map(|item| item.outcome.status).collect();
        assert_eq!(
            statuses,
            vec![ReviewStatus::Correct, ReviewStatus::Incorrect, ReviewStatus::Pending]
        );
        assert_eq!(summary.correct_count, 1);
        assert_eq!(summary.incorrect_count, 1);
        assert_eq!(summary.pending_count, 1);
        assert!(summary.needs_manual_grading());
    }
}
