use std::cmp::Ordering;

use crate::db::models::QuestionOption;

/// Canonical "position 0..n-1" frame for a question's options: ascending by
/// `sequence`, ties broken by the stable option id. Storage order is ignored.
pub(crate) fn resolve_base_order(mut options: Vec<QuestionOption>) -> Vec<QuestionOption> {
    options.sort_by(compare_options);
    options
}

fn compare_options(left: &QuestionOption, right: &QuestionOption) -> Ordering {
    left.sequence.cmp(&right.sequence).then_with(|| left.id.cmp(&right.id))
}

#[cfg(test)]
mod tests {
    use super::resolve_base_order;
    use crate::db::models::QuestionOption;

    fn option(id: &str, sequence: i32) -> QuestionOption {
        QuestionOption {
            id: id.to_string(),
            question_id: "q-1".to_string(),
            text: format!("Option {id}"),
            sequence,
            is_correct: false,
        }
    }

    fn ids(options: &[QuestionOption]) -> Vec<&str> {
        options.iter().map(|option| option.id.as_str()).collect()
    }

    #[test]
    fn sorts_by_sequence() {
        let ordered = resolve_base_order(vec![option("c", 3), option("a", 1), option("b", 2)]);
        assert_eq!(ids(&ordered), vec!["a", "b", "c"]);
    }

    #[test]
    fn breaks_sequence_ties_by_id() {
        let ordered = resolve_base_order(vec![
            option("opt-9", 1),
            option("opt-2", 2),
            option("opt-1", 2),
            option("opt-0", 5),
        ]);
        assert_eq!(ids(&ordered), vec!["opt-9", "opt-1", "opt-2", "opt-0"]);
    }

    #[test]
    fn fetch_order_does_not_matter() {
        let first = resolve_base_order(vec![option("b", 1), option("a", 1), option("c", 0)]);
        let second = resolve_base_order(vec![option("a", 1), option("c", 0), option("b", 1)]);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_set_stays_empty() {
        assert!(resolve_base_order(Vec::new()).is_empty());
    }
}
