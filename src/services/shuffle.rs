//! Deterministic shuffle engine.
//!
//! Option order shown to a student is never stored, so it must be
//! recomputable forever from the seed inputs alone. `StdRng`, `gen_range` and
//! slice shuffling may change between `rand` releases, so only value-stable
//! pieces are used:
//!
//! * seeding: SHA-256 over a canonical, versioned string, first 8 bytes
//!   little-endian;
//! * stream: `ChaCha8Rng::seed_from_u64`;
//! * permutation: Fisher–Yates from the last index down, with rejection
//!   sampling over `next_u64` for an unbiased bound.
//!
//! Any change to these rules needs a new [`SeedVersion`]; attempts record the
//! version they were started with.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

/// Versions of the seeding rules. Stored on every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SeedVersion {
    V1,
}

pub(crate) const CURRENT_SEED_VERSION: SeedVersion = SeedVersion::V1;

impl SeedVersion {
    pub(crate) fn as_i16(self) -> i16 {
        match self {
            Self::V1 => 1,
        }
    }

    pub(crate) fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(Self::V1),
            _ => None,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Self::V1 => "v1",
        }
    }
}

/// The tuple that parameterizes one question's option order within one attempt.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SeedInputs<'a> {
    pub(crate) version: SeedVersion,
    pub(crate) student_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) attempt_id: &'a str,
}

impl SeedInputs<'_> {
    pub(crate) fn canonical(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.version.tag(),
            self.student_id,
            self.question_id,
            self.attempt_id
        )
    }

    pub(crate) fn seed(&self) -> u64 {
        seed_from_canonical(&self.canonical())
    }

    /// Short hex digest for logs; identifies the seed without leaking ids.
    pub(crate) fn fingerprint(&self) -> String {
        hex::encode(&Sha256::digest(self.canonical().as_bytes())[..6])
    }
}

/// Seed for the exam-level question order of one attempt. Lives in its own
/// namespace so it can never collide with an option seed.
pub(crate) fn question_order_seed(
    version: SeedVersion,
    student_id: &str,
    exam_id: &str,
    attempt_id: &str,
) -> u64 {
    seed_from_canonical(&format!("{}|questions|{student_id}|{exam_id}|{attempt_id}", version.tag()))
}

fn seed_from_canonical(canonical: &str) -> u64 {
    let digest = Sha256::digest(canonical.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Uniform value in `0..bound`. `bound` must be non-zero.
fn below(rng: &mut ChaCha8Rng, bound: u64) -> u64 {
    let threshold = bound.wrapping_neg() % bound;
    loop {
        let value = rng.next_u64();
        if value >= threshold {
            return value % bound;
        }
    }
}

fn fisher_yates<T>(items: &mut [T], seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for i in (1..items.len()).rev() {
        let j = below(&mut rng, i as u64 + 1) as usize;
        items.swap(i, j);
    }
}

/// Index permutation of `0..len` for `seed`; identity when `enabled` is false.
pub(crate) fn permutation(len: usize, seed: u64, enabled: bool) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..len).collect();
    if enabled {
        fisher_yates(&mut indices, seed);
    }
    indices
}

/// Reorders `base` for one student, question and attempt. Pure: the output
/// depends only on `base`, `inputs` and `enabled`.
pub(crate) fn shuffle<T: Clone>(base: &[T], inputs: &SeedInputs<'_>, enabled: bool) -> Vec<T> {
    if !enabled || base.len() < 2 {
        return base.to_vec();
    }

    permutation(base.len(), inputs.seed(), true)
        .into_iter()
        .map(|index| base[index].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn inputs<'a>(student: &'a str, question: &'a str, attempt: &'a str) -> SeedInputs<'a> {
        SeedInputs {
            version: SeedVersion::V1,
            student_id: student,
            question_id: question,
            attempt_id: attempt,
        }
    }

    fn letters() -> Vec<&'static str> {
        vec!["A", "B", "C", "D", "E", "F"]
    }

    #[test]
    fn canonical_string_is_versioned_and_delimited() {
        let seed_inputs = inputs("stu-1", "q-7", "att-3");
        assert_eq!(seed_inputs.canonical(), "v1|stu-1|q-7|att-3");
    }

    #[test]
    fn delimiter_prevents_concatenation_collisions() {
        assert_ne!(inputs("ab", "c", "x").seed(), inputs("a", "bc", "x").seed());
    }

    #[test]
    fn seeding_function_is_pinned() {
        assert_eq!(inputs("stu-1", "q-7", "att-3").seed(), 0x9b25_2eea_2eb9_585e);
    }

    #[test]
    fn permutation_is_pinned() {
        assert_eq!(permutation(6, 42, true), vec![4, 5, 1, 0, 2, 3]);
        assert_eq!(
            shuffle(&letters(), &inputs("stu-1", "q-7", "att-3"), true),
            vec!["F", "E", "C", "A", "B", "D"]
        );
    }

    #[test]
    fn same_inputs_give_same_order() {
        let seed_inputs = inputs("student-a", "question-b", "attempt-c");
        let first = shuffle(&letters(), &seed_inputs, true);
        let second = shuffle(&letters(), &seed_inputs, true);
        assert_eq!(first, second);
    }

    #[test]
    fn output_is_a_permutation_of_input() {
        let base: Vec<String> = (0..25).map(|index| format!("opt-{index}")).collect();
        for attempt in 0..50 {
            let attempt_id = format!("attempt-{attempt}");
            let shuffled = shuffle(&base, &inputs("student", "question", &attempt_id), true);

            assert_eq!(shuffled.len(), base.len());
            let unique: HashSet<&String> = shuffled.iter().collect();
            assert_eq!(unique.len(), base.len());
            assert!(base.iter().all(|item| unique.contains(item)));
        }
    }

    #[test]
    fn disabled_shuffle_is_identity() {
        let seed_inputs = inputs("student-a", "question-b", "attempt-c");
        assert_eq!(shuffle(&letters(), &seed_inputs, false), letters());
        assert_eq!(permutation(4, 99, false), vec![0, 1, 2, 3]);
    }

    #[test]
    fn trivial_sets_shuffle_to_themselves() {
        let seed_inputs = inputs("student-a", "question-b", "attempt-c");
        assert_eq!(shuffle(&["only"], &seed_inputs, true), vec!["only"]);
        assert!(shuffle::<&str>(&[], &seed_inputs, true).is_empty());
        assert!(permutation(0, 7, true).is_empty());
    }

    #[test]
    fn different_attempts_usually_reorder() {
        let orders: HashSet<Vec<&str>> = (0..20)
            .map(|attempt| {
                let attempt_id = format!("attempt-{attempt}");
                shuffle(&letters(), &inputs("student", "question", &attempt_id), true)
            })
            .collect();
        assert!(orders.len() > 1);
    }

    #[test]
    fn question_order_seed_has_its_own_namespace() {
        let option_seed = inputs("s", "e", "a").seed();
        assert_ne!(question_order_seed(SeedVersion::V1, "s", "e", "a"), option_seed);
    }

    #[test]
    fn seed_version_round_trips_through_storage() {
        assert_eq!(SeedVersion::from_i16(CURRENT_SEED_VERSION.as_i16()), Some(SeedVersion::V1));
        assert_eq!(SeedVersion::from_i16(0), None);
        assert_eq!(SeedVersion::from_i16(2), None);
    }

    #[test]
    fn fingerprint_is_short_hex() {
        let fingerprint = inputs("s", "q", "a").fingerprint();
        assert_eq!(fingerprint.len(), 12);
        assert!(fingerprint.chars().all(|ch| ch.is_ascii_hexdigit()));
    }
}
