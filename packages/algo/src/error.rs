use thiserror::Error;

use crate::types::ExerciseKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequencingError {
    #[error("cannot generate a plan from an empty item set")]
    NoItems,
    #[error("a single lesson needs exactly {expected} items, got {actual}")]
    LessonItemCount { expected: usize, actual: usize },
    #[error("all {0} slots of the plan are already completed")]
    PlanExhausted(usize),
    #[error("slot {index} is a {expected} exercise, outcome reported for {actual}")]
    OutcomeMismatch {
        index: usize,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("slot {0} is not part of the plan")]
    SlotOutOfRange(usize),
    #[error("slot {0} is not a produce exercise")]
    NotProduceSlot(usize),
    #[error("quality score {0} is outside 0..=4")]
    InvalidScore(u8),
}

impl SequencingError {
    pub(crate) fn mismatch(index: usize, expected: ExerciseKind, actual: ExerciseKind) -> Self {
        SequencingError::OutcomeMismatch {
            index,
            expected: expected.as_str(),
            actual: actual.as_str(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SequencingError>;
