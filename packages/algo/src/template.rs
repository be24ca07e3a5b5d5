//! Plan Templates
//!
//! The fixed exercise sequences are plain data: a lesson template is a list
//! of `(kind, pick)` pairs resolved against the ranked items, a unit-test
//! template is a list of kinds filled from the weakest-first pool. Runtime
//! behaviour is attached through named [`OverrideRule`]s so a new template
//! only needs a new table, not new override logic.

use serde::{Deserialize, Serialize};

use crate::types::ExerciseKind::{self, Introduce, Produce, Recognize};

// ==================== Slot Templates ====================

/// Which of the two ranked lesson items a template slot uses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Pick {
    Weakest,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotTemplate {
    pub kind: ExerciseKind,
    pub pick: Pick,
}

const fn slot(kind: ExerciseKind, pick: Pick) -> SlotTemplate {
    SlotTemplate { kind, pick }
}

/// Interleaved single lesson. Slots 3 and 5 may be rewritten at runtime.
pub const LESSON_TEMPLATE: [SlotTemplate; 6] = [
    slot(Introduce, Pick::Weakest),
    slot(Recognize, Pick::Weakest),
    slot(Introduce, Pick::Other),
    slot(Recognize, Pick::Other),
    slot(Produce, Pick::Weakest),
    slot(Recognize, Pick::Other),
];

pub const PHASED_LESSON_MOTION: [SlotTemplate; 3] = [
    slot(Introduce, Pick::Weakest),
    slot(Introduce, Pick::Other),
    slot(Produce, Pick::Weakest),
];

pub const PHASED_LESSON_RECOGNITION: [SlotTemplate; 3] = [
    slot(Recognize, Pick::Weakest),
    slot(Recognize, Pick::Other),
    slot(Recognize, Pick::Other),
];

/// 2 introduce, 4 recognize, 4 produce; alternating, ends on produce
pub const UNIT_TEST_KINDS: [ExerciseKind; 12] = [
    Recognize, Produce, Introduce, Recognize, Produce, Recognize,
    Produce, Introduce, Recognize, Produce, Recognize, Produce,
];

pub const PHASED_UNIT_MOTION_KINDS: [ExerciseKind; 6] =
    [Introduce, Produce, Produce, Introduce, Produce, Produce];

pub const PHASED_UNIT_RECOGNITION_KINDS: [ExerciseKind; 6] = [Recognize; 6];

// ==================== Override Rules ====================

/// Named runtime rewrite of a not-yet-reached slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "camelCase")]
pub enum OverrideRule {
    /// After the first recognize slot: re-test a miss at `target`
    RetestFirstMiss { trigger: usize, target: usize },
    /// After the produce slot: pick the review item for `target` from session
    /// results; `retest` is where `RetestFirstMiss` writes
    ReviewAfterProduce {
        trigger: usize,
        target: usize,
        retest: usize,
    },
    /// After any missed recognize slot: remediate `offset` positions ahead
    RemediateAhead { offset: usize },
}

impl OverrideRule {
    pub fn name(&self) -> &'static str {
        match self {
            OverrideRule::RetestFirstMiss { .. } => "retest_first_miss",
            OverrideRule::ReviewAfterProduce { .. } => "review_after_produce",
            OverrideRule::RemediateAhead { .. } => "remediate_ahead",
        }
    }
}

pub const LESSON_RULES: [OverrideRule; 2] = [
    OverrideRule::RetestFirstMiss { trigger: 1, target: 3 },
    OverrideRule::ReviewAfterProduce {
        trigger: 4,
        target: 5,
        retest: 3,
    },
];

pub const UNIT_TEST_RULES: [OverrideRule; 1] = [OverrideRule::RemediateAhead { offset: 2 }];
