//! Lesson Plans
//!
//! A plan is either one ordered slot sequence or, in phased mode, a motion
//! phase followed by a recognition phase. Positions are numbered across the
//! whole plan (motion slots first), which is how asynchronous grades and
//! recency statistics refer back to a slot.

use serde::{Deserialize, Serialize};

use crate::template::{OverrideRule, LESSON_RULES, UNIT_TEST_RULES};
use crate::types::{ExerciseSlot, VocabularyItem};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlanKind {
    Lesson,
    UnitTest,
    PhasedLesson,
    PhasedUnitTest,
}

impl PlanKind {
    pub fn is_phased(&self) -> bool {
        matches!(self, PlanKind::PhasedLesson | PlanKind::PhasedUnitTest)
    }

    /// Runtime rewrites attached to plans of this kind
    pub fn override_rules(&self) -> &'static [OverrideRule] {
        match self {
            PlanKind::Lesson => &LESSON_RULES,
            PlanKind::UnitTest => &UNIT_TEST_RULES,
            PlanKind::PhasedLesson | PlanKind::PhasedUnitTest => &[],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Motion,
    Recognition,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "camelCase")]
pub enum SlotLayout {
    Sequential {
        slots: Vec<ExerciseSlot>,
    },
    Phased {
        motion: Vec<ExerciseSlot>,
        recognition: Vec<ExerciseSlot>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlan {
    kind: PlanKind,
    /// Items the plan was built from, weakest-first at generation time
    items: Vec<VocabularyItem>,
    #[serde(flatten)]
    layout: SlotLayout,
}

impl LessonPlan {
    pub(crate) fn sequential(
        kind: PlanKind,
        items: Vec<VocabularyItem>,
        slots: Vec<ExerciseSlot>,
    ) -> Self {
        Self {
            kind,
            items,
            layout: SlotLayout::Sequential { slots },
        }
    }

    pub(crate) fn phased(
        kind: PlanKind,
        items: Vec<VocabularyItem>,
        motion: Vec<ExerciseSlot>,
        recognition: Vec<ExerciseSlot>,
    ) -> Self {
        Self {
            kind,
            items,
            layout: SlotLayout::Phased {
                motion,
                recognition,
            },
        }
    }

    pub fn kind(&self) -> PlanKind {
        self.kind
    }

    pub fn items(&self) -> &[VocabularyItem] {
        &self.items
    }

    pub fn layout(&self) -> &SlotLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        match &self.layout {
            SlotLayout::Sequential { slots } => slots.len(),
            SlotLayout::Phased {
                motion,
                recognition,
            } => motion.len() + recognition.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot at a plan-wide position
    pub fn slot(&self, index: usize) -> Option<&ExerciseSlot> {
        match &self.layout {
            SlotLayout::Sequential { slots } => slots.get(index),
            SlotLayout::Phased {
                motion,
                recognition,
            } => {
                if index < motion.len() {
                    motion.get(index)
                } else {
                    recognition.get(index - motion.len())
                }
            }
        }
    }

    /// Phase of a position; `None` for sequential plans or out of range
    pub fn phase_of(&self, index: usize) -> Option<Phase> {
        match &self.layout {
            SlotLayout::Sequential { .. } => None,
            SlotLayout::Phased {
                motion,
                recognition,
            } => {
                if index < motion.len() {
                    Some(Phase::Motion)
                } else if index < motion.len() + recognition.len() {
                    Some(Phase::Recognition)
                } else {
                    None
                }
            }
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = &ExerciseSlot> + '_> {
        match &self.layout {
            SlotLayout::Sequential { slots } => Box::new(slots.iter()),
            SlotLayout::Phased {
                motion,
                recognition,
            } => Box::new(motion.iter().chain(recognition.iter())),
        }
    }

    /// How many slots of the plan use this item
    pub fn appearances(&self, item_id: &str) -> usize {
        self.iter().filter(|s| s.item_id() == item_id).count()
    }

    pub fn item(&self, item_id: &str) -> Option<&VocabularyItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// First plan item that is none of `excluded`
    pub fn other_item(&self, excluded: &[&str]) -> Option<&VocabularyItem> {
        self.items
            .iter()
            .find(|i| !excluded.contains(&i.id.as_str()))
    }

    /// New plan with the slot at `index` replaced; out-of-range positions leave it unchanged
    pub fn with_slot(&self, index: usize, slot: ExerciseSlot) -> Self {
        let mut next = self.clone();
        let target = match &mut next.layout {
            SlotLayout::Sequential { slots } => slots.get_mut(index),
            SlotLayout::Phased {
                motion,
                recognition,
            } => {
                let motion_len = motion.len();
                if index < motion_len {
                    motion.get_mut(index)
                } else {
                    recognition.get_mut(index - motion_len)
                }
            }
        };
        if let Some(existing) = target {
            *existing = slot;
        }
        next
    }
}
