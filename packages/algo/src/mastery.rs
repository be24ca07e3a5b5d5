//! Mastery Updater
//!
//! Folds one completed slot into the learner's [`MasteryMap`]:
//! - every kind: `last_seen_slot` = position
//! - introduce: `introduced` = true
//! - recognize: attempts + 1, then correct + 1 or `last_missed_slot` = position
//! - produce: nothing else; its grade arrives asynchronously and is not a mastery signal

use crate::types::{ExerciseKind, ExerciseSlot, MasteryMap};

/// Return a new map with the completed slot folded in.
///
/// `correct` is only read for recognize slots; a recognize slot reported
/// without a judgment counts as a miss.
pub fn update_mastery(
    mastery: &MasteryMap,
    slot: &ExerciseSlot,
    position: usize,
    correct: Option<bool>,
) -> MasteryMap {
    let mut stats = mastery.stats(slot.item_id());
    stats.last_seen_slot = Some(position);

    match slot.kind {
        ExerciseKind::Introduce => {
            stats.introduced = true;
        }
        ExerciseKind::Recognize => {
            stats.recognition_attempts += 1;
            if correct == Some(true) {
                stats.recognition_correct += 1;
            } else {
                stats.last_missed_slot = Some(position);
            }
        }
        ExerciseKind::Produce => {}
    }

    mastery.with_stats(slot.item_id(), stats)
}
