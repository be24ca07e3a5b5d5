//! Runtime Overrides
//!
//! After each completed slot the plan's [`OverrideRule`]s may rewrite a
//! not-yet-reached slot:
//! - `RetestFirstMiss`: a miss on the first recognize slot re-tests the item
//! - `ReviewAfterProduce`: the review slot goes to the weakest item of this attempt
//! - `RemediateAhead`: a unit-test miss is re-tested two positions later
//!
//! Rules only ever touch positions after the completed one, and each
//! returns a new plan rather than editing in place.

use tracing::debug;

use crate::plan::LessonPlan;
use crate::ranking::weakest;
use crate::template::OverrideRule;
use crate::types::{
    ExerciseKind, ExerciseSlot, MasteryMap, SessionResult, VocabularyItem,
    SESSION_STRONG_THRESHOLD,
};

/// Result of the just-completed slot, as seen by the override rules
#[derive(Clone, Copy, Debug)]
pub struct Completion<'a> {
    pub index: usize,
    pub slot: &'a ExerciseSlot,
    /// Only recognize slots carry a judgment
    pub correct: Option<bool>,
}

/// Run every rule of the plan's kind against one completion.
///
/// Returns the plan unchanged (and an empty list) when nothing fired.
pub fn apply_overrides(
    plan: &LessonPlan,
    completion: Completion<'_>,
    session: &SessionResult,
    mastery: &MasteryMap,
) -> (LessonPlan, Vec<usize>) {
    let mut current = plan.clone();
    let mut rewritten = Vec::new();

    for rule in plan.kind().override_rules() {
        let next = match *rule {
            OverrideRule::RetestFirstMiss { trigger, target } if completion.index == trigger => {
                retest_first_miss(&current, completion, target)
            }
            OverrideRule::ReviewAfterProduce {
                trigger,
                target,
                retest,
            } if completion.index == trigger => {
                Some(review_after_produce(&current, session, mastery, target, retest))
            }
            OverrideRule::RemediateAhead { offset } => {
                remediate_ahead(&current, completion, offset)
            }
            _ => None,
        };

        if let Some((next, target)) = next {
            if next != current {
                debug!(
                    rule = rule.name(),
                    completed = completion.index,
                    target,
                    "override rewrote slot"
                );
                rewritten.push(target);
                current = next;
            }
        }
    }

    (current, rewritten)
}

/// Slot-1 rule: re-test a missed item at `target`, or re-introduce it when
/// it already appears more than twice.
pub fn retest_first_miss(
    plan: &LessonPlan,
    completion: Completion<'_>,
    target: usize,
) -> Option<(LessonPlan, usize)> {
    if completion.slot.kind != ExerciseKind::Recognize || completion.correct != Some(false) {
        return None;
    }
    if target <= completion.index || target >= plan.len() {
        return None;
    }
    let missed = plan.item(completion.slot.item_id())?.clone();
    let kind = if plan.appearances(&missed.id) > 2 {
        ExerciseKind::Introduce
    } else {
        ExerciseKind::Recognize
    };

    let rewritten = plan.with_slot(target, ExerciseSlot::new(kind, &missed));
    Some((deconflict(&rewritten, target), target))
}

/// Slot-4 rule: choose the review item for `target` from this attempt's
/// recognize results. Items with fewer than two correct answers are still
/// weak; with none weak the default slot stays. `retest` is the position the
/// first-miss rule writes to.
pub fn review_after_produce(
    plan: &LessonPlan,
    session: &SessionResult,
    mastery: &MasteryMap,
    target: usize,
    retest: usize,
) -> (LessonPlan, usize) {
    let still_weak: Vec<VocabularyItem> = plan
        .items()
        .iter()
        .filter(|item| session.correct_count(&item.id) < SESSION_STRONG_THRESHOLD)
        .cloned()
        .collect();

    let mut updated = plan.clone();
    if let Some(focus) = weakest(&still_weak, mastery) {
        let appearances = plan.appearances(&focus.id);
        let retest_is_repeat = plan
            .slot(retest)
            .is_some_and(|s| s.item_id() == focus.id && s.kind == ExerciseKind::Recognize);

        if session.was_missed(&focus.id) && appearances <= 2 {
            updated = plan.with_slot(target, ExerciseSlot::new(ExerciseKind::Recognize, focus));
        } else if retest_is_repeat && appearances >= 3 {
            if let Some(other) = plan.other_item(&[focus.id.as_str()]) {
                updated = plan.with_slot(target, ExerciseSlot::new(ExerciseKind::Recognize, other));
            }
        }
    }

    (deconflict(&updated, target), target)
}

/// Unit-test rule: after a missed recognize at `i`, remediate at `i + offset`.
/// Recognize by default; introduce when the slot before the target is a recognize.
pub fn remediate_ahead(
    plan: &LessonPlan,
    completion: Completion<'_>,
    offset: usize,
) -> Option<(LessonPlan, usize)> {
    if completion.slot.kind != ExerciseKind::Recognize || completion.correct != Some(false) {
        return None;
    }
    let target = completion.index + offset;
    if offset == 0 || target >= plan.len() {
        return None;
    }
    let missed = plan.item(completion.slot.item_id())?;
    let preceding = plan.slot(target - 1)?;
    let kind = if preceding.kind == ExerciseKind::Recognize {
        ExerciseKind::Introduce
    } else {
        ExerciseKind::Recognize
    };

    Some((plan.with_slot(target, ExerciseSlot::new(kind, missed)), target))
}

/// Keep the slot at `index` from repeating its predecessor's kind.
///
/// First swap in an item that differs from both neighbours' items at the same
/// kind; if the kind still collides, flip recognize and produce. Introduce
/// slots are prerequisites and are never flipped.
pub fn deconflict(plan: &LessonPlan, index: usize) -> LessonPlan {
    if index == 0 {
        return plan.clone();
    }
    let (Some(prev), Some(curr)) = (plan.slot(index - 1), plan.slot(index)) else {
        return plan.clone();
    };
    if prev.kind != curr.kind {
        return plan.clone();
    }

    let mut candidate = curr.clone();
    if let Some(other) = plan.other_item(&[curr.item_id(), prev.item_id()]) {
        candidate = ExerciseSlot::new(curr.kind, other);
    }
    if candidate.kind == prev.kind {
        if let Some(flipped) = candidate.kind.flipped() {
            candidate.kind = flipped;
        }
    }
    plan.with_slot(index, candidate)
}
