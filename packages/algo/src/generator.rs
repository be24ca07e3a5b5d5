//! Plan Generation
//!
//! Builds initial plans from the ranked items:
//! - Single lesson: 2 items through [`LESSON_TEMPLATE`]
//! - Unit test: weakest-first pool of 12 over [`UNIT_TEST_KINDS`], no back-to-back item
//! - Phased variants: the same selections split into motion and recognition phases
//!
//! Every generator is total for a non-empty item set and reports
//! [`SequencingError::NoItems`] instead of returning an empty plan.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{Result, SequencingError};
use crate::plan::{LessonPlan, PlanKind};
use crate::ranking::rank_weakest_first;
use crate::template::{
    Pick, SlotTemplate, LESSON_TEMPLATE, PHASED_LESSON_MOTION, PHASED_LESSON_RECOGNITION,
    PHASED_UNIT_MOTION_KINDS, PHASED_UNIT_RECOGNITION_KINDS, UNIT_TEST_KINDS,
};
use crate::types::{
    ExerciseSlot, MasteryMap, VocabularyItem, LESSON_ITEM_COUNT, MIN_APPEARANCES_PER_ITEM,
    UNIT_TEST_SLOT_COUNT,
};

/// Build the initial plan of the given kind
pub fn generate_plan(
    kind: PlanKind,
    items: &[VocabularyItem],
    mastery: &MasteryMap,
) -> Result<LessonPlan> {
    match kind {
        PlanKind::Lesson => generate_lesson_plan(items, mastery),
        PlanKind::UnitTest => generate_unit_test_plan(items, mastery),
        PlanKind::PhasedLesson => generate_phased_lesson_plan(items, mastery),
        PlanKind::PhasedUnitTest => generate_phased_unit_test_plan(items, mastery),
    }
}

// ==================== Single Lesson ====================

pub fn generate_lesson_plan(items: &[VocabularyItem], mastery: &MasteryMap) -> Result<LessonPlan> {
    let ranked = rank_lesson_items(items, mastery)?;
    let slots = resolve_template(&LESSON_TEMPLATE, &ranked);
    debug!(weakest = %ranked[0].id, other = %ranked[1].id, "generated lesson plan");
    Ok(LessonPlan::sequential(PlanKind::Lesson, ranked, slots))
}

pub fn generate_phased_lesson_plan(
    items: &[VocabularyItem],
    mastery: &MasteryMap,
) -> Result<LessonPlan> {
    let ranked = rank_lesson_items(items, mastery)?;
    let motion = resolve_template(&PHASED_LESSON_MOTION, &ranked);
    let recognition = resolve_template(&PHASED_LESSON_RECOGNITION, &ranked);
    debug!(weakest = %ranked[0].id, other = %ranked[1].id, "generated phased lesson plan");
    Ok(LessonPlan::phased(PlanKind::PhasedLesson, ranked, motion, recognition))
}

fn rank_lesson_items(items: &[VocabularyItem], mastery: &MasteryMap) -> Result<Vec<VocabularyItem>> {
    if items.is_empty() {
        return Err(SequencingError::NoItems);
    }
    if items.len() != LESSON_ITEM_COUNT {
        return Err(SequencingError::LessonItemCount {
            expected: LESSON_ITEM_COUNT,
            actual: items.len(),
        });
    }
    Ok(rank_weakest_first(items, mastery))
}

/// Resolve `(kind, pick)` pairs against `[weakest, other]`
fn resolve_template(template: &[SlotTemplate], ranked: &[VocabularyItem]) -> Vec<ExerciseSlot> {
    template
        .iter()
        .map(|entry| {
            let item = match entry.pick {
                Pick::Weakest => &ranked[0],
                Pick::Other => &ranked[1],
            };
            ExerciseSlot::new(entry.kind, item)
        })
        .collect()
}

// ==================== Unit Test ====================

/// Per-item appearance cap for a pool of `total` slots over `item_count` items
pub fn appearance_cap(item_count: usize, total: usize) -> usize {
    if item_count == 0 {
        return 0;
    }
    MIN_APPEARANCES_PER_ITEM.max(total.div_ceil(item_count))
}

/// Weakest-first pool: sweep the ranked list one appearance per item per pass
/// until `total` entries are collected or every item is capped.
pub fn build_unit_pool(ranked: &[VocabularyItem], total: usize) -> Vec<VocabularyItem> {
    let cap = appearance_cap(ranked.len(), total);
    let mut pool = Vec::with_capacity(total);
    let mut counts: HashMap<&str, usize> = HashMap::new();

    while pool.len() < total {
        let mut added = false;
        for item in ranked {
            if pool.len() >= total {
                break;
            }
            let count = counts.entry(item.id.as_str()).or_insert(0);
            if *count < cap {
                *count += 1;
                pool.push(item.clone());
                added = true;
            }
        }
        if !added {
            break;
        }
    }
    pool
}

pub fn generate_unit_test_plan(
    items: &[VocabularyItem],
    mastery: &MasteryMap,
) -> Result<LessonPlan> {
    if items.is_empty() {
        return Err(SequencingError::NoItems);
    }
    let ranked = rank_weakest_first(items, mastery);
    let mut available = build_unit_pool(&ranked, UNIT_TEST_SLOT_COUNT);
    let mut slots: Vec<ExerciseSlot> = Vec::with_capacity(UNIT_TEST_SLOT_COUNT);

    for kind in UNIT_TEST_KINDS {
        if available.is_empty() {
            break;
        }
        let previous = slots.last().map(|s| s.item_id().to_string());
        let pick = available
            .iter()
            .position(|item| Some(item.id.as_str()) != previous.as_deref())
            .unwrap_or(0);
        let item = available.remove(pick);
        slots.push(ExerciseSlot::new(kind, &item));
    }

    debug!(
        items = ranked.len(),
        cap = appearance_cap(ranked.len(), UNIT_TEST_SLOT_COUNT),
        slots = slots.len(),
        "generated unit test plan"
    );
    Ok(LessonPlan::sequential(PlanKind::UnitTest, ranked, slots))
}

pub fn generate_phased_unit_test_plan(
    items: &[VocabularyItem],
    mastery: &MasteryMap,
) -> Result<LessonPlan> {
    if items.is_empty() {
        return Err(SequencingError::NoItems);
    }
    let ranked = rank_weakest_first(items, mastery);
    let pool = build_unit_pool(&ranked, UNIT_TEST_SLOT_COUNT);
    let split = PHASED_UNIT_MOTION_KINDS.len().min(pool.len());
    let (motion_pool, recognition_pool) = pool.split_at(split);

    let motion = PHASED_UNIT_MOTION_KINDS
        .iter()
        .zip(motion_pool)
        .map(|(kind, item)| ExerciseSlot::new(*kind, item))
        .collect();
    let recognition = PHASED_UNIT_RECOGNITION_KINDS
        .iter()
        .zip(recognition_pool)
        .map(|(kind, item)| ExerciseSlot::new(*kind, item))
        .collect();

    debug!(items = ranked.len(), "generated phased unit test plan");
    Ok(LessonPlan::phased(
        PlanKind::PhasedUnitTest,
        ranked,
        motion,
        recognition,
    ))
}
