//! Weakness Ranking
//!
//! Orders items weakest-first from the learner's mastery:
//! - Primary key: Laplace-smoothed recognition rate, ascending
//! - Tie-break 1: more recent miss first (larger `last_missed_slot`)
//! - Tie-break 2: longer since seen first (smaller `last_seen_slot`)
//!
//! `None` recency values order below any position, matching "never".
//! The sort is stable, so exact ties keep input order.

use std::cmp::Ordering;

use crate::types::{MasteryMap, VocabularyItem, WordStats};

/// Weakness score of one item; lower is weaker
pub fn weakness_score(mastery: &MasteryMap, item_id: &str) -> f64 {
    mastery
        .get(item_id)
        .map(WordStats::recognition_rate)
        .unwrap_or_else(|| WordStats::default().recognition_rate())
}

/// Compare two stats records, `Less` meaning `a` is weaker
pub fn compare_weakness(a: &WordStats, b: &WordStats) -> Ordering {
    a.recognition_rate()
        .total_cmp(&b.recognition_rate())
        .then_with(|| b.last_missed_slot.cmp(&a.last_missed_slot))
        .then_with(|| a.last_seen_slot.cmp(&b.last_seen_slot))
}

/// Return the items reordered weakest-first
pub fn rank_weakest_first(items: &[VocabularyItem], mastery: &MasteryMap) -> Vec<VocabularyItem> {
    let mut keyed: Vec<(WordStats, &VocabularyItem)> = items
        .iter()
        .map(|item| (mastery.stats(&item.id), item))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| compare_weakness(a, b));
    keyed.into_iter().map(|(_, item)| item.clone()).collect()
}

/// Weakest item of a non-empty set
pub fn weakest<'a>(items: &'a [VocabularyItem], mastery: &MasteryMap) -> Option<&'a VocabularyItem> {
    // min_by keeps the first of equal elements, same as the stable sort
    items
        .iter()
        .min_by(|a, b| compare_weakness(&mastery.stats(&a.id), &mastery.stats(&b.id)))
}
