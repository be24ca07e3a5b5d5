//! Common Types and Constants
//!
//! Shared data structures used across the sequencing modules: curriculum
//! items, exercise slots, per-learner mastery statistics and the transient
//! per-attempt recognition log.

use im::OrdMap;
use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Number of slots in a single-lesson plan
pub const LESSON_SLOT_COUNT: usize = 6;

/// Number of items a single lesson is built from
pub const LESSON_ITEM_COUNT: usize = 2;

/// Number of slots in a unit-test plan
pub const UNIT_TEST_SLOT_COUNT: usize = 12;

/// Minimum per-item appearance cap when pooling unit-test items
pub const MIN_APPEARANCES_PER_ITEM: usize = 2;

/// Correct recognize answers within one attempt before an item stops being "still weak"
pub const SESSION_STRONG_THRESHOLD: u32 = 2;

// ==================== Curriculum ====================

/// One vocabulary entry of the curriculum. Immutable content supplied by the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
    /// Word or phrase, also the mastery key
    pub id: String,
    /// Reference demonstration media
    pub media_path: String,
    pub correct_answer: String,
    #[serde(default)]
    pub distractors: Vec<String>,
}

impl VocabularyItem {
    pub fn new(
        id: impl Into<String>,
        media_path: impl Into<String>,
        correct_answer: impl Into<String>,
        distractors: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            media_path: media_path.into(),
            correct_answer: correct_answer.into(),
            distractors,
        }
    }
}

// ==================== Exercises ====================

/// Exercise kind of a slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseKind {
    /// Watch the reference demonstration
    Introduce,
    /// Multiple-choice identification, graded synchronously
    Recognize,
    /// Perform the sign and submit it for asynchronous grading
    Produce,
}

impl ExerciseKind {
    /// Motion-capture exercises (introduce, produce) versus recognition
    pub fn is_motion(&self) -> bool {
        matches!(self, ExerciseKind::Introduce | ExerciseKind::Produce)
    }

    /// Recognize and produce swap with each other; introduce is a prerequisite and never flips.
    pub fn flipped(&self) -> Option<Self> {
        match self {
            ExerciseKind::Recognize => Some(ExerciseKind::Produce),
            ExerciseKind::Produce => Some(ExerciseKind::Recognize),
            ExerciseKind::Introduce => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseKind::Introduce => "introduce",
            ExerciseKind::Recognize => "recognize",
            ExerciseKind::Produce => "produce",
        }
    }
}

/// One scheduled exercise instance within a plan
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseSlot {
    pub kind: ExerciseKind,
    pub item: VocabularyItem,
}

impl ExerciseSlot {
    pub fn new(kind: ExerciseKind, item: &VocabularyItem) -> Self {
        Self {
            kind,
            item: item.clone(),
        }
    }

    pub fn item_id(&self) -> &str {
        &self.item.id
    }

    pub fn correct_answer(&self) -> &str {
        &self.item.correct_answer
    }

    pub fn distractors(&self) -> &[String] {
        &self.item.distractors
    }
}

/// What the presentation layer reports when a slot is completed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SlotOutcome {
    /// Introduce slot watched
    Viewed,
    /// Recognize slot answered
    Answered { correct: bool },
    /// Produce slot recorded and handed to the grader
    Submitted,
}

impl SlotOutcome {
    /// Exercise kind this outcome can complete
    pub fn kind(&self) -> ExerciseKind {
        match self {
            SlotOutcome::Viewed => ExerciseKind::Introduce,
            SlotOutcome::Answered { .. } => ExerciseKind::Recognize,
            SlotOutcome::Submitted => ExerciseKind::Produce,
        }
    }

    pub fn correctness(&self) -> Option<bool> {
        match self {
            SlotOutcome::Answered { correct } => Some(*correct),
            _ => None,
        }
    }
}

// ==================== Mastery ====================

/// Per-learner, per-item performance statistics.
///
/// `last_missed_slot` and `last_seen_slot` are positions within whichever
/// plan last touched them; `None` means never.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordStats {
    pub introduced: bool,
    pub recognition_correct: u32,
    pub recognition_attempts: u32,
    pub last_missed_slot: Option<usize>,
    pub last_seen_slot: Option<usize>,
}

impl WordStats {
    /// Laplace-smoothed recognition rate, 0.5 for an unseen item
    pub fn recognition_rate(&self) -> f64 {
        (self.recognition_correct as f64 + 1.0) / (self.recognition_attempts as f64 + 2.0)
    }
}

/// Item id -> [`WordStats`] for one learner.
///
/// Backed by a persistent map so every update returns a new value sharing
/// structure with the previous one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MasteryMap {
    entries: OrdMap<String, WordStats>,
}

impl MasteryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, item_id: &str) -> Option<&WordStats> {
        self.entries.get(item_id)
    }

    /// Stats for an item, defaulting when the learner has never met it
    pub fn stats(&self, item_id: &str) -> WordStats {
        self.entries.get(item_id).cloned().unwrap_or_default()
    }

    /// New map with `item_id` set to `stats`
    pub fn with_stats(&self, item_id: &str, stats: WordStats) -> Self {
        Self {
            entries: self.entries.update(item_id.to_string(), stats),
        }
    }

    /// New map where every item has an entry, creating defaults lazily
    pub fn with_items<'a>(&self, items: impl IntoIterator<Item = &'a VocabularyItem>) -> Self {
        let mut entries = self.entries.clone();
        for item in items {
            if !entries.contains_key(&item.id) {
                entries.insert(item.id.clone(), WordStats::default());
            }
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &WordStats)> {
        self.entries.iter()
    }
}

impl FromIterator<(String, WordStats)> for MasteryMap {
    fn from_iter<T: IntoIterator<Item = (String, WordStats)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// ==================== Session ====================

/// One recognize answer given during the current attempt
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    pub item_id: String,
    pub slot_index: usize,
    pub was_correct: bool,
}

/// Recognize results of the current attempt, discarded when it ends
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionResult {
    results: Vec<RecognitionResult>,
}

impl SessionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// New log with one more result appended
    pub fn with_result(&self, item_id: &str, slot_index: usize, was_correct: bool) -> Self {
        let mut results = self.results.clone();
        results.push(RecognitionResult {
            item_id: item_id.to_string(),
            slot_index,
            was_correct,
        });
        Self { results }
    }

    pub fn correct_count(&self, item_id: &str) -> u32 {
        self.results
            .iter()
            .filter(|r| r.item_id == item_id && r.was_correct)
            .count() as u32
    }

    pub fn was_missed(&self, item_id: &str) -> bool {
        self.results
            .iter()
            .any(|r| r.item_id == item_id && !r.was_correct)
    }

    pub fn at_slot(&self, slot_index: usize) -> Option<&RecognitionResult> {
        self.results.iter().find(|r| r.slot_index == slot_index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecognitionResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
