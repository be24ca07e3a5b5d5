//! Produce-Slot Grades
//!
//! Produce exercises are graded by an external service on a 0–4 scale.
//! Grades arrive asynchronously, in any order, and are matched back to their
//! slot purely by plan position. Until then the slot is pending; a failed
//! grading call is recorded as errored and never counts as a pass.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SequencingError};

/// Lowest score that passes
pub const PASS_THRESHOLD: u8 = 3;

/// Highest score the grader can award
pub const MAX_QUALITY: u8 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct QualityScore(u8);

impl QualityScore {
    pub fn new(score: u8) -> Result<Self> {
        if score > MAX_QUALITY {
            return Err(SequencingError::InvalidScore(score));
        }
        Ok(Self(score))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn passes(&self) -> bool {
        self.0 >= PASS_THRESHOLD
    }
}

impl TryFrom<u8> for QualityScore {
    type Error = SequencingError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<QualityScore> for u8 {
    fn from(score: QualityScore) -> Self {
        score.0
    }
}

/// Resolution state of one produce slot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ProduceGrade {
    Pending,
    Graded { score: QualityScore },
    Errored { message: String },
}

impl ProduceGrade {
    pub fn graded(score: QualityScore) -> Self {
        ProduceGrade::Graded { score }
    }

    pub fn errored(message: impl Into<String>) -> Self {
        ProduceGrade::Errored {
            message: message.into(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ProduceGrade::Pending)
    }

    /// `None` while pending; errored counts as failed
    pub fn passed(&self) -> Option<bool> {
        match self {
            ProduceGrade::Pending => None,
            ProduceGrade::Graded { score } => Some(score.passes()),
            ProduceGrade::Errored { .. } => Some(false),
        }
    }
}

/// Grades of the produce slots of one attempt, keyed by plan position
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradeBook {
    grades: BTreeMap<usize, ProduceGrade>,
}

impl GradeBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a submitted slot as awaiting its grade; an earlier resolution is kept
    pub fn with_pending(&self, position: usize) -> Self {
        let mut grades = self.grades.clone();
        grades.entry(position).or_insert(ProduceGrade::Pending);
        Self { grades }
    }

    /// Record a resolution; a later resolution for the same slot replaces it
    pub fn with_grade(&self, position: usize, grade: ProduceGrade) -> Self {
        let mut grades = self.grades.clone();
        grades.insert(position, grade);
        Self { grades }
    }

    pub fn get(&self, position: usize) -> Option<&ProduceGrade> {
        self.grades.get(&position)
    }

    pub fn pending(&self) -> impl Iterator<Item = usize> + '_ {
        self.grades
            .iter()
            .filter(|(_, grade)| grade.is_pending())
            .map(|(position, _)| *position)
    }

    pub fn pending_count(&self) -> usize {
        self.pending().count()
    }

    pub fn is_settled(&self) -> bool {
        self.pending_count() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &ProduceGrade)> {
        self.grades.iter().map(|(position, grade)| (*position, grade))
    }
}
