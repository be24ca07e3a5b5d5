//! Attempt State Machine
//!
//! One pass through a plan. The attempt is a plain value: every transition
//! consumes it and returns the next one, so the plan, the mastery map, the
//! recognize log and the produce grades always move together.
//!
//! Per completed slot: validate the outcome against the slot kind, fold it
//! into mastery, log recognize answers, run the plan's override rules, then
//! advance the cursor. Produce grades are folded in separately whenever they
//! arrive, even after the cursor has reached the end.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SequencingError};
use crate::generator::generate_plan;
use crate::grading::{GradeBook, ProduceGrade};
use crate::mastery::update_mastery;
use crate::overrides::{apply_overrides, Completion};
use crate::plan::{LessonPlan, Phase, PlanKind};
use crate::report::AttemptReport;
use crate::types::{ExerciseKind, ExerciseSlot, MasteryMap, SessionResult, SlotOutcome, VocabularyItem};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    plan: LessonPlan,
    cursor: usize,
    mastery: MasteryMap,
    session: SessionResult,
    grades: GradeBook,
    outcomes: BTreeMap<usize, SlotOutcome>,
}

/// Position the presentation layer should render next
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor<'a> {
    pub index: usize,
    pub total: usize,
    pub phase: Option<Phase>,
    /// `None` once the plan is exhausted
    pub slot: Option<&'a ExerciseSlot>,
}

impl Cursor<'_> {
    pub fn is_finished(&self) -> bool {
        self.slot.is_none()
    }
}

/// Result of completing one slot
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub attempt: Attempt,
    pub completed: usize,
    /// Future positions rewritten by override rules
    pub rewritten: Vec<usize>,
}

impl Transition {
    pub fn is_finished(&self) -> bool {
        self.attempt.is_finished()
    }
}

impl Attempt {
    /// Start an attempt over an existing plan; mastery entries for the plan
    /// items are created lazily.
    pub fn start(plan: LessonPlan, mastery: MasteryMap) -> Self {
        let mastery = mastery.with_items(plan.items());
        Self {
            plan,
            cursor: 0,
            mastery,
            session: SessionResult::new(),
            grades: GradeBook::new(),
            outcomes: BTreeMap::new(),
        }
    }

    /// Generate a plan of `kind` and start an attempt over it
    pub fn begin(kind: PlanKind, items: &[VocabularyItem], mastery: MasteryMap) -> Result<Self> {
        let plan = generate_plan(kind, items, &mastery)?;
        Ok(Self::start(plan, mastery))
    }

    pub fn plan(&self) -> &LessonPlan {
        &self.plan
    }

    pub fn mastery(&self) -> &MasteryMap {
        &self.mastery
    }

    pub fn session(&self) -> &SessionResult {
        &self.session
    }

    pub fn grades(&self) -> &GradeBook {
        &self.grades
    }

    pub fn outcome(&self, position: usize) -> Option<&SlotOutcome> {
        self.outcomes.get(&position)
    }

    pub fn cursor(&self) -> Cursor<'_> {
        Cursor {
            index: self.cursor,
            total: self.plan.len(),
            phase: self.plan.phase_of(self.cursor),
            slot: self.plan.slot(self.cursor),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.plan.len()
    }

    /// Slots not yet reached, with their positions
    pub fn remaining(&self) -> impl Iterator<Item = (usize, &ExerciseSlot)> {
        self.plan.iter().enumerate().skip(self.cursor)
    }

    /// Complete the slot under the cursor
    pub fn complete(self, outcome: SlotOutcome) -> Result<Transition> {
        let index = self.cursor;
        let slot = self
            .plan
            .slot(index)
            .cloned()
            .ok_or(SequencingError::PlanExhausted(self.plan.len()))?;
        if outcome.kind() != slot.kind {
            return Err(SequencingError::mismatch(index, slot.kind, outcome.kind()));
        }

        let correct = outcome.correctness();
        let mastery = update_mastery(&self.mastery, &slot, index, correct);
        let session = match slot.kind {
            ExerciseKind::Recognize => {
                self.session
                    .with_result(slot.item_id(), index, correct == Some(true))
            }
            _ => self.session,
        };
        let grades = match slot.kind {
            ExerciseKind::Produce => self.grades.with_pending(index),
            _ => self.grades,
        };

        let completion = Completion {
            index,
            slot: &slot,
            correct,
        };
        let (plan, rewritten) = apply_overrides(&self.plan, completion, &session, &mastery);

        let mut outcomes = self.outcomes;
        outcomes.insert(index, outcome);

        debug!(
            index,
            kind = slot.kind.as_str(),
            item = slot.item_id(),
            ?correct,
            rewritten = rewritten.len(),
            "slot completed"
        );

        Ok(Transition {
            attempt: Attempt {
                plan,
                cursor: index + 1,
                mastery,
                session,
                grades,
                outcomes,
            },
            completed: index,
            rewritten,
        })
    }

    /// Fold in the grade of a produce slot, in any order and at any time
    pub fn resolve_grade(self, position: usize, grade: ProduceGrade) -> Result<Self> {
        let slot = self
            .plan
            .slot(position)
            .ok_or(SequencingError::SlotOutOfRange(position))?;
        if slot.kind != ExerciseKind::Produce {
            return Err(SequencingError::NotProduceSlot(position));
        }

        debug!(position, passed = ?grade.passed(), "produce grade resolved");
        let grades = self.grades.with_grade(position, grade);
        Ok(Self { grades, ..self })
    }

    pub fn report(&self) -> AttemptReport {
        AttemptReport::build(self)
    }
}
