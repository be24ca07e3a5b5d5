//! Attempt Report
//!
//! Per-question results of an attempt for the results screen. Recognize
//! slots are judged on the spot; produce slots take their grade from the
//! grade book and stay unresolved while grading is in flight. Introduce
//! slots are not questions.

use serde::{Deserialize, Serialize};

use crate::attempt::Attempt;
use crate::grading::ProduceGrade;
use crate::plan::PlanKind;
use crate::types::{ExerciseKind, SlotOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionKind {
    Motion,
    Recognition,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub index: usize,
    pub kind: QuestionKind,
    pub item_id: String,
    pub correct_answer: String,
    /// `None` while the produce grade is pending
    pub passed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<ProduceGrade>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptReport {
    pub plan_kind: PlanKind,
    pub completed_slots: usize,
    pub total_slots: usize,
    pub questions: Vec<QuestionResult>,
    pub total_correct: usize,
    pub total_questions: usize,
    pub pending: usize,
}

impl AttemptReport {
    pub(crate) fn build(attempt: &Attempt) -> Self {
        let plan = attempt.plan();
        let mut questions = Vec::new();

        for (index, slot) in plan.iter().enumerate() {
            let Some(outcome) = attempt.outcome(index) else {
                continue;
            };
            let question = match (slot.kind, outcome) {
                (ExerciseKind::Recognize, SlotOutcome::Answered { correct }) => QuestionResult {
                    index,
                    kind: QuestionKind::Recognition,
                    item_id: slot.item_id().to_string(),
                    correct_answer: slot.correct_answer().to_string(),
                    passed: Some(*correct),
                    grade: None,
                },
                (ExerciseKind::Produce, _) => {
                    let grade = attempt
                        .grades()
                        .get(index)
                        .cloned()
                        .unwrap_or(ProduceGrade::Pending);
                    QuestionResult {
                        index,
                        kind: QuestionKind::Motion,
                        item_id: slot.item_id().to_string(),
                        correct_answer: slot.correct_answer().to_string(),
                        passed: grade.passed(),
                        grade: Some(grade),
                    }
                }
                _ => continue,
            };
            questions.push(question);
        }

        let total_correct = questions.iter().filter(|q| q.passed == Some(true)).count();
        let pending = questions.iter().filter(|q| q.passed.is_none()).count();

        Self {
            plan_kind: plan.kind(),
            completed_slots: attempt.cursor().index,
            total_slots: plan.len(),
            total_questions: questions.len(),
            questions,
            total_correct,
            pending,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed_slots >= self.total_slots
    }

    /// Rounded share of questions passed, 0 with no questions
    pub fn percentage(&self) -> u32 {
        if self.total_questions == 0 {
            return 0;
        }
        ((self.total_correct as f64 / self.total_questions as f64) * 100.0).round() as u32
    }

    /// Pass/fail against a minimum share of passed questions.
    ///
    /// `None` until every slot is completed and every produce grade resolved.
    /// Errored grades already count as failed questions.
    pub fn verdict(&self, min_ratio: f64) -> Option<bool> {
        if !self.is_complete() || self.pending > 0 {
            return None;
        }
        if self.total_questions == 0 {
            return Some(true);
        }
        Some(self.total_correct as f64 / self.total_questions as f64 >= min_ratio)
    }
}
