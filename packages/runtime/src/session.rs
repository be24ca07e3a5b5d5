//! Session driver
//!
//! Owns one learner's active attempt: mastery is loaded when the session
//! starts and saved after every completed slot, produce submissions are sent
//! for grading without blocking, and grades are folded back in as they
//! arrive. Dropping the session abandons the attempt; whatever mastery was
//! already saved stays saved.

use std::collections::BTreeMap;
use std::sync::Arc;

use signpath_algo::{
    Attempt, AttemptReport, Cursor, ExerciseKind, MasteryMap, PlanKind, SequencingError,
    SlotOutcome, VocabularyItem,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::{Catalog, CatalogError};
use crate::grading::{Evaluation, GradeRequest, GradeResult, GradingDispatcher, GradingService};
use crate::store::{MasteryStore, StoreError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("cannot continue attempt: {0}")]
    Sequencing(#[from] SequencingError),
}

/// What the learner asked to practise
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanRequest {
    Lesson(String),
    UnitTest(String),
    PhasedLesson(String),
    PhasedUnitTest(String),
}

impl PlanRequest {
    pub fn lesson(lesson_id: impl Into<String>, phased: bool) -> Self {
        let id = lesson_id.into();
        if phased {
            PlanRequest::PhasedLesson(id)
        } else {
            PlanRequest::Lesson(id)
        }
    }

    pub fn unit_test(unit_id: impl Into<String>, phased: bool) -> Self {
        let id = unit_id.into();
        if phased {
            PlanRequest::PhasedUnitTest(id)
        } else {
            PlanRequest::UnitTest(id)
        }
    }

    pub fn kind(&self) -> PlanKind {
        match self {
            PlanRequest::Lesson(_) => PlanKind::Lesson,
            PlanRequest::UnitTest(_) => PlanKind::UnitTest,
            PlanRequest::PhasedLesson(_) => PlanKind::PhasedLesson,
            PlanRequest::PhasedUnitTest(_) => PlanKind::PhasedUnitTest,
        }
    }

    /// Lesson or unit id the request refers to
    pub fn source_id(&self) -> &str {
        match self {
            PlanRequest::Lesson(id)
            | PlanRequest::UnitTest(id)
            | PlanRequest::PhasedLesson(id)
            | PlanRequest::PhasedUnitTest(id) => id,
        }
    }

    pub fn resolve_items(&self, catalog: &Catalog) -> Result<Vec<VocabularyItem>, CatalogError> {
        match self {
            PlanRequest::Lesson(id) | PlanRequest::PhasedLesson(id) => {
                Ok(catalog.lesson_items(id)?.to_vec())
            }
            PlanRequest::UnitTest(id) | PlanRequest::PhasedUnitTest(id) => catalog.unit_items(id),
        }
    }
}

/// Share of passed questions an attempt needs by default
pub const DEFAULT_PASS_RATIO: f64 = 0.7;

/// Result of one completed slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub completed: usize,
    /// Upcoming positions changed by remediation
    pub rewritten: Vec<usize>,
    pub finished: bool,
}

/// Final state of a finished session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub report: AttemptReport,
    /// `None` while grades are still outstanding
    pub passed: Option<bool>,
    /// Grader feedback by plan position
    pub feedback: BTreeMap<usize, Evaluation>,
}

pub struct LessonSession {
    learner: String,
    request: PlanRequest,
    attempt: Attempt,
    store: Arc<dyn MasteryStore>,
    dispatcher: GradingDispatcher,
    pass_ratio: f64,
    feedback: BTreeMap<usize, Evaluation>,
    unsaved: bool,
}

impl LessonSession {
    pub async fn start(
        learner: &str,
        request: PlanRequest,
        catalog: &Catalog,
        store: Arc<dyn MasteryStore>,
        grader: Option<Arc<dyn GradingService>>,
    ) -> Result<Self, SessionError> {
        let items = request.resolve_items(catalog)?;
        let mastery = store.load(learner).await?;
        let attempt = Attempt::begin(request.kind(), &items, mastery)?;

        info!(
            learner,
            kind = ?request.kind(),
            source = request.source_id(),
            slots = attempt.plan().len(),
            "session started"
        );

        Ok(Self {
            learner: learner.to_string(),
            request,
            attempt,
            store,
            dispatcher: GradingDispatcher::new(grader),
            pass_ratio: DEFAULT_PASS_RATIO,
            feedback: BTreeMap::new(),
            unsaved: false,
        })
    }

    pub fn with_pass_ratio(mut self, pass_ratio: f64) -> Self {
        self.pass_ratio = pass_ratio.clamp(0.0, 1.0);
        self
    }

    pub fn learner(&self) -> &str {
        &self.learner
    }

    pub fn request(&self) -> &PlanRequest {
        &self.request
    }

    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    pub fn cursor(&self) -> Cursor<'_> {
        self.attempt.cursor()
    }

    pub fn mastery(&self) -> &MasteryMap {
        self.attempt.mastery()
    }

    pub fn grades_in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }

    /// True while the last mastery save failed and has not been retried
    pub fn has_unsaved_mastery(&self) -> bool {
        self.unsaved
    }

    /// Introduce slot watched
    pub async fn view(&mut self) -> Result<Step, SessionError> {
        self.advance(SlotOutcome::Viewed).await
    }

    /// Recognize slot answered
    pub async fn answer(&mut self, correct: bool) -> Result<Step, SessionError> {
        self.advance(SlotOutcome::Answered { correct }).await
    }

    /// Produce slot recorded; grading runs in the background
    pub async fn submit(&mut self, video: Vec<u8>) -> Result<Step, SessionError> {
        let word = self
            .cursor()
            .slot
            .filter(|slot| slot.kind == ExerciseKind::Produce)
            .map(|slot| slot.item_id().to_string());
        let step = self.advance(SlotOutcome::Submitted).await?;
        if let Some(word) = word {
            self.dispatcher
                .dispatch(step.completed, GradeRequest::new(word, video));
        }
        Ok(step)
    }

    /// Fold in every grade that has already arrived; returns how many
    pub fn poll_grades(&mut self) -> usize {
        let ready = self.dispatcher.try_drain();
        let count = ready.len();
        for result in ready {
            self.absorb_grade(result);
        }
        count
    }

    /// Report on the attempt so far without waiting for grades
    pub fn report(&mut self) -> AttemptReport {
        self.poll_grades();
        self.attempt.report()
    }

    /// End the session. With `wait_for_grades` every outstanding grade is
    /// awaited first, so the summary carries a verdict.
    pub async fn finish(mut self, wait_for_grades: bool) -> Result<SessionSummary, SessionError> {
        self.poll_grades();
        if wait_for_grades {
            while let Some(result) = self.dispatcher.next().await {
                self.absorb_grade(result);
            }
        }
        if self.unsaved {
            self.store.save(&self.learner, self.attempt.mastery()).await?;
            self.unsaved = false;
        }

        let report = self.attempt.report();
        let passed = report.verdict(self.pass_ratio);
        info!(
            learner = %self.learner,
            correct = report.total_correct,
            questions = report.total_questions,
            pending = report.pending,
            ?passed,
            "session finished"
        );
        Ok(SessionSummary {
            report,
            passed,
            feedback: self.feedback,
        })
    }

    async fn advance(&mut self, outcome: SlotOutcome) -> Result<Step, SessionError> {
        let transition = self.attempt.clone().complete(outcome)?;
        let step = Step {
            completed: transition.completed,
            rewritten: transition.rewritten.clone(),
            finished: transition.is_finished(),
        };
        self.attempt = transition.attempt;
        self.persist().await;
        self.poll_grades();
        Ok(step)
    }

    /// A failed save is retried on the next completion and at finish
    async fn persist(&mut self) {
        match self.store.save(&self.learner, self.attempt.mastery()).await {
            Ok(()) => self.unsaved = false,
            Err(err) => {
                warn!(learner = %self.learner, error = %err, "failed to save mastery");
                self.unsaved = true;
            }
        }
    }

    fn absorb_grade(&mut self, result: GradeResult) {
        let GradeResult {
            position,
            grade,
            evaluation,
        } = result;
        match self.attempt.clone().resolve_grade(position, grade) {
            Ok(attempt) => {
                self.attempt = attempt;
                if let Some(evaluation) = evaluation {
                    self.feedback.insert(position, evaluation);
                }
            }
            Err(err) => warn!(position, error = %err, "discarding grade"),
        }
    }
}
