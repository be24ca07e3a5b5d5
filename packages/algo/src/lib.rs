//! # signpath-algo - adaptive exercise sequencing
//!
//! Pure, synchronous core that decides which exercises a learner sees and in
//! what order:
//!
//! - **Ranking** - weakest-first ordering from Laplace-smoothed recognition rates
//! - **Plan generation** - single lessons, unit tests and their phased variants
//! - **Runtime overrides** - remediation rewrites of not-yet-reached slots
//! - **Mastery updates** - per-item statistics folded in after each slot
//! - **Attempts** - the value-threaded state machine tying them together
//!
//! ## Module structure
//!
//! - [`types`] - curriculum items, slots, mastery statistics
//! - [`ranking`] - weakness score and ordering
//! - [`template`] - plan templates and named override rules as data
//! - [`plan`] - sequential and phased lesson plans
//! - [`generator`] - initial plan construction
//! - [`overrides`] - runtime rewrites and kind deconfliction
//! - [`mastery`] - mastery updater
//! - [`grading`] - produce-slot grades resolved asynchronously
//! - [`attempt`] - attempt state machine and cursor
//! - [`report`] - per-question results and aggregate verdict
//!
//! ## Example
//!
//! ```rust
//! use signpath_algo::{Attempt, MasteryMap, PlanKind, SlotOutcome, VocabularyItem};
//!
//! let items = vec![
//!     VocabularyItem::new("Hello", "videos/hello.mp4", "Hello", vec!["Goodbye".into()]),
//!     VocabularyItem::new("Goodbye", "videos/goodbye.mp4", "Goodbye", vec!["Hello".into()]),
//! ];
//! let attempt = Attempt::begin(PlanKind::Lesson, &items, MasteryMap::new()).unwrap();
//! let step = attempt.complete(SlotOutcome::Viewed).unwrap();
//! assert_eq!(step.attempt.cursor().index, 1);
//! ```

pub mod error;
pub mod types;
pub mod ranking;
pub mod template;
pub mod plan;
pub mod generator;
pub mod overrides;
pub mod mastery;
pub mod grading;
pub mod attempt;
pub mod report;

pub use error::{Result, SequencingError};
pub use types::*;

pub use ranking::{rank_weakest_first, weakness_score};

pub use plan::{LessonPlan, Phase, PlanKind, SlotLayout};

pub use generator::{
    generate_lesson_plan, generate_phased_lesson_plan, generate_phased_unit_test_plan,
    generate_plan, generate_unit_test_plan,
};

pub use overrides::apply_overrides;

pub use mastery::update_mastery;

pub use grading::{GradeBook, ProduceGrade, QualityScore, PASS_THRESHOLD};

pub use attempt::{Attempt, Cursor, Transition};

pub use report::{AttemptReport, QuestionKind, QuestionResult};
