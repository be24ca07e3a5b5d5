//! # signpath-runtime
//!
//! Runs adaptive practice sessions on top of `signpath-algo`: catalog
//! lookup, per-learner mastery persistence, background grading of produce
//! submissions and the session driver that threads them together.

pub mod catalog;
pub mod config;
pub mod grading;
pub mod logging;
pub mod session;
pub mod store;

pub use catalog::{Catalog, CatalogError};
pub use config::{GraderConfig, RuntimeConfig};
pub use grading::{
    Evaluation, GradeRequest, GradeResult, GradingDispatcher, GradingError, GradingService,
    HttpGrader,
};
pub use session::{LessonSession, PlanRequest, SessionError, SessionSummary, Step};
pub use store::{JsonFileStore, MasteryStore, MemoryStore, StoreError};
