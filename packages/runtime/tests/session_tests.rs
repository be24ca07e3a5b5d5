//! Session driver tests: catalog lookup, mastery persistence and
//! background grading against an in-process grader.

mod common;

use std::sync::Arc;
use std::time::Duration;

use signpath_algo::{ExerciseKind, MasteryMap, ProduceGrade, WordStats};
use signpath_runtime::catalog::CatalogError;
use signpath_runtime::grading::{GradingError, GradingService};
use signpath_runtime::session::{LessonSession, PlanRequest, SessionError, Step};
use signpath_runtime::store::{MasteryStore, MemoryStore};

use common::{catalog, FlakyStore, PanickingGrader, ScriptedGrader};

/// Complete the current slot, answering a recognize slot with `correct`
async fn complete_current(
    session: &mut LessonSession,
    correct: bool,
) -> Result<Step, SessionError> {
    let kind = session.cursor().slot.map(|s| s.kind);
    match kind {
        Some(ExerciseKind::Introduce) | None => session.view().await,
        Some(ExerciseKind::Recognize) => session.answer(correct).await,
        Some(ExerciseKind::Produce) => session.submit(vec![0u8; 16]).await,
    }
}

/// Complete every remaining slot, answering recognize slots with `correct`
async fn play(session: &mut LessonSession, correct: bool) {
    while session.cursor().slot.is_some() {
        complete_current(session, correct).await.unwrap();
    }
}

async fn start(
    request: PlanRequest,
    store: Arc<dyn MasteryStore>,
    grader: Option<Arc<dyn GradingService>>,
) -> LessonSession {
    LessonSession::start("ana", request, &catalog(), store, grader)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_lesson_session_passes_with_good_grades() {
    let store = Arc::new(MemoryStore::new());
    let grader = Arc::new(ScriptedGrader::new().score("Hello", 4).score("Goodbye", 4));
    let mut session = start(
        PlanRequest::lesson("greetings", false),
        store.clone(),
        Some(grader.clone()),
    )
    .await;

    play(&mut session, true).await;
    let summary = session.finish(true).await.unwrap();

    assert_eq!(summary.report.total_questions, 4);
    assert_eq!(summary.report.total_correct, 4);
    assert_eq!(summary.report.pending, 0);
    assert_eq!(summary.passed, Some(true));
    assert_eq!(grader.calls(), vec![("Hello".to_string(), 16)]);
    // the produce slot sits at position 4
    assert_eq!(summary.feedback.len(), 1);
    assert_eq!(summary.feedback[&4].summary, "scored 4");

    let saved = store.snapshot("ana").unwrap();
    assert!(saved.stats("Hello").introduced);
    assert!(saved.stats("Goodbye").introduced);
}

#[tokio::test]
async fn test_failed_grading_counts_against_verdict() {
    // no script for "Hello": the grader errors on the produce slot
    let grader = Arc::new(ScriptedGrader::new());

    let mut session = start(
        PlanRequest::lesson("greetings", false),
        Arc::new(MemoryStore::new()),
        Some(grader.clone()),
    )
    .await;
    play(&mut session, true).await;
    let lenient = session.finish(true).await.unwrap();
    assert_eq!(lenient.report.total_correct, 3);
    assert_eq!(lenient.report.percentage(), 75);
    assert_eq!(lenient.passed, Some(true));

    let mut session = start(
        PlanRequest::lesson("greetings", false),
        Arc::new(MemoryStore::new()),
        Some(grader),
    )
    .await
    .with_pass_ratio(0.8);
    play(&mut session, true).await;
    assert_eq!(session.finish(true).await.unwrap().passed, Some(false));
}

#[tokio::test]
async fn test_missing_grader_fails_produce_slots() {
    let mut session = start(
        PlanRequest::lesson("greetings", true),
        Arc::new(MemoryStore::new()),
        None,
    )
    .await;
    play(&mut session, true).await;

    let summary = session.finish(true).await.unwrap();
    let motion = summary
        .report
        .questions
        .iter()
        .find(|q| q.grade.is_some())
        .unwrap();
    assert_eq!(motion.passed, Some(false));
    assert_eq!(summary.report.pending, 0);
    assert!(summary.feedback.is_empty());
}

#[tokio::test]
async fn test_panicking_grader_resolves_as_errored() {
    let mut session = start(
        PlanRequest::lesson("greetings", false),
        Arc::new(MemoryStore::new()),
        Some(Arc::new(PanickingGrader)),
    )
    .await;
    play(&mut session, true).await;

    let summary = tokio::time::timeout(Duration::from_secs(3), session.finish(true))
        .await
        .expect("finish waited on a grade that never arrives")
        .unwrap();

    assert_eq!(summary.report.pending, 0);
    let motion = summary
        .report
        .questions
        .iter()
        .find(|q| q.grade.is_some())
        .unwrap();
    assert_eq!(motion.index, 4);
    assert_eq!(
        motion.grade,
        Some(ProduceGrade::errored(GradingError::Panicked.to_string()))
    );
    assert_eq!(motion.passed, Some(false));
    assert_eq!(summary.report.total_correct, 3);
}

#[tokio::test]
async fn test_grades_do_not_block_progress() {
    let grader = Arc::new(
        ScriptedGrader::new()
            .score("Hello", 3)
            .delayed(Duration::from_millis(200)),
    );
    let mut session = start(
        PlanRequest::lesson("greetings", true),
        Arc::new(MemoryStore::new()),
        Some(grader),
    )
    .await;

    // phased motion phase: introduce, introduce, produce
    session.view().await.unwrap();
    session.view().await.unwrap();
    let step = session.submit(vec![1, 2, 3]).await.unwrap();
    assert_eq!(step.completed, 2);
    assert_eq!(session.grades_in_flight(), 1);

    // recognition phase is available straight away
    assert_eq!(session.cursor().slot.map(|s| s.kind), Some(ExerciseKind::Recognize));
    play(&mut session, true).await;
    assert_eq!(session.report().pending, 1);

    let summary = session.finish(true).await.unwrap();
    assert_eq!(summary.report.pending, 0);
    assert_eq!(summary.passed, Some(true));
}

#[tokio::test]
async fn test_unit_test_pools_every_lesson() {
    let grader = Arc::new(
        ScriptedGrader::new()
            .score("Hello", 4)
            .score("Goodbye", 3)
            .score("Thank You", 4)
            .score("Please", 3)
            .delayed(Duration::from_millis(10)),
    );
    let mut session = start(
        PlanRequest::unit_test("basics", false),
        Arc::new(MemoryStore::new()),
        Some(grader.clone()),
    )
    .await;
    assert_eq!(session.attempt().plan().len(), 12);

    play(&mut session, true).await;
    let summary = session.finish(true).await.unwrap();

    assert_eq!(grader.calls().len(), 5);
    assert_eq!(summary.report.total_questions, 10);
    assert_eq!(summary.report.total_correct, 10);
    assert_eq!(summary.passed, Some(true));
}

#[tokio::test]
async fn test_mastery_saved_after_every_slot() {
    let store = Arc::new(MemoryStore::new());
    let mut session = start(PlanRequest::lesson("greetings", false), store.clone(), None).await;

    session.view().await.unwrap();
    assert!(store.snapshot("ana").unwrap().stats("Hello").introduced);

    session.answer(false).await.unwrap();
    drop(session);

    // abandoned attempt keeps what was already saved
    let saved = store.snapshot("ana").unwrap();
    assert_eq!(saved.stats("Hello").recognition_attempts, 1);
    assert_eq!(saved.stats("Hello").last_missed_slot, Some(1));
}

#[tokio::test]
async fn test_stored_mastery_drives_ranking() {
    let weak_goodbye = MasteryMap::new().with_stats(
        "Goodbye",
        WordStats {
            introduced: true,
            recognition_attempts: 3,
            ..Default::default()
        },
    );
    let store = Arc::new(MemoryStore::with_learner("ana", weak_goodbye));
    let session = start(PlanRequest::lesson("greetings", false), store.clone(), None).await;

    let first = session.cursor().slot.unwrap();
    assert_eq!(first.kind, ExerciseKind::Introduce);
    assert_eq!(first.item_id(), "Goodbye");
    assert_eq!(store.load("ana").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_lesson_and_wrong_outcome() {
    let result = LessonSession::start(
        "ana",
        PlanRequest::lesson("numbers", false),
        &catalog(),
        Arc::new(MemoryStore::new()),
        None,
    )
    .await;
    assert!(matches!(
        result,
        Err(SessionError::Catalog(CatalogError::UnknownLesson(_)))
    ));

    let mut session = start(
        PlanRequest::lesson("greetings", false),
        Arc::new(MemoryStore::new()),
        None,
    )
    .await;
    // slot 0 is an introduce
    assert!(matches!(
        session.answer(true).await,
        Err(SessionError::Sequencing(_))
    ));
    assert_eq!(session.cursor().index, 0);
}

#[tokio::test]
async fn test_failed_save_is_retried_then_reported() {
    let store = Arc::new(FlakyStore::new());
    let mut session = start(PlanRequest::lesson("greetings", false), store.clone(), None).await;

    store.set_failing(true);
    session.view().await.unwrap();
    assert!(session.has_unsaved_mastery());
    assert!(store.snapshot("ana").is_none());

    // next completion saves everything so far
    store.set_failing(false);
    session.answer(false).await.unwrap();
    assert!(!session.has_unsaved_mastery());
    let saved = store.snapshot("ana").unwrap();
    assert!(saved.stats("Hello").introduced);
    assert_eq!(saved.stats("Hello").recognition_attempts, 1);

    store.set_failing(true);
    complete_current(&mut session, true).await.unwrap();
    assert!(session.has_unsaved_mastery());
    assert!(matches!(
        session.finish(false).await,
        Err(SessionError::Store(_))
    ));
}

#[tokio::test]
async fn test_unsaved_mastery_is_flushed_at_finish() {
    let store = Arc::new(FlakyStore::new());
    let mut session = start(PlanRequest::lesson("greetings", false), store.clone(), None).await;

    store.set_failing(true);
    session.view().await.unwrap();
    store.set_failing(false);

    let summary = session.finish(false).await.unwrap();
    assert_eq!(summary.report.completed_slots, 1);
    assert!(store.snapshot("ana").unwrap().stats("Hello").introduced);
}
