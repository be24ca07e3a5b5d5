//! JSON file store tests against a temporary data directory

use proptest::prelude::*;
use signpath_algo::{MasteryMap, WordStats};
use signpath_runtime::store::{JsonFileStore, MasteryStore, StoreError, SCHEMA_VERSION};

fn sample_mastery() -> MasteryMap {
    MasteryMap::new()
        .with_stats(
            "Hello",
            WordStats {
                introduced: true,
                recognition_correct: 2,
                recognition_attempts: 3,
                last_missed_slot: Some(1),
                last_seen_slot: Some(5),
            },
        )
        .with_stats("Thank You", WordStats::default())
}

#[tokio::test]
async fn test_save_then_load_returns_same_map() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path());

    store.save("ana", &sample_mastery()).await.unwrap();
    let loaded = store.load("ana").await.unwrap();

    assert_eq!(loaded, sample_mastery());
    assert!(store.updated_at("ana").await.unwrap().is_some());
}

#[tokio::test]
async fn test_save_leaves_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("nested"));

    store.save("ana", &sample_mastery()).await.unwrap();
    store.save("ana", &MasteryMap::new()).await.unwrap();

    let names: Vec<_> = std::fs::read_dir(store.dir())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["ana.json".to_string()]);
    assert!(store.load("ana").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_learner_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path());

    assert!(store.load("newcomer").await.unwrap().is_empty());
    assert!(store.updated_at("newcomer").await.unwrap().is_none());
}

#[tokio::test]
async fn test_rejects_other_schema_versions() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path());
    let doc = serde_json::json!({
        "version": SCHEMA_VERSION + 1,
        "learner": "ana",
        "updatedAt": "2026-01-01T00:00:00Z",
        "mastery": {}
    });
    std::fs::write(dir.path().join("ana.json"), doc.to_string()).unwrap();

    let err = store.load("ana").await.unwrap_err();
    assert!(matches!(err, StoreError::UnsupportedVersion { found, .. } if found == SCHEMA_VERSION + 1));
}

#[tokio::test]
async fn test_corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path());
    std::fs::write(dir.path().join("ana.json"), "{ not json").unwrap();

    assert!(matches!(store.load("ana").await, Err(StoreError::Json(_))));
}

#[tokio::test]
async fn test_invalid_learner_is_rejected_before_io() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path());

    let err = store.save("../escape", &MasteryMap::new()).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidLearner(_)));
}

// ============================================================================
// Property-Based Tests
// ============================================================================

fn arb_mastery() -> impl Strategy<Value = MasteryMap> {
    proptest::collection::btree_map(
        "[A-Za-z ]{1,12}",
        (
            any::<bool>(),
            0u32..50,
            proptest::option::of(0usize..12),
            proptest::option::of(0usize..12),
        ),
        0..8,
    )
    .prop_map(|entries| {
        entries
            .into_iter()
            .map(|(id, (introduced, attempts, missed, seen))| {
                let stats = WordStats {
                    introduced,
                    recognition_correct: attempts / 2,
                    recognition_attempts: attempts,
                    last_missed_slot: missed,
                    last_seen_slot: seen,
                };
                (id, stats)
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever is saved is loaded back unchanged
    #[test]
    fn file_store_round_trip(mastery in arb_mastery()) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        let loaded = runtime.block_on(async {
            store.save("learner", &mastery).await.unwrap();
            store.load("learner").await.unwrap()
        });
        prop_assert_eq!(loaded, mastery);
    }
}
