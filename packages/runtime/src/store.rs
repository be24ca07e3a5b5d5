//! Per-learner mastery persistence
//!
//! - [`JsonFileStore`]: one JSON document per learner, replaced atomically
//! - [`MemoryStore`]: process-local, for tests and throwaway sessions

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use signpath_algo::MasteryMap;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid learner name: {0:?}")]
    InvalidLearner(String),
    #[error("mastery file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("mastery file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported mastery schema version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Durable per-learner storage for the mastery map
pub trait MasteryStore: Send + Sync {
    /// Stored mastery, or an empty map for a learner never saved before
    fn load<'a>(&'a self, learner: &'a str) -> BoxFuture<'a, Result<MasteryMap, StoreError>>;

    fn save<'a>(
        &'a self,
        learner: &'a str,
        mastery: &'a MasteryMap,
    ) -> BoxFuture<'a, Result<(), StoreError>>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MasteryDocument {
    version: u32,
    learner: String,
    updated_at: DateTime<Utc>,
    mastery: MasteryMap,
}

// ==================== JSON File Store ====================

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, learner: &str) -> Result<PathBuf, StoreError> {
        validate_learner(learner)?;
        Ok(self.dir.join(format!("{learner}.json")))
    }

    /// Timestamp of the last save, if the learner has a file
    pub async fn updated_at(&self, learner: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.read_document(learner).await?.map(|doc| doc.updated_at))
    }

    async fn read_document(&self, learner: &str) -> Result<Option<MasteryDocument>, StoreError> {
        let path = self.path_for(learner)?;
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let doc: MasteryDocument = serde_json::from_str(&contents)?;
        if doc.version != SCHEMA_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: doc.version,
                expected: SCHEMA_VERSION,
            });
        }
        Ok(Some(doc))
    }

    async fn write_document(&self, learner: &str, mastery: &MasteryMap) -> Result<(), StoreError> {
        let path = self.path_for(learner)?;
        fs::create_dir_all(&self.dir).await?;

        let doc = MasteryDocument {
            version: SCHEMA_VERSION,
            learner: learner.to_string(),
            updated_at: Utc::now(),
            mastery: mastery.clone(),
        };
        let payload = serde_json::to_string_pretty(&doc)?;

        // write beside the target, then rename over it
        let tmp = self.dir.join(format!(".{learner}.{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&tmp, payload).await?;
        if let Err(err) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err.into());
        }

        debug!(learner, entries = mastery.len(), path = %path.display(), "mastery saved");
        Ok(())
    }
}

impl MasteryStore for JsonFileStore {
    fn load<'a>(&'a self, learner: &'a str) -> BoxFuture<'a, Result<MasteryMap, StoreError>> {
        Box::pin(async move {
            match self.read_document(learner).await? {
                Some(doc) => {
                    debug!(learner, entries = doc.mastery.len(), "mastery loaded");
                    Ok(doc.mastery)
                }
                None => {
                    info!(learner, "no stored mastery, starting fresh");
                    Ok(MasteryMap::new())
                }
            }
        })
    }

    fn save<'a>(
        &'a self,
        learner: &'a str,
        mastery: &'a MasteryMap,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(self.write_document(learner, mastery))
    }
}

/// Learner names become file names: no separators, no dot-prefixed names
fn validate_learner(learner: &str) -> Result<(), StoreError> {
    let valid = !learner.trim().is_empty()
        && !learner.starts_with('.')
        && !learner.contains(['/', '\\', '\0']);
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidLearner(learner.to_string()))
    }
}

// ==================== Memory Store ====================

#[derive(Debug, Default)]
pub struct MemoryStore {
    maps: RwLock<HashMap<String, MasteryMap>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one learner's mastery
    pub fn with_learner(learner: &str, mastery: MasteryMap) -> Self {
        let store = Self::new();
        store.maps.write().insert(learner.to_string(), mastery);
        store
    }

    pub fn snapshot(&self, learner: &str) -> Option<MasteryMap> {
        self.maps.read().get(learner).cloned()
    }
}

impl MasteryStore for MemoryStore {
    fn load<'a>(&'a self, learner: &'a str) -> BoxFuture<'a, Result<MasteryMap, StoreError>> {
        let mastery = self.snapshot(learner).unwrap_or_default();
        Box::pin(async move { Ok(mastery) })
    }

    fn save<'a>(
        &'a self,
        learner: &'a str,
        mastery: &'a MasteryMap,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        self.maps.write().insert(learner.to_string(), mastery.clone());
        Box::pin(async { Ok(()) })
    }
}
