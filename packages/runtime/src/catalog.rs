//! Curriculum catalog
//!
//! Static JSON description of the course: units made of ordinary lessons,
//! each lesson carrying its vocabulary items. A unit test pools the items of
//! every lesson in the unit.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use signpath_algo::VocabularyItem;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown lesson: {0}")]
    UnknownLesson(String),
    #[error("unknown unit: {0}")]
    UnknownUnit(String),
    #[error("duplicate id in catalog: {0}")]
    DuplicateId(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub items: Vec<VocabularyItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub lessons: Vec<Lesson>,
    /// Title of the unit's checkpoint test, if the unit has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<String>,
}

impl Unit {
    /// Heading for the unit's test: the checkpoint title, else one built from the unit
    pub fn test_title(&self) -> String {
        match &self.checkpoint {
            Some(checkpoint) => checkpoint.clone(),
            None if self.title.is_empty() => format!("{} unit test", self.id),
            None => format!("{} unit test", self.title),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub units: Vec<Unit>,
}

impl Catalog {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await?;
        let catalog = Self::from_json(&contents)?;
        info!(
            path = %path.display(),
            units = catalog.units.len(),
            lessons = catalog.lessons().count(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Parse and check that unit and lesson ids are unique
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(json)?;
        let mut seen = HashSet::new();
        let ids = catalog
            .units
            .iter()
            .map(|u| u.id.as_str())
            .chain(catalog.lessons().map(|l| l.id.as_str()));
        for id in ids {
            if !seen.insert(id) {
                return Err(CatalogError::DuplicateId(id.to_string()));
            }
        }
        Ok(catalog)
    }

    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.units.iter().flat_map(|u| u.lessons.iter())
    }

    pub fn unit(&self, unit_id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == unit_id)
    }

    pub fn lesson(&self, lesson_id: &str) -> Option<&Lesson> {
        self.lessons().find(|l| l.id == lesson_id)
    }

    pub fn lesson_items(&self, lesson_id: &str) -> Result<&[VocabularyItem], CatalogError> {
        self.lesson(lesson_id)
            .map(|l| l.items.as_slice())
            .ok_or_else(|| CatalogError::UnknownLesson(lesson_id.to_string()))
    }

    /// Items of every lesson in the unit, in lesson order, first occurrence wins
    pub fn unit_items(&self, unit_id: &str) -> Result<Vec<VocabularyItem>, CatalogError> {
        let unit = self
            .unit(unit_id)
            .ok_or_else(|| CatalogError::UnknownUnit(unit_id.to_string()))?;

        let mut seen = HashSet::new();
        Ok(unit
            .lessons
            .iter()
            .flat_map(|l| l.items.iter())
            .filter(|item| seen.insert(item.id.as_str()))
            .cloned()
            .collect())
    }
}
