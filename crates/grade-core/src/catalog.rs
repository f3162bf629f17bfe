//! JSON-backed course catalog
//!
//! Loads the catalog export once at startup and serves it read-only.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::{Course, CourseCatalog, GradeDistribution, GradingStructure};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate course id: {0}")]
    DuplicateCourse(i64),
}

/// One course with the records the engine needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub course: Course,
    #[serde(default)]
    pub grade_distribution: Option<GradeDistribution>,
    #[serde(default)]
    pub grading_structure: Option<GradingStructure>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogFile {
    courses: Vec<CatalogEntry>,
}

/// Immutable in-memory catalog keyed by course id and by "SUBJECT NUMBER"
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    entries: HashMap<i64, CatalogEntry>,
    by_name: HashMap<String, i64>,
}

/// Normalize "compsci   61a" to "COMPSCI 61A"
pub fn normalize_course_name(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_uppercase())
        .collect::<Vec<_>>()
        .join(" ")
}

impl InMemoryCatalog {
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Result<Self, CatalogError> {
        let mut catalog = InMemoryCatalog::default();
        for entry in entries {
            let id = entry.course.course_id;
            if catalog.entries.contains_key(&id) {
                return Err(CatalogError::DuplicateCourse(id));
            }
            catalog
                .by_name
                .insert(normalize_course_name(&entry.course.full_name()), id);
            catalog.entries.insert(id, entry);
        }
        Ok(catalog)
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::from_entries(file.courses)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&raw)?;
        tracing::info!(
            "Loaded {} courses from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CourseCatalog for InMemoryCatalog {
    fn course(&self, course_id: i64) -> Option<Course> {
        self.entries.get(&course_id).map(|e| e.course.clone())
    }

    fn grade_distribution(&self, course_id: i64) -> Option<GradeDistribution> {
        self.entries
            .get(&course_id)
            .and_then(|e| e.grade_distribution.clone())
    }

    fn grading_structure(&self, course_id: i64) -> Option<GradingStructure> {
        self.entries
            .get(&course_id)
            .and_then(|e| e.grading_structure.clone())
    }

    fn course_average_by_name(&self, course_name: &str) -> Option<f64> {
        let id = self.by_name.get(&normalize_course_name(course_name))?;
        self.entries.get(id).and_then(|e| e.course.avg_gpa)
    }
}
