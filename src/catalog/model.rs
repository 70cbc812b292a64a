use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::PawError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub difficulty: Difficulty,
    #[serde(default = "default_duration")]
    pub duration_minutes: u32,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub prerequisite_ids: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    /// Derived by the unlock engine, never authoritative
    #[serde(default)]
    pub is_locked: bool,
    /// Derived from `Progress::completed_lessons`
    #[serde(default)]
    pub is_completed: bool,
}

fn default_duration() -> u32 {
    5
}

impl Lesson {
    /// Minimal lesson with no prerequisites, mostly for building catalogs in code
    pub fn new<S: Into<String>>(id: S, title: S, difficulty: Difficulty) -> Self {
        Lesson {
            id: id.into(),
            title: title.into(),
            summary: String::new(),
            difficulty,
            duration_minutes: default_duration(),
            is_premium: false,
            prerequisite_ids: Vec::new(),
            steps: Vec::new(),
            is_locked: false,
            is_completed: false,
        }
    }

    pub fn premium(mut self) -> Self {
        self.is_premium = true;
        self
    }

    pub fn requires<S: Into<String>>(mut self, prerequisite: S) -> Self {
        self.prerequisite_ids.push(prerequisite.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Order defines sequential unlock order
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    pub completed_count: usize,
}

impl Category {
    pub fn new<S: Into<String>>(id: S, title: S, lessons: Vec<Lesson>) -> Self {
        Category {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            lessons,
            completed_count: 0,
        }
    }

    pub fn position_of(&self, lesson_id: &str) -> Option<usize> {
        self.lessons.iter().position(|l| l.id == lesson_id)
    }

    /// Whether `track` names this category, by id or case-insensitive title
    pub fn matches_track(&self, track: &str) -> bool {
        let track = track.trim();
        self.id == track || self.title.eq_ignore_ascii_case(track)
    }
}

/// Immutable-at-runtime tree of categories and lessons. Only the derived
/// flags change after loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub categories: Vec<Category>,
}

const BUILTIN_CATALOG: &str = include_str!("../../data/catalog.json");

impl Catalog {
    pub fn new(categories: Vec<Category>) -> Self {
        Catalog { categories }
    }

    /// The catalog shipped with the app
    pub fn builtin() -> Result<Catalog, PawError> {
        Self::from_json(BUILTIN_CATALOG)
            .map_err(|e| e.with_context("builtin catalog"))
    }

    pub fn from_json(json: &str) -> Result<Catalog, PawError> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load_from_path(path: &Path) -> Result<Catalog, PawError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| PawError::new(
                format!("Failed to read catalog: {}", e),
                "io"
            ).with_context(format!("path: {:?}", path)))?;
        Self::from_json(&data)
            .map_err(|e| e.with_context(format!("path: {:?}", path)))
    }

    /// Lesson ids must be unique across the whole catalog
    fn validate(&self) -> Result<(), PawError> {
        let mut seen = std::collections::HashSet::new();
        for lesson in self.lessons() {
            if !seen.insert(lesson.id.as_str()) {
                return Err(PawError::new(
                    format!("Duplicate lesson id '{}'", lesson.id),
                    "catalog"
                ));
            }
        }
        Ok(())
    }

    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.categories.iter().flat_map(|c| c.lessons.iter())
    }

    pub fn total_lessons(&self) -> usize {
        self.categories.iter().map(|c| c.lessons.len()).sum()
    }

    /// First lesson with this id across categories
    pub fn lesson(&self, lesson_id: &str) -> Option<&Lesson> {
        self.lessons().find(|l| l.id == lesson_id)
    }

    pub fn category(&self, category_id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == category_id)
    }

    /// Category holding the lesson, with the lesson's ordinal in it
    pub fn locate(&self, lesson_id: &str) -> Option<(&Category, usize)> {
        self.categories
            .iter()
            .find_map(|c| c.position_of(lesson_id).map(|idx| (c, idx)))
    }

    pub fn find_track(&self, track: &str) -> Option<&Category> {
        self.category(track.trim())
            .or_else(|| self.categories.iter().find(|c| c.matches_track(track)))
    }
}
