use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PawError;

/// A trainer's reflection after a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionNote {
    pub lesson_id: String,
    #[serde(deserialize_with = "crate::progress::model::deserialize_timestamp")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub went_well: String,
    #[serde(default)]
    pub struggled: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DogProfile {
    /// Empty on records saved before profiles carried ids; filled on load
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub breed: Option<String>,
    /// Category id or title picked by the onboarding quiz
    #[serde(default)]
    pub recommended_primary_track: Option<String>,
    #[serde(default)]
    pub recommended_secondary_tracks: Vec<String>,
    #[serde(default)]
    pub last_viewed_lesson: Option<String>,
    #[serde(default)]
    pub session_notes: Vec<SessionNote>,
}

impl DogProfile {
    pub fn new<S: Into<String>>(name: S) -> Result<Self, PawError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(PawError::new("Dog name is required", "profile"));
        }
        Ok(DogProfile {
            id: profile_id(trimmed),
            name: trimmed.to_string(),
            age: None,
            breed: None,
            recommended_primary_track: None,
            recommended_secondary_tracks: Vec::new(),
            last_viewed_lesson: None,
            session_notes: Vec::new(),
        })
    }

    pub fn with_age<S: Into<String>>(mut self, age: S) -> Self {
        self.age = Some(age.into());
        self
    }

    pub fn with_breed<S: Into<String>>(mut self, breed: S) -> Self {
        self.breed = Some(breed.into());
        self
    }

    pub fn with_tracks<S: Into<String>>(mut self, primary: S, secondary: Vec<String>) -> Self {
        self.recommended_primary_track = Some(primary.into());
        self.recommended_secondary_tracks = secondary;
        self
    }

    /// Notes for one lesson, oldest first
    pub fn notes_for<'a>(&'a self, lesson_id: &'a str) -> impl Iterator<Item = &'a SessionNote> + 'a {
        self.session_notes.iter().filter(move |n| n.lesson_id == lesson_id)
    }
}

fn name_slug(name: &str) -> String {
    let slug: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug.trim_matches('-');
    if slug.is_empty() { "dog".to_string() } else { slug.to_string() }
}

fn profile_id(name: &str) -> String {
    format!("{}-{}", name_slug(name), Utc::now().timestamp_millis())
}

/// Deterministic id for a stored profile that predates ids
pub(crate) fn legacy_profile_id(name: &str) -> String {
    name_slug(name)
}
