use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Authoritative training progress. Every field tolerates being absent in
/// the persisted record (fresh install, older app versions).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Progress {
    /// Membership only; order is irrelevant
    pub completed_lessons: BTreeSet<String>,
    pub current_streak: u32,
    pub total_sessions: u32,
    pub is_premium: bool,
    pub lesson_views: HashMap<String, u32>,
    pub lesson_completions: HashMap<String, u32>,
    pub quiz_completed: bool,
    #[serde(default, deserialize_with = "deserialize_training_date")]
    pub last_training_date: Option<DateTime<Utc>>,
}

/// Parse a stored training date: an RFC 3339 timestamp or a bare
/// `YYYY-MM-DD` day (taken as midnight UTC).
pub fn parse_training_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(stamp) = DateTime::parse_from_rfc3339(value) {
        return Some(stamp.with_timezone(&Utc));
    }
    let day = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let midnight = day.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}

/// Required timestamp that also accepts a bare day
pub(crate) fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_training_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", raw)))
}

// An unreadable date drops to None instead of failing the whole record
fn deserialize_training_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => {
            let parsed = parse_training_date(&s);
            if parsed.is_none() {
                tracing::warn!(value = %s, "Ignoring unreadable lastTrainingDate");
            }
            parsed
        }
        Some(other) => {
            tracing::warn!(value = %other, "Ignoring non-string lastTrainingDate");
            None
        }
    })
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_completed(&self, lesson_id: &str) -> bool {
        self.completed_lessons.contains(lesson_id)
    }

    pub fn all_completed<'a, I>(&self, lesson_ids: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        lesson_ids.into_iter().all(|id| self.is_completed(id))
    }

    pub fn views_of(&self, lesson_id: &str) -> u32 {
        self.lesson_views.get(lesson_id).copied().unwrap_or(0)
    }

    pub fn completions_of(&self, lesson_id: &str) -> u32 {
        self.lesson_completions.get(lesson_id).copied().unwrap_or(0)
    }
}
