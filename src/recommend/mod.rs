pub mod insights;

use serde::Serialize;

use crate::catalog::model::{Catalog, Category, Lesson};
use crate::progress::model::Progress;
use crate::progress::profile::DogProfile;
use crate::progress::unlock::next_lesson;

/// The next lesson to work on today and the track it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Focus {
    pub lesson: Lesson,
    pub category_id: String,
    pub category_title: String,
}

impl Focus {
    fn new(lesson: &Lesson, category: &Category) -> Self {
        Focus {
            lesson: lesson.clone(),
            category_id: category.id.clone(),
            category_title: category.title.clone(),
        }
    }
}

/// Premium-only: first available lesson on the quiz's primary track, then
/// on each secondary track in the order the quiz listed them.
pub fn todays_focus(progress: &Progress, profile: &DogProfile, catalog: &Catalog) -> Option<Focus> {
    if !progress.is_premium {
        return None;
    }
    let primary = profile.recommended_primary_track.as_deref()?;

    let tracks = std::iter::once(primary)
        .chain(profile.recommended_secondary_tracks.iter().map(String::as_str));

    for track in tracks {
        let Some(category) = catalog.find_track(track) else {
            tracing::debug!(track = %track, "Recommended track not in catalog");
            continue;
        };
        if let Some(lesson) = next_lesson(category, progress, catalog) {
            return Some(Focus::new(lesson, category));
        }
    }

    None
}
