use chrono::{DateTime, Utc};

use crate::catalog::model::{Catalog, Category, Lesson};
use crate::progress::model::Progress;

/// Whether a lesson is locked for the given progress.
///
/// Locked when any of these hold:
/// - the lesson is premium and the user is not
/// - an earlier lesson in its category is not completed
/// - any listed prerequisite is not completed
///
/// A lesson that is not in the catalog is judged on the premium and
/// prerequisite rules only.
pub fn is_lesson_locked(lesson: &Lesson, progress: &Progress, catalog: &Catalog) -> bool {
    if lesson.is_premium && !progress.is_premium {
        return true;
    }

    if let Some((category, idx)) = catalog.locate(&lesson.id) {
        let previous_done = category.lessons[..idx]
            .iter()
            .all(|l| progress.is_completed(&l.id));
        if !previous_done {
            return true;
        }
    }

    !progress.all_completed(&lesson.prerequisite_ids)
}

/// Rebuild every derived flag from scratch.
pub fn recompute_annotations(catalog: &Catalog, progress: &Progress) -> Catalog {
    let mut annotated = catalog.clone();
    for category in annotated.categories.iter_mut() {
        for lesson in category.lessons.iter_mut() {
            lesson.is_completed = progress.is_completed(&lesson.id);
            lesson.is_locked = is_lesson_locked(lesson, progress, catalog);
        }
        category.completed_count = category.lessons.iter().filter(|l| l.is_completed).count();
    }
    annotated
}

/// Record a completion and re-annotate the catalog.
///
/// Repeating a completion keeps the completed set unchanged but still bumps
/// the counters. Ids that are not in the catalog leave progress untouched.
pub fn complete_lesson(
    lesson_id: &str,
    progress: &Progress,
    catalog: &Catalog,
    now: DateTime<Utc>,
) -> (Progress, Catalog) {
    let mut next = progress.clone();

    if catalog.lesson(lesson_id).is_some() {
        let newly_completed = next.completed_lessons.insert(lesson_id.to_string());
        *next.lesson_completions.entry(lesson_id.to_string()).or_insert(0) += 1;
        next.total_sessions += 1;
        next.last_training_date = Some(now);
        tracing::debug!(
            lesson_id = %lesson_id,
            newly_completed = newly_completed,
            completions = next.completions_of(lesson_id),
            "Lesson completed"
        );
    } else {
        tracing::warn!(lesson_id = %lesson_id, "Ignoring completion of unknown lesson");
    }

    let annotated = recompute_annotations(catalog, &next);
    (next, annotated)
}

/// Count a lesson view; unknown ids are ignored
pub fn record_lesson_view(lesson_id: &str, progress: &Progress, catalog: &Catalog) -> Progress {
    let mut next = progress.clone();
    if catalog.lesson(lesson_id).is_some() {
        *next.lesson_views.entry(lesson_id.to_string()).or_insert(0) += 1;
    } else {
        tracing::debug!(lesson_id = %lesson_id, "View of unknown lesson ignored");
    }
    next
}

/// First lesson in the category that is neither completed nor locked
pub fn next_lesson<'a>(category: &'a Category, progress: &Progress, catalog: &Catalog) -> Option<&'a Lesson> {
    category
        .lessons
        .iter()
        .find(|l| !progress.is_completed(&l.id) && !is_lesson_locked(l, progress, catalog))
}

/// Completed share of a category's lessons, 0.0 for an empty category
pub fn category_completion(category: &Category, progress: &Progress) -> f32 {
    if category.lessons.is_empty() {
        return 0.0;
    }
    let done = category.lessons.iter().filter(|l| progress.is_completed(&l.id)).count();
    done as f32 / category.lessons.len() as f32
}

/// Completed share of all catalog lessons; ids outside the catalog don't count
pub fn overall_completion(catalog: &Catalog, progress: &Progress) -> f32 {
    let total = catalog.total_lessons();
    if total == 0 {
        return 0.0;
    }
    let done = catalog.lessons().filter(|l| progress.is_completed(&l.id)).count();
    done as f32 / total as f32
}
