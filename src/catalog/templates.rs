use serde::Serialize;

use crate::catalog::model::{Catalog, Lesson};

/// A fixed, named bundle of lessons for a single training session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTemplate {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub estimated_minutes: u32,
    pub lesson_ids: &'static [&'static str],
}

static SESSION_TEMPLATES: &[SessionTemplate] = &[
    SessionTemplate {
        id: "quick-reset",
        title: "Quick Reset",
        description: "Five calm minutes to bring attention back to you.",
        estimated_minutes: 5,
        lesson_ids: &["settle-1", "eye-contact-1", "watch-me-1"],
    },
    SessionTemplate {
        id: "morning-basics",
        title: "Morning Basics",
        description: "Run through the everyday cues before breakfast.",
        estimated_minutes: 10,
        lesson_ids: &["sit-1", "down-1", "stay-1"],
    },
    SessionTemplate {
        id: "recall-boost",
        title: "Recall Boost",
        description: "Name, come, and a little distance.",
        estimated_minutes: 12,
        lesson_ids: &["name-game-1", "come-1", "come-2"],
    },
    SessionTemplate {
        id: "walk-prep",
        title: "Walk Prep",
        description: "Focus first, then leash manners.",
        estimated_minutes: 15,
        lesson_ids: &["eye-contact-1", "loose-leash-1", "heel-1"],
    },
    SessionTemplate {
        id: "calm-evening",
        title: "Calm Evening",
        description: "Wind down together at the end of the day.",
        estimated_minutes: 15,
        lesson_ids: &["settle-1", "mat-1", "relax-protocol-1"],
    },
];

pub fn session_templates() -> &'static [SessionTemplate] {
    SESSION_TEMPLATES
}

pub fn find_template(template_id: &str) -> Option<&'static SessionTemplate> {
    SESSION_TEMPLATES.iter().find(|t| t.id == template_id)
}

/// Resolve a template against the catalog, in the template's order.
/// Unknown templates resolve to nothing and unknown lesson ids are skipped.
pub fn apply_session_template(template_id: &str, catalog: &Catalog) -> Vec<Lesson> {
    match find_template(template_id) {
        Some(template) => resolve_lessons(template.lesson_ids, catalog),
        None => {
            tracing::debug!(template_id = %template_id, "Unknown session template");
            Vec::new()
        }
    }
}

pub fn resolve_lessons(lesson_ids: &[&str], catalog: &Catalog) -> Vec<Lesson> {
    lesson_ids
        .iter()
        .filter_map(|id| {
            let found = catalog.lesson(id).cloned();
            if found.is_none() {
                tracing::debug!(lesson_id = %id, "Template lesson missing from catalog");
            }
            found
        })
        .collect()
}
