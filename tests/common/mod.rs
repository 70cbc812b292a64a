#![allow(dead_code)]

use pawtrack_lib::catalog::model::{Catalog, Category, Difficulty, Lesson};
use pawtrack_lib::progress::model::Progress;

pub fn lesson(id: &str) -> Lesson {
    Lesson::new(id, id, Difficulty::Beginner)
}

/// Small catalog covering sequential, prerequisite and premium rules
pub fn sample_catalog() -> Catalog {
    Catalog::new(vec![
        Category::new(
            "everyday-obedience",
            "Everyday Obedience",
            vec![lesson("sit-1"), lesson("stay-1").requires("sit-1")],
        ),
        Category::new(
            "recall",
            "Recall",
            vec![lesson("come-1"), lesson("come-2"), lesson("come-3"), lesson("come-4")],
        ),
        Category::new(
            "calm-focus",
            "Calm & Focus",
            vec![lesson("settle-1"), lesson("eye-contact-1"), lesson("watch-me-1")],
        ),
        Category::new(
            "tricks",
            "Tricks",
            vec![lesson("spin-1").premium(), lesson("bow-1")],
        ),
    ])
}

pub fn progress_with(completed: &[&str]) -> Progress {
    let mut progress = Progress::new();
    for id in completed {
        progress.completed_lessons.insert(id.to_string());
    }
    progress
}

pub fn premium_progress_with(completed: &[&str]) -> Progress {
    let mut progress = progress_with(completed);
    progress.is_premium = true;
    progress
}
