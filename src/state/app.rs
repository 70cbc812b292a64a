use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use parking_lot::{Mutex, RwLock};

use crate::catalog::model::{Catalog, Category, Lesson};
use crate::catalog::templates;
use crate::error::PawError;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::progress::model::Progress;
use crate::progress::profile::{DogProfile, SessionNote};
use crate::progress::{streak, unlock};
use crate::recommend::insights::{progress_insights_with, InsightRules};
use crate::recommend::{todays_focus, Focus};
use crate::storage::snapshot::{load_state, save_state, PersistedState};
use crate::storage::KeyValueStore;

/// Single owner of the app's training state.
///
/// Cloning yields another handle to the same state. Every command updates
/// memory first and then persists a snapshot; a failed write is logged and
/// counted but never rolls back memory.
#[derive(Clone)]
pub struct ProgressStore {
    /// Catalog annotated for the current progress
    catalog: Arc<RwLock<Catalog>>,
    progress: Arc<RwLock<Progress>>,
    active_profile: Arc<RwLock<Option<DogProfile>>>,
    profiles: Arc<RwLock<Vec<DogProfile>>>,
    onboarding_complete: Arc<RwLock<bool>>,
    rules: Arc<InsightRules>,
    writer: SnapshotWriter,
}

/// Serializes snapshot writes and drops any that are older than the last
/// one written.
#[derive(Clone)]
struct SnapshotWriter {
    storage: Arc<dyn KeyValueStore>,
    generation: Arc<AtomicU64>,
    /// Held while a generation is assigned and its snapshot taken, so a
    /// higher generation always carries a later snapshot
    stamping: Arc<Mutex<()>>,
    written: Arc<Mutex<u64>>,
    metrics: Metrics,
}

impl SnapshotWriter {
    fn stamp<F>(&self, take: F) -> (u64, PersistedState)
    where
        F: FnOnce() -> PersistedState,
    {
        let _guard = self.stamping.lock();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        (generation, take())
    }

    fn write(&self, generation: u64, snapshot: &PersistedState) -> Result<(), PawError> {
        let mut written = self.written.lock();
        if generation <= *written {
            self.metrics.record_stale_skip();
            return Ok(());
        }
        match save_state(self.storage.as_ref(), snapshot) {
            Ok(()) => {
                *written = generation;
                self.metrics.record_persist_write();
                Ok(())
            }
            Err(e) => {
                self.metrics.record_persist_failure();
                Err(e)
            }
        }
    }

    /// Fire-and-forget: on the blocking pool inside a tokio runtime,
    /// inline otherwise.
    fn dispatch(&self, generation: u64, snapshot: PersistedState) {
        let writer = self.clone();
        let job = move || {
            if let Err(e) = writer.write(generation, &snapshot) {
                tracing::warn!(error = %e, generation = generation, "Failed to persist state");
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(job);
            }
            Err(_) => job(),
        }
    }
}

impl ProgressStore {
    /// Load persisted state from `storage` and annotate `catalog` for it
    pub fn open(catalog: Catalog, storage: Arc<dyn KeyValueStore>) -> Self {
        let state = load_state(storage.as_ref());
        tracing::info!(
            completed = state.progress.completed_lessons.len(),
            profiles = state.profiles.len(),
            onboarding_complete = state.onboarding_complete,
            "Loaded persisted state"
        );
        Self::from_state(catalog, storage, state)
    }

    pub fn from_state(catalog: Catalog, storage: Arc<dyn KeyValueStore>, state: PersistedState) -> Self {
        let annotated = unlock::recompute_annotations(&catalog, &state.progress);
        ProgressStore {
            catalog: Arc::new(RwLock::new(annotated)),
            progress: Arc::new(RwLock::new(state.progress)),
            active_profile: Arc::new(RwLock::new(state.active_profile)),
            profiles: Arc::new(RwLock::new(state.profiles)),
            onboarding_complete: Arc::new(RwLock::new(state.onboarding_complete)),
            rules: Arc::new(InsightRules::default()),
            writer: SnapshotWriter {
                storage,
                generation: Arc::new(AtomicU64::new(0)),
                stamping: Arc::new(Mutex::new(())),
                written: Arc::new(Mutex::new(0)),
                metrics: Metrics::new(),
            },
        }
    }

    pub fn with_rules(mut self, rules: InsightRules) -> Self {
        self.rules = Arc::new(rules);
        self
    }

    // ---- reads ----

    pub fn progress(&self) -> Progress {
        self.progress.read().clone()
    }

    pub fn catalog(&self) -> Catalog {
        self.catalog.read().clone()
    }

    pub fn category(&self, category_id: &str) -> Option<Category> {
        self.catalog.read().category(category_id).cloned()
    }

    pub fn lesson(&self, lesson_id: &str) -> Option<Lesson> {
        self.catalog.read().lesson(lesson_id).cloned()
    }

    /// `None` when the lesson is not in the catalog
    pub fn is_lesson_locked(&self, lesson_id: &str) -> Option<bool> {
        let progress = self.progress.read();
        let catalog = self.catalog.read();
        catalog
            .lesson(lesson_id)
            .map(|lesson| unlock::is_lesson_locked(lesson, &progress, &catalog))
    }

    pub fn active_profile(&self) -> Option<DogProfile> {
        self.active_profile.read().clone()
    }

    pub fn profiles(&self) -> Vec<DogProfile> {
        self.profiles.read().clone()
    }

    pub fn is_onboarding_complete(&self) -> bool {
        *self.onboarding_complete.read()
    }

    pub fn todays_focus(&self) -> Option<Focus> {
        let progress = self.progress.read();
        let catalog = self.catalog.read();
        let profile = self.active_profile.read();
        profile
            .as_ref()
            .and_then(|p| todays_focus(&progress, p, &catalog))
    }

    pub fn progress_insights(&self) -> Vec<String> {
        let progress = self.progress.read();
        let catalog = self.catalog.read();
        progress_insights_with(&progress, &catalog, &self.rules)
    }

    /// Template lessons carrying the current lock/completion flags
    pub fn session_lessons(&self, template_id: &str) -> Vec<Lesson> {
        templates::apply_session_template(template_id, &self.catalog.read())
    }

    pub fn overall_completion(&self) -> f32 {
        let progress = self.progress.read();
        let catalog = self.catalog.read();
        unlock::overall_completion(&catalog, &progress)
    }

    /// Streak to display right now; 0 once a day has been missed
    pub fn current_streak(&self) -> u32 {
        streak::effective_streak(&self.progress.read(), &Local::now())
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.writer.metrics.snapshot()
    }

    pub fn snapshot(&self) -> PersistedState {
        let progress = self.progress.read().clone();
        let active_profile = self.active_profile.read().clone();
        let profiles = self.profiles.read().clone();
        let onboarding_complete = *self.onboarding_complete.read();
        PersistedState {
            progress,
            active_profile,
            profiles,
            onboarding_complete,
        }
    }

    // ---- commands ----

    pub fn complete_lesson(&self, lesson_id: &str) -> bool {
        self.complete_lesson_at(lesson_id, &Local::now())
    }

    /// Complete a lesson at `now`, advancing the streak on `now`'s calendar.
    /// Returns false (and changes nothing) for ids outside the catalog.
    pub fn complete_lesson_at<Tz: TimeZone>(&self, lesson_id: &str, now: &DateTime<Tz>) -> bool {
        {
            let mut progress = self.progress.write();
            let mut catalog = self.catalog.write();
            if catalog.lesson(lesson_id).is_none() {
                tracing::warn!(lesson_id = %lesson_id, "Completion of unknown lesson ignored");
                return false;
            }
            let streaked = streak::update_streak(&progress, now);
            let (next, annotated) =
                unlock::complete_lesson(lesson_id, &streaked, &catalog, now.with_timezone(&Utc));
            *progress = next;
            *catalog = annotated;
            tracing::info!(
                lesson_id = %lesson_id,
                streak = progress.current_streak,
                total_sessions = progress.total_sessions,
                "Lesson completed"
            );
        }
        self.writer.metrics.record_lesson_completed();
        self.persist();
        true
    }

    pub fn record_lesson_view(&self, lesson_id: &str) {
        {
            let mut progress = self.progress.write();
            let catalog = self.catalog.read();
            *progress = unlock::record_lesson_view(lesson_id, &progress, &catalog);
        }
        self.persist();
    }

    pub fn update_streak(&self) -> u32 {
        self.update_streak_at(&Local::now())
    }

    pub fn update_streak_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> u32 {
        let streak = {
            let mut progress = self.progress.write();
            *progress = streak::update_streak(&progress, now);
            progress.current_streak
        };
        self.persist();
        streak
    }

    pub fn set_last_viewed_lesson(&self, lesson_id: &str) {
        let updated = self.update_active_profile(|profile| {
            profile.last_viewed_lesson = Some(lesson_id.to_string());
        });
        if updated {
            self.persist();
        }
    }

    pub fn add_session_note(&self, lesson_id: &str, went_well: &str, struggled: &str) -> bool {
        self.add_session_note_at(lesson_id, went_well, struggled, Utc::now())
    }

    pub fn add_session_note_at(&self, lesson_id: &str, went_well: &str, struggled: &str, date: DateTime<Utc>) -> bool {
        let note = SessionNote {
            lesson_id: lesson_id.to_string(),
            date,
            went_well: went_well.trim().to_string(),
            struggled: struggled.trim().to_string(),
        };
        let updated = self.update_active_profile(|profile| profile.session_notes.push(note));
        if updated {
            self.persist();
        }
        updated
    }

    /// Flip premium and re-annotate the catalog; returns the new flag
    pub fn toggle_premium(&self) -> bool {
        let next = !self.progress.read().is_premium;
        self.set_premium(next);
        next
    }

    pub fn set_premium(&self, is_premium: bool) {
        {
            let mut progress = self.progress.write();
            let mut catalog = self.catalog.write();
            progress.is_premium = is_premium;
            *catalog = unlock::recompute_annotations(&catalog, &progress);
        }
        tracing::info!(is_premium = is_premium, "Premium status changed");
        self.persist();
    }

    /// Store the onboarding quiz outcome on the active profile
    pub fn apply_quiz_result(&self, primary_track: &str, secondary_tracks: Vec<String>) {
        self.progress.write().quiz_completed = true;
        let updated = self.update_active_profile(|profile| {
            profile.recommended_primary_track = Some(primary_track.to_string());
            profile.recommended_secondary_tracks = secondary_tracks;
        });
        if !updated {
            tracing::debug!("Quiz result recorded without an active profile");
        }
        self.persist();
    }

    /// Finish onboarding with the given profile as the active one
    pub fn complete_onboarding(&self, profile: DogProfile) {
        self.upsert_profile(profile.clone());
        *self.active_profile.write() = Some(profile);
        *self.onboarding_complete.write() = true;
        self.persist();
    }

    /// Add (or replace, by id) a profile; it becomes active if none is
    pub fn add_profile(&self, profile: DogProfile) {
        self.upsert_profile(profile.clone());
        {
            let mut active = self.active_profile.write();
            match active.as_ref() {
                None => *active = Some(profile),
                Some(current) if current.id == profile.id => *active = Some(profile),
                Some(_) => {}
            }
        }
        self.persist();
    }

    pub fn set_active_profile(&self, profile_id: &str) -> bool {
        let found = self.profiles.read().iter().find(|p| p.id == profile_id).cloned();
        match found {
            Some(profile) => {
                *self.active_profile.write() = Some(profile);
                self.persist();
                true
            }
            None => {
                tracing::debug!(profile_id = %profile_id, "Unknown profile");
                false
            }
        }
    }

    /// Start training over. Premium status survives the reset.
    pub fn reset_progress(&self) {
        {
            let mut progress = self.progress.write();
            let mut catalog = self.catalog.write();
            *progress = Progress {
                is_premium: progress.is_premium,
                ..Progress::default()
            };
            *catalog = unlock::recompute_annotations(&catalog, &progress);
        }
        tracing::info!("Progress reset");
        self.persist();
    }

    /// Write the current state synchronously, reporting failure
    pub fn flush(&self) -> Result<(), PawError> {
        let (generation, snapshot) = self.writer.stamp(|| self.snapshot());
        self.writer.write(generation, &snapshot)
    }

    fn persist(&self) {
        let (generation, snapshot) = self.writer.stamp(|| self.snapshot());
        self.writer.dispatch(generation, snapshot);
    }

    fn upsert_profile(&self, profile: DogProfile) {
        let mut profiles = self.profiles.write();
        match profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => *existing = profile,
            None => profiles.push(profile),
        }
    }

    /// Apply `f` to the active profile and mirror it into the profile list
    fn update_active_profile<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut DogProfile),
    {
        let updated = {
            let mut active = self.active_profile.write();
            match active.as_mut() {
                Some(profile) => {
                    f(profile);
                    Some(profile.clone())
                }
                None => None,
            }
        };
        match updated {
            Some(profile) => {
                self.upsert_profile(profile);
                true
            }
            None => {
                tracing::debug!("No active dog profile");
                false
            }
        }
    }
}
