mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use common::sample_catalog;
use pawtrack_lib::progress::profile::DogProfile;
use pawtrack_lib::state::app::ProgressStore;
use pawtrack_lib::progress::model::parse_training_date;
use pawtrack_lib::storage::snapshot::{
    clear_state, load_state, save_state, unreadable_key, PersistedState, DOG_PROFILES_KEY, DOG_PROFILE_KEY,
    ONBOARDING_COMPLETE_KEY, USER_PROGRESS_KEY,
};
use pawtrack_lib::storage::{FileKvStore, KeyValueStore, MemoryKvStore, StorageError};

fn memory_store() -> (ProgressStore, Arc<MemoryKvStore>) {
    let kv = Arc::new(MemoryKvStore::new());
    (ProgressStore::open(sample_catalog(), kv.clone()), kv)
}

/// Backend whose writes always fail
struct BrokenKvStore;

impl KeyValueStore for BrokenKvStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set(&self, key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::InvalidKey(key.to_string()))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

#[test]
fn test_fresh_install_defaults() {
    let (store, _) = memory_store();
    let progress = store.progress();
    assert!(progress.completed_lessons.is_empty());
    assert_eq!(progress.current_streak, 0);
    assert!(!progress.is_premium);
    assert!(store.active_profile().is_none());
    assert!(!store.is_onboarding_complete());
    assert_eq!(store.is_lesson_locked("sit-1"), Some(false));
    assert_eq!(store.is_lesson_locked("stay-1"), Some(true));
    assert_eq!(store.is_lesson_locked("ghost"), None);
}

#[test]
fn test_complete_lesson_updates_memory_and_storage() {
    let (store, kv) = memory_store();
    let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();

    assert!(store.complete_lesson_at("sit-1", &now));

    assert_eq!(store.is_lesson_locked("stay-1"), Some(false));
    assert_eq!(store.category("everyday-obedience").unwrap().completed_count, 1);
    assert!(store.lesson("sit-1").unwrap().is_completed);
    assert_eq!(store.progress().current_streak, 1);

    // no runtime here, so the write happened inline
    let persisted = load_state(kv.as_ref());
    assert!(persisted.progress.is_completed("sit-1"));
    assert_eq!(persisted.progress.total_sessions, 1);
    assert_eq!(store.metrics().persist_writes, 1);
}

#[test]
fn test_completion_advances_streak_across_days() {
    let (store, _) = memory_store();
    let day1 = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
    let day2 = Utc.with_ymd_and_hms(2024, 5, 11, 9, 0, 0).unwrap();

    store.complete_lesson_at("sit-1", &day1);
    store.complete_lesson_at("stay-1", &day1);
    assert_eq!(store.progress().current_streak, 1);

    store.complete_lesson_at("come-1", &day2);
    let progress = store.progress();
    assert_eq!(progress.current_streak, 2);
    assert_eq!(progress.total_sessions, 3);
    assert_eq!(store.metrics().lessons_completed, 3);
}

#[test]
fn test_unknown_completion_changes_nothing() {
    let (store, kv) = memory_store();
    assert!(!store.complete_lesson("ghost"));
    assert!(store.progress().completed_lessons.is_empty());
    assert!(kv.keys().is_empty());
}

#[test]
fn test_toggle_premium_reannotates() {
    let (store, _) = memory_store();
    assert!(store.lesson("spin-1").unwrap().is_locked);

    assert!(store.toggle_premium());
    assert!(!store.lesson("spin-1").unwrap().is_locked);
    assert!(store.progress().is_premium);

    assert!(!store.toggle_premium());
    assert!(store.lesson("spin-1").unwrap().is_locked);
}

#[test]
fn test_profile_commands() {
    let (store, kv) = memory_store();
    let biscuit = DogProfile::new("Biscuit").unwrap().with_breed("Beagle");
    store.complete_onboarding(biscuit.clone());

    store.set_last_viewed_lesson("come-1");
    let note_date = Utc.with_ymd_and_hms(2024, 5, 10, 18, 0, 0).unwrap();
    assert!(store.add_session_note_at("come-1", " came twice ", "", note_date));
    store.apply_quiz_result("recall", vec!["calm-focus".to_string()]);

    let active = store.active_profile().unwrap();
    assert_eq!(active.last_viewed_lesson.as_deref(), Some("come-1"));
    assert_eq!(active.session_notes.len(), 1);
    assert_eq!(active.session_notes[0].went_well, "came twice");
    assert_eq!(active.recommended_primary_track.as_deref(), Some("recall"));
    assert!(store.progress().quiz_completed);

    // the profile list mirrors the active profile
    assert_eq!(store.profiles(), vec![active.clone()]);

    let persisted = load_state(kv.as_ref());
    assert!(persisted.onboarding_complete);
    assert_eq!(persisted.active_profile, Some(active));
}

#[test]
fn test_switching_profiles() {
    let (store, _) = memory_store();
    let biscuit = DogProfile::new("Biscuit").unwrap();
    let mochi = DogProfile::new("Mochi").unwrap();
    let mochi_id = mochi.id.clone();

    store.add_profile(biscuit.clone());
    store.add_profile(mochi);
    assert_eq!(store.active_profile().unwrap().id, biscuit.id);
    assert_eq!(store.profiles().len(), 2);

    assert!(store.set_active_profile(&mochi_id));
    assert_eq!(store.active_profile().unwrap().name, "Mochi");
    assert!(!store.set_active_profile("nobody"));
    assert_eq!(store.active_profile().unwrap().name, "Mochi");
}

#[test]
fn test_notes_need_an_active_profile() {
    let (store, _) = memory_store();
    assert!(!store.add_session_note("sit-1", "good", "bad"));
}

#[test]
fn test_todays_focus_and_insights_through_store() {
    let (store, _) = memory_store();
    store.complete_onboarding(
        DogProfile::new("Biscuit")
            .unwrap()
            .with_tracks("recall", vec!["calm-focus".to_string()]),
    );
    assert!(store.todays_focus().is_none());
    assert!(store.progress_insights().is_empty());

    store.set_premium(true);
    assert_eq!(store.todays_focus().unwrap().lesson.id, "come-1");

    for id in ["come-1", "come-2", "come-3"] {
        store.complete_lesson(id);
    }
    assert_eq!(store.todays_focus().unwrap().lesson.id, "come-4");
    assert!(store
        .progress_insights()
        .iter()
        .any(|i| i.starts_with("Recall is improving")));
}

#[test]
fn test_session_lessons_carry_flags() {
    let (store, _) = memory_store();
    let lessons = store.session_lessons("quick-reset");
    assert_eq!(lessons.len(), 3);
    assert!(!lessons[0].is_locked);
    assert!(lessons[1].is_locked);
}

#[test]
fn test_reset_keeps_premium() {
    let (store, _) = memory_store();
    store.set_premium(true);
    store.complete_lesson("sit-1");
    store.reset_progress();

    let progress = store.progress();
    assert!(progress.completed_lessons.is_empty());
    assert!(progress.is_premium);
    assert_eq!(store.category("everyday-obedience").unwrap().completed_count, 0);
}

#[test]
fn test_reopen_restores_state() {
    let dir = tempfile::tempdir().unwrap();
    let kv = Arc::new(FileKvStore::new(dir.path()));
    {
        let store = ProgressStore::open(sample_catalog(), kv.clone());
        store.complete_onboarding(DogProfile::new("Biscuit").unwrap());
        store.complete_lesson("sit-1");
        store.record_lesson_view("stay-1");
        store.flush().unwrap();
    }

    let reopened = ProgressStore::open(sample_catalog(), kv);
    assert!(reopened.is_onboarding_complete());
    assert_eq!(reopened.active_profile().unwrap().name, "Biscuit");
    assert_eq!(reopened.progress().views_of("stay-1"), 1);
    assert_eq!(reopened.is_lesson_locked("stay-1"), Some(false));
    assert_eq!(reopened.category("everyday-obedience").unwrap().completed_count, 1);
}

#[test]
fn test_tolerates_missing_and_corrupt_records() {
    let kv = MemoryKvStore::new();
    kv.set(USER_PROGRESS_KEY, r#"{"completedLessons": ["sit-1"], "currentStreak": 2}"#).unwrap();
    kv.set(DOG_PROFILES_KEY, "not json").unwrap();

    let state = load_state(&kv);
    assert!(state.progress.is_completed("sit-1"));
    assert_eq!(state.progress.current_streak, 2);
    assert_eq!(state.progress.total_sessions, 0);
    assert!(state.progress.lesson_views.is_empty());
    assert!(state.profiles.is_empty());
    assert!(state.active_profile.is_none());
    assert!(!state.onboarding_complete);
}

#[test]
fn test_persisted_layout_uses_fixed_keys() {
    let kv = MemoryKvStore::new();
    let state = PersistedState {
        active_profile: Some(DogProfile::new("Biscuit").unwrap()),
        onboarding_complete: true,
        ..PersistedState::default()
    };
    save_state(&kv, &state).unwrap();

    assert_eq!(
        kv.keys(),
        vec![DOG_PROFILE_KEY, DOG_PROFILES_KEY, ONBOARDING_COMPLETE_KEY, USER_PROGRESS_KEY]
    );
    assert_eq!(kv.get(ONBOARDING_COMPLETE_KEY).unwrap().as_deref(), Some("true"));
    let progress: serde_json::Value = serde_json::from_str(&kv.get(USER_PROGRESS_KEY).unwrap().unwrap()).unwrap();
    assert!(progress.get("completedLessons").is_some());
    assert!(progress.get("lastTrainingDate").is_some());
    assert_eq!(load_state(&kv), state);
}

#[test]
fn test_write_failure_keeps_memory() {
    let store = ProgressStore::open(sample_catalog(), Arc::new(BrokenKvStore));
    assert!(store.complete_lesson("sit-1"));
    assert!(store.progress().is_completed("sit-1"));
    assert_eq!(store.metrics().persist_failures, 1);
    assert!(store.flush().is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_persists_in_background_inside_runtime() {
    let (store, kv) = memory_store();
    store.complete_lesson("sit-1");
    store.complete_lesson("stay-1");

    // memory is current before any write lands
    assert_eq!(store.progress().completed_lessons.len(), 2);

    let deadline = Instant::now() + Duration::from_secs(5);
    while store.metrics().persist_writes + store.metrics().persist_stale_skips < 2 {
        assert!(Instant::now() < deadline, "background writes never finished");
        std::thread::sleep(Duration::from_millis(10));
    }
    let persisted = load_state(kv.as_ref());
    assert_eq!(persisted.progress.completed_lessons.len(), 2);
}

#[test]
fn test_date_only_training_date_keeps_progress() {
    let kv = Arc::new(MemoryKvStore::new());
    kv.set(
        USER_PROGRESS_KEY,
        r#"{"completedLessons":["sit-1","stay-1"],"currentStreak":4,"isPremium":true,"lastTrainingDate":"2024-05-10"}"#,
    )
    .unwrap();

    let state = load_state(kv.as_ref());
    assert_eq!(state.progress.completed_lessons.len(), 2);
    assert_eq!(state.progress.current_streak, 4);
    assert!(state.progress.is_premium);
    assert_eq!(
        state.progress.last_training_date,
        Some(Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap())
    );

    // the next command writes the same progress back, not defaults
    let store = ProgressStore::open(sample_catalog(), kv.clone());
    store.record_lesson_view("come-1");
    let reloaded = load_state(kv.as_ref());
    assert!(reloaded.progress.is_completed("sit-1"));
    assert!(reloaded.progress.is_completed("stay-1"));
    assert!(reloaded.progress.is_premium);
    assert_eq!(reloaded.progress.current_streak, 4);
}

#[test]
fn test_unreadable_training_date_becomes_none() {
    let kv = MemoryKvStore::new();
    for raw in [r#""last tuesday""#, "42", "null"] {
        let record = format!(r#"{{"completedLessons":["sit-1"],"totalSessions":3,"lastTrainingDate":{}}}"#, raw);
        kv.set(USER_PROGRESS_KEY, &record).unwrap();

        let state = load_state(&kv);
        assert!(state.progress.last_training_date.is_none(), "{}", raw);
        assert!(state.progress.is_completed("sit-1"), "{}", raw);
        assert_eq!(state.progress.total_sessions, 3, "{}", raw);
    }
    assert!(kv.get(&unreadable_key(USER_PROGRESS_KEY)).unwrap().is_none());
}

#[test]
fn test_training_date_formats() {
    assert_eq!(
        parse_training_date("2024-05-10T18:30:00+02:00"),
        Some(Utc.with_ymd_and_hms(2024, 5, 10, 16, 30, 0).unwrap())
    );
    assert_eq!(
        parse_training_date(" 2024-05-10 "),
        Some(Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap())
    );
    assert!(parse_training_date("2024-13-40").is_none());
    assert!(parse_training_date("").is_none());
}

#[test]
fn test_unparseable_record_is_kept_aside_before_overwrite() {
    let kv = Arc::new(MemoryKvStore::new());
    let raw = r#"{"completedLessons":"sit-1","currentStreak":9}"#;
    kv.set(USER_PROGRESS_KEY, raw).unwrap();

    let store = ProgressStore::open(sample_catalog(), kv.clone());
    assert!(store.progress().completed_lessons.is_empty());
    store.complete_lesson("sit-1");

    let backup_key = unreadable_key(USER_PROGRESS_KEY);
    assert_eq!(kv.get(&backup_key).unwrap().as_deref(), Some(raw));
    assert!(load_state(kv.as_ref()).progress.is_completed("sit-1"));

    // a later bad record does not replace the first preserved copy
    kv.set(USER_PROGRESS_KEY, "{").unwrap();
    load_state(kv.as_ref());
    assert_eq!(kv.get(&backup_key).unwrap().as_deref(), Some(raw));
}

#[test]
fn test_unparseable_record_is_kept_aside_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let kv = Arc::new(FileKvStore::new(dir.path()));
    kv.set(DOG_PROFILES_KEY, "[{\"breed\":").unwrap();

    let store = ProgressStore::open(sample_catalog(), kv.clone());
    store.add_profile(DogProfile::new("Mochi").unwrap());
    store.flush().unwrap();

    assert!(dir.path().join("dogProfiles-unreadable.json").exists());
    assert_eq!(load_state(kv.as_ref()).profiles.len(), 1);
}

#[test]
fn test_profiles_without_ids_load() {
    let kv = Arc::new(MemoryKvStore::new());
    let biscuit = r#"{"name":"Biscuit","breed":"Beagle","sessionNotes":[{"lessonId":"sit-1","date":"2024-05-10","wentWell":"fast"}]}"#;
    kv.set(DOG_PROFILE_KEY, biscuit).unwrap();
    kv.set(DOG_PROFILES_KEY, &format!("[{}]", biscuit)).unwrap();

    let state = load_state(kv.as_ref());
    let active = state.active_profile.clone().unwrap();
    assert_eq!(active.name, "Biscuit");
    assert_eq!(active.breed.as_deref(), Some("Beagle"));
    assert_eq!(active.id, "biscuit");
    assert_eq!(state.profiles.len(), 1);
    assert_eq!(state.profiles[0].id, active.id);
    assert_eq!(
        active.session_notes[0].date,
        Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap()
    );

    let store = ProgressStore::open(sample_catalog(), kv);
    store.set_last_viewed_lesson("stay-1");
    assert_eq!(store.profiles().len(), 1);
    assert_eq!(store.profiles()[0].last_viewed_lesson.as_deref(), Some("stay-1"));
    assert!(store.set_active_profile("biscuit"));
}

#[test]
fn test_id_less_profiles_with_same_name_get_distinct_ids() {
    let kv = MemoryKvStore::new();
    kv.set(DOG_PROFILES_KEY, r#"[{"name":"Rex"},{"name":"Rex"},{"id":"rex-2","name":"Rex II"}]"#).unwrap();
    kv.set(DOG_PROFILE_KEY, r#"{"name":"Luna"}"#).unwrap();

    let state = load_state(&kv);
    let ids: Vec<&str> = state.profiles.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["rex", "rex-3", "rex-2"]);
    assert_eq!(state.active_profile.unwrap().id, "luna");
}

#[test]
fn test_concurrent_handles_persist_latest_state() {
    let (store, kv) = memory_store();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let store = store.clone();
            std::thread::spawn(move || {
                for round in 0..25 {
                    store.record_lesson_view(if i % 2 == 0 { "sit-1" } else { "come-1" });
                    if round % 10 == 0 {
                        store.toggle_premium();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let progress = store.progress();
    assert_eq!(progress.views_of("sit-1") + progress.views_of("come-1"), 100);
    assert_eq!(load_state(kv.as_ref()), store.snapshot());

    store.flush().unwrap();
    assert_eq!(load_state(kv.as_ref()), store.snapshot());
}

#[test]
fn test_clear_state_removes_every_record() {
    let kv = MemoryKvStore::new();
    let state = PersistedState {
        active_profile: Some(DogProfile::new("Biscuit").unwrap()),
        onboarding_complete: true,
        ..PersistedState::default()
    };
    save_state(&kv, &state).unwrap();

    clear_state(&kv).unwrap();
    assert!(kv.keys().is_empty());
    assert_eq!(load_state(&kv), PersistedState::default());
    clear_state(&kv).unwrap();
}

#[test]
fn test_profile_builders_and_notes() {
    let (store, _) = memory_store();
    let profile = DogProfile::new("  Pepper ").unwrap().with_age("2 years").with_breed("Collie");
    assert_eq!(profile.name, "Pepper");
    assert!(profile.id.starts_with("pepper-"));
    assert!(DogProfile::new("   ").is_err());
    store.complete_onboarding(profile);

    let day = Utc.with_ymd_and_hms(2024, 5, 10, 18, 0, 0).unwrap();
    store.add_session_note_at("sit-1", "quick sit", "", day);
    store.add_session_note_at("come-1", "", "distracted", day);
    store.add_session_note_at("sit-1", "held it", "", day);

    let active = store.active_profile().unwrap();
    assert_eq!(active.age.as_deref(), Some("2 years"));
    let sit_notes: Vec<&str> = active.notes_for("sit-1").map(|n| n.went_well.as_str()).collect();
    assert_eq!(sit_notes, vec!["quick sit", "held it"]);
    assert_eq!(active.notes_for("stay-1").count(), 0);
}
