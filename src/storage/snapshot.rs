use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::PawError;
use crate::progress::model::Progress;
use crate::progress::profile::{legacy_profile_id, DogProfile};
use crate::storage::KeyValueStore;

pub const USER_PROGRESS_KEY: &str = "userProgress";
pub const DOG_PROFILE_KEY: &str = "dogProfile";
pub const DOG_PROFILES_KEY: &str = "dogProfiles";
pub const ONBOARDING_COMPLETE_KEY: &str = "onboardingComplete";

/// Everything the app persists, as four independent records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub progress: Progress,
    pub active_profile: Option<DogProfile>,
    pub profiles: Vec<DogProfile>,
    pub onboarding_complete: bool,
}

/// Side key holding the raw text of a record that failed to parse
pub fn unreadable_key(key: &str) -> String {
    format!("{}-unreadable", key)
}

/// Read one record, falling back to the default when it is missing or
/// unreadable. Storage is never allowed to block startup. The raw text of
/// an unparseable record is kept under [`unreadable_key`] before the next
/// save replaces it.
fn load_record<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> T {
    match store.get(key) {
        Ok(Some(data)) => match serde_json::from_str::<T>(&data) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = key, error = %e, "Failed to parse stored record, using defaults");
                preserve_unreadable(store, key, &data);
                T::default()
            }
        },
        Ok(None) => {
            tracing::debug!(key = key, "No stored record, using defaults");
            T::default()
        }
        Err(e) => {
            tracing::warn!(key = key, error = %e, "Failed to read stored record, using defaults");
            T::default()
        }
    }
}

fn preserve_unreadable(store: &dyn KeyValueStore, key: &str, data: &str) {
    let backup = unreadable_key(key);
    // First copy wins
    match store.get(&backup) {
        Ok(Some(_)) => {
            tracing::debug!(key = key, backup = %backup, "Unreadable record already preserved");
        }
        _ => match store.set(&backup, data) {
            Ok(()) => tracing::info!(key = key, backup = %backup, "Preserved unreadable record"),
            Err(e) => tracing::error!(key = key, error = %e, "Failed to preserve unreadable record"),
        },
    }
}

pub fn load_state(store: &dyn KeyValueStore) -> PersistedState {
    let mut state = PersistedState {
        progress: load_record(store, USER_PROGRESS_KEY),
        active_profile: load_record(store, DOG_PROFILE_KEY),
        profiles: load_record(store, DOG_PROFILES_KEY),
        onboarding_complete: load_record(store, ONBOARDING_COMPLETE_KEY),
    };
    backfill_profile_ids(&mut state);
    state
}

/// Give id-less profiles (saved before profiles carried ids) a stable id.
/// The active profile and its entry in the list end up with the same id.
fn backfill_profile_ids(state: &mut PersistedState) {
    let mut taken: HashSet<String> = state
        .profiles
        .iter()
        .chain(state.active_profile.iter())
        .filter(|p| !p.id.is_empty())
        .map(|p| p.id.clone())
        .collect();

    for profile in state.profiles.iter_mut().filter(|p| p.id.is_empty()) {
        profile.id = unique_legacy_id(&profile.name, &mut taken);
        tracing::info!(profile_id = %profile.id, "Assigned id to stored profile");
    }

    if let Some(active) = state.active_profile.as_mut().filter(|p| p.id.is_empty()) {
        let twin = state.profiles.iter().find(|p| p.name == active.name);
        active.id = match twin {
            Some(p) => p.id.clone(),
            None => unique_legacy_id(&active.name, &mut taken),
        };
        tracing::info!(profile_id = %active.id, "Assigned id to stored active profile");
    }
}

fn unique_legacy_id(name: &str, taken: &mut HashSet<String>) -> String {
    let base = legacy_profile_id(name);
    let mut id = base.clone();
    let mut n = 2;
    while taken.contains(&id) {
        id = format!("{}-{}", base, n);
        n += 1;
    }
    taken.insert(id.clone());
    id
}

fn save_record<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), PawError> {
    let json = serde_json::to_string(value)
        .map_err(|e| PawError::new(
            format!("Failed to serialize {}: {}", key, e),
            "json_serialize"
        ))?;
    store.set(key, &json)
        .map_err(|e| PawError::from(e).with_context(format!("key: {}", key)))
}

/// Write all four records. Stops at the first failure.
pub fn save_state(store: &dyn KeyValueStore, state: &PersistedState) -> Result<(), PawError> {
    save_record(store, USER_PROGRESS_KEY, &state.progress)?;
    match &state.active_profile {
        Some(profile) => save_record(store, DOG_PROFILE_KEY, profile)?,
        None => store.remove(DOG_PROFILE_KEY)?,
    }
    save_record(store, DOG_PROFILES_KEY, &state.profiles)?;
    save_record(store, ONBOARDING_COMPLETE_KEY, &state.onboarding_complete)?;
    Ok(())
}

/// Remove every persisted record
pub fn clear_state(store: &dyn KeyValueStore) -> Result<(), PawError> {
    for key in [USER_PROGRESS_KEY, DOG_PROFILE_KEY, DOG_PROFILES_KEY, ONBOARDING_COMPLETE_KEY] {
        store.remove(key)?;
    }
    Ok(())
}
