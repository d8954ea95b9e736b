use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, warn};

use super::{EpisodePointer, WatchStateError};
use crate::metrics;
use crate::storage::{KeyValueStore, PLAYER_PREFERENCES_KEY};

/// Player toggles, both on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPreferences {
    /// Start playback as soon as the player opens.
    #[serde(default = "enabled", alias = "autoplayEnabled")]
    pub autoplay: bool,
    /// Move on to the next episode when one finishes.
    #[serde(default = "enabled", alias = "autonextEnabled")]
    pub autonext: bool,
}

fn enabled() -> bool {
    true
}

impl Default for PlayerPreferences {
    fn default() -> Self {
        Self {
            autoplay: true,
            autonext: true,
        }
    }
}

impl PlayerPreferences {
    /// The episode to continue with, if auto-next is on and one exists.
    pub fn auto_next(&self, next: Option<EpisodePointer>) -> Option<EpisodePointer> {
        next.filter(|_| self.autonext)
    }
}

/// Partial update; absent fields keep their value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PlayerPreferencesUpdate {
    pub autoplay: Option<bool>,
    pub autonext: Option<bool>,
}

/// Blobs written by the previous client wrap the toggles in a `state` object.
#[derive(Deserialize)]
struct Envelope {
    state: PlayerPreferences,
}

fn parse(json: &str) -> Result<PlayerPreferences, serde_json::Error> {
    if let Ok(envelope) = serde_json::from_str::<Envelope>(json) {
        return Ok(envelope.state);
    }
    serde_json::from_str(json)
}

/// Persisted player preferences.
pub struct PlayerPreferencesStore {
    preferences: Mutex<PlayerPreferences>,
    storage: Arc<dyn KeyValueStore>,
}

impl PlayerPreferencesStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            preferences: Mutex::new(PlayerPreferences::default()),
            storage,
        }
    }

    /// Create and load persisted preferences. A corrupt blob falls back to
    /// the defaults.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Result<Self, WatchStateError> {
        let store = Self::new(storage);
        if let Some(json) = store.storage.get(PLAYER_PREFERENCES_KEY)? {
            match parse(&json) {
                Ok(preferences) => *store.preferences() = preferences,
                Err(e) => warn!(error = %e, "Discarding unreadable player preferences"),
            }
        }
        Ok(store)
    }

    fn preferences(&self) -> MutexGuard<'_, PlayerPreferences> {
        self.preferences.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, preferences: &PlayerPreferences) {
        let outcome = serde_json::to_string(preferences)
            .map_err(|e| WatchStateError::Snapshot(e.to_string()))
            .and_then(|json| Ok(self.storage.put(PLAYER_PREFERENCES_KEY, &json)?));
        if let Err(e) = outcome {
            error!(error = %e, "Failed to persist player preferences");
            metrics::PERSIST_FAILURES
                .with_label_values(&[PLAYER_PREFERENCES_KEY])
                .inc();
        }
    }

    pub fn get(&self) -> PlayerPreferences {
        *self.preferences()
    }

    /// Apply `update` and return the resulting preferences.
    pub fn update(&self, update: PlayerPreferencesUpdate) -> PlayerPreferences {
        let mut preferences = self.preferences();
        if let Some(autoplay) = update.autoplay {
            preferences.autoplay = autoplay;
        }
        if let Some(autonext) = update.autonext {
            preferences.autonext = autonext;
        }
        self.persist(&preferences);
        *preferences
    }

    pub fn set_autoplay(&self, enabled: bool) -> PlayerPreferences {
        self.update(PlayerPreferencesUpdate {
            autoplay: Some(enabled),
            autonext: None,
        })
    }

    pub fn set_autonext(&self, enabled: bool) -> PlayerPreferences {
        self.update(PlayerPreferencesUpdate {
            autoplay: None,
            autonext: Some(enabled),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKeyValueStore;

    #[test]
    fn test_defaults_are_enabled() {
        let store = PlayerPreferencesStore::new(Arc::new(MemoryKeyValueStore::new()));
        assert_eq!(
            store.get(),
            PlayerPreferences {
                autoplay: true,
                autonext: true
            }
        );
    }

    #[test]
    fn test_updates_persist_and_reload() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        let store = PlayerPreferencesStore::new(storage.clone());

        let after = store.set_autonext(false);
        assert!(after.autoplay);
        assert!(!after.autonext);
        store.update(PlayerPreferencesUpdate {
            autoplay: Some(false),
            autonext: None,
        });

        let reloaded = PlayerPreferencesStore::load(storage).unwrap();
        assert_eq!(
            reloaded.get(),
            PlayerPreferences {
                autoplay: false,
                autonext: false
            }
        );
    }

    #[test]
    fn test_previous_client_blob_is_read() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        storage
            .put(
                PLAYER_PREFERENCES_KEY,
                r#"{"state":{"autoplayEnabled":false,"autonextEnabled":true},"version":0}"#,
            )
            .unwrap();

        let store = PlayerPreferencesStore::load(storage).unwrap();
        assert!(!store.get().autoplay);
        assert!(store.get().autonext);
    }

    #[test]
    fn test_corrupt_blob_falls_back_to_defaults() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        storage.put(PLAYER_PREFERENCES_KEY, "[1, 2").unwrap();
        let store = PlayerPreferencesStore::load(storage).unwrap();
        assert_eq!(store.get(), PlayerPreferences::default());
    }

    #[test]
    fn test_auto_next_follows_the_toggle() {
        let next = Some(EpisodePointer::new(2, 1));
        let mut preferences = PlayerPreferences::default();
        assert_eq!(preferences.auto_next(next), next);

        preferences.autonext = false;
        assert_eq!(preferences.auto_next(next), None);
        assert_eq!(PlayerPreferences::default().auto_next(None), None);
    }
}
