use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::legacy;
use super::succession::next_episode;
use super::{
    ContinueWatchingEntry, EpisodePointer, FavoriteEntry, ProgressUpdate, WatchHistoryEntry,
    WatchKey, WatchStateError, WatchStateSnapshot, CONTINUE_WATCHING_CAP, FINISHED_THRESHOLD,
    HISTORY_CAP,
};
use crate::catalog::MediaKind;
use crate::metrics;
use crate::storage::{KeyValueStore, LEGACY_PREFERENCES_KEY, WATCH_STATE_KEY};

/// Where [`WatchStateStore::hydrate`] found its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrateSource {
    Snapshot,
    Legacy,
    Empty,
}

/// Outcome of a progress write.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedProgress {
    pub entry: WatchHistoryEntry,
    /// Successor episode for series, if one exists.
    pub next_episode: Option<EpisodePointer>,
    /// Whether the title is now listed under continue watching.
    pub in_progress: bool,
}

#[derive(Default)]
struct WatchState {
    history: Vec<WatchHistoryEntry>,
    continue_watching: Vec<ContinueWatchingEntry>,
    favorites: Vec<FavoriteEntry>,
    favorite_index: HashSet<(u64, MediaKind)>,
}

impl WatchState {
    /// Rebuild state from a snapshot, restoring the invariants a live store
    /// keeps: progress within 0-100, one history entry per key, one
    /// continue-watching entry per title and none at or above the finished
    /// threshold, newest first, within the caps.
    fn from_snapshot(snapshot: WatchStateSnapshot) -> Self {
        let WatchStateSnapshot {
            mut history,
            favorites,
            mut continue_watching,
            ..
        } = snapshot;
        let loaded = history.len() + continue_watching.len() + favorites.len();

        for entry in &mut history {
            entry.progress = normalize_progress(entry.progress);
        }
        history.sort_by(|a, b| b.last_watched.cmp(&a.last_watched));
        let mut keys = HashSet::new();
        history.retain(|h| keys.insert(h.key()));
        history.truncate(HISTORY_CAP);

        for entry in &mut continue_watching {
            entry.progress = normalize_progress(entry.progress);
        }
        continue_watching.sort_by(|a, b| b.last_watched.cmp(&a.last_watched));
        let mut titles = HashSet::new();
        continue_watching
            .retain(|c| titles.insert((c.id, c.kind)) && c.progress < FINISHED_THRESHOLD);
        continue_watching.truncate(CONTINUE_WATCHING_CAP);

        let mut favorite_index = HashSet::new();
        let favorites: Vec<FavoriteEntry> = favorites
            .into_iter()
            .filter(|f| favorite_index.insert((f.id, f.kind)))
            .collect();

        let dropped = loaded - (history.len() + continue_watching.len() + favorites.len());
        if dropped > 0 {
            warn!(dropped, "Dropped duplicate, finished or over-cap watch-state entries");
        }

        Self {
            history,
            continue_watching,
            favorites,
            favorite_index,
        }
    }

    fn snapshot(&self) -> WatchStateSnapshot {
        WatchStateSnapshot {
            history: self.history.clone(),
            favorites: self.favorites.clone(),
            continue_watching: self.continue_watching.clone(),
            ..WatchStateSnapshot::default()
        }
    }
}

fn normalize_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 100.0)
    }
}

/// Favorites, watch history and continue watching for one client.
pub struct WatchStateStore {
    state: Mutex<WatchState>,
    storage: Arc<dyn KeyValueStore>,
    revision: watch::Sender<u64>,
    last_persist_error: Mutex<Option<String>>,
}

impl WatchStateStore {
    /// Create an empty store. Call [`hydrate`](Self::hydrate) before first read.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Mutex::new(WatchState::default()),
            storage,
            revision,
            last_persist_error: Mutex::new(None),
        }
    }

    fn state(&self) -> MutexGuard<'_, WatchState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Load persisted state, importing the legacy preferences blob once if
    /// no snapshot exists yet.
    pub fn hydrate(&self) -> Result<HydrateSource, WatchStateError> {
        if let Some(json) = self.storage.get(WATCH_STATE_KEY)? {
            let snapshot = WatchStateSnapshot::from_json(&json)?;
            info!(
                history = snapshot.history.len(),
                favorites = snapshot.favorites.len(),
                "Loaded watch state"
            );
            *self.state() = WatchState::from_snapshot(snapshot);
            self.bump();
            return Ok(HydrateSource::Snapshot);
        }

        let Some(json) = self.storage.get(LEGACY_PREFERENCES_KEY)? else {
            debug!("No persisted watch state");
            return Ok(HydrateSource::Empty);
        };

        let snapshot = legacy::migrate(&json, Utc::now())?;
        self.storage.put(WATCH_STATE_KEY, &snapshot.to_json()?)?;
        self.storage.remove(LEGACY_PREFERENCES_KEY)?;
        info!(
            history = snapshot.history.len(),
            favorites = snapshot.favorites.len(),
            "Migrated legacy user preferences"
        );
        *self.state() = WatchState::from_snapshot(snapshot);
        self.bump();
        Ok(HydrateSource::Legacy)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Apply `mutate` and persist the result while still holding the state lock,
    /// so stored snapshots are written in mutation order.
    fn mutate<R>(&self, operation: &'static str, mutate: impl FnOnce(&mut WatchState) -> R) -> R {
        let result = {
            let mut state = self.state();
            let result = mutate(&mut state);
            self.persist(&state.snapshot());
            result
        };
        metrics::WATCH_MUTATIONS.with_label_values(&[operation]).inc();
        self.bump();
        result
    }

    fn persist(&self, snapshot: &WatchStateSnapshot) {
        let outcome = snapshot
            .to_json()
            .and_then(|json| Ok(self.storage.put(WATCH_STATE_KEY, &json)?));

        let mut last_error = self
            .last_persist_error
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        match outcome {
            Ok(()) => *last_error = None,
            Err(e) => {
                error!(error = %e, "Failed to persist watch state");
                metrics::PERSIST_FAILURES
                    .with_label_values(&[WATCH_STATE_KEY])
                    .inc();
                *last_error = Some(e.to_string());
            }
        }
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Record playback progress at the current time.
    pub fn record_progress(
        &self,
        update: &ProgressUpdate,
    ) -> Result<RecordedProgress, WatchStateError> {
        self.record_progress_at(update, Utc::now())
    }

    /// Record playback progress as of `at`.
    ///
    /// The history entry for the key moves to the front. Finished titles
    /// (progress at or above the threshold) leave continue watching; all
    /// others move to its front.
    pub fn record_progress_at(
        &self,
        update: &ProgressUpdate,
        at: DateTime<Utc>,
    ) -> Result<RecordedProgress, WatchStateError> {
        let progress = update.validated_progress()?;
        let key = update.key();
        let successor = update
            .episode
            .and_then(|ep| next_episode(ep.season, ep.episode, &update.layout));

        let entry = WatchHistoryEntry {
            id: update.id,
            kind: update.kind,
            season: update.episode.map(|ep| ep.season),
            episode: update.episode.map(|ep| ep.episode),
            progress,
            last_watched: at,
            episode_title: update.episode_title.clone(),
            runtime_minutes: update.runtime_minutes,
        };

        let in_progress = progress < FINISHED_THRESHOLD;

        self.mutate("record_progress", |state| {
            state.history.retain(|h| h.key() != key);
            state.history.insert(0, entry.clone());
            state.history.truncate(HISTORY_CAP);

            let previous = state
                .continue_watching
                .iter()
                .position(|c| c.id == update.id && c.kind == update.kind)
                .map(|i| state.continue_watching.remove(i));

            if in_progress {
                let previous = previous.as_ref();
                state.continue_watching.insert(
                    0,
                    ContinueWatchingEntry {
                        id: update.id,
                        kind: update.kind,
                        progress,
                        last_watched: at,
                        title: update
                            .title
                            .clone()
                            .or_else(|| previous.and_then(|p| p.title.clone())),
                        poster_path: update
                            .poster_path
                            .clone()
                            .or_else(|| previous.and_then(|p| p.poster_path.clone())),
                        runtime_minutes: update
                            .runtime_minutes
                            .or_else(|| previous.and_then(|p| p.runtime_minutes)),
                        season: entry.season,
                        episode: entry.episode,
                        episode_title: update.episode_title.clone(),
                        next_episode: successor,
                    },
                );
                state.continue_watching.truncate(CONTINUE_WATCHING_CAP);
            }
        });

        debug!(
            id = update.id,
            kind = %update.kind,
            progress,
            in_progress,
            "Recorded watch progress"
        );

        Ok(RecordedProgress {
            entry,
            next_episode: successor,
            in_progress,
        })
    }

    /// Add or remove a favorite. Adding an existing favorite is a no-op.
    pub fn set_favorite(&self, id: u64, kind: MediaKind, on: bool) {
        self.mutate("set_favorite", |state| {
            if on {
                if state.favorite_index.insert((id, kind)) {
                    state.favorites.insert(
                        0,
                        FavoriteEntry {
                            id,
                            kind,
                            added_at: Utc::now(),
                        },
                    );
                }
            } else if state.favorite_index.remove(&(id, kind)) {
                state.favorites.retain(|f| !(f.id == id && f.kind == kind));
            }
        });
    }

    /// Flip a favorite. Returns the new membership.
    pub fn toggle_favorite(&self, id: u64, kind: MediaKind) -> bool {
        self.mutate("toggle_favorite", |state| {
            if state.favorite_index.remove(&(id, kind)) {
                state.favorites.retain(|f| !(f.id == id && f.kind == kind));
                false
            } else {
                state.favorite_index.insert((id, kind));
                state.favorites.insert(
                    0,
                    FavoriteEntry {
                        id,
                        kind,
                        added_at: Utc::now(),
                    },
                );
                true
            }
        })
    }

    /// Forget every history entry of a title, and its continue-watching entry.
    /// Returns how many history entries were removed.
    pub fn remove_from_history(&self, id: u64, kind: MediaKind) -> usize {
        self.mutate("remove_from_history", |state| {
            let before = state.history.len();
            state.history.retain(|h| !(h.id == id && h.kind == kind));
            state
                .continue_watching
                .retain(|c| !(c.id == id && c.kind == kind));
            before - state.history.len()
        })
    }

    /// Drop a title from continue watching, keeping its history.
    pub fn remove_from_continue_watching(&self, id: u64, kind: MediaKind) -> bool {
        self.mutate("remove_from_continue_watching", |state| {
            let before = state.continue_watching.len();
            state
                .continue_watching
                .retain(|c| !(c.id == id && c.kind == kind));
            state.continue_watching.len() != before
        })
    }

    /// Empty all collections.
    pub fn clear(&self) {
        self.mutate("clear", |state| *state = WatchState::default());
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn is_favorite(&self, id: u64, kind: MediaKind) -> bool {
        self.state().favorite_index.contains(&(id, kind))
    }

    /// Favorites, most recently added first.
    pub fn favorites(&self) -> Vec<FavoriteEntry> {
        self.state().favorites.clone()
    }

    /// History, most recently watched first.
    pub fn history(&self) -> Vec<WatchHistoryEntry> {
        self.state().history.clone()
    }

    /// In-progress titles, most recently watched first.
    pub fn continue_watching(&self) -> Vec<ContinueWatchingEntry> {
        self.state().continue_watching.clone()
    }

    pub fn progress_for(&self, key: &WatchKey) -> Option<WatchHistoryEntry> {
        self.state()
            .history
            .iter()
            .find(|h| h.key() == *key)
            .cloned()
    }

    /// Most recently watched episode of a series.
    pub fn latest_for_series(&self, id: u64) -> Option<WatchHistoryEntry> {
        self.state()
            .history
            .iter()
            .find(|h| h.id == id && h.kind == MediaKind::Series)
            .cloned()
    }

    /// Receiver of a revision counter bumped after every change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Error of the most recent failed write, cleared by the next success.
    pub fn last_persist_error(&self) -> Option<String> {
        self.last_persist_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    pub fn snapshot(&self) -> WatchStateSnapshot {
        self.state().snapshot()
    }

    pub fn export_json(&self) -> Result<String, WatchStateError> {
        self.snapshot().to_json()
    }

    /// Replace all state with a previously exported snapshot.
    pub fn import_json(&self, json: &str) -> Result<(), WatchStateError> {
        let snapshot = WatchStateSnapshot::from_json(json)?;
        self.restore(snapshot);
        Ok(())
    }

    pub fn restore(&self, snapshot: WatchStateSnapshot) {
        self.mutate("import", |state| *state = WatchState::from_snapshot(snapshot));
    }
}
