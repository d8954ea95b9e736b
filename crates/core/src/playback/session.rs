use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::watch::{EpisodePointer, ProgressUpdate, RecordedProgress, WatchStateStore};

/// Forwards player progress for one item or episode to the watch-state
/// store, writing at most once per save interval.
///
/// Only the last write time is kept; sessions are cheap to recreate.
pub struct PlaybackSession {
    store: Arc<WatchStateStore>,
    target: ProgressUpdate,
    save_interval: Duration,
    last_write: Option<Instant>,
    next_episode: Option<EpisodePointer>,
}

impl PlaybackSession {
    /// `target` carries the item identity and display hints; its progress
    /// value is replaced on every write.
    pub fn new(store: Arc<WatchStateStore>, target: ProgressUpdate, save_interval: Duration) -> Self {
        Self {
            store,
            target,
            save_interval,
            last_write: None,
            next_episode: None,
        }
    }

    pub fn target(&self) -> &ProgressUpdate {
        &self.target
    }

    /// Report the player position. Writes when the interval has elapsed
    /// since the previous write; returns whether it did.
    pub fn update_progress(&mut self, current_time: f64, duration: f64) -> bool {
        if !duration.is_finite() || duration <= 0.0 || !current_time.is_finite() {
            return false;
        }

        let now = Instant::now();
        if let Some(last) = self.last_write {
            if now.duration_since(last) < self.save_interval {
                return false;
            }
        }

        let progress = (current_time / duration * 100.0).min(100.0);
        self.write(progress).is_some()
    }

    /// Write `progress` immediately, ignoring the interval.
    pub fn save_progress(&mut self, progress: f64) -> Option<RecordedProgress> {
        self.write(progress)
    }

    /// Record the item as fully watched.
    pub fn mark_complete(&mut self) -> Option<RecordedProgress> {
        self.save_progress(100.0)
    }

    /// Successor episode computed by the last write.
    pub fn next_episode(&self) -> Option<EpisodePointer> {
        self.next_episode
    }

    fn write(&mut self, progress: f64) -> Option<RecordedProgress> {
        self.last_write = Some(Instant::now());
        let update = self.target.clone().with_progress(progress);
        match self.store.record_progress(&update) {
            Ok(recorded) => {
                debug!(id = update.id, progress = recorded.entry.progress, "Saved playback progress");
                self.next_episode = recorded.next_episode;
                Some(recorded)
            }
            Err(e) => {
                warn!(id = update.id, error = %e, "Rejected playback progress");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKeyValueStore;
    use crate::watch::SeriesLayout;

    fn session(target: ProgressUpdate) -> (PlaybackSession, Arc<WatchStateStore>) {
        let store = Arc::new(WatchStateStore::new(Arc::new(MemoryKeyValueStore::new())));
        let session = PlaybackSession::new(store.clone(), target, Duration::from_secs(10));
        (session, store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_updates_are_gated_by_interval() {
        let (mut session, store) = session(ProgressUpdate::movie(603, 0.0));

        assert!(session.update_progress(60.0, 6000.0));
        assert_eq!(store.history()[0].progress, 1.0);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(!session.update_progress(300.0, 6000.0));
        assert_eq!(store.history()[0].progress, 1.0);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(session.update_progress(600.0, 6000.0));
        assert_eq!(store.history()[0].progress, 10.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_is_capped_and_bad_durations_ignored() {
        let (mut session, store) = session(ProgressUpdate::movie(1, 0.0));

        assert!(!session.update_progress(10.0, 0.0));
        assert!(!session.update_progress(10.0, f64::NAN));
        assert!(store.history().is_empty());

        assert!(session.update_progress(7000.0, 6000.0));
        assert_eq!(store.history()[0].progress, 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_progress_bypasses_interval() {
        let (mut session, store) = session(ProgressUpdate::movie(1, 0.0));
        assert!(session.update_progress(100.0, 1000.0));

        let recorded = session.save_progress(50.0).unwrap();
        assert_eq!(recorded.entry.progress, 50.0);
        assert_eq!(store.continue_watching().len(), 1);

        session.mark_complete().unwrap();
        assert!(store.continue_watching().is_empty());
        assert_eq!(store.history()[0].progress, 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_episode_is_exposed() {
        let target = ProgressUpdate::episode(1399, 1, 10, 0.0)
            .with_layout(SeriesLayout::new(10, 2))
            .with_title("Game of Thrones");
        let (mut session, store) = session(target);

        assert_eq!(session.next_episode(), None);
        session.save_progress(40.0);
        assert_eq!(session.next_episode(), Some(EpisodePointer::new(2, 1)));
        assert_eq!(
            store.continue_watching()[0].next_episode,
            Some(EpisodePointer::new(2, 1))
        );
    }
}
