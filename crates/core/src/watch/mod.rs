//! Client-local watch state: history, continue watching, favorites,
//! recent searches and player preferences.
//!
//! Every mutation is a single synchronous read-modify-write, persisted to
//! the key-value store before it returns. Persistence failures are logged
//! and counted but never roll back the in-memory change.

mod legacy;
mod player;
mod searches;
mod store;
mod succession;
mod types;

pub use player::{PlayerPreferences, PlayerPreferencesStore, PlayerPreferencesUpdate};
pub use searches::RecentSearches;
pub use store::{HydrateSource, RecordedProgress, WatchStateStore};
pub use succession::next_episode;
pub use types::*;

use thiserror::Error;

use crate::catalog::MediaKind;
use crate::storage::StorageError;

/// Maximum number of history entries kept.
pub const HISTORY_CAP: usize = 100;
/// Maximum number of continue-watching entries kept.
pub const CONTINUE_WATCHING_CAP: usize = 20;
/// Progress at or above which a title counts as finished.
pub const FINISHED_THRESHOLD: f64 = 90.0;
/// Maximum number of recent searches kept.
pub const RECENT_SEARCHES_CAP: usize = 10;
/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum WatchStateError {
    #[error("Progress must be a finite number, got {0}")]
    InvalidProgress(f64),

    #[error("Episode progress for series {id} needs a season and episode number")]
    MissingEpisode { id: u64 },

    #[error("{kind} {id} cannot carry an episode")]
    UnexpectedEpisode { id: u64, kind: MediaKind },

    #[error("Invalid snapshot: {0}")]
    Snapshot(String),

    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
