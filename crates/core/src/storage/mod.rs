//! Durable key-value blob storage for client-local state.
//!
//! Watch state, recent searches and player preferences are persisted as serialized JSON blobs
//! under fixed keys and rehydrated once at startup.

mod memory;
mod sqlite;

pub use memory::MemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;

use thiserror::Error;

/// Storage key of the watch-state snapshot.
pub const WATCH_STATE_KEY: &str = "watch-state";
/// Storage key of the pre-snapshot preferences blob, imported once.
pub const LEGACY_PREFERENCES_KEY: &str = "mavida-user-preferences";
/// Storage key of the recent-searches list.
pub const SEARCH_HISTORY_KEY: &str = "search-history";
/// Storage key of the autoplay and auto-next toggles.
pub const PLAYER_PREFERENCES_KEY: &str = "player-preferences";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Failed to encode value: {0}")]
    Serialization(String),
}

/// Trait for key-value blob storage.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// All stored keys, sorted.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}
