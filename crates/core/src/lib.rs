pub mod cache;
pub mod catalog;
pub mod config;
pub mod context;
pub mod metrics;
pub mod playback;
pub mod storage;
pub mod testing;
pub mod throttle;
pub mod watch;

pub use cache::{CacheKey, CachedCatalog, FreshnessPolicy, ResourceClass, ResponseCache, RetryPolicy};
pub use catalog::{
    CatalogError, CatalogItem, CatalogPage, CatalogSource, ListCategory, MediaKind, TmdbGateway,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use context::{AppContext, ContextError};
pub use playback::PlaybackSession;
pub use storage::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StorageError};
pub use throttle::{RequestThrottle, ThrottleStatus};
pub use watch::{
    ContinueWatchingEntry, FavoriteEntry, PlayerPreferences, PlayerPreferencesStore,
    ProgressUpdate, RecentSearches, WatchHistoryEntry, WatchStateError, WatchStateStore,
};
