//! Application context: the gateway, cache and watch state built once at
//! boot and handed to every consumer.

use futures::future::join_all;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::cache::CachedCatalog;
use crate::catalog::{image_url, CatalogError, CatalogSource, ItemDetail, TmdbGateway};
use crate::config::Config;
use crate::playback::PlaybackSession;
use crate::storage::{KeyValueStore, SqliteKeyValueStore, StorageError};
use crate::throttle::{RequestThrottle, ThrottleStatus};
use crate::watch::{
    ContinueWatchingEntry, PlayerPreferencesStore, ProgressUpdate, RecentSearches,
    WatchStateError, WatchStateStore,
};

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Catalog setup failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Storage setup failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Watch state setup failed: {0}")]
    WatchState(#[from] WatchStateError),
}

/// A continue-watching entry joined with the title's catalog detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedContinueWatching {
    #[serde(flatten)]
    pub entry: ContinueWatchingEntry,
    pub detail: ItemDetail,
}

/// Continue watching with details. Entries whose detail could not be
/// fetched are left out and counted in `failed`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinueWatchingDetails {
    pub items: Vec<EnrichedContinueWatching>,
    pub failed: usize,
}

/// Everything a consumer needs, constructed once per process (or per test).
pub struct AppContext {
    config: Config,
    catalog: Arc<CachedCatalog>,
    throttle: Option<Arc<RequestThrottle>>,
    watch: Arc<WatchStateStore>,
    searches: Arc<RecentSearches>,
    player: Arc<PlayerPreferencesStore>,
}

impl AppContext {
    /// Build the TMDB gateway and SQLite-backed state from configuration.
    pub fn from_config(config: Config) -> Result<Self, ContextError> {
        let throttle = Arc::new(RequestThrottle::per_second(
            config.catalog.requests_per_second,
        ));
        let gateway = TmdbGateway::with_throttle(&config.catalog, Arc::clone(&throttle))?;
        let storage = SqliteKeyValueStore::new(Path::new(&config.storage.path))?;
        info!(
            base_url = %config.catalog.base_url,
            storage = %config.storage.path.display(),
            requests_per_second = config.catalog.requests_per_second,
            "Catalog gateway ready"
        );

        let mut context = Self::with_parts(config, Arc::new(gateway), Arc::new(storage))?;
        context.throttle = Some(throttle);
        Ok(context)
    }

    /// Assemble a context from an arbitrary source and store, then load the
    /// persisted watch state.
    pub fn with_parts(
        config: Config,
        source: Arc<dyn CatalogSource>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Result<Self, ContextError> {
        let catalog = Arc::new(CachedCatalog::from_config(source, &config.cache));

        let watch = Arc::new(WatchStateStore::new(Arc::clone(&storage)));
        match watch.hydrate() {
            Ok(source) => info!(?source, "Watch state hydrated"),
            Err(WatchStateError::Storage(e)) => return Err(e.into()),
            Err(e) => warn!(error = %e, "Ignoring unreadable watch state"),
        }

        let searches = Arc::new(RecentSearches::load(Arc::clone(&storage))?);
        let player = Arc::new(PlayerPreferencesStore::load(storage)?);

        Ok(Self {
            config,
            catalog,
            throttle: None,
            watch,
            searches,
            player,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<CachedCatalog> {
        &self.catalog
    }

    pub fn watch(&self) -> &Arc<WatchStateStore> {
        &self.watch
    }

    pub fn searches(&self) -> &Arc<RecentSearches> {
        &self.searches
    }

    pub fn player(&self) -> &Arc<PlayerPreferencesStore> {
        &self.player
    }

    /// Continue watching joined with cached catalog details, fetched
    /// concurrently. A failed lookup drops only its own entry.
    pub async fn continue_watching_details(&self) -> ContinueWatchingDetails {
        let entries = self.watch.continue_watching();
        let lookups = entries
            .iter()
            .map(|entry| self.catalog.detail(entry.kind, entry.id));
        let details = join_all(lookups).await;

        let mut items = Vec::with_capacity(entries.len());
        let mut failed = 0;
        for (entry, detail) in entries.into_iter().zip(details) {
            match detail {
                Ok(detail) => items.push(EnrichedContinueWatching { entry, detail }),
                Err(e) => {
                    warn!(id = entry.id, kind = %entry.kind, error = %e, "Skipping continue-watching entry without detail");
                    failed += 1;
                }
            }
        }

        ContinueWatchingDetails { items, failed }
    }

    /// Status of the outbound throttle, when the context owns one.
    pub fn throttle_status(&self) -> Option<ThrottleStatus> {
        self.throttle.as_ref().map(|t| t.status())
    }

    /// Full image URL for a poster or backdrop path.
    pub fn image_url(&self, path: &str, size: &str) -> String {
        image_url(&self.config.catalog.image_base_url, path, size)
    }

    /// Start a playback session with the configured save interval.
    pub fn playback_session(&self, target: ProgressUpdate) -> PlaybackSession {
        PlaybackSession::new(
            Arc::clone(&self.watch),
            target,
            self.config.playback.save_interval(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogSource, MediaKind};
    use crate::config::{CatalogConfig, Config};
    use crate::storage::{MemoryKeyValueStore, PLAYER_PREFERENCES_KEY, WATCH_STATE_KEY};
    use crate::testing::{fixtures, MockCatalog};

    fn config() -> Config {
        Config {
            catalog: CatalogConfig::with_api_key("test-token"),
            cache: Default::default(),
            storage: Default::default(),
            playback: Default::default(),
            server: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_with_parts_serves_cached_catalog() {
        let mock = Arc::new(MockCatalog::new());
        mock.add_detail(fixtures::movie_detail(603, "The Matrix"))
            .await;
        let context = AppContext::with_parts(
            config(),
            mock.clone(),
            Arc::new(MemoryKeyValueStore::new()),
        )
        .unwrap();

        context.catalog().detail(MediaKind::Movie, 603).await.unwrap();
        context.catalog().detail(MediaKind::Movie, 603).await.unwrap();
        assert_eq!(mock.call_count().await, 1);
        assert!(context.throttle_status().is_none());
    }

    #[tokio::test]
    async fn test_continue_watching_details_skip_failed_lookups() {
        let mock = Arc::new(MockCatalog::new());
        mock.add_detail(fixtures::movie_detail(603, "The Matrix"))
            .await;
        mock.add_detail(fixtures::series_detail(1399, "Game of Thrones", 8, 10))
            .await;
        let context = AppContext::with_parts(
            config(),
            mock.clone(),
            Arc::new(MemoryKeyValueStore::new()),
        )
        .unwrap();

        let watch = context.watch();
        watch.record_progress(&ProgressUpdate::movie(603, 30.0)).unwrap();
        watch.record_progress(&ProgressUpdate::movie(999, 30.0)).unwrap();
        watch
            .record_progress(&ProgressUpdate::episode(1399, 1, 2, 50.0))
            .unwrap();
        watch.record_progress(&ProgressUpdate::movie(13, 95.0)).unwrap();

        let details = context.continue_watching_details().await;
        assert_eq!(details.failed, 1);
        let ids: Vec<u64> = details.items.iter().map(|i| i.entry.id).collect();
        assert_eq!(ids, vec![1399, 603]);
        assert_eq!(details.items[1].detail.item.title, "The Matrix");
        assert_eq!(details.items[0].entry.episode, Some(2));

        // Details come from the cache on the second pass.
        let calls = mock.call_count().await;
        context.continue_watching_details().await;
        assert_eq!(mock.call_count().await, calls + 1);
    }

    #[test]
    fn test_player_preferences_are_loaded_from_storage() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        storage
            .put(PLAYER_PREFERENCES_KEY, r#"{"autoplay":false,"autonext":false}"#)
            .unwrap();

        let context =
            AppContext::with_parts(config(), Arc::new(MockCatalog::new()), storage).unwrap();
        assert!(!context.player().get().autoplay);
        assert!(!context.player().get().autonext);
    }

    #[test]
    fn test_corrupt_watch_state_is_ignored() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        storage.put(WATCH_STATE_KEY, "{broken").unwrap();

        let context =
            AppContext::with_parts(config(), Arc::new(MockCatalog::new()), storage).unwrap();
        assert!(context.watch().history().is_empty());
    }

    #[test]
    fn test_isolated_contexts() {
        let a = AppContext::with_parts(
            config(),
            Arc::new(MockCatalog::new()),
            Arc::new(MemoryKeyValueStore::new()),
        )
        .unwrap();
        let b = AppContext::with_parts(
            config(),
            Arc::new(MockCatalog::new()),
            Arc::new(MemoryKeyValueStore::new()),
        )
        .unwrap();

        a.watch().set_favorite(1, MediaKind::Movie, true);
        assert!(!b.watch().is_favorite(1, MediaKind::Movie));
    }

    #[test]
    fn test_from_config_uses_sqlite_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = config();
        config.storage.path = dir.path().join("state.db");

        let context = AppContext::from_config(config).unwrap();
        assert!(context.throttle_status().is_some());
        assert_eq!(
            context.image_url("/abc.jpg", "w500"),
            "https://image.tmdb.org/t/p/w500/abc.jpg"
        );
    }
}
