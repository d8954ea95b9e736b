use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

use super::{CacheKey, FreshnessPolicy, ResponseCache, RetryPolicy};
use crate::catalog::{
    CatalogError, CatalogPage, CatalogSource, Credits, DiscoverFilters, Episode, GenreTable,
    ItemDetail, ListCategory, MediaKind, PageQuery, Relation, SearchQuery, SeasonDetail, Video,
};
use crate::config::CacheConfig;

/// A [`CatalogSource`] that serves responses from a [`ResponseCache`] while
/// they are fresh and refetches them, with retries, once they go stale.
///
/// `full_info` and `details_batch` use the trait defaults, so each part is
/// cached under its own key and the aggregate stays all-or-nothing.
pub struct CachedCatalog {
    source: Arc<dyn CatalogSource>,
    cache: ResponseCache,
    retry: RetryPolicy,
}

impl CachedCatalog {
    pub fn new(source: Arc<dyn CatalogSource>, policy: FreshnessPolicy, retry: RetryPolicy) -> Self {
        Self {
            source,
            cache: ResponseCache::new(policy),
            retry,
        }
    }

    pub fn from_config(source: Arc<dyn CatalogSource>, config: &CacheConfig) -> Self {
        Self::new(
            source,
            FreshnessPolicy::from_config(config),
            RetryPolicy::from_config(config),
        )
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn source(&self) -> &Arc<dyn CatalogSource> {
        &self.source
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Cache an arbitrary fetch under `key` with this catalog's policies.
    pub async fn fetch_with<T, F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<T, CatalogError>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CatalogError>>,
    {
        self.cache.get_or_fetch(key, &self.retry, fetch).await
    }
}

#[async_trait]
impl CatalogSource for CachedCatalog {
    async fn list(
        &self,
        kind: MediaKind,
        category: ListCategory,
        query: &PageQuery,
    ) -> Result<CatalogPage, CatalogError> {
        let key = CacheKey::list(kind, category, query);
        self.fetch_with(&key, || self.source.list(kind, category, query))
            .await
    }

    async fn detail(&self, kind: MediaKind, id: u64) -> Result<ItemDetail, CatalogError> {
        let key = CacheKey::detail(kind, id);
        self.fetch_with(&key, || self.source.detail(kind, id)).await
    }

    async fn credits(&self, kind: MediaKind, id: u64) -> Result<Credits, CatalogError> {
        let key = CacheKey::credits(kind, id);
        self.fetch_with(&key, || self.source.credits(kind, id)).await
    }

    async fn videos(&self, kind: MediaKind, id: u64) -> Result<Vec<Video>, CatalogError> {
        let key = CacheKey::videos(kind, id);
        self.fetch_with(&key, || self.source.videos(kind, id)).await
    }

    async fn related(
        &self,
        kind: MediaKind,
        id: u64,
        relation: Relation,
        query: &PageQuery,
    ) -> Result<CatalogPage, CatalogError> {
        let key = CacheKey::related(kind, id, relation, query);
        self.fetch_with(&key, || self.source.related(kind, id, relation, query))
            .await
    }

    async fn search(
        &self,
        kind: MediaKind,
        query: &SearchQuery,
    ) -> Result<CatalogPage, CatalogError> {
        let key = CacheKey::search(kind, query);
        self.fetch_with(&key, || self.source.search(kind, query))
            .await
    }

    async fn search_multi(&self, query: &SearchQuery) -> Result<CatalogPage, CatalogError> {
        let key = CacheKey::search_multi(query);
        self.fetch_with(&key, || self.source.search_multi(query))
            .await
    }

    async fn discover(
        &self,
        kind: MediaKind,
        filters: &DiscoverFilters,
    ) -> Result<CatalogPage, CatalogError> {
        let key = CacheKey::discover(kind, filters);
        self.fetch_with(&key, || self.source.discover(kind, filters))
            .await
    }

    async fn season(
        &self,
        series_id: u64,
        season_number: u32,
    ) -> Result<SeasonDetail, CatalogError> {
        let key = CacheKey::season(series_id, season_number);
        self.fetch_with(&key, || self.source.season(series_id, season_number))
            .await
    }

    async fn episode(
        &self,
        series_id: u64,
        season_number: u32,
        episode_number: u32,
    ) -> Result<Episode, CatalogError> {
        let key = CacheKey::episode(series_id, season_number, episode_number);
        self.fetch_with(&key, || {
            self.source.episode(series_id, season_number, episode_number)
        })
        .await
    }

    async fn genres(&self, kind: MediaKind) -> Result<GenreTable, CatalogError> {
        let key = CacheKey::genres(kind);
        self.fetch_with(&key, || self.source.genres(kind)).await
    }
}
