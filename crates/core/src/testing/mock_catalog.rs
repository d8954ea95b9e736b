//! Mock catalog source for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::catalog::{
    validate_page, validate_search, CatalogError, CatalogItem, CatalogPage, CatalogSource,
    Credits, DiscoverFilters, Episode, GenreTable, ItemDetail, ListCategory, MediaKind, PageQuery,
    Relation, SearchQuery, SeasonDetail, Video,
};

/// Items per page served by the mock.
pub const PAGE_SIZE: usize = 20;

/// A recorded catalog call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCatalogCall {
    List { kind: MediaKind, category: ListCategory, page: u32 },
    Detail { kind: MediaKind, id: u64 },
    Credits { kind: MediaKind, id: u64 },
    Videos { kind: MediaKind, id: u64 },
    Related { kind: MediaKind, id: u64, relation: Relation, page: u32 },
    Search { kind: MediaKind, query: String, page: u32 },
    SearchMulti { query: String, page: u32 },
    Discover { kind: MediaKind, page: u32 },
    Season { series_id: u64, season: u32 },
    Episode { series_id: u64, season: u32, episode: u32 },
    Genres { kind: MediaKind },
}

/// Mock implementation of the CatalogSource trait.
///
/// Provides controllable behavior for testing:
/// - Serve configurable lists, details, seasons and genres
/// - Track calls for assertions
/// - Simulate failures and latency
///
/// # Example
///
/// ```rust,ignore
/// use marquee_core::testing::{MockCatalog, fixtures};
///
/// let catalog = MockCatalog::new();
/// catalog.set_list(MediaKind::Movie, ListCategory::Popular, vec![fixtures::movie(603, "The Matrix")]).await;
///
/// let page = catalog.list(MediaKind::Movie, ListCategory::Popular, &PageQuery::default()).await?;
/// assert_eq!(page.items.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockCatalog {
    /// List contents by (kind, category name).
    lists: Arc<RwLock<HashMap<(MediaKind, String), Vec<CatalogItem>>>>,
    /// Details by (kind, id).
    details: Arc<RwLock<HashMap<(MediaKind, u64), ItemDetail>>>,
    credits: Arc<RwLock<HashMap<(MediaKind, u64), Credits>>>,
    videos: Arc<RwLock<HashMap<(MediaKind, u64), Vec<Video>>>>,
    /// Related items by (kind, id).
    related: Arc<RwLock<HashMap<(MediaKind, u64), Vec<CatalogItem>>>>,
    /// Seasons by (series_id, season_number).
    seasons: Arc<RwLock<HashMap<(u64, u32), SeasonDetail>>>,
    genres: Arc<RwLock<HashMap<MediaKind, GenreTable>>>,
    /// Recorded calls.
    calls: Arc<RwLock<Vec<RecordedCatalogCall>>>,
    /// Errors returned by the next calls, in order.
    next_errors: Arc<RwLock<VecDeque<CatalogError>>>,
    /// Simulated response time.
    latency: Arc<RwLock<Option<Duration>>>,
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalog {
    /// Create a new empty mock catalog.
    pub fn new() -> Self {
        Self {
            lists: Arc::new(RwLock::new(HashMap::new())),
            details: Arc::new(RwLock::new(HashMap::new())),
            credits: Arc::new(RwLock::new(HashMap::new())),
            videos: Arc::new(RwLock::new(HashMap::new())),
            related: Arc::new(RwLock::new(HashMap::new())),
            seasons: Arc::new(RwLock::new(HashMap::new())),
            genres: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            next_errors: Arc::new(RwLock::new(VecDeque::new())),
            latency: Arc::new(RwLock::new(None)),
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Set the full contents of a list; pages are cut from it.
    pub async fn set_list(&self, kind: MediaKind, category: ListCategory, items: Vec<CatalogItem>) {
        self.lists
            .write()
            .await
            .insert((kind, category.name()), items);
    }

    /// Add an item detail. Its item also becomes searchable.
    pub async fn add_detail(&self, detail: ItemDetail) {
        self.details
            .write()
            .await
            .insert((detail.item.kind, detail.item.id), detail);
    }

    pub async fn set_credits(&self, kind: MediaKind, id: u64, credits: Credits) {
        self.credits.write().await.insert((kind, id), credits);
    }

    pub async fn set_videos(&self, kind: MediaKind, id: u64, videos: Vec<Video>) {
        self.videos.write().await.insert((kind, id), videos);
    }

    pub async fn set_related(&self, kind: MediaKind, id: u64, items: Vec<CatalogItem>) {
        self.related.write().await.insert((kind, id), items);
    }

    pub async fn add_season(&self, series_id: u64, season: SeasonDetail) {
        self.seasons
            .write()
            .await
            .insert((series_id, season.season_number), season);
    }

    pub async fn set_genres(&self, kind: MediaKind, genres: GenreTable) {
        self.genres.write().await.insert(kind, genres);
    }

    /// Delay every response by `latency`.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = Some(latency);
    }

    // =========================================================================
    // Call Recording
    // =========================================================================

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedCatalogCall> {
        self.calls.read().await.clone()
    }

    /// Clear recorded calls.
    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    /// Get the number of calls performed.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    // =========================================================================
    // Error Injection
    // =========================================================================

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: CatalogError) {
        let mut errors = self.next_errors.write().await;
        errors.clear();
        errors.push_back(error);
    }

    /// Configure the next calls to fail, one error per call.
    pub async fn queue_errors(&self, errors: Vec<CatalogError>) {
        self.next_errors.write().await.extend(errors);
    }

    /// Clear any pending errors.
    pub async fn clear_next_error(&self) {
        self.next_errors.write().await.clear();
    }

    /// Record a call, wait out the latency and take the next error if set.
    async fn enter(&self, call: RecordedCatalogCall) -> Result<(), CatalogError> {
        self.calls.write().await.push(call);
        let latency = *self.latency.read().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match self.next_errors.write().await.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn searchable(&self, kind: Option<MediaKind>) -> Vec<CatalogItem> {
        let mut items: Vec<CatalogItem> = self
            .details
            .read()
            .await
            .values()
            .map(|d| d.item.clone())
            .collect();
        for list in self.lists.read().await.values() {
            items.extend(list.iter().cloned());
        }

        let mut seen = std::collections::HashSet::new();
        items.sort_by_key(|i| (i.kind, i.id));
        items
            .into_iter()
            .filter(|i| kind.map_or(true, |k| i.kind == k))
            .filter(|i| seen.insert((i.kind, i.id)))
            .collect()
    }
}

fn not_found(what: String) -> CatalogError {
    CatalogError::NotFound {
        status: 404,
        message: format!("{what} not found"),
    }
}

/// Cut page `page` (1-based) out of `items`.
pub fn paginate(items: &[CatalogItem], page: u32) -> CatalogPage {
    let total_results = items.len() as u32;
    let total_pages = items.len().div_ceil(PAGE_SIZE).max(1) as u32;
    let start = (page.saturating_sub(1) as usize) * PAGE_SIZE;
    CatalogPage {
        items: items.iter().skip(start).take(PAGE_SIZE).cloned().collect(),
        page,
        total_pages,
        total_results,
    }
}

#[async_trait]
impl CatalogSource for MockCatalog {
    async fn list(
        &self,
        kind: MediaKind,
        category: ListCategory,
        query: &PageQuery,
    ) -> Result<CatalogPage, CatalogError> {
        validate_page(query.page)?;
        category.path(kind)?;
        self.enter(RecordedCatalogCall::List {
            kind,
            category,
            page: query.page,
        })
        .await?;

        let lists = self.lists.read().await;
        let items = lists
            .get(&(kind, category.name()))
            .map(Vec::as_slice)
            .unwrap_or_default();
        Ok(paginate(items, query.page))
    }

    async fn detail(&self, kind: MediaKind, id: u64) -> Result<ItemDetail, CatalogError> {
        self.enter(RecordedCatalogCall::Detail { kind, id }).await?;

        self.details
            .read()
            .await
            .get(&(kind, id))
            .cloned()
            .ok_or_else(|| not_found(format!("{kind} {id}")))
    }

    async fn credits(&self, kind: MediaKind, id: u64) -> Result<Credits, CatalogError> {
        self.enter(RecordedCatalogCall::Credits { kind, id }).await?;

        if let Some(credits) = self.credits.read().await.get(&(kind, id)) {
            return Ok(credits.clone());
        }
        if self.details.read().await.contains_key(&(kind, id)) {
            return Ok(Credits::default());
        }
        Err(not_found(format!("Credits of {kind} {id}")))
    }

    async fn videos(&self, kind: MediaKind, id: u64) -> Result<Vec<Video>, CatalogError> {
        self.enter(RecordedCatalogCall::Videos { kind, id }).await?;

        if let Some(videos) = self.videos.read().await.get(&(kind, id)) {
            return Ok(videos.clone());
        }
        if self.details.read().await.contains_key(&(kind, id)) {
            return Ok(Vec::new());
        }
        Err(not_found(format!("Videos of {kind} {id}")))
    }

    async fn related(
        &self,
        kind: MediaKind,
        id: u64,
        relation: Relation,
        query: &PageQuery,
    ) -> Result<CatalogPage, CatalogError> {
        validate_page(query.page)?;
        self.enter(RecordedCatalogCall::Related {
            kind,
            id,
            relation,
            page: query.page,
        })
        .await?;

        let related = self.related.read().await;
        let items = related
            .get(&(kind, id))
            .map(Vec::as_slice)
            .unwrap_or_default();
        Ok(paginate(items, query.page))
    }

    async fn search(
        &self,
        kind: MediaKind,
        query: &SearchQuery,
    ) -> Result<CatalogPage, CatalogError> {
        validate_search(query)?;
        self.enter(RecordedCatalogCall::Search {
            kind,
            query: query.query.clone(),
            page: query.page,
        })
        .await?;

        let needle = query.query.trim().to_lowercase();
        let matches: Vec<CatalogItem> = self
            .searchable(Some(kind))
            .await
            .into_iter()
            .filter(|i| i.title.to_lowercase().contains(&needle))
            .filter(|i| query.year.map_or(true, |y| i.year() == Some(y)))
            .collect();
        Ok(paginate(&matches, query.page))
    }

    async fn search_multi(&self, query: &SearchQuery) -> Result<CatalogPage, CatalogError> {
        validate_search(query)?;
        self.enter(RecordedCatalogCall::SearchMulti {
            query: query.query.clone(),
            page: query.page,
        })
        .await?;

        let needle = query.query.trim().to_lowercase();
        let matches: Vec<CatalogItem> = self
            .searchable(None)
            .await
            .into_iter()
            .filter(|i| i.title.to_lowercase().contains(&needle))
            .collect();
        Ok(paginate(&matches, query.page))
    }

    async fn discover(
        &self,
        kind: MediaKind,
        filters: &DiscoverFilters,
    ) -> Result<CatalogPage, CatalogError> {
        validate_page(filters.page)?;
        self.enter(RecordedCatalogCall::Discover {
            kind,
            page: filters.page,
        })
        .await?;

        let genres = self.genres.read().await.get(&kind).cloned();
        let wanted: Vec<String> = genres
            .map(|table| table.resolve(&filters.genre_ids))
            .unwrap_or_default();

        let matches: Vec<CatalogItem> = self
            .searchable(Some(kind))
            .await
            .into_iter()
            .filter(|i| wanted.iter().all(|g| i.genres.contains(g)))
            .filter(|i| filters.year.map_or(true, |y| i.year() == Some(y)))
            .filter(|i| filters.min_rating.map_or(true, |r| i.rating >= f64::from(r)))
            .filter(|i| filters.max_rating.map_or(true, |r| i.rating <= f64::from(r)))
            .filter(|i| filters.min_votes.map_or(true, |v| i.vote_count >= v))
            .collect();
        Ok(paginate(&matches, filters.page))
    }

    async fn season(
        &self,
        series_id: u64,
        season_number: u32,
    ) -> Result<SeasonDetail, CatalogError> {
        self.enter(RecordedCatalogCall::Season {
            series_id,
            season: season_number,
        })
        .await?;

        self.seasons
            .read()
            .await
            .get(&(series_id, season_number))
            .cloned()
            .ok_or_else(|| not_found(format!("Season {season_number} of series {series_id}")))
    }

    async fn episode(
        &self,
        series_id: u64,
        season_number: u32,
        episode_number: u32,
    ) -> Result<Episode, CatalogError> {
        if episode_number == 0 {
            return Err(CatalogError::validation("episode number must be at least 1"));
        }
        self.enter(RecordedCatalogCall::Episode {
            series_id,
            season: season_number,
            episode: episode_number,
        })
        .await?;

        self.seasons
            .read()
            .await
            .get(&(series_id, season_number))
            .and_then(|s| {
                s.episodes
                    .iter()
                    .find(|e| e.episode_number == episode_number)
                    .cloned()
            })
            .ok_or_else(|| {
                not_found(format!(
                    "Episode {episode_number} of season {season_number} of series {series_id}"
                ))
            })
    }

    async fn genres(&self, kind: MediaKind) -> Result<GenreTable, CatalogError> {
        self.enter(RecordedCatalogCall::Genres { kind }).await?;

        Ok(self
            .genres
            .read()
            .await
            .get(&kind)
            .cloned()
            .unwrap_or_default())
    }
}
