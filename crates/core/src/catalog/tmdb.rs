//! TMDB (The Movie Database) gateway.
//!
//! Every request carries the bearer token and the configured language, and
//! is dispatched through the shared request throttle.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::types::{
    round_rating, CastMember, CatalogItem, CatalogPage, Credits, CrewMember, DiscoverFilters,
    Episode, Genre, GenreTable, ItemDetail, ListCategory, MediaKind, PageQuery, Relation,
    SearchQuery, SeasonDetail, SeasonSummary, Video,
};
use super::{validate_page, validate_search, CatalogError, CatalogSource};
use crate::config::CatalogConfig;
use crate::metrics;
use crate::throttle::RequestThrottle;

type Params = Vec<(&'static str, String)>;

/// Build a full image URL from a poster/backdrop path and a size ("w500", "original").
pub fn image_url(base: &str, path: &str, size: &str) -> String {
    format!(
        "{}/{}/{}",
        base.trim_end_matches('/'),
        size,
        path.trim_start_matches('/')
    )
}

/// HTTP gateway to the TMDB v3 API.
pub struct TmdbGateway {
    client: Client,
    base_url: String,
    image_base_url: String,
    api_key: String,
    language: String,
    region: String,
    include_adult: bool,
    throttle: Arc<RequestThrottle>,
    movie_genres: OnceCell<GenreTable>,
    series_genres: OnceCell<GenreTable>,
}

impl TmdbGateway {
    /// Create a gateway with its own throttle sized from the config.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let throttle = Arc::new(RequestThrottle::per_second(config.requests_per_second));
        Self::with_throttle(config, throttle)
    }

    /// Create a gateway that shares an existing throttle.
    pub fn with_throttle(
        config: &CatalogConfig,
        throttle: Arc<RequestThrottle>,
    ) -> Result<Self, CatalogError> {
        if config.api_key.trim().is_empty() {
            return Err(CatalogError::validation("catalog API key is required"));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CatalogError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            image_base_url: config.image_base_url.clone(),
            api_key: config.api_key.clone(),
            language: config.language.clone(),
            region: config.region.clone(),
            include_adult: config.include_adult,
            throttle,
            movie_genres: OnceCell::new(),
            series_genres: OnceCell::new(),
        })
    }

    pub fn throttle(&self) -> &Arc<RequestThrottle> {
        &self.throttle
    }

    /// Image URL for a path returned by this gateway.
    pub fn image_url(&self, path: &str, size: &str) -> String {
        image_url(&self.image_base_url, path, size)
    }

    /// Parameters present on every call.
    fn params(&self, language: Option<&str>) -> Params {
        vec![(
            "language",
            language.unwrap_or(self.language.as_str()).to_string(),
        )]
    }

    /// Queue a GET behind the throttle and decode its body.
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        path: &str,
        params: Params,
    ) -> Result<T, CatalogError> {
        let url = format!("{}{}", self.base_url, path);
        self.throttle
            .execute(|| self.send(endpoint, &url, &params))
            .await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: &str,
        params: &Params,
    ) -> Result<T, CatalogError> {
        debug!(endpoint, url, "TMDB request");

        let started = Instant::now();
        let result = self.fetch(url, params).await;

        metrics::GATEWAY_DURATION
            .with_label_values(&[endpoint])
            .observe(started.elapsed().as_secs_f64());
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.label(),
        };
        metrics::GATEWAY_REQUESTS
            .with_label_values(&[endpoint, outcome])
            .inc();

        if let Err(e) = &result {
            warn!(endpoint, status = e.status(), error = %e, "TMDB request failed");
        }
        result
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &Params,
    ) -> Result<T, CatalogError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .query(params)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body, retry_after));
        }

        let body = response.bytes().await.map_err(transport_error)?;
        serde_json::from_slice(&body).map_err(|e| CatalogError::Decode(e.to_string()))
    }

    fn genre_cell(&self, kind: MediaKind) -> &OnceCell<GenreTable> {
        match kind {
            MediaKind::Movie => &self.movie_genres,
            MediaKind::Series => &self.series_genres,
        }
    }

    /// Genre table for a kind, fetched at most once per gateway.
    ///
    /// Concurrent first callers wait on the same fetch. A failed fetch
    /// leaves the cell empty so a later call tries again.
    async fn genre_table(&self, kind: MediaKind) -> Result<&GenreTable, CatalogError> {
        self.genre_cell(kind)
            .get_or_try_init(|| async {
                let path = format!("/genre/{}/list", kind.as_str());
                let raw: TmdbGenreList = self.get("genres", &path, self.params(None)).await?;
                debug!(kind = %kind, count = raw.genres.len(), "Loaded genre table");
                Ok::<_, CatalogError>(GenreTable::new(raw.genres))
            })
            .await
    }

    /// Fetch a page of results and resolve its genre ids.
    async fn fetch_page(
        &self,
        kind: MediaKind,
        endpoint: &'static str,
        path: &str,
        params: Params,
    ) -> Result<CatalogPage, CatalogError> {
        let (raw, genres) = tokio::try_join!(
            self.get::<TmdbPage>(endpoint, path, params),
            self.genre_table(kind)
        )?;
        Ok(raw.into_page(|result| Some(result.into_item(kind, genres))))
    }

    fn push_region(&self, params: &mut Params, kind: MediaKind, region: Option<&str>) {
        if kind == MediaKind::Movie {
            params.push(("region", region.unwrap_or(self.region.as_str()).to_string()));
        }
    }
}

#[async_trait]
impl CatalogSource for TmdbGateway {
    async fn list(
        &self,
        kind: MediaKind,
        category: ListCategory,
        query: &PageQuery,
    ) -> Result<CatalogPage, CatalogError> {
        validate_page(query.page)?;
        let path = category.path(kind)?;

        debug!(kind = %kind, category = %category.name(), page = query.page, "TMDB list");

        let mut params = self.params(query.language.as_deref());
        params.push(("page", query.page.to_string()));
        params.push(("include_adult", self.include_adult.to_string()));
        self.push_region(&mut params, kind, query.region.as_deref());

        self.fetch_page(kind, "list", &path, params).await
    }

    async fn detail(&self, kind: MediaKind, id: u64) -> Result<ItemDetail, CatalogError> {
        let path = format!("/{}/{}", kind.as_str(), id);
        let raw: TmdbDetail = self.get("detail", &path, self.params(None)).await?;
        Ok(raw.into_detail(kind))
    }

    async fn credits(&self, kind: MediaKind, id: u64) -> Result<Credits, CatalogError> {
        let path = format!("/{}/{}/credits", kind.as_str(), id);
        let raw: TmdbCredits = self.get("credits", &path, self.params(None)).await?;
        Ok(raw.into())
    }

    async fn videos(&self, kind: MediaKind, id: u64) -> Result<Vec<Video>, CatalogError> {
        let path = format!("/{}/{}/videos", kind.as_str(), id);
        let raw: TmdbVideoList = self.get("videos", &path, self.params(None)).await?;
        Ok(raw.results.into_iter().map(Video::from).collect())
    }

    async fn related(
        &self,
        kind: MediaKind,
        id: u64,
        relation: Relation,
        query: &PageQuery,
    ) -> Result<CatalogPage, CatalogError> {
        validate_page(query.page)?;
        let path = format!("/{}/{}/{}", kind.as_str(), id, relation.as_str());

        let mut params = self.params(query.language.as_deref());
        params.push(("page", query.page.to_string()));

        self.fetch_page(kind, "related", &path, params).await
    }

    async fn search(
        &self,
        kind: MediaKind,
        query: &SearchQuery,
    ) -> Result<CatalogPage, CatalogError> {
        validate_search(query)?;
        let path = format!("/search/{}", kind.as_str());

        debug!(kind = %kind, query = %query.query, page = query.page, "TMDB search");

        let mut params = self.params(query.language.as_deref());
        params.push(("query", query.query.trim().to_string()));
        params.push(("page", query.page.to_string()));
        params.push((
            "include_adult",
            query.include_adult.unwrap_or(self.include_adult).to_string(),
        ));
        self.push_region(&mut params, kind, query.region.as_deref());
        if let Some(year) = query.year {
            match kind {
                MediaKind::Movie => {
                    params.push(("year", year.to_string()));
                    params.push(("primary_release_year", year.to_string()));
                }
                MediaKind::Series => params.push(("first_air_date_year", year.to_string())),
            }
        }

        self.fetch_page(kind, "search", &path, params).await
    }

    async fn search_multi(&self, query: &SearchQuery) -> Result<CatalogPage, CatalogError> {
        validate_search(query)?;

        debug!(query = %query.query, page = query.page, "TMDB multi search");

        let mut params = self.params(query.language.as_deref());
        params.push(("query", query.query.trim().to_string()));
        params.push(("page", query.page.to_string()));
        params.push((
            "include_adult",
            query.include_adult.unwrap_or(self.include_adult).to_string(),
        ));

        let (raw, movie_genres, series_genres) = tokio::try_join!(
            self.get::<TmdbPage>("search", "/search/multi", params),
            self.genre_table(MediaKind::Movie),
            self.genre_table(MediaKind::Series)
        )?;

        Ok(raw.into_page(|result| match result.media_type.as_deref() {
            Some("movie") => Some(result.into_item(MediaKind::Movie, movie_genres)),
            Some("tv") => Some(result.into_item(MediaKind::Series, series_genres)),
            _ => None,
        }))
    }

    async fn discover(
        &self,
        kind: MediaKind,
        filters: &DiscoverFilters,
    ) -> Result<CatalogPage, CatalogError> {
        validate_page(filters.page)?;
        let path = format!("/discover/{}", kind.as_str());

        let mut params = self.params(filters.language.as_deref());
        params.push(("page", filters.page.to_string()));
        params.push((
            "include_adult",
            filters.include_adult.unwrap_or(self.include_adult).to_string(),
        ));
        self.push_region(&mut params, kind, filters.region.as_deref());
        if let Some(sort_by) = &filters.sort_by {
            params.push(("sort_by", sort_by.clone()));
        }
        if !filters.genre_ids.is_empty() {
            let genres: Vec<String> = filters.genre_ids.iter().map(|g| g.to_string()).collect();
            params.push(("with_genres", genres.join(",")));
        }
        if let Some(year) = filters.year {
            let key = match kind {
                MediaKind::Movie => "primary_release_year",
                MediaKind::Series => "first_air_date_year",
            };
            params.push((key, year.to_string()));
        }
        if let Some(min) = filters.min_rating {
            params.push(("vote_average.gte", min.to_string()));
        }
        if let Some(max) = filters.max_rating {
            params.push(("vote_average.lte", max.to_string()));
        }
        if let Some(votes) = filters.min_votes {
            params.push(("vote_count.gte", votes.to_string()));
        }

        self.fetch_page(kind, "discover", &path, params).await
    }

    async fn season(
        &self,
        series_id: u64,
        season_number: u32,
    ) -> Result<SeasonDetail, CatalogError> {
        let path = format!("/tv/{}/season/{}", series_id, season_number);
        let raw: TmdbSeasonDetail = self.get("season", &path, self.params(None)).await?;
        Ok(raw.into())
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
        let path = format!(
            "/tv/{}/season/{}/episode/{}",
            series_id, season_number, episode_number
        );
        let raw: TmdbEpisode = self.get("episode", &path, self.params(None)).await?;
        Ok(raw.into_episode(season_number))
    }

    async fn genres(&self, kind: MediaKind) -> Result<GenreTable, CatalogError> {
        self.genre_table(kind).await.cloned()
    }
}

// ============================================================================
// Failure classification
// ============================================================================

fn transport_error(e: reqwest::Error) -> CatalogError {
    let message = if e.is_timeout() {
        format!("Request timed out: {}", e)
    } else {
        e.to_string()
    };
    CatalogError::Network { message }
}

/// Map a non-2xx response to an error, preferring the HTTP status and
/// falling back to the provider's `status_code` for ambiguous 4xx.
fn classify_failure(status: StatusCode, body: &str, retry_after: Option<u64>) -> CatalogError {
    let payload: Option<TmdbErrorBody> = serde_json::from_str(body).ok();
    let provider_code = payload.as_ref().and_then(|p| p.status_code);
    let message = payload
        .and_then(|p| p.status_message)
        .filter(|m| !m.trim().is_empty())
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());
    let status = status.as_u16();

    match status {
        401 | 403 => CatalogError::Auth { status, message },
        404 => CatalogError::NotFound { status, message },
        429 => CatalogError::RateLimited {
            status,
            message,
            retry_after,
        },
        500..=599 => CatalogError::Server { status, message },
        _ => match provider_code {
            Some(3 | 7 | 10 | 30 | 31 | 35) => CatalogError::Auth { status, message },
            Some(34) => CatalogError::NotFound { status, message },
            Some(25) => CatalogError::RateLimited {
                status,
                message,
                retry_after,
            },
            _ => CatalogError::Validation {
                status: Some(status),
                message,
            },
        },
    }
}

// ============================================================================
// TMDB API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct TmdbErrorBody {
    status_code: Option<i32>,
    status_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenreList {
    #[serde(default)]
    genres: Vec<Genre>,
}

#[derive(Debug, Deserialize)]
struct TmdbPage {
    #[serde(default = "first_page")]
    page: u32,
    #[serde(default)]
    results: Vec<TmdbResult>,
    #[serde(default)]
    total_pages: u32,
    #[serde(default)]
    total_results: u32,
}

fn first_page() -> u32 {
    1
}

/// List/search entry. Movies use `title`/`release_date`, series use
/// `name`/`first_air_date`; multi-search adds `media_type`.
#[derive(Debug, Deserialize)]
struct TmdbResult {
    id: u64,
    media_type: Option<String>,
    title: Option<String>,
    name: Option<String>,
    original_title: Option<String>,
    original_name: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    vote_average: Option<f64>,
    vote_count: Option<u32>,
    popularity: Option<f64>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    #[serde(default)]
    genre_ids: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct TmdbDetail {
    #[serde(flatten)]
    base: TmdbResult,
    #[serde(default)]
    genres: Vec<Genre>,
    runtime: Option<u32>,
    #[serde(default)]
    episode_run_time: Vec<u32>,
    tagline: Option<String>,
    status: Option<String>,
    homepage: Option<String>,
    number_of_seasons: Option<u32>,
    number_of_episodes: Option<u32>,
    #[serde(default)]
    seasons: Vec<TmdbSeasonSummary>,
}

#[derive(Debug, Deserialize)]
struct TmdbSeasonSummary {
    season_number: u32,
    name: Option<String>,
    episode_count: Option<u32>,
    air_date: Option<String>,
    poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbCredits {
    #[serde(default)]
    cast: Vec<TmdbCast>,
    #[serde(default)]
    crew: Vec<TmdbCrew>,
}

#[derive(Debug, Deserialize)]
struct TmdbCast {
    id: u64,
    name: String,
    character: Option<String>,
    profile_path: Option<String>,
    order: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TmdbCrew {
    id: u64,
    name: String,
    job: Option<String>,
    department: Option<String>,
    profile_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbVideoList {
    #[serde(default)]
    results: Vec<TmdbVideo>,
}

#[derive(Debug, Deserialize)]
struct TmdbVideo {
    id: String,
    key: String,
    name: String,
    site: String,
    #[serde(rename = "type")]
    video_type: String,
    official: Option<bool>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbSeasonDetail {
    season_number: u32,
    name: Option<String>,
    overview: Option<String>,
    air_date: Option<String>,
    poster_path: Option<String>,
    #[serde(default)]
    episodes: Vec<TmdbEpisode>,
}

#[derive(Debug, Deserialize)]
struct TmdbEpisode {
    season_number: Option<u32>,
    episode_number: u32,
    name: Option<String>,
    overview: Option<String>,
    runtime: Option<u32>,
    air_date: Option<String>,
    still_path: Option<String>,
    vote_average: Option<f64>,
}

// ============================================================================
// Conversions
// ============================================================================

/// TMDB sends "" for unknown dates and taglines.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TmdbPage {
    fn into_page<F>(self, mut convert: F) -> CatalogPage
    where
        F: FnMut(TmdbResult) -> Option<CatalogItem>,
    {
        CatalogPage {
            items: self.results.into_iter().filter_map(&mut convert).collect(),
            page: self.page,
            total_pages: self.total_pages,
            total_results: self.total_results,
        }
    }
}

impl TmdbResult {
    fn into_item(self, kind: MediaKind, genres: &GenreTable) -> CatalogItem {
        CatalogItem {
            id: self.id,
            kind,
            title: self.title.or(self.name).unwrap_or_default(),
            original_title: self.original_title.or(self.original_name),
            overview: non_empty(self.overview),
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
            rating: round_rating(self.vote_average.unwrap_or(0.0)),
            vote_count: self.vote_count.unwrap_or(0),
            popularity: self.popularity.unwrap_or(0.0),
            release_date: non_empty(self.release_date).or(non_empty(self.first_air_date)),
            genres: genres.resolve(&self.genre_ids),
        }
    }
}

impl TmdbDetail {
    fn into_detail(self, kind: MediaKind) -> ItemDetail {
        let genres = self.genres.into_iter().map(|g| g.name).collect();
        let mut item = self.base.into_item(kind, &GenreTable::default());
        item.genres = genres;

        ItemDetail {
            item,
            runtime_minutes: self
                .runtime
                .or_else(|| self.episode_run_time.first().copied())
                .filter(|m| *m > 0),
            tagline: non_empty(self.tagline),
            status: non_empty(self.status),
            homepage: non_empty(self.homepage),
            number_of_seasons: self.number_of_seasons,
            number_of_episodes: self.number_of_episodes,
            seasons: self.seasons.into_iter().map(SeasonSummary::from).collect(),
        }
    }
}

impl From<TmdbSeasonSummary> for SeasonSummary {
    fn from(s: TmdbSeasonSummary) -> Self {
        Self {
            season_number: s.season_number,
            name: s.name,
            episode_count: s.episode_count.unwrap_or(0),
            air_date: non_empty(s.air_date),
            poster_path: s.poster_path,
        }
    }
}

impl From<TmdbCredits> for Credits {
    fn from(c: TmdbCredits) -> Self {
        Self {
            cast: c
                .cast
                .into_iter()
                .map(|m| CastMember {
                    id: m.id,
                    name: m.name,
                    character: m.character.unwrap_or_default(),
                    profile_path: m.profile_path,
                    order: m.order.unwrap_or(u32::MAX),
                })
                .collect(),
            crew: c
                .crew
                .into_iter()
                .map(|m| CrewMember {
                    id: m.id,
                    name: m.name,
                    job: m.job.unwrap_or_default(),
                    department: m.department.unwrap_or_default(),
                    profile_path: m.profile_path,
                })
                .collect(),
        }
    }
}

impl From<TmdbVideo> for Video {
    fn from(v: TmdbVideo) -> Self {
        Self {
            id: v.id,
            key: v.key,
            name: v.name,
            site: v.site,
            video_type: v.video_type,
            official: v.official.unwrap_or(false),
            published_at: v.published_at,
        }
    }
}

impl From<TmdbSeasonDetail> for SeasonDetail {
    fn from(d: TmdbSeasonDetail) -> Self {
        let season_number = d.season_number;
        Self {
            season_number,
            name: d.name,
            overview: non_empty(d.overview),
            air_date: non_empty(d.air_date),
            poster_path: d.poster_path,
            episodes: d
                .episodes
                .into_iter()
                .map(|e| e.into_episode(season_number))
                .collect(),
        }
    }
}

impl TmdbEpisode {
    fn into_episode(self, season_number: u32) -> Episode {
        Episode {
            season_number: self.season_number.unwrap_or(season_number),
            episode_number: self.episode_number,
            name: self.name.unwrap_or_default(),
            overview: non_empty(self.overview),
            runtime_minutes: self.runtime,
            air_date: non_empty(self.air_date),
            still_path: self.still_path,
            rating: round_rating(self.vote_average.unwrap_or(0.0)),
        }
    }
}
