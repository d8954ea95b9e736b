//! Catalog API handlers.
//!
//! Every read goes through the cached gateway, so repeated requests inside a
//! freshness window never reach the provider.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use marquee_core::catalog::{
    CatalogPage, CatalogSource, Credits, DiscoverFilters, Episode, FullItemInfo, GenreTable,
    ItemDetail, ListCategory, MediaKind, PageQuery, Relation, SearchQuery, SeasonDetail,
    TimeWindow, Video,
};
use marquee_core::CatalogError;

use super::handlers::{catalog_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub window: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl PageParams {
    fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page.unwrap_or(1),
            language: self.language.clone(),
            region: self.region.clone(),
        }
    }
}

/// Discover filters as query parameters; `genres` is a comma-separated id list.
#[derive(Debug, Default, Deserialize)]
pub struct DiscoverParams {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub genres: Option<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub min_rating: Option<f32>,
    #[serde(default)]
    pub max_rating: Option<f32>,
    #[serde(default)]
    pub min_votes: Option<u32>,
    #[serde(default)]
    pub include_adult: Option<bool>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl DiscoverParams {
    fn filters(self) -> Result<DiscoverFilters, CatalogError> {
        let genre_ids = match self.genres.as_deref() {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(|id| {
                    id.parse::<u32>()
                        .map_err(|_| CatalogError::validation(format!("invalid genre id '{id}'")))
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(DiscoverFilters {
            page: self.page.unwrap_or(1),
            sort_by: self.sort_by,
            genre_ids,
            year: self.year,
            min_rating: self.min_rating,
            max_rating: self.max_rating,
            min_votes: self.min_votes,
            include_adult: self.include_adult,
            language: self.language,
            region: self.region,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct FullInfoResponse {
    #[serde(flatten)]
    pub info: FullItemInfo,
    pub trailer: Option<Video>,
}

fn parse_kind(kind: &str) -> Result<MediaKind, ApiError> {
    kind.parse::<MediaKind>().map_err(catalog_error)
}

fn require_series(kind: &str) -> Result<(), ApiError> {
    match parse_kind(kind)? {
        MediaKind::Series => Ok(()),
        MediaKind::Movie => Err(catalog_error(CatalogError::validation(
            "seasons and episodes are only available for tv",
        ))),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/catalog/{kind}/lists/{category}
///
/// Trending, popular, top rated and the kind-specific lists.
pub async fn get_list(
    State(state): State<Arc<AppState>>,
    Path((kind, category)): Path<(String, String)>,
    Query(params): Query<PageParams>,
) -> Result<Json<CatalogPage>, ApiError> {
    let kind = parse_kind(&kind)?;
    let window = params
        .window
        .as_deref()
        .map(str::parse::<TimeWindow>)
        .transpose()
        .map_err(catalog_error)?;
    let category = ListCategory::parse(&category, window).map_err(catalog_error)?;

    state
        .catalog()
        .list(kind, category, &params.page_query())
        .await
        .map(Json)
        .map_err(catalog_error)
}

/// GET /api/v1/catalog/{kind}/genres
pub async fn get_genres(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Result<Json<GenreTable>, ApiError> {
    let kind = parse_kind(&kind)?;
    state
        .catalog()
        .genres(kind)
        .await
        .map(Json)
        .map_err(catalog_error)
}

/// GET /api/v1/catalog/{kind}/search
pub async fn search(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<CatalogPage>, ApiError> {
    let kind = parse_kind(&kind)?;
    state
        .catalog()
        .search(kind, &query)
        .await
        .map(Json)
        .map_err(catalog_error)
}

/// GET /api/v1/catalog/search
///
/// Movies and series together; people are left out.
pub async fn search_multi(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<CatalogPage>, ApiError> {
    state
        .catalog()
        .search_multi(&query)
        .await
        .map(Json)
        .map_err(catalog_error)
}

/// GET /api/v1/catalog/{kind}/discover
pub async fn discover(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(params): Query<DiscoverParams>,
) -> Result<Json<CatalogPage>, ApiError> {
    let kind = parse_kind(&kind)?;
    let filters = params.filters().map_err(catalog_error)?;
    state
        .catalog()
        .discover(kind, &filters)
        .await
        .map(Json)
        .map_err(catalog_error)
}

/// GET /api/v1/catalog/{kind}/{id}
pub async fn get_detail(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, u64)>,
) -> Result<Json<ItemDetail>, ApiError> {
    let kind = parse_kind(&kind)?;
    state
        .catalog()
        .detail(kind, id)
        .await
        .map(Json)
        .map_err(catalog_error)
}

/// GET /api/v1/catalog/{kind}/{id}/full
///
/// Detail, credits and videos in one response. Fails if any part fails.
pub async fn get_full_info(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, u64)>,
) -> Result<Json<FullInfoResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let info = state
        .catalog()
        .full_info(kind, id)
        .await
        .map_err(catalog_error)?;
    let trailer = info.trailer().cloned();
    Ok(Json(FullInfoResponse { info, trailer }))
}

/// GET /api/v1/catalog/{kind}/{id}/credits
pub async fn get_credits(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, u64)>,
) -> Result<Json<Credits>, ApiError> {
    let kind = parse_kind(&kind)?;
    state
        .catalog()
        .credits(kind, id)
        .await
        .map(Json)
        .map_err(catalog_error)
}

/// GET /api/v1/catalog/{kind}/{id}/videos
pub async fn get_videos(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, u64)>,
) -> Result<Json<Vec<Video>>, ApiError> {
    let kind = parse_kind(&kind)?;
    state
        .catalog()
        .videos(kind, id)
        .await
        .map(Json)
        .map_err(catalog_error)
}

/// GET /api/v1/catalog/{kind}/{id}/related/{relation}
pub async fn get_related(
    State(state): State<Arc<AppState>>,
    Path((kind, id, relation)): Path<(String, u64, String)>,
    Query(params): Query<PageParams>,
) -> Result<Json<CatalogPage>, ApiError> {
    let kind = parse_kind(&kind)?;
    let relation = relation.parse::<Relation>().map_err(catalog_error)?;
    state
        .catalog()
        .related(kind, id, relation, &params.page_query())
        .await
        .map(Json)
        .map_err(catalog_error)
}

/// GET /api/v1/catalog/tv/{id}/season/{season}
pub async fn get_season(
    State(state): State<Arc<AppState>>,
    Path((kind, id, season)): Path<(String, u64, u32)>,
) -> Result<Json<SeasonDetail>, ApiError> {
    require_series(&kind)?;
    state
        .catalog()
        .season(id, season)
        .await
        .map(Json)
        .map_err(catalog_error)
}

/// GET /api/v1/catalog/tv/{id}/season/{season}/episode/{episode}
pub async fn get_episode(
    State(state): State<Arc<AppState>>,
    Path((kind, id, season, episode)): Path<(String, u64, u32, u32)>,
) -> Result<Json<Episode>, ApiError> {
    require_series(&kind)?;
    state
        .catalog()
        .episode(id, season, episode)
        .await
        .map(Json)
        .map_err(catalog_error)
}
