//! Watch-state and favorites handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use marquee_core::watch::{
    ContinueWatchingEntry, EpisodePointer, FavoriteEntry, ProgressUpdate, SeriesLayout,
    WatchHistoryEntry, WatchStateSnapshot,
};
use marquee_core::context::ContinueWatchingDetails;
use marquee_core::MediaKind;

use super::handlers::{catalog_error, watch_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

/// Body of `POST /watch/progress`.
#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub id: u64,
    pub kind: MediaKind,
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default)]
    pub episode: Option<u32>,
    pub progress: f64,
    /// Episodes in the current season, used to pick the next episode.
    #[serde(default)]
    pub episodes_in_season: Option<u32>,
    #[serde(default)]
    pub total_seasons: Option<u32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub episode_title: Option<String>,
    #[serde(default)]
    pub runtime_minutes: Option<u32>,
}

impl From<ProgressRequest> for ProgressUpdate {
    fn from(req: ProgressRequest) -> Self {
        let mut update = ProgressUpdate::new(req.id, req.kind, req.progress).with_layout(
            SeriesLayout {
                episodes_in_season: req.episodes_in_season,
                total_seasons: req.total_seasons,
            },
        );
        // A pointer needs both numbers; the store rejects series without one.
        if let (Some(season), Some(episode)) = (req.season, req.episode) {
            update = update.with_episode(season, episode);
        }
        update.title = req.title;
        update.poster_path = req.poster_path;
        update.episode_title = req.episode_title;
        update.runtime_minutes = req.runtime_minutes;
        update
    }
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub entry: WatchHistoryEntry,
    pub in_progress: bool,
    pub next_episode: Option<EpisodePointer>,
    /// `next_episode` when auto-next is enabled.
    pub auto_next: Option<EpisodePointer>,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: usize,
}

#[derive(Debug, Serialize)]
pub struct FavoriteStatus {
    pub id: u64,
    pub kind: MediaKind,
    pub favorite: bool,
}

fn parse_kind(kind: &str) -> Result<MediaKind, ApiError> {
    kind.parse::<MediaKind>().map_err(catalog_error)
}

// ============================================================================
// Watch state
// ============================================================================

/// GET /api/v1/watch/continue
pub async fn continue_watching(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<ContinueWatchingEntry>> {
    Json(state.watch().continue_watching())
}

/// GET /api/v1/watch/continue/details
///
/// Continue watching joined with catalog details. Titles whose detail
/// lookup fails are skipped and counted.
pub async fn continue_watching_details(
    State(state): State<Arc<AppState>>,
) -> Json<ContinueWatchingDetails> {
    Json(state.continue_watching_details().await)
}

/// GET /api/v1/watch/history
pub async fn history(State(state): State<Arc<AppState>>) -> Json<Vec<WatchHistoryEntry>> {
    Json(state.watch().history())
}

/// POST /api/v1/watch/progress
pub async fn record_progress(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProgressRequest>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let update = ProgressUpdate::from(req);
    let recorded = state
        .watch()
        .record_progress(&update)
        .map_err(watch_error)?;

    Ok(Json(ProgressResponse {
        entry: recorded.entry,
        in_progress: recorded.in_progress,
        next_episode: recorded.next_episode,
        auto_next: state.player().get().auto_next(recorded.next_episode),
    }))
}

/// DELETE /api/v1/watch/history/{kind}/{id}
///
/// Drops every history entry for the title, all episodes included.
pub async fn remove_from_history(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, u64)>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let removed = state.watch().remove_from_history(id, kind);
    Ok(Json(RemovedResponse { removed }))
}

/// DELETE /api/v1/watch/continue/{kind}/{id}
pub async fn remove_from_continue_watching(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, u64)>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let removed = state.watch().remove_from_continue_watching(id, kind);
    Ok(Json(RemovedResponse {
        removed: usize::from(removed),
    }))
}

/// DELETE /api/v1/watch
///
/// Clears history, continue watching and favorites.
pub async fn clear(State(state): State<Arc<AppState>>) -> StatusCode {
    state.watch().clear();
    StatusCode::NO_CONTENT
}

/// GET /api/v1/watch/export
pub async fn export(State(state): State<Arc<AppState>>) -> Json<WatchStateSnapshot> {
    Json(state.watch().snapshot())
}

/// POST /api/v1/watch/import
///
/// Replaces the whole watch state with an exported snapshot.
pub async fn import(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<StatusCode, ApiError> {
    state.watch().import_json(&body).map_err(watch_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Favorites
// ============================================================================

/// GET /api/v1/favorites
pub async fn list_favorites(State(state): State<Arc<AppState>>) -> Json<Vec<FavoriteEntry>> {
    Json(state.watch().favorites())
}

/// GET /api/v1/favorites/{kind}/{id}
pub async fn get_favorite(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, u64)>,
) -> Result<Json<FavoriteStatus>, ApiError> {
    let kind = parse_kind(&kind)?;
    Ok(Json(FavoriteStatus {
        id,
        kind,
        favorite: state.watch().is_favorite(id, kind),
    }))
}

/// PUT /api/v1/favorites/{kind}/{id}
pub async fn add_favorite(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, u64)>,
) -> Result<Json<FavoriteStatus>, ApiError> {
    set_favorite(&state, &kind, id, true)
}

/// DELETE /api/v1/favorites/{kind}/{id}
pub async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, u64)>,
) -> Result<Json<FavoriteStatus>, ApiError> {
    set_favorite(&state, &kind, id, false)
}

fn set_favorite(
    state: &AppState,
    kind: &str,
    id: u64,
    on: bool,
) -> Result<Json<FavoriteStatus>, ApiError> {
    let kind = parse_kind(kind)?;
    state.watch().set_favorite(id, kind, on);
    Ok(Json(FavoriteStatus {
        id,
        kind,
        favorite: on,
    }))
}
