//! Recent search handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::handlers::{error_response, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddSearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct RecentSearchesResponse {
    pub queries: Vec<String>,
}

/// GET /api/v1/searches/recent
///
/// Most recent first.
pub async fn list_recent(State(state): State<Arc<AppState>>) -> Json<RecentSearchesResponse> {
    Json(RecentSearchesResponse {
        queries: state.searches().list(),
    })
}

/// POST /api/v1/searches/recent
///
/// Blank queries are ignored; repeats move to the front.
pub async fn add_recent(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddSearchRequest>,
) -> Json<RecentSearchesResponse> {
    Json(RecentSearchesResponse {
        queries: state.searches().add(&req.query),
    })
}

/// DELETE /api/v1/searches/recent/{query}
pub async fn remove_recent(
    State(state): State<Arc<AppState>>,
    Path(query): Path<String>,
) -> Result<Json<RecentSearchesResponse>, ApiError> {
    if !state.searches().remove(&query) {
        return Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Recent search not found: {}", query),
        ));
    }
    Ok(Json(RecentSearchesResponse {
        queries: state.searches().list(),
    }))
}

/// DELETE /api/v1/searches/recent
pub async fn clear_recent(State(state): State<Arc<AppState>>) -> StatusCode {
    state.searches().clear();
    StatusCode::NO_CONTENT
}
