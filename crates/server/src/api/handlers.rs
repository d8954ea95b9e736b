use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};

use marquee_core::{CatalogError, SanitizedConfig, WatchStateError};

use crate::metrics;
use crate::state::AppState;

// ============================================================================
// Shared response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error half of every handler result.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map a catalog failure to the status the client should see.
///
/// Problems with our provider credentials or the provider itself surface as
/// 502 so they are not mistaken for client errors.
pub fn catalog_error(e: CatalogError) -> ApiError {
    let status = match &e {
        CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
        CatalogError::Validation { .. } => StatusCode::BAD_REQUEST,
        CatalogError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        CatalogError::Auth { .. } => {
            error!(error = %e, "Catalog provider rejected credentials");
            StatusCode::BAD_GATEWAY
        }
        CatalogError::Network { .. } => StatusCode::GATEWAY_TIMEOUT,
        CatalogError::Server { .. } | CatalogError::Decode(_) => {
            warn!(error = %e, "Catalog provider failure");
            StatusCode::BAD_GATEWAY
        }
    };
    error_response(status, e.to_string())
}

pub fn watch_error(e: WatchStateError) -> ApiError {
    let status = match &e {
        WatchStateError::Storage(_) => {
            error!(error = %e, "Watch state storage failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::BAD_REQUEST,
    };
    error_response(status, e.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// GET /metrics
///
/// Prometheus text exposition.
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    metrics::collect_dynamic_metrics(&state);
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics::encode_metrics(),
    )
}
