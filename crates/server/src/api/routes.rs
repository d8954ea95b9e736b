use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::middleware::metrics_middleware;
use super::{catalog, handlers, player, searches, watch};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Catalog
        .route("/catalog/search", get(catalog::search_multi))
        .route("/catalog/{kind}/lists/{category}", get(catalog::get_list))
        .route("/catalog/{kind}/genres", get(catalog::get_genres))
        .route("/catalog/{kind}/search", get(catalog::search))
        .route("/catalog/{kind}/discover", get(catalog::discover))
        .route("/catalog/{kind}/{id}", get(catalog::get_detail))
        .route("/catalog/{kind}/{id}/full", get(catalog::get_full_info))
        .route("/catalog/{kind}/{id}/credits", get(catalog::get_credits))
        .route("/catalog/{kind}/{id}/videos", get(catalog::get_videos))
        .route(
            "/catalog/{kind}/{id}/related/{relation}",
            get(catalog::get_related),
        )
        .route(
            "/catalog/{kind}/{id}/season/{season}",
            get(catalog::get_season),
        )
        .route(
            "/catalog/{kind}/{id}/season/{season}/episode/{episode}",
            get(catalog::get_episode),
        )
        // Watch state
        .route("/watch", delete(watch::clear))
        .route("/watch/continue", get(watch::continue_watching))
        .route(
            "/watch/continue/details",
            get(watch::continue_watching_details),
        )
        .route(
            "/watch/continue/{kind}/{id}",
            delete(watch::remove_from_continue_watching),
        )
        .route("/watch/history", get(watch::history))
        .route(
            "/watch/history/{kind}/{id}",
            delete(watch::remove_from_history),
        )
        .route("/watch/progress", post(watch::record_progress))
        .route("/watch/export", get(watch::export))
        .route("/watch/import", post(watch::import))
        // Favorites
        .route("/favorites", get(watch::list_favorites))
        .route(
            "/favorites/{kind}/{id}",
            get(watch::get_favorite)
                .put(watch::add_favorite)
                .delete(watch::remove_favorite),
        )
        // Recent searches
        .route(
            "/searches/recent",
            get(searches::list_recent)
                .post(searches::add_recent)
                .delete(searches::clear_recent),
        )
        .route("/searches/recent/{query}", delete(searches::remove_recent))
        // Player preferences
        .route(
            "/player/preferences",
            get(player::get_preferences).put(player::update_preferences),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
