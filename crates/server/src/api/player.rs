//! Player preference handlers.

use std::sync::Arc;

use axum::{extract::State, Json};

use marquee_core::watch::{PlayerPreferences, PlayerPreferencesUpdate};

use crate::state::AppState;

/// GET /api/v1/player/preferences
pub async fn get_preferences(State(state): State<Arc<AppState>>) -> Json<PlayerPreferences> {
    Json(state.player().get())
}

/// PUT /api/v1/player/preferences
///
/// Fields left out of the body keep their current value.
pub async fn update_preferences(
    State(state): State<Arc<AppState>>,
    Json(update): Json<PlayerPreferencesUpdate>,
) -> Json<PlayerPreferences> {
    Json(state.player().update(update))
}
