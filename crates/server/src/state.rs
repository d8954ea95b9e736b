use std::sync::Arc;

use marquee_core::context::ContinueWatchingDetails;
use marquee_core::{
    AppContext, CachedCatalog, Config, PlayerPreferencesStore, RecentSearches, SanitizedConfig,
    ThrottleStatus, WatchStateStore,
};

/// Shared application state
pub struct AppState {
    context: AppContext,
}

impl AppState {
    pub fn new(context: AppContext) -> Self {
        Self { context }
    }

    pub fn config(&self) -> &Config {
        self.context.config()
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(self.context.config())
    }

    pub fn catalog(&self) -> &CachedCatalog {
        self.context.catalog().as_ref()
    }

    pub fn watch(&self) -> &Arc<WatchStateStore> {
        self.context.watch()
    }

    pub fn searches(&self) -> &Arc<RecentSearches> {
        self.context.searches()
    }

    pub fn player(&self) -> &Arc<PlayerPreferencesStore> {
        self.context.player()
    }

    pub async fn continue_watching_details(&self) -> ContinueWatchingDetails {
        self.context.continue_watching_details().await
    }

    pub fn throttle_status(&self) -> Option<ThrottleStatus> {
        self.context.throttle_status()
    }
}
