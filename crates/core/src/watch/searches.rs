use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, warn};

use super::{WatchStateError, RECENT_SEARCHES_CAP};
use crate::metrics;
use crate::storage::{KeyValueStore, SEARCH_HISTORY_KEY};

/// Recently submitted search queries, most recent first.
pub struct RecentSearches {
    queries: Mutex<Vec<String>>,
    storage: Arc<dyn KeyValueStore>,
}

impl RecentSearches {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            queries: Mutex::new(Vec::new()),
            storage,
        }
    }

    /// Create and load persisted queries. A corrupt blob starts empty.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Result<Self, WatchStateError> {
        let searches = Self::new(storage);
        if let Some(json) = searches.storage.get(SEARCH_HISTORY_KEY)? {
            match serde_json::from_str::<Vec<String>>(&json) {
                Ok(mut queries) => {
                    queries.truncate(RECENT_SEARCHES_CAP);
                    *searches.queries() = queries;
                }
                Err(e) => warn!(error = %e, "Discarding unreadable search history"),
            }
        }
        Ok(searches)
    }

    fn queries(&self) -> MutexGuard<'_, Vec<String>> {
        self.queries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, queries: &[String]) {
        let outcome = serde_json::to_string(queries)
            .map_err(|e| WatchStateError::Snapshot(e.to_string()))
            .and_then(|json| Ok(self.storage.put(SEARCH_HISTORY_KEY, &json)?));
        if let Err(e) = outcome {
            error!(error = %e, "Failed to persist search history");
            metrics::PERSIST_FAILURES
                .with_label_values(&[SEARCH_HISTORY_KEY])
                .inc();
        }
    }

    /// Record a submitted query. Blank queries are ignored; a repeated
    /// query moves to the front.
    pub fn add(&self, query: &str) -> Vec<String> {
        let query = query.trim();
        let mut queries = self.queries();
        if query.is_empty() {
            return queries.clone();
        }
        queries.retain(|q| q != query);
        queries.insert(0, query.to_string());
        queries.truncate(RECENT_SEARCHES_CAP);
        self.persist(&queries);
        queries.clone()
    }

    /// Forget one query. Returns whether it was present.
    pub fn remove(&self, query: &str) -> bool {
        let mut queries = self.queries();
        let before = queries.len();
        queries.retain(|q| q != query);
        let removed = queries.len() != before;
        if removed {
            self.persist(&queries);
        }
        removed
    }

    pub fn clear(&self) {
        let mut queries = self.queries();
        queries.clear();
        self.persist(&queries);
    }

    pub fn list(&self) -> Vec<String> {
        self.queries().clone()
    }
}
