use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{CacheKey, FreshnessPolicy, ResourceClass, RetryPolicy};
use crate::catalog::CatalogError;
use crate::metrics;

struct Entry {
    class: ResourceClass,
    value: serde_json::Value,
    fetched_at: Instant,
}

/// A caller's share of a key's single-flight lock. The map entry is removed
/// when the last holder drops, whether its fetch finished or was cancelled.
struct FlightSlot<'a> {
    cache: &'a ResponseCache,
    key: &'a str,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for FlightSlot<'_> {
    fn drop(&mut self) {
        let mut in_flight = self
            .cache
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        // Map + this handle: nobody else is waiting on the key.
        let last = in_flight
            .get(self.key)
            .is_some_and(|lock| Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) <= 2);
        if last {
            in_flight.remove(self.key);
        }
    }
}

/// Result of looking a key up against its freshness window.
#[derive(Debug, Clone, PartialEq)]
pub enum Freshness {
    Fresh(serde_json::Value),
    Stale,
    Missing,
}

/// In-memory response cache keyed by [`CacheKey`].
///
/// Values are stored as JSON so one cache can hold every response type.
/// Concurrent fetches of the same key are collapsed into one.
pub struct ResponseCache {
    policy: FreshnessPolicy,
    entries: Mutex<HashMap<String, Entry>>,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ResponseCache {
    pub fn new(policy: FreshnessPolicy) -> Self {
        Self {
            policy,
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &FreshnessPolicy {
        &self.policy
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // A poisoned map only means a panic mid-insert; the data is still usable.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Classify an entry against its window.
    pub fn freshness(&self, key: &CacheKey) -> Freshness {
        let entries = self.entries();
        match entries.get(key.as_str()) {
            Some(entry) if entry.fetched_at.elapsed() < self.policy.window(entry.class) => {
                Freshness::Fresh(entry.value.clone())
            }
            Some(_) => Freshness::Stale,
            None => Freshness::Missing,
        }
    }

    /// Fresh value for `key`, if any.
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.freshness(key) {
            Freshness::Fresh(value) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }

    /// Store a value, replacing any previous entry, and prune expired ones.
    pub fn insert<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode response for cache");
                return;
            }
        };

        let now = Instant::now();
        let mut entries = self.entries();
        entries.retain(|_, entry| {
            now.duration_since(entry.fetched_at) < self.policy.retention(entry.class)
        });
        entries.insert(
            key.as_str().to_string(),
            Entry {
                class: key.class(),
                value,
                fetched_at: now,
            },
        );
    }

    /// Drop one entry. Returns whether it existed.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries().remove(key.as_str()).is_some()
    }

    /// Drop every entry whose key starts with `prefix`. Returns how many.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn flight_slot<'a>(&'a self, key: &'a CacheKey) -> FlightSlot<'a> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        let lock = Arc::clone(in_flight.entry(key.as_str().to_string()).or_default());
        FlightSlot {
            cache: self,
            key: key.as_str(),
            lock,
        }
    }

    /// Serve `key` from cache while fresh, otherwise fetch it through `retry`
    /// and store the result. Failures are returned and never cached.
    pub async fn get_or_fetch<T, F, Fut>(
        &self,
        key: &CacheKey,
        retry: &RetryPolicy,
        fetch: F,
    ) -> Result<T, CatalogError>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CatalogError>>,
    {
        let class = key.class().as_str();

        if let Some(value) = self.get(key) {
            metrics::CACHE_LOOKUPS.with_label_values(&[class, "hit"]).inc();
            return Ok(value);
        }

        // Declared before the guard so the guard is released first, also
        // when this future is dropped mid-fetch.
        let slot = self.flight_slot(key);
        let _guard = slot.lock.lock().await;

        // Another caller may have filled the entry while we waited.
        match self.freshness(key) {
            Freshness::Fresh(value) => match serde_json::from_value(value) {
                Ok(value) => {
                    metrics::CACHE_LOOKUPS.with_label_values(&[class, "hit"]).inc();
                    Ok(value)
                }
                Err(_) => self.refresh(key, retry, fetch, "miss").await,
            },
            Freshness::Stale => self.refresh(key, retry, fetch, "stale").await,
            Freshness::Missing => self.refresh(key, retry, fetch, "miss").await,
        }
    }

    async fn refresh<T, F, Fut>(
        &self,
        key: &CacheKey,
        retry: &RetryPolicy,
        fetch: F,
        lookup: &'static str,
    ) -> Result<T, CatalogError>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CatalogError>>,
    {
        metrics::CACHE_LOOKUPS
            .with_label_values(&[key.class().as_str(), lookup])
            .inc();
        debug!(key = %key, lookup, "Fetching catalog response");

        let value = retry.run(key.class(), fetch).await?;
        self.insert(key, &value);
        Ok(value)
    }
}
