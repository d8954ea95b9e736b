use std::future::Future;
use std::time::Duration;
use tracing::warn;

use super::ResourceClass;
use crate::catalog::CatalogError;
use crate::config::CacheConfig;
use crate::metrics;

/// Freshness windows per resource class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshnessPolicy {
    pub list: Duration,
    pub detail: Duration,
    pub search: Duration,
    pub default: Duration,
    /// Entries older than this many windows are dropped.
    pub retention_factor: u32,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl FreshnessPolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            list: Duration::from_secs(config.list_ttl_secs),
            detail: Duration::from_secs(config.detail_ttl_secs),
            search: Duration::from_secs(config.search_ttl_secs),
            default: Duration::from_secs(config.default_ttl_secs),
            retention_factor: config.retention_factor,
        }
    }

    /// Maximum age at which an entry is served without refetching.
    pub fn window(&self, class: ResourceClass) -> Duration {
        match class {
            ResourceClass::List => self.list,
            ResourceClass::Detail => self.detail,
            ResourceClass::Search => self.search,
            ResourceClass::Default => self.default,
        }
    }

    /// Maximum age at which a stale entry is still kept around.
    pub fn retention(&self, class: ResourceClass) -> Duration {
        self.window(class) * self.retention_factor.max(1)
    }
}

/// Bounded exponential backoff for transient catalog failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }

    /// Never retry.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based): `min(base * 2^attempt, max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Delay after `error`, honouring a provider `Retry-After` up to `max_delay`.
    pub fn delay_after(&self, attempt: u32, error: &CatalogError) -> Duration {
        let backoff = self.delay_for(attempt);
        match error {
            CatalogError::RateLimited {
                retry_after: Some(secs),
                ..
            } => backoff.max(Duration::from_secs(*secs)).min(self.max_delay),
            _ => backoff,
        }
    }

    /// Run `operation`, retrying retryable failures.
    ///
    /// Auth, not-found, validation and decode failures return immediately.
    pub async fn run<T, F, Fut>(&self, class: ResourceClass, mut operation: F) -> Result<T, CatalogError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CatalogError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay_after(attempt, &e);
                    warn!(
                        class = class.as_str(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying catalog fetch"
                    );
                    metrics::CACHE_RETRIES
                        .with_label_values(&[class.as_str()])
                        .inc();
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
