//! Response cache with per-resource freshness windows.
//!
//! Lists stay fresh for an hour, details for a day, searches for five
//! minutes. Stale or missing entries are refetched through a bounded
//! exponential-backoff retry that only retries transient failures.

mod cached;
mod key;
mod policy;
mod store;

pub use cached::CachedCatalog;
pub use key::{CacheKey, ResourceClass};
pub use policy::{FreshnessPolicy, RetryPolicy};
pub use store::{Freshness, ResponseCache};
