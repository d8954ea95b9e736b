//! Catalog gateway for movie and TV metadata.
//!
//! [`CatalogSource`] is the seam every consumer talks to. [`TmdbGateway`]
//! implements it over HTTP, pacing every call through a
//! [`RequestThrottle`](crate::throttle::RequestThrottle), and
//! [`CachedCatalog`](crate::cache::CachedCatalog) wraps any source with
//! freshness windows and retries.

mod tmdb;
mod types;

pub use tmdb::{image_url, TmdbGateway};
pub use types::*;

use async_trait::async_trait;
use futures::future::try_join_all;
use thiserror::Error;

/// Errors surfaced by catalog operations.
///
/// Provider failures carry the HTTP status and the provider's message.
/// Transport failures and local validation carry status 0.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    /// No response was received (connection, DNS, timeout).
    #[error("Network error: {message}")]
    Network { message: String },

    /// Credentials were rejected (401/403).
    #[error("Authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    /// Resource does not exist (404).
    #[error("Resource not found ({status}): {message}")]
    NotFound { status: u16, message: String },

    /// Provider rate limit hit (429).
    #[error("Rate limited ({status}): {message}")]
    RateLimited {
        status: u16,
        message: String,
        /// Seconds the provider asked us to wait, if it said.
        retry_after: Option<u64>,
    },

    /// Provider-side failure (5xx).
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Malformed request, either rejected locally or by the provider.
    #[error("Invalid request: {message}")]
    Validation {
        status: Option<u16>,
        message: String,
    },

    /// A successful response whose body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl CatalogError {
    /// Local validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        CatalogError::Validation {
            status: None,
            message: message.into(),
        }
    }

    /// Whether a retry may succeed: transport, server and rate-limit failures.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CatalogError::Network { .. }
                | CatalogError::Server { .. }
                | CatalogError::RateLimited { .. }
        )
    }

    /// HTTP status carried by the error, 0 when there was no response.
    pub fn status(&self) -> u16 {
        match self {
            CatalogError::Auth { status, .. }
            | CatalogError::NotFound { status, .. }
            | CatalogError::RateLimited { status, .. }
            | CatalogError::Server { status, .. } => *status,
            CatalogError::Validation { status, .. } => status.unwrap_or(0),
            CatalogError::Network { .. } | CatalogError::Decode(_) => 0,
        }
    }

    /// Short label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            CatalogError::Network { .. } => "network",
            CatalogError::Auth { .. } => "auth",
            CatalogError::NotFound { .. } => "not_found",
            CatalogError::RateLimited { .. } => "rate_limited",
            CatalogError::Server { .. } => "server",
            CatalogError::Validation { .. } => "validation",
            CatalogError::Decode(_) => "decode",
        }
    }
}

/// Reject page numbers below 1.
pub fn validate_page(page: u32) -> Result<(), CatalogError> {
    if page == 0 {
        return Err(CatalogError::validation("page must be at least 1"));
    }
    Ok(())
}

/// Reject blank search text.
pub fn validate_search(query: &SearchQuery) -> Result<(), CatalogError> {
    if query.query.trim().is_empty() {
        return Err(CatalogError::validation("search query cannot be empty"));
    }
    validate_page(query.page)
}

/// Read access to a movie/TV catalog.
///
/// Implemented by the HTTP gateway, the caching wrapper and test doubles.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch a page of a curated list.
    async fn list(
        &self,
        kind: MediaKind,
        category: ListCategory,
        query: &PageQuery,
    ) -> Result<CatalogPage, CatalogError>;

    /// Fetch the full detail of one item.
    async fn detail(&self, kind: MediaKind, id: u64) -> Result<ItemDetail, CatalogError>;

    /// Fetch cast and crew.
    async fn credits(&self, kind: MediaKind, id: u64) -> Result<Credits, CatalogError>;

    /// Fetch trailers, teasers and clips.
    async fn videos(&self, kind: MediaKind, id: u64) -> Result<Vec<Video>, CatalogError>;

    /// Fetch items similar to, or recommended from, an item.
    async fn related(
        &self,
        kind: MediaKind,
        id: u64,
        relation: Relation,
        query: &PageQuery,
    ) -> Result<CatalogPage, CatalogError>;

    /// Free-text search within one kind.
    async fn search(
        &self,
        kind: MediaKind,
        query: &SearchQuery,
    ) -> Result<CatalogPage, CatalogError>;

    /// Free-text search across movies and series.
    async fn search_multi(&self, query: &SearchQuery) -> Result<CatalogPage, CatalogError>;

    /// Filtered discovery.
    async fn discover(
        &self,
        kind: MediaKind,
        filters: &DiscoverFilters,
    ) -> Result<CatalogPage, CatalogError>;

    /// Fetch a season of a series with its episodes.
    async fn season(&self, series_id: u64, season_number: u32)
        -> Result<SeasonDetail, CatalogError>;

    /// Fetch a single episode.
    async fn episode(
        &self,
        series_id: u64,
        season_number: u32,
        episode_number: u32,
    ) -> Result<Episode, CatalogError>;

    /// Genre taxonomy for a kind.
    async fn genres(&self, kind: MediaKind) -> Result<GenreTable, CatalogError>;

    /// Detail, credits and videos in parallel.
    ///
    /// All-or-nothing: if any of the three fails, the first failure is
    /// returned and no partial result is produced.
    async fn full_info(&self, kind: MediaKind, id: u64) -> Result<FullItemInfo, CatalogError> {
        let (detail, credits, videos) = tokio::try_join!(
            self.detail(kind, id),
            self.credits(kind, id),
            self.videos(kind, id)
        )?;
        Ok(FullItemInfo {
            detail,
            credits,
            videos,
        })
    }

    /// Details for several items in parallel, in the order requested.
    ///
    /// All-or-nothing like [`full_info`](Self::full_info).
    async fn details_batch(
        &self,
        kind: MediaKind,
        ids: &[u64],
    ) -> Result<Vec<ItemDetail>, CatalogError> {
        try_join_all(ids.iter().map(|id| self.detail(kind, *id))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classes() {
        assert!(CatalogError::Network {
            message: "reset".into()
        }
        .is_retryable());
        assert!(CatalogError::Server {
            status: 503,
            message: "down".into()
        }
        .is_retryable());
        assert!(CatalogError::RateLimited {
            status: 429,
            message: "slow down".into(),
            retry_after: None
        }
        .is_retryable());

        assert!(!CatalogError::Auth {
            status: 401,
            message: "bad key".into()
        }
        .is_retryable());
        assert!(!CatalogError::NotFound {
            status: 404,
            message: "gone".into()
        }
        .is_retryable());
        assert!(!CatalogError::validation("bad page").is_retryable());
        assert!(!CatalogError::Decode("eof".into()).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            CatalogError::NotFound {
                status: 404,
                message: String::new()
            }
            .status(),
            404
        );
        assert_eq!(
            CatalogError::Network {
                message: String::new()
            }
            .status(),
            0
        );
        assert_eq!(CatalogError::validation("x").status(), 0);
        assert_eq!(
            CatalogError::Validation {
                status: Some(422),
                message: String::new()
            }
            .status(),
            422
        );
    }

    #[test]
    fn test_validate_page() {
        assert!(validate_page(1).is_ok());
        assert!(matches!(
            validate_page(0),
            Err(CatalogError::Validation { .. })
        ));
    }

    #[test]
    fn test_validate_search() {
        assert!(validate_search(&SearchQuery::new("matrix")).is_ok());
        assert!(validate_search(&SearchQuery::new("   ")).is_err());
        assert!(validate_search(&SearchQuery::new("matrix").with_page(0)).is_err());
    }
}
