use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::{DiscoverFilters, ListCategory, MediaKind, PageQuery, Relation, SearchQuery};

/// Volatility class of a cached resource; each maps to a freshness window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    /// Curated and discovery lists.
    List,
    /// Item detail, credits, videos, seasons, genre tables.
    Detail,
    /// Free-text search results.
    Search,
    Default,
}

impl ResourceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceClass::List => "list",
            ResourceClass::Detail => "detail",
            ResourceClass::Search => "search",
            ResourceClass::Default => "default",
        }
    }
}

/// Composite cache key: operation name plus its parameters.
///
/// Rendered as `kind:operation:param:...`, e.g. `movie:list:trending_week:1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    class: ResourceClass,
    key: String,
}

impl CacheKey {
    /// Build a key from raw parts.
    pub fn new(class: ResourceClass, parts: &[&str]) -> Self {
        Self {
            class,
            key: parts.join(":"),
        }
    }

    pub fn class(&self) -> ResourceClass {
        self.class
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn list(kind: MediaKind, category: ListCategory, query: &PageQuery) -> Self {
        let name = category.name();
        let page = query.page.to_string();
        let mut parts = vec![kind.as_str(), "list", name.as_str(), page.as_str()];
        push_locale(&mut parts, query.language.as_deref(), query.region.as_deref());
        Self::new(ResourceClass::List, &parts)
    }

    pub fn detail(kind: MediaKind, id: u64) -> Self {
        Self::new(ResourceClass::Detail, &[kind.as_str(), "detail", &id.to_string()])
    }

    pub fn credits(kind: MediaKind, id: u64) -> Self {
        Self::new(
            ResourceClass::Detail,
            &[kind.as_str(), "credits", &id.to_string()],
        )
    }

    pub fn videos(kind: MediaKind, id: u64) -> Self {
        Self::new(ResourceClass::Detail, &[kind.as_str(), "videos", &id.to_string()])
    }

    pub fn related(kind: MediaKind, id: u64, relation: Relation, query: &PageQuery) -> Self {
        let id = id.to_string();
        let page = query.page.to_string();
        let mut parts = vec![kind.as_str(), relation.as_str(), id.as_str(), page.as_str()];
        push_locale(&mut parts, query.language.as_deref(), query.region.as_deref());
        Self::new(ResourceClass::List, &parts)
    }

    pub fn search(kind: MediaKind, query: &SearchQuery) -> Self {
        Self::search_key(kind.as_str(), query)
    }

    pub fn search_multi(query: &SearchQuery) -> Self {
        Self::search_key("multi", query)
    }

    fn search_key(scope: &str, query: &SearchQuery) -> Self {
        let text = normalize_text(&query.query);
        let page = query.page.to_string();
        let year = query.year.map(|y| y.to_string()).unwrap_or_default();
        let adult = query
            .include_adult
            .map(|a| a.to_string())
            .unwrap_or_default();
        let mut parts = vec![
            scope,
            "search",
            text.as_str(),
            page.as_str(),
            year.as_str(),
            adult.as_str(),
        ];
        push_locale(&mut parts, query.language.as_deref(), query.region.as_deref());
        Self::new(ResourceClass::Search, &parts)
    }

    pub fn discover(kind: MediaKind, filters: &DiscoverFilters) -> Self {
        // Filters have no canonical order of their own; serde field order is stable.
        let encoded = serde_json::to_string(filters).unwrap_or_default();
        let encoded = urlencoding::encode(&encoded);
        Self::new(
            ResourceClass::List,
            &[kind.as_str(), "discover", encoded.as_ref()],
        )
    }

    pub fn season(series_id: u64, season_number: u32) -> Self {
        Self::new(
            ResourceClass::Detail,
            &[
                MediaKind::Series.as_str(),
                "season",
                &series_id.to_string(),
                &season_number.to_string(),
            ],
        )
    }

    pub fn episode(series_id: u64, season_number: u32, episode_number: u32) -> Self {
        Self::new(
            ResourceClass::Detail,
            &[
                MediaKind::Series.as_str(),
                "episode",
                &series_id.to_string(),
                &season_number.to_string(),
                &episode_number.to_string(),
            ],
        )
    }

    pub fn genres(kind: MediaKind) -> Self {
        Self::new(ResourceClass::Detail, &[kind.as_str(), "genres"])
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

fn push_locale<'a>(parts: &mut Vec<&'a str>, language: Option<&'a str>, region: Option<&'a str>) {
    if language.is_some() || region.is_some() {
        parts.push(language.unwrap_or(""));
        parts.push(region.unwrap_or(""));
    }
}

/// Lower-case, trimmed, percent-encoded so ':' in user text cannot collide.
fn normalize_text(text: &str) -> String {
    urlencoding::encode(&text.trim().to_lowercase()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TimeWindow;

    #[test]
    fn test_list_key() {
        let key = CacheKey::list(
            MediaKind::Movie,
            ListCategory::Trending(TimeWindow::Week),
            &PageQuery::new(1),
        );
        assert_eq!(key.to_string(), "movie:list:trending_week:1");
        assert_eq!(key.class(), ResourceClass::List);
    }

    #[test]
    fn test_list_key_includes_locale_override() {
        let key = CacheKey::list(
            MediaKind::Series,
            ListCategory::Popular,
            &PageQuery::new(2).with_language("it-IT"),
        );
        assert_eq!(key.as_str(), "tv:list:popular:2:it-IT:");
    }

    #[test]
    fn test_search_key_normalizes_text() {
        let a = CacheKey::search(MediaKind::Movie, &SearchQuery::new("  The Matrix "));
        let b = CacheKey::search(MediaKind::Movie, &SearchQuery::new("the matrix"));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "movie:search:the%20matrix:1::");
        assert_eq!(a.class(), ResourceClass::Search);
    }

    #[test]
    fn test_search_key_escapes_separator() {
        let key = CacheKey::search_multi(&SearchQuery::new("star wars: episode iv"));
        assert!(key.as_str().starts_with("multi:search:star%20wars%3A%20episode%20iv:"));
    }

    #[test]
    fn test_detail_keys_are_distinct_per_kind() {
        assert_ne!(
            CacheKey::detail(MediaKind::Movie, 1),
            CacheKey::detail(MediaKind::Series, 1)
        );
        assert_eq!(CacheKey::detail(MediaKind::Series, 1).as_str(), "tv:detail:1");
        assert_eq!(CacheKey::season(1399, 2).as_str(), "tv:season:1399:2");
    }

    #[test]
    fn test_discover_key_depends_on_filters() {
        let a = CacheKey::discover(MediaKind::Movie, &DiscoverFilters::new().with_genre(28));
        let b = CacheKey::discover(MediaKind::Movie, &DiscoverFilters::new().with_genre(18));
        assert_ne!(a, b);
        assert_eq!(a.class(), ResourceClass::List);
    }
}
