//! Catalog domain types.
//!
//! These are the shapes the rest of the crate works with; provider wire
//! formats are private to each backend and converted on arrival.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::CatalogError;

// ============================================================================
// Kinds and categories
// ============================================================================

/// Kind of catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MediaKind {
    #[serde(rename = "movie")]
    Movie,
    #[serde(rename = "tv", alias = "series")]
    Series,
}

impl MediaKind {
    /// Path segment and wire name ("movie" / "tv").
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "tv",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "movie" | "movies" => Ok(MediaKind::Movie),
            "tv" | "series" | "show" => Ok(MediaKind::Series),
            other => Err(CatalogError::validation(format!(
                "unknown media kind '{other}'"
            ))),
        }
    }
}

/// Trending window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Day,
    #[default]
    Week,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }
}

impl FromStr for TimeWindow {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(TimeWindow::Day),
            "week" => Ok(TimeWindow::Week),
            other => Err(CatalogError::validation(format!(
                "unknown time window '{other}'"
            ))),
        }
    }
}

/// Curated list a page can be fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListCategory {
    Trending(TimeWindow),
    Popular,
    TopRated,
    /// Movies only.
    NowPlaying,
    /// Movies only.
    Upcoming,
    /// Series only.
    AiringToday,
    /// Series only.
    OnTheAir,
}

impl ListCategory {
    /// Stable name used in cache keys and routes.
    pub fn name(&self) -> String {
        match self {
            ListCategory::Trending(window) => format!("trending_{}", window.as_str()),
            ListCategory::Popular => "popular".to_string(),
            ListCategory::TopRated => "top_rated".to_string(),
            ListCategory::NowPlaying => "now_playing".to_string(),
            ListCategory::Upcoming => "upcoming".to_string(),
            ListCategory::AiringToday => "airing_today".to_string(),
            ListCategory::OnTheAir => "on_the_air".to_string(),
        }
    }

    /// Whether this category exists for the given kind.
    pub fn supports(&self, kind: MediaKind) -> bool {
        match self {
            ListCategory::NowPlaying | ListCategory::Upcoming => kind == MediaKind::Movie,
            ListCategory::AiringToday | ListCategory::OnTheAir => kind == MediaKind::Series,
            _ => true,
        }
    }

    /// Endpoint path for this category, rejecting kind mismatches.
    pub fn path(&self, kind: MediaKind) -> Result<String, CatalogError> {
        if !self.supports(kind) {
            return Err(CatalogError::validation(format!(
                "list '{}' is not available for {}",
                self.name(),
                kind
            )));
        }
        Ok(match self {
            ListCategory::Trending(window) => {
                format!("/trending/{}/{}", kind.as_str(), window.as_str())
            }
            other => format!("/{}/{}", kind.as_str(), other.name()),
        })
    }

    /// Parse a category name; `trending` defaults to the weekly window.
    pub fn parse(name: &str, window: Option<TimeWindow>) -> Result<Self, CatalogError> {
        let normalized = name.to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "trending" => Ok(ListCategory::Trending(window.unwrap_or_default())),
            "trending_day" => Ok(ListCategory::Trending(TimeWindow::Day)),
            "trending_week" => Ok(ListCategory::Trending(TimeWindow::Week)),
            "popular" => Ok(ListCategory::Popular),
            "top_rated" => Ok(ListCategory::TopRated),
            "now_playing" => Ok(ListCategory::NowPlaying),
            "upcoming" => Ok(ListCategory::Upcoming),
            "airing_today" => Ok(ListCategory::AiringToday),
            "on_the_air" => Ok(ListCategory::OnTheAir),
            other => Err(CatalogError::validation(format!(
                "unknown list category '{other}'"
            ))),
        }
    }
}

/// Lists derived from a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Similar,
    Recommendations,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Similar => "similar",
            Relation::Recommendations => "recommendations",
        }
    }
}

impl FromStr for Relation {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "similar" => Ok(Relation::Similar),
            "recommendations" | "recommended" => Ok(Relation::Recommendations),
            other => Err(CatalogError::validation(format!(
                "unknown relation '{other}'"
            ))),
        }
    }
}

// ============================================================================
// Request parameters
// ============================================================================

/// Page selection with optional locale overrides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageQuery {
    pub page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self::new(1)
    }
}

impl PageQuery {
    pub fn new(page: u32) -> Self {
        Self {
            page,
            language: None,
            region: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// Free-text search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default = "first_page")]
    pub page: u32,
    /// Release year (movies) or first-air year (series).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_adult: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

fn first_page() -> u32 {
    1
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page: 1,
            year: None,
            include_adult: None,
            language: None,
            region: None,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_year(mut self, year: u32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_include_adult(mut self, include_adult: bool) -> Self {
        self.include_adult = Some(include_adult);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// Discovery filters. Unset fields are not sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoverFilters {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genre_ids: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_votes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_adult: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Default for DiscoverFilters {
    fn default() -> Self {
        Self {
            page: 1,
            sort_by: None,
            genre_ids: Vec::new(),
            year: None,
            min_rating: None,
            max_rating: None,
            min_votes: None,
            include_adult: None,
            language: None,
            region: None,
        }
    }
}

impl DiscoverFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = Some(sort_by.into());
        self
    }

    pub fn with_genre(mut self, genre_id: u32) -> Self {
        self.genre_ids.push(genre_id);
        self
    }

    pub fn with_year(mut self, year: u32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_min_rating(mut self, rating: f32) -> Self {
        self.min_rating = Some(rating);
        self
    }

    pub fn with_max_rating(mut self, rating: f32) -> Self {
        self.max_rating = Some(rating);
        self
    }

    pub fn with_min_votes(mut self, votes: u32) -> Self {
        self.min_votes = Some(votes);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

// ============================================================================
// Results
// ============================================================================

/// A movie or series as shown in lists and search results.
///
/// Replaced wholesale on refetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Provider-assigned identifier.
    pub id: u64,
    pub kind: MediaKind,
    /// Title for movies, name for series.
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_path: Option<String>,
    /// Average vote (0-10), one decimal.
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub vote_count: u32,
    #[serde(default)]
    pub popularity: f64,
    /// Release date for movies, first air date for series (YYYY-MM-DD).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl CatalogItem {
    /// Release year parsed from the release date.
    pub fn year(&self) -> Option<u32> {
        year_of(self.release_date.as_deref())
    }
}

pub(crate) fn year_of(date: Option<&str>) -> Option<u32> {
    date.and_then(|d| d.split('-').next())
        .and_then(|y| y.parse().ok())
}

/// Round a vote average to one decimal.
pub(crate) fn round_rating(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// One page of catalog items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    pub items: Vec<CatalogItem>,
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u32,
}

impl CatalogPage {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// A genre id/name pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

/// Genre id to name lookup, in provider order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Genre>", into = "Vec<Genre>")]
pub struct GenreTable {
    genres: Vec<Genre>,
    index: HashMap<u32, String>,
}

impl GenreTable {
    pub fn new(genres: Vec<Genre>) -> Self {
        let index = genres.iter().map(|g| (g.id, g.name.clone())).collect();
        Self { genres, index }
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.index.get(&id).map(String::as_str)
    }

    /// Resolve ids to names, keeping order and skipping unknown ids.
    pub fn resolve(&self, ids: &[u32]) -> Vec<String> {
        ids.iter()
            .filter_map(|id| self.index.get(id).cloned())
            .collect()
    }

    pub fn genres(&self) -> &[Genre] {
        &self.genres
    }

    pub fn len(&self) -> usize {
        self.genres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
    }
}

impl From<Vec<Genre>> for GenreTable {
    fn from(genres: Vec<Genre>) -> Self {
        Self::new(genres)
    }
}

impl From<GenreTable> for Vec<Genre> {
    fn from(table: GenreTable) -> Self {
        table.genres
    }
}

/// Season entry from a series detail response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSummary {
    /// Season number (0 for specials).
    pub season_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub episode_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
}

/// Full detail of a movie or series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: CatalogItem,
    /// Movie runtime, or typical episode runtime for series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_seasons: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_episodes: Option<u32>,
    #[serde(default)]
    pub seasons: Vec<SeasonSummary>,
}

impl ItemDetail {
    /// Episode count of a season, if the series lists it.
    pub fn episodes_in_season(&self, season_number: u32) -> Option<u32> {
        self.seasons
            .iter()
            .find(|s| s.season_number == season_number)
            .map(|s| s.episode_count)
            .filter(|count| *count > 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub character: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_path: Option<String>,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewMember {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub job: String,
    #[serde(default)]
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

impl Credits {
    pub fn directors(&self) -> impl Iterator<Item = &CrewMember> {
        self.crew.iter().filter(|c| c.job == "Director")
    }
}

/// A video attached to an item (trailer, teaser, clip).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub key: String,
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
    #[serde(default)]
    pub official: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

impl Video {
    pub fn is_trailer(&self) -> bool {
        self.video_type == "Trailer" && self.site == "YouTube"
    }
}

/// Detail, credits and videos fetched together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullItemInfo {
    pub detail: ItemDetail,
    pub credits: Credits,
    pub videos: Vec<Video>,
}

impl FullItemInfo {
    /// Preferred trailer: official ones first, then any trailer.
    pub fn trailer(&self) -> Option<&Video> {
        self.videos
            .iter()
            .filter(|v| v.is_trailer())
            .max_by_key(|v| v.official)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub season_number: u32,
    pub episode_number: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub still_path: Option<String>,
    #[serde(default)]
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonDetail {
    pub season_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

impl SeasonDetail {
    /// Total runtime in minutes of episodes that report one.
    pub fn total_runtime_minutes(&self) -> u32 {
        self.episodes.iter().filter_map(|e| e.runtime_minutes).sum()
    }
}
