//! Testing utilities and mock implementations.
//!
//! This module provides a mock catalog source and fixtures so the cache,
//! watch state and HTTP facade can be exercised without the network.
//!
//! # Example
//!
//! ```rust,ignore
//! use marquee_core::testing::{MockCatalog, fixtures};
//!
//! let catalog = MockCatalog::new();
//! catalog.add_detail(fixtures::movie_detail(603, "The Matrix")).await;
//! ```

mod mock_catalog;

pub use mock_catalog::{paginate, MockCatalog, RecordedCatalogCall, PAGE_SIZE};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::catalog::{
        CatalogItem, Episode, Genre, GenreTable, ItemDetail, MediaKind, SeasonDetail,
        SeasonSummary, Video,
    };

    /// Create a catalog item with reasonable defaults.
    pub fn catalog_item(id: u64, kind: MediaKind, title: &str) -> CatalogItem {
        CatalogItem {
            id,
            kind,
            title: title.to_string(),
            original_title: None,
            overview: Some(format!("All about {}.", title.to_lowercase())),
            poster_path: Some(format!("/poster-{id}.jpg")),
            backdrop_path: Some(format!("/backdrop-{id}.jpg")),
            rating: 7.5,
            vote_count: 1000,
            popularity: 50.0,
            release_date: Some("2020-06-15".to_string()),
            genres: vec!["Drama".to_string()],
        }
    }

    /// Create a movie item.
    pub fn movie(id: u64, title: &str) -> CatalogItem {
        catalog_item(id, MediaKind::Movie, title)
    }

    /// Create a series item.
    pub fn series(id: u64, name: &str) -> CatalogItem {
        catalog_item(id, MediaKind::Series, name)
    }

    /// Create a movie detail.
    pub fn movie_detail(id: u64, title: &str) -> ItemDetail {
        ItemDetail {
            item: movie(id, title),
            runtime_minutes: Some(120),
            tagline: None,
            status: Some("Released".to_string()),
            homepage: None,
            number_of_seasons: None,
            number_of_episodes: None,
            seasons: Vec::new(),
        }
    }

    /// Create a series detail with `seasons` seasons of `episodes` episodes each.
    pub fn series_detail(id: u64, name: &str, seasons: u32, episodes: u32) -> ItemDetail {
        ItemDetail {
            item: series(id, name),
            runtime_minutes: Some(45),
            tagline: None,
            status: Some("Returning Series".to_string()),
            homepage: None,
            number_of_seasons: Some(seasons),
            number_of_episodes: Some(seasons * episodes),
            seasons: (1..=seasons)
                .map(|s| SeasonSummary {
                    season_number: s,
                    name: Some(format!("Season {s}")),
                    episode_count: episodes,
                    air_date: Some(format!("{}-01-01", 2010 + s)),
                    poster_path: None,
                })
                .collect(),
        }
    }

    /// Create a season with `episodes` episodes.
    pub fn season(season_number: u32, episodes: u32) -> SeasonDetail {
        SeasonDetail {
            season_number,
            name: Some(format!("Season {season_number}")),
            overview: None,
            air_date: Some("2020-01-01".to_string()),
            poster_path: None,
            episodes: (1..=episodes)
                .map(|e| Episode {
                    season_number,
                    episode_number: e,
                    name: format!("Episode {e}"),
                    overview: Some(format!("Episode {e} description.")),
                    runtime_minutes: Some(45),
                    air_date: Some(format!("2020-01-{:02}", e.min(28))),
                    still_path: None,
                    rating: 8.0,
                })
                .collect(),
        }
    }

    /// Create a YouTube trailer.
    pub fn trailer(key: &str) -> Video {
        Video {
            id: format!("video-{key}"),
            key: key.to_string(),
            name: "Official Trailer".to_string(),
            site: "YouTube".to_string(),
            video_type: "Trailer".to_string(),
            official: true,
            published_at: None,
        }
    }

    /// The usual movie genre table subset.
    pub fn movie_genres() -> GenreTable {
        GenreTable::new(vec![
            Genre {
                id: 28,
                name: "Action".to_string(),
            },
            Genre {
                id: 18,
                name: "Drama".to_string(),
            },
            Genre {
                id: 878,
                name: "Science Fiction".to_string(),
            },
        ])
    }
}
