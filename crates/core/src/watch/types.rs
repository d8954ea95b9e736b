//! Watch-state entry types and the persisted snapshot shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{WatchStateError, SNAPSHOT_VERSION};
use crate::catalog::{ItemDetail, MediaKind};

/// A (season, episode) position within a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpisodePointer {
    pub season: u32,
    pub episode: u32,
}

impl EpisodePointer {
    pub fn new(season: u32, episode: u32) -> Self {
        Self { season, episode }
    }
}

/// Identity of a history entry: a movie, or one episode of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchKey {
    pub id: u64,
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<EpisodePointer>,
}

impl WatchKey {
    pub fn movie(id: u64) -> Self {
        Self {
            id,
            kind: MediaKind::Movie,
            episode: None,
        }
    }

    pub fn episode(id: u64, season: u32, episode: u32) -> Self {
        Self {
            id,
            kind: MediaKind::Series,
            episode: Some(EpisodePointer::new(season, episode)),
        }
    }
}

/// What is known about a series' shape at the time progress is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesLayout {
    /// Episode count of the season being watched.
    pub episodes_in_season: Option<u32>,
    /// Number of seasons in the series.
    pub total_seasons: Option<u32>,
}

impl SeriesLayout {
    pub fn new(episodes_in_season: u32, total_seasons: u32) -> Self {
        Self {
            episodes_in_season: Some(episodes_in_season),
            total_seasons: Some(total_seasons),
        }
    }

    /// Layout for `season` as listed by a series detail.
    pub fn from_detail(detail: &ItemDetail, season: u32) -> Self {
        Self {
            episodes_in_season: detail.episodes_in_season(season),
            total_seasons: detail.number_of_seasons.filter(|n| *n > 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchHistoryEntry {
    pub id: u64,
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    /// 0-100.
    pub progress: f64,
    pub last_watched: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_minutes: Option<u32>,
}

impl WatchHistoryEntry {
    pub fn key(&self) -> WatchKey {
        WatchKey {
            id: self.id,
            kind: self.kind,
            episode: match (self.season, self.episode) {
                (Some(season), Some(episode)) => Some(EpisodePointer::new(season, episode)),
                _ => None,
            },
        }
    }
}

/// One in-progress title, most recent first in the derived list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinueWatchingEntry {
    pub id: u64,
    pub kind: MediaKind,
    pub progress: f64,
    pub last_watched: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_title: Option<String>,
    /// Successor episode, absent for movies and series finales.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_episode: Option<EpisodePointer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub id: u64,
    pub kind: MediaKind,
    pub added_at: DateTime<Utc>,
}

/// A progress write, plus the display hints stored alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub id: u64,
    pub kind: MediaKind,
    pub episode: Option<EpisodePointer>,
    pub progress: f64,
    pub layout: SeriesLayout,
    pub title: Option<String>,
    pub poster_path: Option<String>,
    pub episode_title: Option<String>,
    pub runtime_minutes: Option<u32>,
}

impl ProgressUpdate {
    pub fn new(id: u64, kind: MediaKind, progress: f64) -> Self {
        Self {
            id,
            kind,
            episode: None,
            progress,
            layout: SeriesLayout::default(),
            title: None,
            poster_path: None,
            episode_title: None,
            runtime_minutes: None,
        }
    }

    pub fn movie(id: u64, progress: f64) -> Self {
        Self::new(id, MediaKind::Movie, progress)
    }

    pub fn episode(id: u64, season: u32, episode: u32, progress: f64) -> Self {
        Self::new(id, MediaKind::Series, progress).with_episode(season, episode)
    }

    pub fn with_episode(mut self, season: u32, episode: u32) -> Self {
        self.episode = Some(EpisodePointer::new(season, episode));
        self
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_layout(mut self, layout: SeriesLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_poster(mut self, poster_path: impl Into<String>) -> Self {
        self.poster_path = Some(poster_path.into());
        self
    }

    pub fn with_episode_title(mut self, episode_title: impl Into<String>) -> Self {
        self.episode_title = Some(episode_title.into());
        self
    }

    pub fn with_runtime(mut self, minutes: u32) -> Self {
        self.runtime_minutes = Some(minutes);
        self
    }

    pub fn key(&self) -> WatchKey {
        WatchKey {
            id: self.id,
            kind: self.kind,
            episode: self.episode,
        }
    }

    /// Check the update and return its progress clamped to 0-100.
    /// NaN and infinite progress are rejected.
    pub(crate) fn validated_progress(&self) -> Result<f64, WatchStateError> {
        if !self.progress.is_finite() {
            return Err(WatchStateError::InvalidProgress(self.progress));
        }
        match (self.kind, self.episode) {
            (MediaKind::Series, None) => {
                return Err(WatchStateError::MissingEpisode { id: self.id })
            }
            (MediaKind::Movie, Some(_)) => {
                return Err(WatchStateError::UnexpectedEpisode {
                    id: self.id,
                    kind: self.kind,
                })
            }
            _ => {}
        }
        Ok(self.progress.clamp(0.0, 100.0))
    }
}

/// Persisted form of the whole store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchStateSnapshot {
    pub version: u32,
    #[serde(default)]
    pub history: Vec<WatchHistoryEntry>,
    #[serde(default)]
    pub favorites: Vec<FavoriteEntry>,
    #[serde(default)]
    pub continue_watching: Vec<ContinueWatchingEntry>,
}

impl Default for WatchStateSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            history: Vec::new(),
            favorites: Vec::new(),
            continue_watching: Vec::new(),
        }
    }
}

impl WatchStateSnapshot {
    pub fn from_json(json: &str) -> Result<Self, WatchStateError> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| WatchStateError::Snapshot(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(WatchStateError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String, WatchStateError> {
        serde_json::to_string(self).map_err(|e| WatchStateError::Snapshot(e.to_string()))
    }
}
