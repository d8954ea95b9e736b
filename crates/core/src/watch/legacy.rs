//! One-time import of the pre-snapshot preferences blob.
//!
//! The old shape only tracked movies: a favorites list of full movie
//! objects and a flat watch history keyed by `movieId`.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashSet;

use super::{
    ContinueWatchingEntry, FavoriteEntry, WatchHistoryEntry, WatchStateError, WatchStateSnapshot,
    CONTINUE_WATCHING_CAP, FINISHED_THRESHOLD, HISTORY_CAP,
};
use crate::catalog::MediaKind;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPreferences {
    #[serde(default)]
    favorites: Vec<LegacyFavorite>,
    #[serde(default)]
    watch_history: Vec<LegacyProgress>,
}

/// Persisted wrapper some writers used: `{ "state": {...}, "version": 0 }`.
#[derive(Debug, Deserialize)]
struct LegacyEnvelope {
    state: LegacyPreferences,
}

#[derive(Debug, Deserialize)]
struct LegacyFavorite {
    id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyProgress {
    movie_id: u64,
    #[serde(default)]
    progress: f64,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
}

fn parse(json: &str) -> Result<LegacyPreferences, WatchStateError> {
    if let Ok(envelope) = serde_json::from_str::<LegacyEnvelope>(json) {
        return Ok(envelope.state);
    }
    serde_json::from_str(json).map_err(|e| WatchStateError::Snapshot(e.to_string()))
}

fn timestamp(ms: i64, fallback: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or(fallback)
}

/// Convert a legacy preferences blob into a snapshot.
pub(crate) fn migrate(json: &str, now: DateTime<Utc>) -> Result<WatchStateSnapshot, WatchStateError> {
    let legacy = parse(json)?;

    let mut seen = HashSet::new();
    let favorites = legacy
        .favorites
        .iter()
        .filter(|f| seen.insert(f.id))
        .map(|f| FavoriteEntry {
            id: f.id,
            kind: MediaKind::Movie,
            added_at: now,
        })
        .collect();

    let mut seen = HashSet::new();
    let mut progress: Vec<&LegacyProgress> = legacy
        .watch_history
        .iter()
        .filter(|p| !p.progress.is_nan() && seen.insert(p.movie_id))
        .collect();
    progress.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let history = progress
        .iter()
        .take(HISTORY_CAP)
        .map(|p| WatchHistoryEntry {
            id: p.movie_id,
            kind: MediaKind::Movie,
            season: None,
            episode: None,
            progress: p.progress.clamp(0.0, 100.0),
            last_watched: timestamp(p.timestamp, now),
            episode_title: None,
            runtime_minutes: None,
        })
        .collect();

    let continue_watching = progress
        .iter()
        .filter(|p| p.progress.clamp(0.0, 100.0) < FINISHED_THRESHOLD)
        .take(CONTINUE_WATCHING_CAP)
        .map(|p| ContinueWatchingEntry {
            id: p.movie_id,
            kind: MediaKind::Movie,
            progress: p.progress.clamp(0.0, 100.0),
            last_watched: timestamp(p.timestamp, now),
            title: p.title.clone().filter(|t| !t.is_empty()),
            poster_path: p.poster_path.clone().filter(|t| !t.is_empty()),
            runtime_minutes: None,
            season: None,
            episode: None,
            episode_title: None,
            next_episode: None,
        })
        .collect();

    Ok(WatchStateSnapshot {
        history,
        favorites,
        continue_watching,
        ..WatchStateSnapshot::default()
    })
}
