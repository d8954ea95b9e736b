//! Watch-state store scenarios: caps, exclusion, succession, round-trips
//! and persistence across restarts.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tempfile::TempDir;

use marquee_core::catalog::MediaKind;
use marquee_core::storage::{
    KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, LEGACY_PREFERENCES_KEY,
    WATCH_STATE_KEY,
};
use marquee_core::testing::fixtures;
use marquee_core::watch::{
    EpisodePointer, HydrateSource, ProgressUpdate, SeriesLayout, WatchKey, WatchStateStore,
    HISTORY_CAP,
};

fn memory_store() -> WatchStateStore {
    WatchStateStore::new(Arc::new(MemoryKeyValueStore::new()))
}

#[test]
fn test_history_keeps_the_most_recent_hundred() {
    let store = memory_store();
    let start = Utc::now();
    for id in 1..=101u64 {
        store
            .record_progress_at(
                &ProgressUpdate::movie(id, 30.0),
                start + Duration::seconds(id as i64),
            )
            .unwrap();
    }

    let history = store.history();
    assert_eq!(history.len(), HISTORY_CAP);
    assert_eq!(history[0].id, 101);
    assert!(history.iter().all(|h| h.id != 1));
    assert!(store.progress_for(&WatchKey::movie(1)).is_none());
}

#[test]
fn test_nearly_finished_titles_leave_continue_watching() {
    let store = memory_store();
    store.record_progress(&ProgressUpdate::movie(42, 50.0)).unwrap();
    assert_eq!(store.continue_watching().len(), 1);

    let recorded = store.record_progress(&ProgressUpdate::movie(42, 95.0)).unwrap();
    assert!(!recorded.in_progress);
    assert!(store
        .continue_watching()
        .iter()
        .all(|c| !(c.id == 42 && c.kind == MediaKind::Movie)));

    // The history entry stays, with the new progress.
    assert_eq!(
        store.progress_for(&WatchKey::movie(42)).unwrap().progress,
        95.0
    );
}

#[test]
fn test_exactly_ninety_counts_as_finished() {
    let store = memory_store();
    store.record_progress(&ProgressUpdate::movie(1, 89.9)).unwrap();
    assert_eq!(store.continue_watching().len(), 1);
    store.record_progress(&ProgressUpdate::movie(1, 90.0)).unwrap();
    assert!(store.continue_watching().is_empty());
}

#[test]
fn test_next_episode_crosses_season_boundary() {
    let store = memory_store();
    let detail = fixtures::series_detail(1399, "Game of Thrones", 2, 10);

    let recorded = store
        .record_progress(
            &ProgressUpdate::episode(1399, 1, 10, 40.0)
                .with_layout(SeriesLayout::from_detail(&detail, 1)),
        )
        .unwrap();
    assert_eq!(recorded.next_episode, Some(EpisodePointer::new(2, 1)));
    assert_eq!(
        store.continue_watching()[0].next_episode,
        Some(EpisodePointer { season: 2, episode: 1 })
    );

    let finale = store
        .record_progress(
            &ProgressUpdate::episode(1399, 2, 10, 40.0)
                .with_layout(SeriesLayout::from_detail(&detail, 2)),
        )
        .unwrap();
    assert_eq!(finale.next_episode, None);
    assert_eq!(store.continue_watching()[0].next_episode, None);
}

#[test]
fn test_favorite_upsert_is_idempotent() {
    let store = memory_store();
    store.set_favorite(42, MediaKind::Movie, true);
    store.set_favorite(42, MediaKind::Movie, true);

    let favorites = store.favorites();
    assert_eq!(
        favorites
            .iter()
            .filter(|f| f.id == 42 && f.kind == MediaKind::Movie)
            .count(),
        1
    );
    assert!(store.is_favorite(42, MediaKind::Movie));
    assert!(!store.is_favorite(42, MediaKind::Series));
}

#[test]
fn test_export_clear_import_round_trip() {
    let store = memory_store();
    store
        .record_progress(&ProgressUpdate::movie(603, 35.0).with_title("The Matrix"))
        .unwrap();
    store
        .record_progress(
            &ProgressUpdate::episode(1399, 3, 9, 70.0)
                .with_layout(SeriesLayout::new(10, 8))
                .with_episode_title("The Rains of Castamere"),
        )
        .unwrap();
    store.record_progress(&ProgressUpdate::movie(155, 100.0)).unwrap();
    store.set_favorite(603, MediaKind::Movie, true);
    store.set_favorite(1399, MediaKind::Series, true);

    let before = store.snapshot();
    let exported = store.export_json().unwrap();

    store.clear();
    assert!(store.history().is_empty());
    assert!(store.favorites().is_empty());

    store.import_json(&exported).unwrap();
    assert_eq!(store.snapshot(), before);
    assert!(store.is_favorite(1399, MediaKind::Series));
}

#[test]
fn test_import_restores_collection_invariants() {
    let store = memory_store();
    store
        .import_json(
            r#"{
                "version": 1,
                "history": [
                    {"id": 1, "kind": "movie", "progress": 40.0, "last_watched": "2024-05-02T10:00:00Z"},
                    {"id": 2, "kind": "movie", "progress": -5.0, "last_watched": "2024-05-03T10:00:00Z"},
                    {"id": 1, "kind": "movie", "progress": 250.0, "last_watched": "2024-05-01T10:00:00Z"}
                ],
                "favorites": [],
                "continue_watching": [
                    {"id": 1, "kind": "movie", "progress": 95.0, "last_watched": "2024-05-02T12:00:00Z"},
                    {"id": 1, "kind": "movie", "progress": 40.0, "last_watched": "2024-05-02T10:00:00Z"},
                    {"id": 3, "kind": "movie", "progress": 30.0, "last_watched": "2024-05-01T10:00:00Z"},
                    {"id": 3, "kind": "movie", "progress": 20.0, "last_watched": "2024-04-01T10:00:00Z"}
                ]
            }"#,
        )
        .unwrap();

    let history = store.history();
    let ids: Vec<u64> = history.iter().map(|h| h.id).collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(history[0].progress, 0.0);
    assert_eq!(history[1].progress, 40.0);
    assert!(history.iter().all(|h| (0.0..=100.0).contains(&h.progress)));

    // The newest entry per title decides; a finished one removes the title.
    let continuing = store.continue_watching();
    let titles: Vec<(u64, f64)> = continuing.iter().map(|c| (c.id, c.progress)).collect();
    assert_eq!(titles, vec![(3, 30.0)]);
}

#[test]
fn test_hydrate_caps_oversized_snapshots() {
    let start = Utc::now();
    let history: Vec<_> = (0..150u64)
        .map(|id| {
            serde_json::json!({
                "id": id,
                "kind": "movie",
                "progress": 10.0,
                "last_watched": start + Duration::seconds(id as i64),
            })
        })
        .collect();
    let storage = Arc::new(MemoryKeyValueStore::new());
    storage
        .put(
            WATCH_STATE_KEY,
            &serde_json::json!({ "version": 1, "history": history }).to_string(),
        )
        .unwrap();

    let store = WatchStateStore::new(storage);
    assert_eq!(store.hydrate().unwrap(), HydrateSource::Snapshot);
    let history = store.history();
    assert_eq!(history.len(), HISTORY_CAP);
    assert_eq!(history[0].id, 149);
    assert!(history.iter().all(|h| h.id >= 50));
}

#[test]
fn test_state_survives_restart() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("marquee.db");

    {
        let storage = Arc::new(SqliteKeyValueStore::new(&db).unwrap());
        let store = WatchStateStore::new(storage);
        assert_eq!(store.hydrate().unwrap(), HydrateSource::Empty);
        store.record_progress(&ProgressUpdate::movie(603, 20.0)).unwrap();
        store.set_favorite(603, MediaKind::Movie, true);
    }

    let storage = Arc::new(SqliteKeyValueStore::new(&db).unwrap());
    let store = WatchStateStore::new(storage);
    assert_eq!(store.hydrate().unwrap(), HydrateSource::Snapshot);
    assert_eq!(store.continue_watching()[0].id, 603);
    assert!(store.is_favorite(603, MediaKind::Movie));
}

#[test]
fn test_legacy_preferences_are_migrated_once() {
    let storage = Arc::new(MemoryKeyValueStore::new());
    storage
        .put(
            LEGACY_PREFERENCES_KEY,
            r#"{
                "favorites": [{"id": 603, "title": "The Matrix"}],
                "watchHistory": [
                    {"movieId": 603, "progress": 45, "timestamp": 1700000000000, "title": "The Matrix", "posterPath": "/m.jpg"},
                    {"movieId": 680, "progress": 99, "timestamp": 1700000100000, "title": "Pulp Fiction", "posterPath": null}
                ]
            }"#,
        )
        .unwrap();

    let store = WatchStateStore::new(storage.clone());
    assert_eq!(store.hydrate().unwrap(), HydrateSource::Legacy);

    assert!(store.is_favorite(603, MediaKind::Movie));
    assert_eq!(store.history().len(), 2);
    let continuing = store.continue_watching();
    assert_eq!(continuing.len(), 1);
    assert_eq!(continuing[0].title.as_deref(), Some("The Matrix"));

    assert!(storage.get(LEGACY_PREFERENCES_KEY).unwrap().is_none());
    assert!(storage.get(WATCH_STATE_KEY).unwrap().is_some());
}

#[test]
fn test_previous_client_preferences_blob_is_imported() {
    assert_eq!(LEGACY_PREFERENCES_KEY, "mavida-user-preferences");
    let storage = Arc::new(MemoryKeyValueStore::new());
    storage
        .put(
            "mavida-user-preferences",
            r#"{
                "state": {
                    "favorites": [{"id": 27205, "title": "Inception"}],
                    "watchHistory": [
                        {"movieId": 27205, "progress": 60, "timestamp": 1700000000000, "title": "Inception", "posterPath": "/i.jpg"}
                    ]
                },
                "version": 0
            }"#,
        )
        .unwrap();

    let store = WatchStateStore::new(storage.clone());
    assert_eq!(store.hydrate().unwrap(), HydrateSource::Legacy);
    assert!(store.is_favorite(27205, MediaKind::Movie));
    assert_eq!(store.continue_watching()[0].title.as_deref(), Some("Inception"));
    assert!(storage.get("mavida-user-preferences").unwrap().is_none());
}

#[tokio::test]
async fn test_subscribers_are_notified() {
    let store = Arc::new(memory_store());
    let mut rx = store.subscribe();

    let writer = Arc::clone(&store);
    tokio::spawn(async move {
        writer.set_favorite(7, MediaKind::Series, true);
    });

    rx.changed().await.unwrap();
    assert!(store.is_favorite(7, MediaKind::Series));
}
