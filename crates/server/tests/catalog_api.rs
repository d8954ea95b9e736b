//! Catalog routes over the mock catalog.

mod common;

use axum::http::StatusCode;
use common::{fixtures, TestFixture};
use marquee_core::catalog::{ListCategory, MediaKind, Relation, TimeWindow};
use marquee_core::testing::RecordedCatalogCall;
use marquee_core::CatalogError;

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_hides_api_key() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/config").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["catalog"]["api_key_configured"], true);
    assert!(response.body["catalog"].get("api_key").is_none());
    assert!(!response.body.to_string().contains("test-token"));
}

#[tokio::test]
async fn test_list_is_served_and_cached() {
    let fixture = TestFixture::new().await;
    fixture
        .catalog
        .set_list(
            MediaKind::Movie,
            ListCategory::Popular,
            vec![fixtures::movie(603, "The Matrix"), fixtures::movie(604, "The Matrix Reloaded")],
        )
        .await;

    let first = fixture.get("/api/v1/catalog/movie/lists/popular").await;
    assert_status!(first, StatusCode::OK);
    assert_eq!(first.body["items"].as_array().unwrap().len(), 2);
    assert_eq!(first.body["items"][0]["title"], "The Matrix");
    assert_eq!(first.body["page"], 1);

    let second = fixture.get("/api/v1/catalog/movie/lists/popular").await;
    assert_status!(second, StatusCode::OK);
    assert_eq!(fixture.catalog.call_count().await, 1);
}

#[tokio::test]
async fn test_trending_window_is_passed_through() {
    let fixture = TestFixture::new().await;
    fixture
        .catalog
        .set_list(
            MediaKind::Series,
            ListCategory::Trending(TimeWindow::Day),
            vec![fixtures::series(1399, "Game of Thrones")],
        )
        .await;

    let response = fixture
        .get("/api/v1/catalog/tv/lists/trending?window=day&page=1")
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["items"][0]["id"], 1399);

    let calls = fixture.catalog.recorded_calls().await;
    assert_eq!(
        calls,
        vec![RecordedCatalogCall::List {
            kind: MediaKind::Series,
            category: ListCategory::Trending(TimeWindow::Day),
            page: 1,
        }]
    );
}

#[tokio::test]
async fn test_list_rejects_bad_input_without_calling_provider() {
    let fixture = TestFixture::new().await;

    let unknown_kind = fixture.get("/api/v1/catalog/podcast/lists/popular").await;
    assert_status!(unknown_kind, StatusCode::BAD_REQUEST);

    let unknown_category = fixture.get("/api/v1/catalog/movie/lists/best_ever").await;
    assert_status!(unknown_category, StatusCode::BAD_REQUEST);

    let mismatched = fixture.get("/api/v1/catalog/movie/lists/airing_today").await;
    assert_status!(mismatched, StatusCode::BAD_REQUEST);

    let page_zero = fixture.get("/api/v1/catalog/movie/lists/popular?page=0").await;
    assert_status!(page_zero, StatusCode::BAD_REQUEST);
    assert!(page_zero.body["error"].as_str().unwrap().contains("page"));

    assert_eq!(fixture.catalog.call_count().await, 0);
}

#[tokio::test]
async fn test_detail_and_not_found() {
    let fixture = TestFixture::new().await;
    fixture
        .catalog
        .add_detail(fixtures::movie_detail(603, "The Matrix"))
        .await;

    let found = fixture.get("/api/v1/catalog/movie/603").await;
    assert_status!(found, StatusCode::OK);
    assert_eq!(found.body["title"], "The Matrix");
    assert_eq!(found.body["runtime_minutes"], 120);

    let missing = fixture.get("/api/v1/catalog/movie/999").await;
    assert_status!(missing, StatusCode::NOT_FOUND);
    assert!(missing.body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_full_info_includes_trailer() {
    let fixture = TestFixture::new().await;
    fixture
        .catalog
        .add_detail(fixtures::movie_detail(603, "The Matrix"))
        .await;
    fixture
        .catalog
        .set_videos(MediaKind::Movie, 603, vec![fixtures::trailer("m8e-FF8MsqU")])
        .await;

    let response = fixture.get("/api/v1/catalog/movie/603/full").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["detail"]["title"], "The Matrix");
    assert_eq!(response.body["credits"]["cast"].as_array().unwrap().len(), 0);
    assert_eq!(response.body["trailer"]["key"], "m8e-FF8MsqU");
    assert_eq!(response.body["trailer"]["type"], "Trailer");
}

#[tokio::test]
async fn test_full_info_fails_when_a_part_fails() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/catalog/movie/42/full").await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_credits_and_videos_routes() {
    let fixture = TestFixture::new().await;
    fixture
        .catalog
        .add_detail(fixtures::series_detail(1399, "Game of Thrones", 8, 10))
        .await;

    let credits = fixture.get("/api/v1/catalog/tv/1399/credits").await;
    assert_status!(credits, StatusCode::OK);
    assert!(credits.body["cast"].is_array());

    let videos = fixture.get("/api/v1/catalog/tv/1399/videos").await;
    assert_status!(videos, StatusCode::OK);
    assert_eq!(videos.body, serde_json::json!([]));
}

#[tokio::test]
async fn test_related_route() {
    let fixture = TestFixture::new().await;
    fixture
        .catalog
        .set_related(
            MediaKind::Movie,
            603,
            vec![fixtures::movie(604, "The Matrix Reloaded")],
        )
        .await;

    let response = fixture
        .get("/api/v1/catalog/movie/603/related/recommendations?page=1")
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["items"][0]["id"], 604);

    let calls = fixture.catalog.recorded_calls().await;
    assert!(matches!(
        calls.as_slice(),
        [RecordedCatalogCall::Related {
            relation: Relation::Recommendations,
            ..
        }]
    ));

    let bad = fixture.get("/api/v1/catalog/movie/603/related/sequels").await;
    assert_status!(bad, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_by_kind_and_multi() {
    let fixture = TestFixture::new().await;
    fixture
        .catalog
        .add_detail(fixtures::movie_detail(603, "The Matrix"))
        .await;
    fixture
        .catalog
        .add_detail(fixtures::series_detail(1399, "Game of Thrones", 8, 10))
        .await;

    let movies = fixture.get("/api/v1/catalog/movie/search?query=matrix").await;
    assert_status!(movies, StatusCode::OK);
    assert_eq!(movies.body["items"].as_array().unwrap().len(), 1);
    assert_eq!(movies.body["items"][0]["kind"], "movie");

    let multi = fixture.get("/api/v1/catalog/search?query=a").await;
    assert_status!(multi, StatusCode::OK);
    assert_eq!(multi.body["items"].as_array().unwrap().len(), 2);

    let blank = fixture.get("/api/v1/catalog/search?query=%20%20").await;
    assert_status!(blank, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_requires_query_parameter() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/catalog/movie/search").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(fixture.catalog.call_count().await, 0);
}

#[tokio::test]
async fn test_discover_filters_by_genre() {
    let fixture = TestFixture::new().await;
    fixture
        .catalog
        .set_genres(MediaKind::Movie, fixtures::movie_genres())
        .await;
    let mut action = fixtures::movie(603, "The Matrix");
    action.genres = vec!["Action".to_string(), "Science Fiction".to_string()];
    fixture
        .catalog
        .set_list(
            MediaKind::Movie,
            ListCategory::Popular,
            vec![action, fixtures::movie(13, "Forrest Gump")],
        )
        .await;

    let response = fixture
        .get("/api/v1/catalog/movie/discover?genres=28,878&page=1")
        .await;
    assert_status!(response, StatusCode::OK);
    let items = response.body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], 603);

    let bad = fixture.get("/api/v1/catalog/movie/discover?genres=action").await;
    assert_status!(bad, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_genres_route() {
    let fixture = TestFixture::new().await;
    fixture
        .catalog
        .set_genres(MediaKind::Movie, fixtures::movie_genres())
        .await;

    let response = fixture.get("/api/v1/catalog/movie/genres").await;
    assert_status!(response, StatusCode::OK);
    let genres = response.body.as_array().unwrap();
    assert!(genres
        .iter()
        .any(|g| g["id"] == 28 && g["name"] == "Action"));
}

#[tokio::test]
async fn test_season_and_episode_routes() {
    let fixture = TestFixture::new().await;
    fixture
        .catalog
        .add_season(1399, fixtures::season(1, 10))
        .await;

    let season = fixture.get("/api/v1/catalog/tv/1399/season/1").await;
    assert_status!(season, StatusCode::OK);
    assert_eq!(season.body["episodes"].as_array().unwrap().len(), 10);

    let episode = fixture
        .get("/api/v1/catalog/tv/1399/season/1/episode/3")
        .await;
    assert_status!(episode, StatusCode::OK);
    assert_eq!(episode.body["name"], "Episode 3");

    let movie_season = fixture.get("/api/v1/catalog/movie/603/season/1").await;
    assert_status!(movie_season, StatusCode::BAD_REQUEST);

    let missing = fixture.get("/api/v1/catalog/tv/1399/season/9").await;
    assert_status!(missing, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_provider_auth_failure_maps_to_bad_gateway() {
    let fixture = TestFixture::new().await;
    fixture
        .catalog
        .set_next_error(CatalogError::Auth {
            status: 401,
            message: "Invalid API key".to_string(),
        })
        .await;

    let response = fixture.get("/api/v1/catalog/movie/603").await;
    assert_status!(response, StatusCode::BAD_GATEWAY);
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("Invalid API key"));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v1/health").await;

    let (status, body) = fixture.get_text("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("marquee_http_requests_total"));
    assert!(body.contains("marquee_cache_entries"));
    assert!(body.contains("marquee_watch_entries"));
}
