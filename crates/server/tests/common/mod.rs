//! Common test utilities for API testing with mocks.
//!
//! The fixture builds an in-process router over a mock catalog and an
//! in-memory store, so tests run without network or disk.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use marquee_core::config::CatalogConfig;
use marquee_core::testing::MockCatalog;
use marquee_core::{AppContext, Config, KeyValueStore, MemoryKeyValueStore};
use marquee_server::state::AppState;

/// Re-export fixtures for test convenience
pub use marquee_core::testing::fixtures;

/// Test fixture with a mock catalog and in-memory storage.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_detail() {
///     let fixture = TestFixture::new().await;
///     fixture.catalog.add_detail(fixtures::movie_detail(603, "The Matrix")).await;
///
///     let response = fixture.get("/api/v1/catalog/movie/603").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock catalog - configure provider responses and inject failures
    pub catalog: Arc<MockCatalog>,
    /// Backing store for watch state and recent searches
    pub storage: Arc<MemoryKeyValueStore>,
    pub state: Arc<AppState>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

pub fn test_config() -> Config {
    Config {
        catalog: CatalogConfig::with_api_key("test-token"),
        cache: Default::default(),
        storage: Default::default(),
        playback: Default::default(),
        server: Default::default(),
    }
}

impl TestFixture {
    /// Create a new test fixture with empty mocks.
    pub async fn new() -> Self {
        Self::with_storage(Arc::new(MemoryKeyValueStore::new())).await
    }

    /// Create a fixture over pre-populated storage, hydrating from it.
    pub async fn with_storage(storage: Arc<MemoryKeyValueStore>) -> Self {
        let catalog = Arc::new(MockCatalog::new());

        let context = AppContext::with_parts(
            test_config(),
            Arc::clone(&catalog) as Arc<dyn marquee_core::CatalogSource>,
            Arc::clone(&storage) as Arc<dyn KeyValueStore>,
        )
        .expect("Failed to build app context");

        let state = Arc::new(AppState::new(context));
        let router = marquee_server::api::create_router(Arc::clone(&state));

        Self {
            router,
            catalog,
            storage,
            state,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a PUT request without a body.
    pub async fn put(&self, path: &str) -> TestResponse {
        self.request("PUT", path, None).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put_json(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body.
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await.0
    }

    /// Send a GET request and return the body as text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let (response, bytes) = self.send(request).await;
        (
            response.status,
            String::from_utf8(bytes).expect("Body is not UTF-8"),
        )
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await.0
    }

    async fn send(&self, request: Request<Body>) -> (TestResponse, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        (TestResponse { status, body }, body_bytes.to_vec())
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
