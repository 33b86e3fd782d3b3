#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use cinebook_api::auth::jwt::{issue_token, JwtConfig};
use cinebook_api::config::ServerConfig;
use cinebook_api::router::build_app_router;
use cinebook_api::state::AppState;
use cinebook_core::booking::{BookingConfig, BookingService};
use cinebook_core::memory::MemoryStore;
use cinebook_core::models::Showtime;
use cinebook_core::types::{DbId, Money};

const TEST_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        seat_lock_wait_ms: 500,
        booking_persist_timeout_secs: 5,
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            leeway_secs: 0,
            issuer: None,
        },
    }
}

/// A running app over an in-memory store seeded with one showtime
/// (room of 5 rows x 10 seats, base price 100000).
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub showtime: Showtime,
}

/// Build the full application router with all middleware layers over a
/// fresh [`MemoryStore`].
pub fn build_test_app() -> TestApp {
    build_test_app_with(BookingConfig {
        seat_lock_wait: Duration::from_millis(500),
        persist_timeout: Duration::from_secs(5),
    })
}

pub fn build_test_app_with(booking: BookingConfig) -> TestApp {
    let config = test_config();
    let store = Arc::new(MemoryStore::new());
    let room = store.add_room("Room 1", 5, 10);
    let showtime = store.add_showtime(&room, 1, Money::from(100_000));

    let state = AppState {
        booking: Arc::new(BookingService::new(store.clone(), booking)),
        config: Arc::new(config),
    };

    TestApp {
        router: build_app_router(state),
        store,
        showtime,
    }
}

/// Bearer token for `user_id` with `role`.
pub fn token(user_id: DbId, role: &str) -> String {
    issue_token(user_id, role, &test_config().jwt).unwrap()
}

/// Send a GET request, optionally authenticated.
pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> axum::response::Response {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(t) = token {
        builder = builder.header("authorization", format!("Bearer {t}"));
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Send a POST request with a JSON body, optionally authenticated.
pub async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
    token: Option<&str>,
) -> axum::response::Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(t) = token {
        builder = builder.header("authorization", format!("Bearer {t}"));
    }
    app.clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

/// Collect a response body into JSON.
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status and return the parsed body.
pub async fn expect_status(
    response: axum::response::Response,
    status: StatusCode,
) -> serde_json::Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}
