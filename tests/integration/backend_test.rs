//! Behavior when the session backend is unreachable.

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;
use weiser_core::clock::ManualClock;

use crate::helpers::{TestApp, UnavailableStore};

fn unavailable_app() -> TestApp {
    TestApp::with_store(
        Arc::new(UnavailableStore),
        Arc::new(ManualClock::starting_now()),
    )
}

#[tokio::test]
async fn test_request_with_cookie_gets_503() {
    let app = unavailable_app();
    let response = app
        .request("GET", "/api/session", None, Some("0123456789abcdef0123456789abcdef"))
        .await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["error"], json!("SERVICE_UNAVAILABLE"));
    // The cookie may still be good once the backend is back.
    assert_eq!(response.set_cookie, None);
}

#[tokio::test]
async fn test_request_without_cookie_gets_503() {
    let app = unavailable_app();
    let response = app.request("GET", "/api/session", None, None).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["error"], json!("SERVICE_UNAVAILABLE"));
    assert_eq!(response.set_cookie, None);
}

#[tokio::test]
async fn test_health_reports_degraded() {
    let app = unavailable_app();
    let response = app.request("GET", "/api/health", None, None).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["data"]["session_store_healthy"], json!(false));
}
