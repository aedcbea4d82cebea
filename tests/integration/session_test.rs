//! Session lifecycle over HTTP.

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use crate::helpers::{TTL, TestApp};

#[tokio::test]
async fn test_first_request_issues_cookie() {
    let app = TestApp::new();
    let response = app.request("GET", "/api/session", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    let id = response.set_cookie.expect("Missing Set-Cookie");
    assert_eq!(id.len(), 32);
    assert_eq!(response.body["data"]["id"], json!(id));
    assert_eq!(response.body["data"]["data"], json!({}));
}

#[tokio::test]
async fn test_cookie_reuse_sees_stored_data() {
    let app = TestApp::new();
    let id = app.start_session().await;

    let response = app
        .request(
            "PUT",
            "/api/session/data/user",
            Some(json!({"name": "alice"})),
            Some(&id),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.set_cookie.as_deref(), Some(id.as_str()));

    let response = app
        .request("GET", "/api/session/data/user", None, Some(&id))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["value"], json!({"name": "alice"}));

    let response = app.request("GET", "/api/session", None, Some(&id)).await;
    assert_eq!(response.body["data"]["data"]["user"]["name"], json!("alice"));
    // Known sessions are not re-issued on plain reads.
    assert!(response.set_cookie.is_none());
}

#[tokio::test]
async fn test_missing_key_reads_as_null() {
    let app = TestApp::new();
    let id = app.start_session().await;

    let response = app
        .request("GET", "/api/session/data/nothing", None, Some(&id))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["value"], json!(null));
}

#[tokio::test]
async fn test_delete_key() {
    let app = TestApp::new();
    let id = app.start_session().await;

    app.request("PUT", "/api/session/data/k", Some(json!(1)), Some(&id))
        .await;
    let response = app
        .request("DELETE", "/api/session/data/k", None, Some(&id))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app
        .request("GET", "/api/session/data/k", None, Some(&id))
        .await;
    assert_eq!(response.body["data"]["value"], json!(null));
}

#[tokio::test]
async fn test_expired_cookie_is_rejected() {
    let app = TestApp::new();
    let id = app.start_session().await;

    app.clock.advance(TTL + Duration::from_secs(1));

    let response = app.request("GET", "/api/session", None, Some(&id)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], json!("SESSION_EXPIRED"));
    assert_eq!(response.set_cookie.as_deref(), Some(""));

    // Purged on first sight; afterwards it is simply unknown.
    let response = app.request("GET", "/api/session", None, Some(&id)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], json!("SESSION_NOT_FOUND"));
}

#[tokio::test]
async fn test_writes_keep_session_alive() {
    let app = TestApp::new();
    let id = app.start_session().await;

    for i in 0..3 {
        app.clock.advance(TTL - Duration::from_secs(10));
        let response = app
            .request("PUT", "/api/session/data/n", Some(json!(i)), Some(&id))
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let response = app.request("GET", "/api/session/data/n", None, Some(&id)).await;
    assert_eq!(response.body["data"]["value"], json!(2));
}

#[tokio::test]
async fn test_clear_session() {
    let app = TestApp::new();
    let id = app.start_session().await;

    let response = app.request("DELETE", "/api/session", None, Some(&id)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(response.set_cookie.as_deref(), Some(""));
    assert!(app.manager.list_ids().await.unwrap().is_empty());

    let response = app.request("GET", "/api/session", None, Some(&id)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_oversized_key_is_rejected() {
    let app = TestApp::new();
    let id = app.start_session().await;
    let key = "k".repeat(200);

    let response = app
        .request("PUT", &format!("/api/session/data/{key}"), Some(json!(1)), Some(&id))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], json!("VALIDATION_ERROR"));
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let response = app.request("GET", "/api/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["session_store"], json!("memory"));
    assert!(response.set_cookie.is_none());
}
