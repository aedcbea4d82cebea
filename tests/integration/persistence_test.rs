//! File-backed sessions survive a server restart.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use weiser_core::clock::ManualClock;
use weiser_core::config::session::FileStoreConfig;
use weiser_session::file::FileSessionStore;

use crate::helpers::{TTL, TestApp};

async fn file_app(config: &FileStoreConfig, clock: Arc<ManualClock>) -> TestApp {
    let store = FileSessionStore::open(config, clock.clone())
        .await
        .expect("Failed to open session log");
    TestApp::with_store(Arc::new(store), clock)
}

#[tokio::test]
async fn test_sessions_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = FileStoreConfig {
        path: dir.path().join("sessions.log").to_string_lossy().into_owned(),
        fsync: false,
        compact_threshold: 1000,
    };
    let clock = Arc::new(ManualClock::starting_now());

    let (kept, lapsed) = {
        let app = file_app(&config, clock.clone()).await;
        let kept = app.start_session().await;
        let lapsed = app.start_session().await;
        app.request("PUT", "/api/session/data/user", Some(json!("alice")), Some(&kept))
            .await;
        (kept, lapsed)
    };

    // Only `kept` was refreshed by its write.
    clock.advance(TTL - Duration::from_secs(1));
    {
        let app = file_app(&config, clock.clone()).await;
        app.request("PUT", "/api/session/data/seen", Some(json!(true)), Some(&kept))
            .await;
    }
    clock.advance(Duration::from_secs(2));

    let app = file_app(&config, clock.clone()).await;
    let response = app
        .request("GET", "/api/session/data/user", None, Some(&kept))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["value"], json!("alice"));

    let response = app.request("GET", "/api/session", None, Some(&lapsed)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
