//! Background sweep against sessions created over HTTP.

use std::time::Duration;

use axum::http::StatusCode;

use weiser_session::cleanup::SessionJanitor;

use crate::helpers::{TTL, TestApp};

#[tokio::test]
async fn test_sweep_removes_abandoned_sessions() {
    let app = TestApp::new();
    let abandoned = app.start_session().await;
    app.clock.advance(TTL / 2);
    let active = app.start_session().await;
    app.clock.advance(TTL / 2 + Duration::from_secs(1));

    let janitor = SessionJanitor::new(app.manager.clone(), Duration::from_secs(60));
    assert_eq!(janitor.run_cleanup().await.unwrap(), 1);

    let ids = app.manager.list_ids().await.unwrap();
    assert_eq!(ids, vec![active.clone()]);

    let response = app
        .request("GET", "/api/session", None, Some(&abandoned))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    let response = app.request("GET", "/api/session", None, Some(&active)).await;
    assert_eq!(response.status, StatusCode::OK);
}
