//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use weiser_api::AppState;
use weiser_core::clock::ManualClock;
use weiser_core::config::AppConfig;
use weiser_core::error::AppError;
use weiser_core::result::AppResult;
use weiser_core::traits::session_store::{SessionStore, UpdateOutcome};
use weiser_core::types::session::{Session, SessionMutation};
use weiser_session::manager::SessionManager;
use weiser_session::memory::MemorySessionStore;

/// Session lifetime used by the test applications.
pub const TTL: Duration = Duration::from_secs(60);

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Clock driving every expiry decision
    pub clock: Arc<ManualClock>,
    /// Manager shared with the router
    pub manager: SessionManager,
}

impl TestApp {
    /// Create a test application over an in-memory store
    pub fn new() -> Self {
        Self::with_store(
            Arc::new(MemorySessionStore::new()),
            Arc::new(ManualClock::starting_now()),
        )
    }

    /// Create a test application over the given store and clock
    pub fn with_store(store: Arc<dyn SessionStore>, clock: Arc<ManualClock>) -> Self {
        let manager = SessionManager::with_clock(store, TTL, clock.clone());
        let router = weiser_api::build_app(AppState::new(AppConfig::default(), manager.clone()));

        Self {
            router,
            clock,
            manager,
        }
    }

    /// Send a request, optionally carrying a session cookie
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        session: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(id) = session {
            req = req.header(header::COOKIE, format!("weiser_session={id}"));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let set_cookie = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .filter_map(|pair| pair.strip_prefix("weiser_session="))
            .map(str::to_string)
            .last();

        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");
        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            body,
            set_cookie,
        }
    }

    /// Start a session over HTTP and return its id
    pub async fn start_session(&self) -> String {
        let response = self.request("GET", "/api/session", None, None).await;
        assert_eq!(response.status, StatusCode::OK);
        response.set_cookie.expect("No session cookie issued")
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
    /// Value of the session cookie set by the response, empty on removal
    pub set_cookie: Option<String>,
}

/// Store that fails every call as if the backend were down
#[derive(Debug)]
pub struct UnavailableStore;

fn refused() -> AppError {
    AppError::backend("connection refused")
}

#[async_trait]
impl SessionStore for UnavailableStore {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn put(&self, _session: &Session) -> AppResult<()> {
        Err(refused())
    }

    async fn get(&self, _id: &str) -> AppResult<Option<Session>> {
        Err(refused())
    }

    async fn delete(&self, _id: &str) -> AppResult<()> {
        Err(refused())
    }

    async fn list_ids(&self) -> AppResult<Vec<String>> {
        Err(refused())
    }

    async fn update(
        &self,
        _id: &str,
        _mutation: &SessionMutation,
        _now: DateTime<Utc>,
        _ttl: Duration,
    ) -> AppResult<UpdateOutcome> {
        Err(refused())
    }

    async fn purge_if_expired(&self, _id: &str, _now: DateTime<Utc>) -> AppResult<bool> {
        Err(refused())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(false)
    }
}
