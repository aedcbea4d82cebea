//! `SessionHandle` extractor: the session resolved by the session middleware.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Serialize;
use serde_json::Value;

use weiser_core::error::AppError;
use weiser_core::result::AppResult;
use weiser_core::types::session::Session;
use weiser_session::manager::SessionManager;

use crate::error::ApiError;
use crate::state::AppState;

/// The live session bound to the current request.
///
/// Inserted into request extensions by the session middleware.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

/// Session access for handlers.
///
/// Carries the snapshot loaded by the middleware; reads and writes go
/// through the manager so expiry is always enforced against the backend.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session: Session,
    manager: Arc<SessionManager>,
}

impl SessionHandle {
    /// Session id.
    pub fn id(&self) -> &str {
        &self.session.id
    }

    /// The record as loaded at the start of the request.
    pub fn snapshot(&self) -> &Session {
        &self.session
    }

    /// Reloads the live record from the backend.
    pub async fn reload(&self) -> AppResult<Session> {
        self.manager.session(self.id()).await
    }

    /// Reads `data[key]`.
    pub async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        self.manager.get(key, self.id()).await
    }

    /// Writes `data[key]`, returning the refreshed record.
    pub async fn set<V: Serialize>(&self, key: &str, value: V) -> AppResult<Session> {
        self.manager.set(key, value, self.id()).await
    }

    /// Removes `data[key]`.
    pub async fn delete(&self, key: &str) -> AppResult<()> {
        self.manager.delete(key, self.id()).await
    }

    /// Removes the whole session.
    pub async fn clear(&self) -> AppResult<()> {
        self.manager.clear(self.id()).await
    }
}

impl FromRequestParts<AppState> for SessionHandle {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .ok_or_else(|| AppError::not_found("No session bound to this request"))?;

        Ok(Self {
            session,
            manager: Arc::clone(&state.session_manager),
        })
    }
}
