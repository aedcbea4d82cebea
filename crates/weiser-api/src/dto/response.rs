//! Response DTOs.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use weiser_core::types::session::Session;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Active session backend.
    pub session_store: String,
    /// Whether the session backend answered.
    pub session_store_healthy: bool,
}

/// The current session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Session id.
    pub id: String,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
    /// Stored values.
    pub data: HashMap<String, Value>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            id: session.id,
            expires_at: session.expires_at,
            data: session.data,
        }
    }
}

/// One stored value; `value` is null when the key is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionValueResponse {
    /// Data key.
    pub key: String,
    /// Stored value.
    pub value: Option<Value>,
}
