//! The session record shared by every storage backend.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A server-side session.
///
/// Backends persist exactly this triple; `expires_at` is encoded as integer
/// milliseconds since the UNIX epoch in every encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session id, also the cookie value.
    pub id: String,
    /// Per-session key/value data.
    #[serde(default)]
    pub data: HashMap<String, Value>,
    /// Absolute expiry instant.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session with empty data.
    pub fn new(id: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            data: HashMap::new(),
            expires_at,
        }
    }

    /// A session is valid strictly before its expiry instant.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Inverse of [`Session::is_valid`].
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !self.is_valid(now)
    }

    /// Time left before expiry; zero once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// Reads one data value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

/// Computes `now + ttl` truncated to whole milliseconds, saturating at the
/// maximum representable instant.
///
/// Truncation keeps a freshly computed expiry identical to what any backend
/// reads back.
pub fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .and_then(|at| DateTime::from_timestamp_millis(at.timestamp_millis()))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A change applied to a live session as part of an atomic
/// validate-then-mutate backend operation.
///
/// Every mutation refreshes `expires_at`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionMutation {
    /// Insert or overwrite `data[key]`.
    Insert {
        /// Data key.
        key: String,
        /// New value.
        value: Value,
    },
    /// Remove `data[key]` if present.
    Remove {
        /// Data key.
        key: String,
    },
    /// Only refresh the expiry.
    Touch,
}

impl SessionMutation {
    /// Applies the mutation and sets the new expiry.
    pub fn apply(&self, session: &mut Session, expires_at: DateTime<Utc>) {
        match self {
            Self::Insert { key, value } => {
                session.data.insert(key.clone(), value.clone());
            }
            Self::Remove { key } => {
                session.data.remove(key);
            }
            Self::Touch => {}
        }
        session.expires_at = expires_at;
    }
}
