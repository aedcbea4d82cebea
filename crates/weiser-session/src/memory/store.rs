//! In-memory session store guarded by a single Tokio mutex.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use weiser_core::result::AppResult;
use weiser_core::traits::session_store::{SessionStore, UpdateOutcome};
use weiser_core::types::session::{Session, SessionMutation, expiry_after};

/// Process-local session store.
///
/// Every operation, read or write, takes the same exclusive lock. Suitable
/// for single-node deployments; all sessions are lost on restart.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    /// Sessions keyed by id.
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, session: &Session) -> AppResult<()> {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> AppResult<Option<Session>> {
        let sessions = self.sessions.lock().await;
        Ok(sessions.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(id);
        Ok(())
    }

    async fn list_ids(&self) -> AppResult<Vec<String>> {
        let sessions = self.sessions.lock().await;
        Ok(sessions.keys().cloned().collect())
    }

    async fn update(
        &self,
        id: &str,
        mutation: &SessionMutation,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> AppResult<UpdateOutcome> {
        let mut sessions = self.sessions.lock().await;

        let Some(session) = sessions.get_mut(id) else {
            return Ok(UpdateOutcome::Missing);
        };

        if session.is_expired(now) {
            sessions.remove(id);
            debug!(session_id = %id, "Purged expired session during update");
            return Ok(UpdateOutcome::Expired);
        }

        mutation.apply(session, expiry_after(now, ttl));
        Ok(UpdateOutcome::Updated(session.clone()))
    }

    async fn purge_if_expired(&self, id: &str, now: DateTime<Utc>) -> AppResult<bool> {
        let mut sessions = self.sessions.lock().await;
        let expired = sessions.get(id).is_some_and(|s| s.is_expired(now));
        if expired {
            sessions.remove(id);
        }
        Ok(expired)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
