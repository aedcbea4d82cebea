//! Session lifecycle manager: start, validate, read, mutate, clear.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use weiser_core::clock::{Clock, SystemClock};
use weiser_core::config::session::SessionConfig;
use weiser_core::error::AppError;
use weiser_core::result::AppResult;
use weiser_core::traits::session_store::{SessionStore, UpdateOutcome};
use weiser_core::types::session::{Session, SessionMutation, expiry_after};

/// Attempts at drawing an id that is not already taken.
const ID_ATTEMPTS: usize = 3;

/// Manages the complete session lifecycle over one storage backend.
///
/// Built once at startup and shared by handle; the backend never changes
/// for the lifetime of the manager.
#[derive(Clone)]
pub struct SessionManager {
    /// Session persistence.
    store: Arc<dyn SessionStore>,
    /// Time source for every expiry decision.
    clock: Arc<dyn Clock>,
    /// Time-to-live applied on start and on every mutation.
    ttl: Duration,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("store", &self.store.name())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionManager {
    /// Creates a manager using the system clock and the configured TTL.
    pub fn new(store: Arc<dyn SessionStore>, config: &SessionConfig) -> Self {
        Self::with_clock(store, config.ttl(), Arc::new(SystemClock))
    }

    /// Creates a manager with an explicit TTL and clock.
    pub fn with_clock(store: Arc<dyn SessionStore>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock, ttl }
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The underlying backend.
    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    /// The clock used for expiry decisions.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Creates and persists a new empty session.
    ///
    /// On failure no session exists and the caller must treat the request as
    /// unauthenticated.
    pub async fn start_session(&self) -> AppResult<Session> {
        let id = self.fresh_id().await?;
        let session = Session::new(id, expiry_after(self.clock.now(), self.ttl));

        self.store.put(&session).await.map_err(|e| {
            warn!(error = %e, backend = self.store.name(), "Failed to store new session");
            e
        })?;

        info!(session_id = %session.id, expires_at = %session.expires_at, "Session started");
        Ok(session)
    }

    /// Loads a session and enforces its expiry.
    ///
    /// Returns the live record, or a `NotFound` / `Expired` error. An expired
    /// record is purged before `Expired` is returned.
    pub async fn check_expiration(&self, id: &str) -> AppResult<Session> {
        if id.is_empty() {
            return Err(AppError::not_found("Empty session id"));
        }

        let Some(session) = self.store.get(id).await? else {
            return Err(AppError::not_found(format!("Session {id} not found")));
        };

        let now = self.clock.now();
        if session.is_valid(now) {
            return Ok(session);
        }

        if self.store.purge_if_expired(id, now).await? {
            info!(session_id = %id, "Expired session purged");
        }
        Err(AppError::expired(format!("Session {id} has expired")))
    }

    /// The whole live record; same contract as [`Self::check_expiration`].
    pub async fn session(&self, id: &str) -> AppResult<Session> {
        self.check_expiration(id).await
    }

    /// Reads `data[key]`.
    ///
    /// A missing key and a missing or expired session all read as `Ok(None)`.
    /// Only backend failures are errors.
    pub async fn get(&self, key: &str, id: &str) -> AppResult<Option<Value>> {
        match self.check_expiration(id).await {
            Ok(mut session) => Ok(session.data.remove(key)),
            Err(e) if e.is_session_gone() => Ok(None),
            Err(e) => {
                warn!(session_id = %id, key, error = %e, "Session read failed");
                Err(e)
            }
        }
    }

    /// Reads and deserializes `data[key]`.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str, id: &str) -> AppResult<Option<T>> {
        match self.get(key, id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Writes `data[key]` and refreshes the expiry in one atomic backend step.
    pub async fn set<V: Serialize>(&self, key: &str, value: V, id: &str) -> AppResult<Session> {
        let mutation = SessionMutation::Insert {
            key: key.to_string(),
            value: serde_json::to_value(value)?,
        };
        self.mutate(id, &mutation, self.ttl).await
    }

    /// Removes `data[key]` and refreshes the expiry.
    ///
    /// A missing or expired session has nothing to delete and is not an
    /// error. Backend failures are logged and returned.
    pub async fn delete(&self, key: &str, id: &str) -> AppResult<()> {
        let mutation = SessionMutation::Remove {
            key: key.to_string(),
        };
        match self.mutate(id, &mutation, self.ttl).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_session_gone() => {
                debug!(session_id = %id, key, "Delete on absent session ignored");
                Ok(())
            }
            Err(e) => {
                warn!(session_id = %id, key, error = %e, "Failed to delete session key");
                Err(e)
            }
        }
    }

    /// Refreshes the expiry by the configured TTL without changing data.
    pub async fn touch(&self, id: &str) -> AppResult<Session> {
        self.mutate(id, &SessionMutation::Touch, self.ttl).await
    }

    /// Sets the expiry to `now + ttl` for this session only.
    pub async fn update_expiration(&self, id: &str, ttl: Duration) -> AppResult<Session> {
        self.mutate(id, &SessionMutation::Touch, ttl).await
    }

    /// Removes the session record. Idempotent.
    pub async fn clear(&self, id: &str) -> AppResult<()> {
        self.store.delete(id).await?;
        info!(session_id = %id, "Session cleared");
        Ok(())
    }

    /// Every id the backend currently holds, live or not.
    pub async fn list_ids(&self) -> AppResult<Vec<String>> {
        self.store.list_ids().await
    }

    /// Removes the session if it has expired. Returns whether it was removed.
    pub async fn purge_if_expired(&self, id: &str) -> AppResult<bool> {
        self.store.purge_if_expired(id, self.clock.now()).await
    }

    /// Backend reachability.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.store.health_check().await
    }

    async fn mutate(
        &self,
        id: &str,
        mutation: &SessionMutation,
        ttl: Duration,
    ) -> AppResult<Session> {
        let outcome = self
            .store
            .update(id, mutation, self.clock.now(), ttl)
            .await?;

        match outcome {
            UpdateOutcome::Updated(session) => Ok(session),
            UpdateOutcome::Expired => {
                info!(session_id = %id, "Expired session purged");
                Err(AppError::expired(format!("Session {id} has expired")))
            }
            UpdateOutcome::Missing => Err(AppError::not_found(format!("Session {id} not found"))),
        }
    }

    async fn fresh_id(&self) -> AppResult<String> {
        for _ in 0..ID_ATTEMPTS {
            let id = generate_session_id();
            if self.store.get(&id).await?.is_none() {
                return Ok(id);
            }
            warn!("Generated session id collided with an existing session");
        }
        Err(AppError::internal("Could not generate a unique session id"))
    }
}

/// 128 random bits, lowercase hex.
pub fn generate_session_id() -> String {
    let bytes: [u8; 16] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
