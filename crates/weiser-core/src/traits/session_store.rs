//! Session store trait for pluggable persistence backends.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::result::AppResult;
use crate::types::session::{Session, SessionMutation};

/// Result of an atomic validate-then-mutate operation.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The session was live and has been mutated and persisted.
    Updated(Session),
    /// The session had expired; it has been purged and nothing was written.
    Expired,
    /// No record exists for the id.
    Missing,
}

/// Trait for session storage backends (memory, file, Redis).
///
/// Backends store whole [`Session`] records keyed by id and never interpret
/// `data`. Expiry is decided by the caller-supplied `now`; backends only
/// guarantee that `update` and `purge_if_expired` check and act on one
/// consistent view of the record.
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug + 'static {
    /// Short backend name for logging.
    fn name(&self) -> &'static str;

    /// Insert or replace a record.
    async fn put(&self, session: &Session) -> AppResult<()>;

    /// Load a record. Returns `None` if no record exists, regardless of expiry.
    async fn get(&self, id: &str) -> AppResult<Option<Session>>;

    /// Remove a record. Removing a missing id is not an error.
    async fn delete(&self, id: &str) -> AppResult<()>;

    /// List every id currently held.
    async fn list_ids(&self) -> AppResult<Vec<String>>;

    /// Atomically check expiry and, if the session is live, apply `mutation`
    /// with a new expiry of `now + ttl`.
    ///
    /// An expired record is removed as part of the same operation.
    async fn update(
        &self,
        id: &str,
        mutation: &SessionMutation,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> AppResult<UpdateOutcome>;

    /// Atomically remove the record if it is expired at `now`.
    ///
    /// Returns `true` if a record was removed.
    async fn purge_if_expired(&self, id: &str, now: DateTime<Utc>) -> AppResult<bool>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
