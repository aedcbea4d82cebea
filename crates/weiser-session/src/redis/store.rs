//! Redis session store.
//!
//! One key per session (`<prefix><id>`), value is the JSON record. Atomic
//! validate-then-mutate is a read followed by a Lua compare-and-swap that
//! only writes if the stored value is byte-for-byte what was read.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Script};
use tracing::{debug, warn};

use weiser_core::config::session::RedisStoreConfig;
use weiser_core::error::{AppError, ErrorKind};
use weiser_core::result::AppResult;
use weiser_core::traits::session_store::{SessionStore, UpdateOutcome};
use weiser_core::types::session::{Session, SessionMutation, expiry_after};

use super::client::RedisClient;
use crate::keys;

/// Lua script for compare-and-swap.
///
/// KEYS[1] = session key
/// ARGV[1] = expected current value
/// ARGV[2] = new value
/// ARGV[3] = absolute expiry in unix ms for native TTL, or "" for none
///
/// Returns 1 if written, 0 if the value changed or vanished since it was read.
const CAS_SCRIPT: &str = r#"
    local current = redis.call('GET', KEYS[1])
    if current ~= ARGV[1] then
        return 0
    end
    if ARGV[3] ~= '' then
        redis.call('SET', KEYS[1], ARGV[2], 'PXAT', ARGV[3])
    else
        redis.call('SET', KEYS[1], ARGV[2])
    end
    return 1
"#;

/// Lua script for compare-and-delete.
///
/// KEYS[1] = session key
/// ARGV[1] = expected current value
///
/// Returns 1 if deleted, 0 otherwise.
const CAD_SCRIPT: &str = r#"
    if redis.call('GET', KEYS[1]) == ARGV[1] then
        return redis.call('DEL', KEYS[1])
    end
    return 0
"#;

/// Keys fetched per `SCAN` round-trip.
const SCAN_BATCH: usize = 200;

/// Redis-backed session store for multi-node deployments.
#[derive(Debug, Clone)]
pub struct RedisSessionStore {
    /// Redis client.
    client: RedisClient,
    /// Mirror `expires_at` as a native key expiry.
    native_ttl: bool,
    /// Extra attempts after a lost compare-and-swap.
    cas_retries: u32,
    /// Compare-and-swap script.
    cas_script: Script,
    /// Compare-and-delete script.
    cad_script: Script,
}

impl RedisSessionStore {
    /// Connect using the given configuration.
    pub async fn connect(config: &RedisStoreConfig) -> AppResult<Self> {
        let client = RedisClient::connect(config).await?;
        Ok(Self::new(client, config))
    }

    /// Wrap an existing client.
    pub fn new(client: RedisClient, config: &RedisStoreConfig) -> Self {
        Self {
            client,
            native_ttl: config.native_ttl,
            cas_retries: config.cas_retries,
            cas_script: Script::new(CAS_SCRIPT),
            cad_script: Script::new(CAD_SCRIPT),
        }
    }

    /// Map a Redis error to an AppError.
    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(
            ErrorKind::BackendUnavailable,
            format!("Redis error: {e}"),
            e,
        )
    }

    fn native_expiry_arg(&self, session: &Session) -> String {
        if self.native_ttl {
            session.expires_at.timestamp_millis().to_string()
        } else {
            String::new()
        }
    }

    async fn get_raw(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.client.conn_mut();
        let raw: Option<String> = conn.get(key).await.map_err(Self::map_err)?;
        Ok(raw)
    }

    async fn delete_if_unchanged(&self, key: &str, expected: &str) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let removed: i64 = self
            .cad_script
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(removed == 1)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn put(&self, session: &Session) -> AppResult<()> {
        let key = self.client.session_key(&session.id);
        let encoded = serde_json::to_string(session)?;
        let mut conn = self.client.conn_mut();

        if self.native_ttl {
            let _: () = redis::cmd("SET")
                .arg(&key)
                .arg(&encoded)
                .arg("PXAT")
                .arg(session.expires_at.timestamp_millis())
                .query_async(&mut conn)
                .await
                .map_err(Self::map_err)?;
        } else {
            let _: () = conn.set(&key, &encoded).await.map_err(Self::map_err)?;
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> AppResult<Option<Session>> {
        match self.get_raw(&self.client.session_key(id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let key = self.client.session_key(id);
        let mut conn = self.client.conn_mut();
        let _: () = conn.del(&key).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn list_ids(&self) -> AppResult<Vec<String>> {
        let pattern = keys::scan_pattern(self.client.prefix());
        let mut conn = self.client.conn_mut();
        let mut ids = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(Self::map_err)?;

            ids.extend(
                batch
                    .iter()
                    .filter_map(|key| keys::id_from_key(self.client.prefix(), key))
                    .map(str::to_string),
            );

            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once.
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn update(
        &self,
        id: &str,
        mutation: &SessionMutation,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> AppResult<UpdateOutcome> {
        let key = self.client.session_key(id);

        for attempt in 0..=self.cas_retries {
            let Some(raw) = self.get_raw(&key).await? else {
                return Ok(UpdateOutcome::Missing);
            };
            let mut session: Session = serde_json::from_str(&raw)?;

            if session.is_expired(now) {
                if self.delete_if_unchanged(&key, &raw).await? {
                    debug!(session_id = %id, "Purged expired session during update");
                    return Ok(UpdateOutcome::Expired);
                }
                continue;
            }

            mutation.apply(&mut session, expiry_after(now, ttl));
            let encoded = serde_json::to_string(&session)?;

            let mut conn = self.client.conn_mut();
            let swapped: i64 = self
                .cas_script
                .key(&key)
                .arg(&raw)
                .arg(&encoded)
                .arg(self.native_expiry_arg(&session))
                .invoke_async(&mut conn)
                .await
                .map_err(Self::map_err)?;

            if swapped == 1 {
                return Ok(UpdateOutcome::Updated(session));
            }
            debug!(session_id = %id, attempt, "Session changed concurrently, retrying update");
        }

        warn!(session_id = %id, retries = self.cas_retries, "Session update kept conflicting");
        Err(AppError::backend(format!(
            "Session {id} was modified concurrently {} times in a row",
            self.cas_retries + 1
        )))
    }

    async fn purge_if_expired(&self, id: &str, now: DateTime<Utc>) -> AppResult<bool> {
        let key = self.client.session_key(id);
        let Some(raw) = self.get_raw(&key).await? else {
            return Ok(false);
        };
        let session: Session = serde_json::from_str(&raw)?;
        if session.is_valid(now) {
            return Ok(false);
        }
        self.delete_if_unchanged(&key, &raw).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }
}
