//! Session management configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Session management configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Storage driver: `"memory"`, `"file"` or `"redis"`.
    #[serde(default = "default_driver")]
    pub driver: String,
    /// Time-to-live in seconds, refreshed on every mutation.
    #[serde(default = "default_expiration")]
    pub expiration_seconds: u64,
    /// Interval between expired-session sweeps in seconds.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
    /// File driver settings.
    #[serde(default)]
    pub file: FileStoreConfig,
    /// Redis driver settings.
    #[serde(default)]
    pub redis: RedisStoreConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            expiration_seconds: default_expiration(),
            cleanup_interval_seconds: default_cleanup_interval(),
            file: FileStoreConfig::default(),
            redis: RedisStoreConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Session time-to-live.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.expiration_seconds)
    }

    /// Sweep interval.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }

    /// Parse the configured driver.
    pub fn store_kind(&self) -> Result<StoreKind, AppError> {
        self.driver.parse()
    }

    /// Reject settings no session manager can run with.
    ///
    /// A zero TTL would hand out sessions that are expired on creation.
    pub fn validate(&self) -> Result<(), AppError> {
        self.store_kind()?;
        if self.expiration_seconds == 0 {
            return Err(AppError::configuration(
                "session.expiration_seconds must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// File driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStoreConfig {
    /// Path of the append-only session log.
    #[serde(default = "default_file_path")]
    pub path: String,
    /// Whether to fsync after every appended entry.
    #[serde(default = "default_true")]
    pub fsync: bool,
    /// Number of superseded log entries that triggers compaction.
    #[serde(default = "default_compact_threshold")]
    pub compact_threshold: usize,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            path: default_file_path(),
            fsync: true,
            compact_threshold: default_compact_threshold(),
        }
    }
}

/// Redis driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisStoreConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Prefix applied to every session key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Also set a native Redis expiry at `expires_at`.
    #[serde(default)]
    pub native_ttl: bool,
    /// Retries for a compare-and-swap update that lost a race.
    #[serde(default = "default_cas_retries")]
    pub cas_retries: u32,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
            native_ttl: false,
            cas_retries: default_cas_retries(),
        }
    }
}

/// The storage backends a session manager can be built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Process-local map.
    Memory,
    /// Append-only log file.
    File,
    /// Remote Redis server.
    Redis,
}

impl FromStr for StoreKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "redis" => Ok(Self::Redis),
            other => Err(AppError::configuration(format!(
                "Unknown session driver: '{other}'. Supported: memory, file, redis"
            ))),
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::Memory => write!(f, "memory"),
            StoreKind::File => write!(f, "file"),
            StoreKind::Redis => write!(f, "redis"),
        }
    }
}

fn default_driver() -> String {
    "memory".to_string()
}

fn default_expiration() -> u64 {
    1800
}

fn default_cleanup_interval() -> u64 {
    60
}

fn default_file_path() -> String {
    "data/sessions.log".to_string()
}

fn default_compact_threshold() -> usize {
    1000
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "weiser:session:".to_string()
}

fn default_cas_retries() -> u32 {
    8
}

fn default_true() -> bool {
    true
}
