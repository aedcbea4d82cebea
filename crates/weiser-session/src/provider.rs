//! Store construction keyed by the configured driver.

use std::sync::Arc;

use tracing::info;

use weiser_core::clock::Clock;
use weiser_core::config::session::{SessionConfig, StoreKind};
use weiser_core::result::AppResult;
use weiser_core::traits::session_store::SessionStore;

/// Build the session store selected by `config.driver`.
///
/// An unknown driver or a zero TTL is a configuration error; callers treat
/// it as fatal.
pub async fn open_store(
    config: &SessionConfig,
    clock: Arc<dyn Clock>,
) -> AppResult<Arc<dyn SessionStore>> {
    config.validate()?;
    let kind = config.store_kind()?;

    let store: Arc<dyn SessionStore> = match kind {
        StoreKind::Memory => {
            info!("Initializing in-memory session store");
            Arc::new(crate::memory::MemorySessionStore::new())
        }
        StoreKind::File => {
            info!(path = %config.file.path, "Initializing file session store");
            Arc::new(crate::file::FileSessionStore::open(&config.file, clock).await?)
        }
        StoreKind::Redis => {
            info!("Initializing Redis session store");
            Arc::new(crate::redis::RedisSessionStore::connect(&config.redis).await?)
        }
    };

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weiser_core::clock::SystemClock;
    use weiser_core::error::ErrorKind;

    #[tokio::test]
    async fn test_memory_driver() {
        let config = SessionConfig::default();
        let store = open_store(&config, Arc::new(SystemClock)).await.unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[tokio::test]
    async fn test_file_driver() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SessionConfig {
            driver: "file".into(),
            ..SessionConfig::default()
        };
        config.file.path = dir.path().join("s.log").to_string_lossy().into_owned();

        let store = open_store(&config, Arc::new(SystemClock)).await.unwrap();
        assert_eq!(store.name(), "file");
    }

    #[tokio::test]
    async fn test_unknown_driver_fails() {
        let config = SessionConfig {
            driver: "mongo".into(),
            ..SessionConfig::default()
        };
        let err = open_store(&config, Arc::new(SystemClock)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_zero_ttl_fails() {
        let config = SessionConfig {
            expiration_seconds: 0,
            ..SessionConfig::default()
        };
        let err = open_store(&config, Arc::new(SystemClock)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
