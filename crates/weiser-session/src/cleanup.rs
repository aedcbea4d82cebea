//! Background sweep of expired sessions.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use weiser_core::result::AppResult;

use crate::manager::SessionManager;

/// Periodically removes sessions whose expiry has passed.
///
/// Each removal is a conditional delete against the backend, so a session
/// refreshed between listing and purging survives the sweep.
#[derive(Clone)]
pub struct SessionJanitor {
    /// Manager whose backend is swept.
    manager: SessionManager,
    /// Time between sweeps.
    interval: Duration,
}

impl std::fmt::Debug for SessionJanitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionJanitor")
            .field("interval", &self.interval)
            .finish()
    }
}

impl SessionJanitor {
    /// Creates a janitor sweeping every `interval` (at least one second).
    pub fn new(manager: SessionManager, interval: Duration) -> Self {
        Self {
            manager,
            interval: interval.max(Duration::from_secs(1)),
        }
    }

    /// Runs one sweep over every stored session.
    ///
    /// Returns the number of sessions removed. Failures on individual
    /// sessions are logged and skipped; failing to list is returned.
    pub async fn run_cleanup(&self) -> AppResult<u32> {
        let ids = self.manager.list_ids().await?;
        if ids.is_empty() {
            return Ok(0);
        }

        let mut cleaned = 0u32;
        for id in &ids {
            match self.manager.purge_if_expired(id).await {
                Ok(true) => cleaned += 1,
                Ok(false) => {}
                Err(e) => {
                    error!(session_id = %id, error = %e, "Failed to purge session");
                }
            }
        }

        if cleaned > 0 {
            info!(scanned = ids.len(), cleaned, "Session cleanup completed");
        } else {
            debug!(scanned = ids.len(), "Session cleanup found nothing to remove");
        }
        Ok(cleaned)
    }

    /// Runs sweeps until `shutdown` turns true or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "Session janitor started");

        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cleanup().await {
                        warn!(error = %e, "Session cleanup failed");
                    }
                }
            }
        }

        info!("Session janitor stopped");
    }

    /// Spawns [`Self::run`] on the current runtime.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}
