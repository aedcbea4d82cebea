//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use weiser_core::config::AppConfig;
use weiser_session::manager::SessionManager;

use crate::cookie::CookieBinder;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Session lifecycle manager
    pub session_manager: Arc<SessionManager>,
    /// Session cookie issuer and reader
    pub cookies: Arc<CookieBinder>,
}

impl AppState {
    /// Builds the state from a loaded configuration and a ready manager.
    pub fn new(config: AppConfig, session_manager: SessionManager) -> Self {
        let cookies = Arc::new(CookieBinder::new(config.cookie.clone()));
        Self {
            config: Arc::new(config),
            session_manager: Arc::new(session_manager),
            cookies,
        }
    }
}
