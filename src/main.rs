//! Weiser Server: server-side sessions over a pluggable store.
//!
//! Main entry point that wires the crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use weiser_core::clock::SystemClock;
use weiser_core::config::AppConfig;
use weiser_core::error::AppError;
use weiser_session::cleanup::SessionJanitor;
use weiser_session::manager::SessionManager;
use weiser_session::provider::open_store;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load layered configuration for the environment named by `WEISER_ENV`.
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("WEISER_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Weiser");

    // ── Step 1: Session store ────────────────────────────────────
    tracing::info!(driver = %config.session.driver, "Opening session store...");
    let store = open_store(&config.session, Arc::new(SystemClock)).await?;
    if !store.health_check().await? {
        return Err(AppError::backend(format!(
            "Session store '{}' failed its health check",
            store.name()
        )));
    }
    tracing::info!(store = store.name(), "Session store ready");

    // ── Step 2: Session manager ──────────────────────────────────
    let session_manager = SessionManager::new(store, &config.session);

    // ── Step 3: Shutdown channel & janitor ───────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let janitor = SessionJanitor::new(
        session_manager.clone(),
        config.session.cleanup_interval(),
    );
    let janitor_handle = janitor.spawn(shutdown_rx);

    // ── Step 4: Build and start HTTP server ──────────────────────
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let addr = config.server.bind_address();
    let app = weiser_api::build_app(weiser_api::AppState::new(config, session_manager));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(%addr, "Weiser server listening");

    // ── Step 5: Graceful shutdown ────────────────────────────────
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    if tokio::time::timeout(grace, janitor_handle).await.is_err() {
        tracing::warn!("Session janitor did not stop within the grace period");
    }

    tracing::info!("Weiser server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
