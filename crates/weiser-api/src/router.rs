//! Route definitions for the Weiser HTTP API.
//!
//! Routes are mounted under `/api`. Session routes sit behind the session
//! middleware; the health check does not, so probing it never creates
//! sessions.

use axum::{
    Router,
    middleware as axum_middleware,
    routing::get,
};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(session_routes(state.clone()))
        .merge(health_routes());

    Router::new()
        .nest("/api", api_routes)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Session inspection and data endpoints
fn session_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/session",
            get(handlers::session::get_session).delete(handlers::session::clear_session),
        )
        .route(
            "/session/data/{key}",
            get(handlers::session::get_value)
                .put(handlers::session::put_value)
                .delete(handlers::session::delete_value),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::session::require_session,
        ))
}

/// Health check
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
