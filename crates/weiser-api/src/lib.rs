//! # weiser-api
//!
//! HTTP layer for Weiser built on Axum.
//!
//! Binds browsers to server-side sessions through a cookie, resolves or
//! starts the session for every request, and exposes a small session
//! surface plus a health check.

pub mod app;
pub mod cookie;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use cookie::CookieBinder;
pub use error::ApiError;
pub use state::AppState;
