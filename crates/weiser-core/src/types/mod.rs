//! Shared domain types.

pub mod session;

pub use session::{Session, SessionMutation, expiry_after};
