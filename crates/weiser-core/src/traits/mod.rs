//! Core traits defined in `weiser-core` and implemented by other crates.

pub mod session_store;

pub use session_store::{SessionStore, UpdateOutcome};
