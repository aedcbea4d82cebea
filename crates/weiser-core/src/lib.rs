//! # weiser-core
//!
//! Core crate for Weiser sessions. Contains the configuration schemas, the
//! session record, the storage backend trait, the clock abstraction and the
//! unified error system.
//!
//! This crate has **no** internal dependencies on other Weiser crates.

pub mod clock;
pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AppError, ErrorKind};
pub use result::AppResult;
pub use traits::{SessionStore, UpdateOutcome};
pub use types::{Session, SessionMutation};
