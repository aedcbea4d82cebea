//! # weiser-session
//!
//! Session lifecycle management and pluggable session storage for Weiser.
//!
//! ## Modules
//!
//! - `manager`: Session lifecycle (start, validate, read, mutate, clear)
//! - `cleanup`: Background sweep of expired sessions
//! - `provider`: Store construction from the configured driver
//! - `memory`: Process-local store
//! - `file`: Append-only log store on local disk
//! - `redis`: Shared store for multi-node deployments
//! - `keys`: Redis key layout

pub mod cleanup;
pub mod file;
pub mod keys;
pub mod manager;
pub mod memory;
pub mod provider;
pub mod redis;

pub use cleanup::SessionJanitor;
pub use file::FileSessionStore;
pub use manager::{SessionManager, generate_session_id};
pub use memory::MemorySessionStore;
pub use provider::open_store;
pub use redis::RedisSessionStore;
