//! In-memory session backend.

pub mod store;

pub use store::MemorySessionStore;
