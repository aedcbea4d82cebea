//! File-backed session backend: an append-only JSON-lines log with an
//! in-memory index and periodic compaction.

pub mod log;
pub mod store;

pub use store::FileSessionStore;
