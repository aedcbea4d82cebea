//! HTTP-level integration tests for the Weiser server.

mod backend_test;
mod helpers;
mod janitor_test;
mod persistence_test;
mod session_test;
