//! Deterministic, pure logic for the feed.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod controller;
pub mod invariants;
pub mod snapshot;
pub mod store;
pub mod types;
