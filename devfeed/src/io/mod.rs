//! I/O adapters: configuration, session credentials and the HTTP backend.

pub mod api;
pub mod config;
pub mod credentials;
pub mod matching;
pub mod profile_source;
