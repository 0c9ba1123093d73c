//! Client core for a "swipe to match developers" feed.
//!
//! The crate keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (feed state, controller state
//!   machine). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting adapters (config file, HTTP backend).
//!   Hidden behind traits so tests can script them.
//!
//! [`session`] drives the controller against the adapters on tokio; [`swipe`]
//! and [`render`] are the terminal front end built on top of it.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod render;
pub mod session;
pub mod swipe;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
