//! Shared application state for the UI server.

use devfeed::session::FeedHandle;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Running feed session; every request goes through it.
    pub feed: FeedHandle,
}

impl AppState {
    pub fn new(feed: FeedHandle) -> Self {
        Self { feed }
    }
}
