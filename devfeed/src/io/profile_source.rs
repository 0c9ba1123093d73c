//! Profile source abstraction.
//!
//! The [`ProfileSource`] trait decouples the feed session from the HTTP
//! backend. Tests use scripted sources that return predetermined pages.

use anyhow::Result;
use async_trait::async_trait;

use crate::core::types::Profile;
use crate::io::api::ApiClient;

#[async_trait]
pub trait ProfileSource: Send + Sync + 'static {
    /// Fetch page `page` (1-based) of at most `limit` profiles.
    ///
    /// Fewer than `limit` profiles means the feed is exhausted.
    async fn fetch_page(&self, page: u32, limit: usize) -> Result<Vec<Profile>>;
}

#[async_trait]
impl ProfileSource for ApiClient {
    async fn fetch_page(&self, page: u32, limit: usize) -> Result<Vec<Profile>> {
        self.get_feed(page, limit).await
    }
}
