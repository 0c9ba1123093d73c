//! Matching service abstraction for accept/reject submissions.

use anyhow::Result;
use async_trait::async_trait;

use crate::core::types::Decision;
use crate::io::api::ApiClient;

#[async_trait]
pub trait MatchingService: Send + Sync + 'static {
    /// Record the user's decision on `profile_id`.
    async fn submit_decision(&self, profile_id: &str, decision: Decision) -> Result<()>;
}

#[async_trait]
impl MatchingService for ApiClient {
    async fn submit_decision(&self, profile_id: &str, decision: Decision) -> Result<()> {
        self.send_request(profile_id, decision).await
    }
}
