//! Read-only view of the feed handed to presentation layers.

use serde::Serialize;

use crate::core::types::{Decision, Profile};

/// Observable feed state at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedSnapshot {
    pub queue: Vec<Profile>,
    pub loading: bool,
    pub error: Option<String>,
    pub has_more: bool,
    pub page: u32,
    /// Profile whose decision is being submitted.
    pub deciding: Option<String>,
    /// Profile whose decision succeeded and is waiting out the settle delay.
    pub settling: Option<String>,
    /// Direction of the in-flight decision, for exit animations.
    pub direction: Option<Decision>,
}

impl FeedSnapshot {
    /// Profile currently offered for a decision.
    pub fn head(&self) -> Option<&Profile> {
        self.queue.first()
    }

    /// Profile shown behind the head card.
    pub fn preview(&self) -> Option<&Profile> {
        self.queue.get(1)
    }

    pub fn find(&self, id: &str) -> Option<&Profile> {
        self.queue.iter().find(|profile| profile.id == id)
    }

    /// Nothing left to show and nothing more to fetch.
    pub fn is_exhausted(&self) -> bool {
        !self.loading && self.queue.is_empty() && !self.has_more
    }

    /// A decision is in flight or settling, so new decisions are ignored.
    pub fn is_transitioning(&self) -> bool {
        self.deciding.is_some() || self.settling.is_some()
    }
}
