//! Session-scoped feed state and its transitions.
//!
//! Every transition is total: none of them fail, and "error" is data stored
//! in [`FeedState::error`], never a raised fault.

use std::collections::HashSet;

use serde::Serialize;

use crate::core::types::{MergeSummary, PAGE_SIZE, Profile};

/// Mutable feed aggregate owned by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedState {
    /// Profiles awaiting a decision, unique by id, in arrival order.
    pub queue: Vec<Profile>,
    /// True while a page fetch is outstanding.
    pub loading: bool,
    /// Last error description, if any.
    pub error: Option<String>,
    /// Page cursor, starting at 1.
    pub page: u32,
    /// False once a short page has been received.
    pub has_more: bool,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            queue: Vec::new(),
            loading: false,
            error: None,
            page: 1,
            has_more: true,
        }
    }
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_load(&mut self) {
        self.loading = true;
    }

    pub fn fail_load(&mut self, description: impl Into<String>) {
        self.loading = false;
        self.error = Some(description.into());
    }

    /// Append the unseen profiles of `incoming` after the existing queue.
    ///
    /// A page shorter than [`PAGE_SIZE`] marks the feed as exhausted. Existing
    /// entries are never reordered.
    pub fn merge_profiles(&mut self, incoming: Vec<Profile>) -> MergeSummary {
        let mut summary = MergeSummary::default();
        if incoming.len() < PAGE_SIZE && self.has_more {
            self.has_more = false;
            summary.exhausted = true;
        }

        let mut seen: HashSet<String> = self.queue.iter().map(|p| p.id.clone()).collect();
        for profile in incoming {
            if seen.insert(profile.id.clone()) {
                summary.appended.push(profile.id.clone());
                self.queue.push(profile);
            } else {
                summary.duplicates.push(profile.id);
            }
        }

        self.loading = false;
        summary
    }

    /// Remove the profile with `id`. Absent ids are a no-op.
    pub fn evict(&mut self, id: &str) -> bool {
        let before = self.queue.len();
        self.queue.retain(|profile| profile.id != id);
        self.queue.len() != before
    }

    pub fn advance_page(&mut self) {
        self.page += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Record an error without touching `loading`.
    pub fn record_error(&mut self, description: impl Into<String>) {
        self.error = Some(description.into());
    }

    pub fn head(&self) -> Option<&Profile> {
        self.queue.first()
    }

    pub fn find(&self, id: &str) -> Option<&Profile> {
        self.queue.iter().find(|profile| profile.id == id)
    }
}
