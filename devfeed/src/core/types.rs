//! Shared deterministic types for the feed core.
//!
//! These types define stable contracts between the store, the controller and
//! the I/O adapters. They must not depend on external state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of profiles the backend returns for a full page.
///
/// A page shorter than this signals that the feed is exhausted.
pub const PAGE_SIZE: usize = 10;

/// Remaining queue length at or below which the next page is prefetched.
pub const DEFAULT_PREFETCH_THRESHOLD: usize = 3;

/// A candidate developer shown in the feed.
///
/// Field names follow the backend's JSON shape. Everything except the
/// identifier is optional on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
}

impl Profile {
    /// `first last`, trimmed when either part is missing.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A user's verdict on the head-of-queue profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Swipe right.
    Interested,
    /// Swipe left.
    Ignored,
}

impl Decision {
    pub fn from_interested(interested: bool) -> Self {
        if interested {
            Decision::Interested
        } else {
            Decision::Ignored
        }
    }

    pub fn is_interested(self) -> bool {
        matches!(self, Decision::Interested)
    }

    /// Path segment used by the match request endpoint.
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Interested => "interested",
            Decision::Ignored => "ignored",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of merging one fetched page into the queue.
///
/// Id lists are recorded in incoming order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Ids appended to the queue.
    pub appended: Vec<String>,
    /// Ids dropped because they were already queued (or repeated in the page).
    pub duplicates: Vec<String>,
    /// True when this merge flipped `has_more` to false.
    pub exhausted: bool,
}
