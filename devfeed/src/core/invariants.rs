//! Feed state invariants that the type system does not enforce.

use std::collections::HashSet;

use crate::core::store::FeedState;

/// Check feed invariants:
/// - No duplicate profile ids in the queue
/// - `page >= 1`
/// - Profile ids are non-empty
pub fn validate_feed_state(state: &FeedState) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, profile) in state.queue.iter().enumerate() {
        if profile.id.is_empty() {
            errors.push(format!("queue[{}]: empty profile id", index));
        }
        if !seen.insert(profile.id.as_str()) {
            errors.push(format!("duplicate id '{}' at queue[{}]", profile.id, index));
        }
    }

    if state.page == 0 {
        errors.push("page must be >= 1".to_string());
    }

    errors
}
