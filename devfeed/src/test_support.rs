//! Test-only helpers for building profiles and scripted collaborators.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::core::types::{Decision, Profile};
use crate::io::matching::MatchingService;
use crate::io::profile_source::ProfileSource;

/// Create a deterministic profile with default fields.
pub fn profile(id: &str) -> Profile {
    Profile {
        id: id.to_string(),
        first_name: format!("{} first", id),
        last_name: format!("{} last", id),
        age: Some(30),
        about: format!("{} bio", id),
        skills: vec!["rust".to_string(), "sql".to_string()],
        title: None,
        photo_url: None,
        github_url: None,
    }
}

/// Profiles `p{n}` for every `n` in `range`, in order.
pub fn profiles(range: impl IntoIterator<Item = u32>) -> Vec<Profile> {
    range
        .into_iter()
        .map(|n| profile(&format!("p{}", n)))
        .collect()
}

/// Ids of `profiles`, in order.
pub fn ids(profiles: &[Profile]) -> Vec<String> {
    profiles.iter().map(|profile| profile.id.clone()).collect()
}

/// One scripted reply from a [`ScriptedSource`].
#[derive(Debug, Clone)]
pub struct ScriptedPage {
    pub result: Result<Vec<Profile>, String>,
    /// Simulated network latency.
    pub delay: Duration,
}

impl ScriptedPage {
    pub fn ok(profiles: Vec<Profile>) -> Self {
        Self {
            result: Ok(profiles),
            delay: Duration::ZERO,
        }
    }

    pub fn err(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            delay: Duration::ZERO,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Profile source that replays queued pages and records requested page numbers.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    pages: Arc<Mutex<VecDeque<ScriptedPage>>>,
    requests: Arc<Mutex<Vec<u32>>>,
}

impl ScriptedSource {
    pub fn new(pages: Vec<ScriptedPage>) -> Self {
        Self {
            pages: Arc::new(Mutex::new(pages.into())),
            requests: Arc::default(),
        }
    }

    pub fn push(&self, page: ScriptedPage) {
        self.pages.lock().expect("pages lock").push_back(page);
    }

    /// Page numbers requested so far, in call order.
    pub fn requests(&self) -> Vec<u32> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl ProfileSource for ScriptedSource {
    async fn fetch_page(&self, page: u32, _limit: usize) -> Result<Vec<Profile>> {
        self.requests.lock().expect("requests lock").push(page);
        let next = self.pages.lock().expect("pages lock").pop_front();
        let Some(next) = next else {
            return Err(anyhow!("no scripted page left for page {}", page));
        };
        if !next.delay.is_zero() {
            tokio::time::sleep(next.delay).await;
        }
        next.result.map_err(|message| anyhow!(message))
    }
}

/// Matching service that replays queued outcomes and records submissions.
#[derive(Clone, Default)]
pub struct ScriptedMatcher {
    outcomes: Arc<Mutex<VecDeque<ScriptedSubmit>>>,
    submitted: Arc<Mutex<Vec<(String, Decision)>>>,
}

/// One scripted reply from a [`ScriptedMatcher`].
#[derive(Debug, Clone)]
pub struct ScriptedSubmit {
    pub result: Result<(), String>,
    pub delay: Duration,
}

impl ScriptedSubmit {
    pub fn ok() -> Self {
        Self {
            result: Ok(()),
            delay: Duration::ZERO,
        }
    }

    pub fn err(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            delay: Duration::ZERO,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl ScriptedMatcher {
    pub fn new(outcomes: Vec<ScriptedSubmit>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes.into())),
            submitted: Arc::default(),
        }
    }

    /// Every submission so far, in call order. Unscripted calls succeed.
    pub fn submitted(&self) -> Vec<(String, Decision)> {
        self.submitted.lock().expect("submitted lock").clone()
    }
}

#[async_trait]
impl MatchingService for ScriptedMatcher {
    async fn submit_decision(&self, profile_id: &str, decision: Decision) -> Result<()> {
        self.submitted
            .lock()
            .expect("submitted lock")
            .push((profile_id.to_string(), decision));
        let next = self
            .outcomes
            .lock()
            .expect("outcomes lock")
            .pop_front()
            .unwrap_or_else(ScriptedSubmit::ok);
        if !next.delay.is_zero() {
            tokio::time::sleep(next.delay).await;
        }
        next.result.map_err(|message| anyhow!(message))
    }
}
