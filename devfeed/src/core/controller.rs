//! Feed controller state machine.
//!
//! The controller decides *when* to fetch, submit and evict, but performs no
//! I/O itself. Each operation returns the [`Effect`]s the driver must carry
//! out; the driver reports completions back with the [`Ticket`] it was given.
//! Completions whose ticket is no longer current are dropped, which is how
//! work started before a refresh or teardown stops touching the state.

use std::time::Duration;

use crate::core::snapshot::FeedSnapshot;
use crate::core::store::FeedState;
use crate::core::types::{DEFAULT_PREFETCH_THRESHOLD, Decision, PAGE_SIZE, Profile};

/// Identifies one outstanding fetch, submission or settle timer.
pub type Ticket = u64;

/// Default pause between a successful submission and eviction.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Pause between a successful decision and evicting the profile.
    pub settle_delay: Duration,
    /// Prefetch the next page once the queue shrinks to this many profiles.
    pub prefetch_threshold: usize,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            prefetch_threshold: DEFAULT_PREFETCH_THRESHOLD,
        }
    }
}

/// Work the driver must perform on the controller's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Request one page from the profile source.
    FetchPage {
        ticket: Ticket,
        page: u32,
        limit: usize,
    },
    /// Send the decision to the matching service.
    SubmitDecision {
        ticket: Ticket,
        profile_id: String,
        decision: Decision,
    },
    /// Call [`FeedController::settle_elapsed`] after `delay`.
    ScheduleSettle { ticket: Ticket, delay: Duration },
    /// Abort pending fetch and settle work; their tickets are already stale.
    CancelPending,
}

/// Why a decision request was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    EmptyQueue,
    DecisionInFlight,
    NotHead,
    /// A refresh replaced the queue while the submission was in flight.
    Refreshed,
    TornDown,
}

/// Response to [`FeedController::request_decision`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionRequest {
    Submitted { ticket: Ticket, effects: Vec<Effect> },
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecisionPhase {
    Submitting,
    Settling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingDecision {
    ticket: Ticket,
    profile_id: String,
    decision: Decision,
    phase: DecisionPhase,
}

/// Sole owner of a session's [`FeedState`].
#[derive(Debug, Clone)]
pub struct FeedController {
    state: FeedState,
    options: ControllerOptions,
    next_ticket: Ticket,
    fetch: Option<Ticket>,
    decision: Option<PendingDecision>,
    /// Last page merged successfully.
    fetched_page: Option<u32>,
    /// The last fetch failed and nothing has happened since; blocks the
    /// immediate refill so a failing backend is not hammered.
    fetch_failed: bool,
    torn_down: bool,
}

impl FeedController {
    pub fn new(options: ControllerOptions) -> Self {
        Self::with_state(FeedState::new(), options)
    }

    /// Start from an existing state (e.g. a queue restored by the caller).
    pub fn with_state(state: FeedState, options: ControllerOptions) -> Self {
        Self {
            state,
            options,
            next_ticket: 0,
            fetch: None,
            decision: None,
            fetched_page: None,
            fetch_failed: false,
            torn_down: false,
        }
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn is_fetching(&self) -> bool {
        self.fetch.is_some()
    }

    pub fn is_deciding(&self) -> bool {
        self.decision.is_some()
    }

    pub fn details(&self, id: &str) -> Option<&Profile> {
        self.state.find(id)
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let pending_id = |phase: DecisionPhase| {
            self.decision
                .as_ref()
                .filter(|pending| pending.phase == phase)
                .map(|pending| pending.profile_id.clone())
        };
        FeedSnapshot {
            queue: self.state.queue.clone(),
            loading: self.state.loading,
            error: self.state.error.clone(),
            has_more: self.state.has_more,
            page: self.state.page,
            deciding: pending_id(DecisionPhase::Submitting),
            settling: pending_id(DecisionPhase::Settling),
            direction: self.decision.as_ref().map(|pending| pending.decision),
        }
    }

    /// Kick off the first fetch if the feed needs one.
    pub fn start(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.fill_if_empty(&mut effects);
        effects
    }

    /// Accept or reject the profile at the head of the queue.
    pub fn request_decision(&mut self, profile_id: &str, interested: bool) -> DecisionRequest {
        if self.torn_down {
            return DecisionRequest::Ignored(IgnoreReason::TornDown);
        }
        let Some(head) = self.state.head() else {
            return DecisionRequest::Ignored(IgnoreReason::EmptyQueue);
        };
        if self.decision.is_some() {
            return DecisionRequest::Ignored(IgnoreReason::DecisionInFlight);
        }
        if head.id != profile_id {
            return DecisionRequest::Ignored(IgnoreReason::NotHead);
        }

        let ticket = self.issue_ticket();
        let decision = Decision::from_interested(interested);
        self.decision = Some(PendingDecision {
            ticket,
            profile_id: profile_id.to_string(),
            decision,
            phase: DecisionPhase::Submitting,
        });
        DecisionRequest::Submitted {
            ticket,
            effects: vec![Effect::SubmitDecision {
                ticket,
                profile_id: profile_id.to_string(),
                decision,
            }],
        }
    }

    /// Apply the outcome of a decision submission.
    pub fn decision_submitted(&mut self, ticket: Ticket, result: Result<(), String>) -> Vec<Effect> {
        let Some(pending) = self.decision.as_mut() else {
            return Vec::new();
        };
        if pending.ticket != ticket || pending.phase != DecisionPhase::Submitting {
            return Vec::new();
        }

        match result {
            Ok(()) => {
                pending.phase = DecisionPhase::Settling;
                vec![Effect::ScheduleSettle {
                    ticket,
                    delay: self.options.settle_delay,
                }]
            }
            Err(message) => {
                self.decision = None;
                self.state.record_error(message);
                Vec::new()
            }
        }
    }

    /// Evict the decided profile once the settle delay has passed.
    pub fn settle_elapsed(&mut self, ticket: Ticket) -> Vec<Effect> {
        let settled = matches!(
            &self.decision,
            Some(pending) if pending.ticket == ticket && pending.phase == DecisionPhase::Settling
        );
        if !settled {
            return Vec::new();
        }
        let Some(pending) = self.decision.take() else {
            return Vec::new();
        };

        let mut effects = Vec::new();
        self.state.evict(&pending.profile_id);
        // The user moved on; a page that failed earlier may be requested again.
        self.fetch_failed = false;

        let running_low = self.state.queue.len() <= self.options.prefetch_threshold;
        if running_low && self.state.has_more && self.fetch.is_none() {
            self.fetch_next_page(&mut effects);
        }
        self.fill_if_empty(&mut effects);
        effects
    }

    /// Apply the outcome of a page fetch.
    pub fn fetch_completed(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<Profile>, String>,
    ) -> Vec<Effect> {
        if self.fetch != Some(ticket) {
            return Vec::new();
        }
        self.fetch = None;

        match result {
            Ok(profiles) => {
                self.state.merge_profiles(profiles);
                self.fetched_page = Some(self.state.page);
            }
            Err(message) => {
                self.state.fail_load(message);
                self.fetch_failed = true;
            }
        }

        let mut effects = Vec::new();
        self.fill_if_empty(&mut effects);
        effects
    }

    /// Drop everything and start over from page 1.
    pub fn refresh(&mut self) -> Vec<Effect> {
        if self.torn_down {
            return Vec::new();
        }
        let mut effects = vec![Effect::CancelPending];
        self.state.reset();
        self.fetch = None;
        self.decision = None;
        self.fetched_page = None;
        self.fetch_failed = false;
        self.begin_fetch(&mut effects);
        effects
    }

    /// Re-issue the page request that last failed.
    ///
    /// No-op while a fetch is outstanding or once the current page is merged.
    pub fn retry(&mut self) -> Vec<Effect> {
        if self.torn_down
            || self.fetch.is_some()
            || !self.state.has_more
            || self.fetched_page == Some(self.state.page)
        {
            return Vec::new();
        }
        let mut effects = Vec::new();
        self.begin_fetch(&mut effects);
        effects
    }

    /// Stop applying completions; every later call is a no-op.
    pub fn teardown(&mut self) -> Vec<Effect> {
        if self.torn_down {
            return Vec::new();
        }
        self.torn_down = true;
        self.fetch = None;
        self.decision = None;
        self.state.loading = false;
        vec![Effect::CancelPending]
    }

    fn fill_if_empty(&mut self, effects: &mut Vec<Effect>) {
        if self.torn_down
            || self.fetch.is_some()
            || self.fetch_failed
            || !self.state.has_more
            || !self.state.queue.is_empty()
        {
            return;
        }
        self.fetch_next_page(effects);
    }

    /// Fetch the page after the last merged one. A page whose fetch failed is
    /// requested again instead of being skipped.
    fn fetch_next_page(&mut self, effects: &mut Vec<Effect>) {
        if self.fetched_page == Some(self.state.page) {
            self.state.advance_page();
        }
        self.begin_fetch(effects);
    }

    fn begin_fetch(&mut self, effects: &mut Vec<Effect>) {
        let ticket = self.issue_ticket();
        self.fetch = Some(ticket);
        self.fetch_failed = false;
        self.state.clear_error();
        self.state.begin_load();
        effects.push(Effect::FetchPage {
            ticket,
            page: self.state.page,
            limit: PAGE_SIZE,
        });
    }

    fn issue_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        self.next_ticket
    }
}

impl Default for FeedController {
    fn default() -> Self {
        Self::new(ControllerOptions::default())
    }
}
