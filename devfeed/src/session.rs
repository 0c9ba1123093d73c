//! Async driver for a feed session.
//!
//! A session is a single tokio task that owns the [`FeedController`]. Commands
//! from presentation layers and completions from I/O tasks arrive on channels
//! and are applied one at a time, so state transitions never interleave.
//! Snapshots are published on a `watch` channel after every step.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::core::controller::{
    ControllerOptions, DecisionRequest, Effect, FeedController, IgnoreReason, Ticket,
};
use crate::core::invariants::validate_feed_state;
use crate::core::snapshot::FeedSnapshot;
use crate::core::types::{Decision, Profile};
use crate::io::matching::MatchingService;
use crate::io::profile_source::ProfileSource;

const COMMAND_BUFFER: usize = 32;

/// How a decision request ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DecisionOutcome {
    /// Submitted successfully; the profile leaves the queue after the settle delay.
    Accepted { profile_id: String, decision: Decision },
    /// Dropped without contacting the backend.
    Ignored { reason: IgnoreReason },
    /// The backend rejected the submission; the queue is unchanged.
    Failed { profile_id: String, message: String },
}

enum Command {
    Decide {
        /// `None` decides on whatever profile is at the head.
        profile_id: Option<String>,
        interested: bool,
        reply: oneshot::Sender<DecisionOutcome>,
    },
    Refresh {
        done: oneshot::Sender<()>,
    },
    Retry {
        done: oneshot::Sender<()>,
    },
    Shutdown {
        done: oneshot::Sender<()>,
    },
}

enum Completion {
    Fetched {
        ticket: Ticket,
        result: Result<Vec<Profile>, String>,
    },
    Submitted {
        ticket: Ticket,
        profile_id: String,
        decision: Decision,
        result: Result<(), String>,
    },
    Settled {
        ticket: Ticket,
    },
}

/// Cloneable handle to a running feed session.
#[derive(Clone)]
pub struct FeedHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<FeedSnapshot>,
}

impl FeedHandle {
    /// Current snapshot.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified whenever the snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.snapshots.clone()
    }

    /// Look up a queued profile. Never changes state.
    pub fn details(&self, profile_id: &str) -> Option<Profile> {
        self.snapshots.borrow().find(profile_id).cloned()
    }

    /// Accept (`interested = true`) or reject the head profile `profile_id`.
    pub async fn decide(&self, profile_id: &str, interested: bool) -> DecisionOutcome {
        self.send_decision(Some(profile_id.to_string()), interested)
            .await
    }

    /// Decide on whatever profile is currently at the head.
    pub async fn decide_head(&self, interested: bool) -> DecisionOutcome {
        self.send_decision(None, interested).await
    }

    /// Reset the feed and fetch page 1 again.
    ///
    /// Returns once the reset has been applied (the fetch is still running).
    pub async fn refresh(&self) {
        let (done, wait) = oneshot::channel();
        if self.commands.send(Command::Refresh { done }).await.is_ok() {
            let _ = wait.await;
        }
    }

    /// Retry the page request that last failed.
    pub async fn retry(&self) {
        let (done, wait) = oneshot::channel();
        if self.commands.send(Command::Retry { done }).await.is_ok() {
            let _ = wait.await;
        }
    }

    /// Stop the session. Later calls on any handle become no-ops.
    pub async fn shutdown(&self) {
        let (done, wait) = oneshot::channel();
        if self.commands.send(Command::Shutdown { done }).await.is_ok() {
            let _ = wait.await;
        }
    }

    /// Wait until `predicate` holds for the published snapshot.
    ///
    /// Returns `None` if the session ends first.
    pub async fn wait_until(
        &self,
        mut predicate: impl FnMut(&FeedSnapshot) -> bool,
    ) -> Option<FeedSnapshot> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx.wait_for(|snapshot| predicate(snapshot)).await.ok()?.clone();
        Some(snapshot)
    }

    async fn send_decision(&self, profile_id: Option<String>, interested: bool) -> DecisionOutcome {
        let torn_down = DecisionOutcome::Ignored {
            reason: IgnoreReason::TornDown,
        };
        let (reply, outcome) = oneshot::channel();
        let command = Command::Decide {
            profile_id,
            interested,
            reply,
        };
        if self.commands.send(command).await.is_err() {
            return torn_down;
        }
        outcome.await.unwrap_or(torn_down)
    }
}

/// Spawn a session on the current tokio runtime and start the first fetch.
pub fn spawn_session<S, M>(source: S, matcher: M, options: ControllerOptions) -> FeedHandle
where
    S: ProfileSource,
    M: MatchingService,
{
    let mut controller = FeedController::new(options);
    // The first published snapshot already shows the initial fetch.
    let initial = controller.start();
    let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (completion_tx, completion_rx) = mpsc::unbounded_channel();

    let driver = Driver {
        controller,
        source: Arc::new(source),
        matcher: Arc::new(matcher),
        completions: completion_tx,
        snapshots: snapshot_tx,
        fetch_task: None,
        settle_task: None,
        replies: HashMap::new(),
    };
    tokio::spawn(driver.run(initial, command_rx, completion_rx));

    FeedHandle {
        commands: command_tx,
        snapshots: snapshot_rx,
    }
}

struct Driver<S, M> {
    controller: FeedController,
    source: Arc<S>,
    matcher: Arc<M>,
    completions: mpsc::UnboundedSender<Completion>,
    snapshots: watch::Sender<FeedSnapshot>,
    fetch_task: Option<JoinHandle<()>>,
    settle_task: Option<JoinHandle<()>>,
    replies: HashMap<Ticket, oneshot::Sender<DecisionOutcome>>,
}

impl<S: ProfileSource, M: MatchingService> Driver<S, M> {
    #[instrument(name = "feed_session", skip_all)]
    async fn run(
        mut self,
        initial: Vec<Effect>,
        mut commands: mpsc::Receiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        info!("feed session started");
        self.execute(initial);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown { done }) => {
                        self.teardown();
                        let _ = done.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        self.teardown();
                        break;
                    }
                },
                Some(completion) = completions.recv() => self.handle_completion(completion),
            }
            self.publish();
        }
        info!("feed session stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Decide {
                profile_id,
                interested,
                reply,
            } => {
                let target = profile_id.or_else(|| {
                    self.controller
                        .state()
                        .head()
                        .map(|profile| profile.id.clone())
                });
                let Some(target) = target else {
                    let _ = reply.send(DecisionOutcome::Ignored {
                        reason: IgnoreReason::EmptyQueue,
                    });
                    return;
                };
                match self.controller.request_decision(&target, interested) {
                    DecisionRequest::Submitted { ticket, effects } => {
                        debug!(ticket, profile_id = %target, interested, "decision submitted");
                        self.replies.insert(ticket, reply);
                        self.execute(effects);
                    }
                    DecisionRequest::Ignored(reason) => {
                        debug!(profile_id = %target, ?reason, "decision ignored");
                        let _ = reply.send(DecisionOutcome::Ignored { reason });
                    }
                }
            }
            Command::Refresh { done } => {
                info!("refreshing feed");
                let effects = self.controller.refresh();
                // The controller drops the pending submission's completion as stale.
                for (ticket, reply) in self.replies.drain() {
                    debug!(ticket, "decision overtaken by refresh");
                    let _ = reply.send(DecisionOutcome::Ignored {
                        reason: IgnoreReason::Refreshed,
                    });
                }
                self.execute(effects);
                self.publish();
                let _ = done.send(());
            }
            Command::Retry { done } => {
                let effects = self.controller.retry();
                self.execute(effects);
                self.publish();
                let _ = done.send(());
            }
            Command::Shutdown { .. } => {}
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Fetched { ticket, result } => {
                match &result {
                    Ok(profiles) => debug!(ticket, count = profiles.len(), "page fetched"),
                    Err(message) => warn!(ticket, error = %message, "page fetch failed"),
                }
                let effects = self.controller.fetch_completed(ticket, result);
                self.execute(effects);
            }
            Completion::Submitted {
                ticket,
                profile_id,
                decision,
                result,
            } => {
                let outcome = match &result {
                    Ok(()) => DecisionOutcome::Accepted {
                        profile_id,
                        decision,
                    },
                    Err(message) => {
                        warn!(ticket, profile_id = %profile_id, error = %message, "decision failed");
                        DecisionOutcome::Failed {
                            profile_id,
                            message: message.clone(),
                        }
                    }
                };
                let effects = self.controller.decision_submitted(ticket, result);
                self.execute(effects);
                // Callers that look at the snapshot after the reply must see the new phase.
                self.publish();
                if let Some(reply) = self.replies.remove(&ticket) {
                    let _ = reply.send(outcome);
                }
            }
            Completion::Settled { ticket } => {
                let effects = self.controller.settle_elapsed(ticket);
                self.execute(effects);
            }
        }
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::FetchPage {
                    ticket,
                    page,
                    limit,
                } => {
                    debug!(ticket, page, "fetching page");
                    let source = Arc::clone(&self.source);
                    let tx = self.completions.clone();
                    self.fetch_task = Some(tokio::spawn(async move {
                        let result = source
                            .fetch_page(page, limit)
                            .await
                            .map_err(|err| format!("{:#}", err));
                        let _ = tx.send(Completion::Fetched { ticket, result });
                    }));
                }
                Effect::SubmitDecision {
                    ticket,
                    profile_id,
                    decision,
                } => {
                    let matcher = Arc::clone(&self.matcher);
                    let tx = self.completions.clone();
                    // Submissions are not aborted: the backend may already have recorded them.
                    tokio::spawn(async move {
                        let result = matcher
                            .submit_decision(&profile_id, decision)
                            .await
                            .map_err(|err| format!("{:#}", err));
                        let _ = tx.send(Completion::Submitted {
                            ticket,
                            profile_id,
                            decision,
                            result,
                        });
                    });
                }
                Effect::ScheduleSettle { ticket, delay } => {
                    let tx = self.completions.clone();
                    self.settle_task = Some(tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send(Completion::Settled { ticket });
                    }));
                }
                Effect::CancelPending => {
                    for task in [self.fetch_task.take(), self.settle_task.take()]
                        .into_iter()
                        .flatten()
                    {
                        task.abort();
                    }
                }
            }
        }
    }

    fn teardown(&mut self) {
        let effects = self.controller.teardown();
        self.execute(effects);
        self.replies.clear();
    }

    fn publish(&self) {
        let errors = validate_feed_state(self.controller.state());
        if !errors.is_empty() {
            warn!(errors = ?errors, "feed invariants violated");
        }
        let next = self.controller.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}
