//! Line-driven swipe loop for `devfeed swipe`.
//!
//! Reads one key per line from `input` and writes cards and toasts to
//! `output`. Arrow-key escape sequences are accepted alongside letters.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::core::controller::IgnoreReason;
use crate::core::snapshot::FeedSnapshot;
use crate::render::{decision_toast, render_card, render_details, render_status};
use crate::session::{DecisionOutcome, FeedHandle};

const HELP: &str = "keys: l/right = interested, h/left = pass, i = details, r = refresh, t = retry, q = quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Interested,
    Pass,
    Details,
    Refresh,
    Retry,
    Quit,
    Unknown,
}

pub fn parse_key(line: &str) -> Key {
    match line.trim() {
        "l" | "y" | "like" | "\u{1b}[C" => Key::Interested,
        "h" | "n" | "pass" | "\u{1b}[D" => Key::Pass,
        "i" | "info" | "details" => Key::Details,
        "r" | "refresh" => Key::Refresh,
        "t" | "retry" => Key::Retry,
        "q" | "quit" | "exit" => Key::Quit,
        _ => Key::Unknown,
    }
}

/// Tally of a swipe session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwipeSummary {
    pub liked: u32,
    pub passed: u32,
}

/// Run the interactive loop until `q`, end of input or session shutdown.
pub async fn run_swipe<R, W>(handle: &FeedHandle, input: R, mut output: W) -> Result<SwipeSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut summary = SwipeSummary::default();

    loop {
        let Some(snapshot) = handle.wait_until(is_settled).await else {
            break;
        };
        write_view(&mut output, &snapshot).await?;

        let Some(line) = lines.next_line().await.context("read input")? else {
            break;
        };
        let key = parse_key(&line);
        debug!(?key, "key pressed");

        match key {
            Key::Interested | Key::Pass => {
                let head = snapshot.head().cloned();
                let outcome = handle.decide_head(key == Key::Interested).await;
                let message = match (&outcome, head) {
                    (DecisionOutcome::Accepted { decision, .. }, Some(profile)) => {
                        if decision.is_interested() {
                            summary.liked += 1;
                        } else {
                            summary.passed += 1;
                        }
                        decision_toast(*decision, &profile)
                    }
                    (DecisionOutcome::Accepted { profile_id, .. }, None) => {
                        format!("sent decision for {}", profile_id)
                    }
                    (DecisionOutcome::Ignored { reason }, _) => ignored_message(*reason).to_string(),
                    (DecisionOutcome::Failed { message, .. }, _) => {
                        format!("could not send decision ({}), try again", message)
                    }
                };
                write_line(&mut output, &message).await?;
            }
            Key::Details => match snapshot.head() {
                Some(profile) => write_line(&mut output, &render_details(profile)?).await?,
                None => write_line(&mut output, "nothing to show").await?,
            },
            Key::Refresh => handle.refresh().await,
            Key::Retry => handle.retry().await,
            Key::Quit => break,
            Key::Unknown => write_line(&mut output, HELP).await?,
        }
    }

    output.flush().await.context("flush output")?;
    Ok(summary)
}

/// Nothing in flight that would change the head card.
fn is_settled(snapshot: &FeedSnapshot) -> bool {
    !snapshot.is_transitioning() && !(snapshot.loading && snapshot.queue.is_empty())
}

fn ignored_message(reason: IgnoreReason) -> &'static str {
    match reason {
        IgnoreReason::EmptyQueue => "no developer to decide on",
        IgnoreReason::DecisionInFlight => "still sending the previous decision",
        IgnoreReason::NotHead => "that developer is no longer first in line",
        IgnoreReason::Refreshed => "feed was refreshed before the decision went through",
        IgnoreReason::TornDown => "session closed",
    }
}

async fn write_view<W: AsyncWrite + Unpin>(output: &mut W, snapshot: &FeedSnapshot) -> Result<()> {
    match snapshot.head() {
        Some(head) => {
            write_line(output, &render_card(head, snapshot.preview())?).await?;
            if let Some(error) = &snapshot.error {
                write_line(output, &format!("warning: {}", error)).await?;
            }
        }
        None => write_line(output, &render_status(snapshot)).await?,
    }
    Ok(())
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<()> {
    output
        .write_all(format!("{}\n", text).as_bytes())
        .await
        .context("write output")
}
