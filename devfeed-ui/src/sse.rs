//! Server-Sent Events stream of feed snapshots.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use tracing::{debug, warn};

use devfeed::core::snapshot::FeedSnapshot;

use crate::state::AppState;

/// SSE endpoint handler.
///
/// Sends `connected`, then a `snapshot` event with the current feed and one
/// more every time the session publishes a change. Ends when the session
/// stops.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.feed.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("connected").data("{}"));

        loop {
            let snapshot = rx.borrow_and_update().clone();
            if let Some(event) = snapshot_event(&snapshot) {
                yield Ok(event);
            }
            if rx.changed().await.is_err() {
                debug!("feed session closed, ending SSE stream");
                break;
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn snapshot_event(snapshot: &FeedSnapshot) -> Option<Event> {
    match serde_json::to_string(snapshot) {
        Ok(json) => Some(Event::default().event("snapshot").data(json)),
        Err(err) => {
            warn!(error = %err, "failed to serialize snapshot");
            None
        }
    }
}
