//! Session-level tests driving a spawned feed session end to end.
//!
//! The profile source and matching service are scripted fakes; tokio's clock
//! is paused so settle delays and simulated latency elapse instantly.

use std::time::Duration;

use devfeed::core::controller::{ControllerOptions, IgnoreReason};
use devfeed::core::types::Decision;
use devfeed::session::{DecisionOutcome, FeedHandle, spawn_session};
use devfeed::test_support::{
    ScriptedMatcher, ScriptedPage, ScriptedSource, ScriptedSubmit, ids, profiles,
};

fn start(source: &ScriptedSource, matcher: &ScriptedMatcher) -> FeedHandle {
    spawn_session(
        source.clone(),
        matcher.clone(),
        ControllerOptions::default(),
    )
}

async fn loaded(handle: &FeedHandle, len: usize) {
    handle
        .wait_until(|s| !s.loading && s.queue.len() == len)
        .await
        .expect("session alive");
}

async fn idle(handle: &FeedHandle) {
    handle
        .wait_until(|s| !s.is_transitioning())
        .await
        .expect("session alive");
}

#[tokio::test(start_paused = true)]
async fn first_page_loads_on_start() {
    let source = ScriptedSource::new(vec![ScriptedPage::ok(profiles(1..=10))]);
    let matcher = ScriptedMatcher::default();
    let handle = start(&source, &matcher);

    loaded(&handle, 10).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.page, 1);
    assert!(snapshot.has_more);
    assert_eq!(snapshot.error, None);
    assert_eq!(snapshot.head().map(|p| p.id.as_str()), Some("p1"));
    assert_eq!(source.requests(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn deciding_down_to_threshold_prefetches_next_page() {
    let source = ScriptedSource::new(vec![
        ScriptedPage::ok(profiles(1..=10)),
        ScriptedPage::ok(profiles(11..=20)),
    ]);
    let matcher = ScriptedMatcher::default();
    let handle = start(&source, &matcher);
    loaded(&handle, 10).await;

    for n in 1..=7 {
        let id = format!("p{}", n);
        let outcome = handle.decide(&id, n % 2 == 1).await;
        assert!(
            matches!(outcome, DecisionOutcome::Accepted { ref profile_id, .. } if *profile_id == id),
            "decision on {} was {:?}",
            id,
            outcome
        );
        // Still queued while settling.
        assert_eq!(handle.snapshot().settling.as_deref(), Some(id.as_str()));
        idle(&handle).await;
    }

    loaded(&handle, 13).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.page, 2);
    assert_eq!(ids(&snapshot.queue)[..4], ["p8", "p9", "p10", "p11"]);
    assert_eq!(source.requests(), vec![1, 2]);

    let submitted = matcher.submitted();
    assert_eq!(submitted.len(), 7);
    assert_eq!(submitted[0], ("p1".to_string(), Decision::Interested));
    assert_eq!(submitted[1], ("p2".to_string(), Decision::Ignored));
}

#[tokio::test(start_paused = true)]
async fn failed_submission_keeps_profile_and_reports_error() {
    let source = ScriptedSource::new(vec![ScriptedPage::ok(profiles(1..=10))]);
    let matcher = ScriptedMatcher::new(vec![ScriptedSubmit::err("503 service unavailable")]);
    let handle = start(&source, &matcher);
    loaded(&handle, 10).await;

    let outcome = handle.decide("p1", true).await;
    assert!(matches!(outcome, DecisionOutcome::Failed { ref message, .. } if message.contains("503")));

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.head().map(|p| p.id.as_str()), Some("p1"));
    assert_eq!(snapshot.queue.len(), 10);
    assert!(snapshot.error.as_deref().is_some_and(|e| e.contains("503")));
    assert!(!snapshot.is_transitioning());

    // The same gesture goes through on the second try.
    let outcome = handle.decide("p1", true).await;
    assert!(matches!(outcome, DecisionOutcome::Accepted { .. }));
}

#[tokio::test(start_paused = true)]
async fn fetch_failure_waits_for_retry() {
    let source = ScriptedSource::new(vec![ScriptedPage::err("connection refused")]);
    let matcher = ScriptedMatcher::default();
    let handle = start(&source, &matcher);

    let failed = handle
        .wait_until(|s| s.error.is_some())
        .await
        .expect("session alive");
    assert!(failed.queue.is_empty());
    assert!(!failed.loading);
    assert!(failed.has_more);

    // No automatic refetch.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(source.requests(), vec![1]);

    source.push(ScriptedPage::ok(profiles(1..=10)));
    handle.retry().await;
    loaded(&handle, 10).await;
    assert_eq!(handle.snapshot().error, None);
    assert_eq!(source.requests(), vec![1, 1]);
}

#[tokio::test(start_paused = true)]
async fn failed_prefetch_is_retried_as_the_queue_drains() {
    let source = ScriptedSource::new(vec![
        ScriptedPage::ok(profiles(1..=10)),
        ScriptedPage::err("blip"),
        ScriptedPage::ok(profiles(11..=20)),
    ]);
    let matcher = ScriptedMatcher::default();
    let handle = start(&source, &matcher);
    loaded(&handle, 10).await;

    // Seven decisions reach the threshold and fire the page 2 prefetch, which fails.
    for n in 1..=7 {
        let outcome = handle.decide(&format!("p{}", n), true).await;
        assert!(matches!(outcome, DecisionOutcome::Accepted { .. }));
        idle(&handle).await;
    }
    let failed = handle
        .wait_until(|s| s.error.is_some())
        .await
        .expect("session alive");
    assert_eq!(failed.queue.len(), 3);
    assert!(failed.has_more);
    assert_eq!(source.requests(), vec![1, 2]);

    // The next eviction asks for page 2 again.
    let outcome = handle.decide("p8", true).await;
    assert!(matches!(outcome, DecisionOutcome::Accepted { .. }));
    idle(&handle).await;

    loaded(&handle, 12).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.error, None);
    assert_eq!(snapshot.page, 2);
    assert_eq!(ids(&snapshot.queue)[..3], ["p9", "p10", "p11"]);
    assert_eq!(source.requests(), vec![1, 2, 2]);
}

#[tokio::test(start_paused = true)]
async fn failed_prefetch_does_not_stall_the_feed() {
    let source = ScriptedSource::new(vec![
        ScriptedPage::ok(profiles(1..=10)),
        ScriptedPage::err("blip"),
        ScriptedPage::ok(profiles(11..=20)),
    ]);
    let matcher = ScriptedMatcher::default();
    let handle = start(&source, &matcher);
    loaded(&handle, 10).await;

    for n in 1..=10 {
        let outcome = handle.decide(&format!("p{}", n), true).await;
        assert!(matches!(outcome, DecisionOutcome::Accepted { .. }));
        idle(&handle).await;
    }
    tokio::time::sleep(Duration::from_secs(5)).await;

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.queue.len(), 10);
    assert_eq!(snapshot.head().map(|p| p.id.as_str()), Some("p11"));
    assert_eq!(snapshot.error, None);
    assert_eq!(source.requests(), vec![1, 2, 2]);
}

#[tokio::test(start_paused = true)]
async fn refresh_overtaking_a_submission_reports_it_ignored() {
    let source = ScriptedSource::new(vec![
        ScriptedPage::ok(profiles(1..=10)),
        ScriptedPage::ok(profiles(1..=10)),
    ]);
    let matcher = ScriptedMatcher::new(vec![
        ScriptedSubmit::ok().after(Duration::from_millis(200)),
    ]);
    let handle = start(&source, &matcher);
    loaded(&handle, 10).await;

    let (outcome, ()) = tokio::join!(handle.decide("p1", true), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.refresh().await;
    });
    assert_eq!(
        outcome,
        DecisionOutcome::Ignored {
            reason: IgnoreReason::Refreshed
        }
    );

    loaded(&handle, 10).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.queue.len(), 10);
    assert_eq!(snapshot.head().map(|p| p.id.as_str()), Some("p1"));
    assert!(!snapshot.is_transitioning());
}

#[tokio::test(start_paused = true)]
async fn refresh_during_settle_cancels_eviction() {
    let source = ScriptedSource::new(vec![
        ScriptedPage::ok(profiles(1..=10)),
        ScriptedPage::ok(profiles(1..=10)).after(Duration::from_millis(50)),
    ]);
    let matcher = ScriptedMatcher::default();
    let handle = start(&source, &matcher);
    loaded(&handle, 10).await;

    let outcome = handle.decide("p1", true).await;
    assert!(matches!(outcome, DecisionOutcome::Accepted { .. }));

    handle.refresh().await;
    let reset = handle.snapshot();
    assert!(reset.queue.is_empty());
    assert!(reset.loading);
    assert_eq!(reset.page, 1);
    assert_eq!(reset.settling, None);

    loaded(&handle, 10).await;
    tokio::time::sleep(Duration::from_secs(2)).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.queue.len(), 10, "stale settle must not evict");
    assert_eq!(snapshot.head().map(|p| p.id.as_str()), Some("p1"));
    assert_eq!(source.requests(), vec![1, 1]);
}

#[tokio::test(start_paused = true)]
async fn concurrent_decisions_are_serialised() {
    let source = ScriptedSource::new(vec![ScriptedPage::ok(profiles(1..=10))]);
    let matcher = ScriptedMatcher::new(vec![
        ScriptedSubmit::ok().after(Duration::from_millis(100)),
    ]);
    let handle = start(&source, &matcher);
    loaded(&handle, 10).await;

    let (first, second) = tokio::join!(handle.decide("p1", true), handle.decide("p1", false));
    assert!(matches!(first, DecisionOutcome::Accepted { .. }));
    assert_eq!(
        second,
        DecisionOutcome::Ignored {
            reason: IgnoreReason::DecisionInFlight
        }
    );
    assert_eq!(matcher.submitted().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn decisions_on_non_head_profiles_are_ignored() {
    let source = ScriptedSource::new(vec![ScriptedPage::ok(profiles(1..=10))]);
    let matcher = ScriptedMatcher::default();
    let handle = start(&source, &matcher);
    loaded(&handle, 10).await;

    assert_eq!(
        handle.decide("p3", true).await,
        DecisionOutcome::Ignored {
            reason: IgnoreReason::NotHead
        }
    );
    assert!(matcher.submitted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn empty_feed_is_exhausted() {
    let source = ScriptedSource::new(vec![ScriptedPage::ok(Vec::new())]);
    let matcher = ScriptedMatcher::default();
    let handle = start(&source, &matcher);

    let snapshot = handle
        .wait_until(|s| s.is_exhausted())
        .await
        .expect("session alive");
    assert!(!snapshot.has_more);
    assert_eq!(
        handle.decide_head(true).await,
        DecisionOutcome::Ignored {
            reason: IgnoreReason::EmptyQueue
        }
    );
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(source.requests(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_the_session() {
    let source = ScriptedSource::new(vec![ScriptedPage::ok(profiles(1..=10))]);
    let matcher = ScriptedMatcher::default();
    let handle = start(&source, &matcher);
    loaded(&handle, 10).await;

    handle.shutdown().await;
    assert_eq!(
        handle.decide("p1", true).await,
        DecisionOutcome::Ignored {
            reason: IgnoreReason::TornDown
        }
    );
    assert!(handle.wait_until(|_| false).await.is_none());
    assert!(matcher.submitted().is_empty());
}
