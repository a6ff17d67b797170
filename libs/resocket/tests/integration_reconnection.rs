//! Integration tests for reconnection
//!
//! These tests verify the backoff sequence, the single pending timer,
//! the reconnect budget and the handling of synchronous open failures.

#[macro_use]
mod common;

use common::{advance, settle, Harness, Seen};
use resocket::traits::reconnect::{ReconnectBackoff, DEFAULT_MAX_DELAY};
use resocket::ConnectionState;
use std::time::Duration;

#[test]
fn test_backoff_full_sequence() {
    verbose_println!("Testing backoff full sequence...");

    let mut backoff = ReconnectBackoff::new(
        Duration::from_millis(1000),
        Duration::from_millis(1000),
        DEFAULT_MAX_DELAY,
        None,
    );

    let expected_delays = [1000, 1500, 2250, 3375];
    for (attempt, &expected_ms) in expected_delays.iter().enumerate() {
        let delay = backoff.next_delay();
        verbose_println!("  Attempt {}: {:?}", attempt, delay);
        assert_eq!(delay.as_millis(), expected_ms, "Unexpected delay at attempt {}", attempt);
    }
}

#[test]
fn test_backoff_budget_is_lifetime() {
    let mut backoff = ReconnectBackoff::new(
        Duration::from_millis(100),
        Duration::from_millis(100),
        Duration::from_secs(1),
        Some(Duration::from_millis(300)),
    );

    let first = backoff.next_delay();
    backoff.charge(first);
    backoff.reset();
    let again = backoff.next_delay();
    assert_eq!(again, Duration::from_millis(100), "reset restarts the sequence");

    backoff.charge(again);
    assert!(!backoff.is_exhausted());
    backoff.charge(Duration::from_millis(100));
    assert!(!backoff.is_exhausted(), "reaching the budget is not exceeding it");
    backoff.charge(Duration::from_millis(1));
    assert!(backoff.is_exhausted());
}

#[tokio::test(start_paused = true)]
async fn test_close_schedules_reconnect() {
    let harness = Harness::start(|b| b.reconnect(true));
    let peer = harness.open().await;

    peer.close(1006, "lost");
    settle().await;
    assert_eq!(harness.manager.state(), ConnectionState::Closed);
    assert!(harness.manager.is_reconnect_pending());

    advance(Duration::from_millis(1)).await;

    assert_eq!(harness.connector.opened(), 2);
    assert_eq!(harness.manager.state(), ConnectionState::Initializing);
    assert_eq!(harness.manager.metrics().reconnect_attempts, 1);
    assert!(!harness.manager.is_reconnect_pending());

    let replacement = harness.accept().await;
    replacement.open();
    settle().await;
    assert_eq!(harness.manager.state(), ConnectionState::Opened);
    assert_eq!(
        harness.recorder.take(),
        vec![Seen::Opened, Seen::Closed(1006), Seen::Opened]
    );
}

#[tokio::test(start_paused = true)]
async fn test_error_and_close_share_one_timer() {
    verbose_println!("Testing error then close produces one attempt...");

    let harness = Harness::start(|b| {
        b.reconnect(true).backoff(
            Duration::from_millis(100),
            Duration::from_millis(100),
            Duration::from_secs(60),
        )
    });
    let peer = harness.open().await;

    peer.error("reset by peer");
    peer.close(1006, "reset by peer");
    settle().await;
    assert!(harness.manager.is_reconnect_pending());

    advance(Duration::from_millis(100)).await;
    assert_eq!(harness.connector.opened(), 2);
    assert_eq!(harness.acceptor.pending(), 1);
    assert_eq!(harness.manager.metrics().reconnect_attempts, 1);

    // Nothing else was queued behind the first timer
    advance(Duration::from_secs(10)).await;
    assert_eq!(harness.connector.opened(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_replaces_live_transport() {
    let harness = Harness::start(|b| b.reconnect(true));
    let mut first = harness.open().await;

    // Errored keeps the transport; the reconnect must discard it
    first.error("stalled");
    settle().await;
    advance(Duration::from_millis(1)).await;

    assert!(first.is_closed_by_client());
    assert!(!first.message("stale"));

    let second = harness.accept().await;
    assert!(second.open());
    settle().await;
    assert_eq!(harness.manager.state(), ConnectionState::Opened);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_disabled_never_schedules() {
    let harness = Harness::start(|b| b.reconnect(false));
    let peer = harness.open().await;

    peer.error("boom");
    peer.close(1006, "boom");
    settle().await;
    assert!(!harness.manager.is_reconnect_pending());

    advance(Duration::from_secs(120)).await;
    assert_eq!(harness.connector.opened(), 1);
    assert_eq!(harness.manager.state(), ConnectionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_delays_grow_between_attempts() {
    verbose_println!("Testing the observed delay sequence...");

    let harness = Harness::start_with(
        |c| c.fail_next(usize::MAX),
        |b| {
            b.reconnect(true).backoff(
                Duration::from_millis(1000),
                Duration::from_millis(1000),
                Duration::from_secs(60),
            )
        },
    );
    settle().await;
    assert!(harness.manager.is_reconnect_pending());

    let mut total = 0u64;
    for (attempt, delay_ms) in [1000u64, 1500, 2250, 3375].into_iter().enumerate() {
        advance(Duration::from_millis(delay_ms - 1)).await;
        assert_eq!(
            harness.manager.metrics().reconnect_attempts,
            attempt as u64,
            "attempt {} fired early",
            attempt + 1
        );

        advance(Duration::from_millis(1)).await;
        total += delay_ms;
        verbose_println!("  Attempt {} after {}ms", attempt + 1, total);
        assert_eq!(harness.manager.metrics().reconnect_attempts, attempt as u64 + 1);
    }

    // Synchronous failures never reach listeners
    assert!(harness.recorder.take().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_default_backoff_retries_once_then_grows_from_one_second() {
    verbose_println!("Testing the default delay sequence...");

    let harness = Harness::start_with(|c| c.fail_next(usize::MAX), |b| b.reconnect(true));
    settle().await;

    // First retry is almost immediate
    advance(Duration::from_millis(1)).await;
    assert_eq!(harness.manager.metrics().reconnect_attempts, 1);

    // Then 1500ms, 2250ms: no retry storm against a dead server
    advance(Duration::from_millis(1050)).await;
    assert_eq!(harness.manager.metrics().reconnect_attempts, 1);
    advance(Duration::from_millis(449)).await;
    assert_eq!(harness.manager.metrics().reconnect_attempts, 1);
    advance(Duration::from_millis(1)).await;
    assert_eq!(harness.manager.metrics().reconnect_attempts, 2);

    advance(Duration::from_millis(2249)).await;
    assert_eq!(harness.manager.metrics().reconnect_attempts, 2);
    advance(Duration::from_millis(1)).await;
    assert_eq!(harness.manager.metrics().reconnect_attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn test_synchronous_failure_retries() {
    let harness = Harness::start_with(|c| c.fail_next(1), |b| b.reconnect(true));
    settle().await;

    assert_eq!(harness.connector.opened(), 0);
    assert!(harness.manager.is_reconnect_pending());
    assert!(harness.recorder.take().is_empty());

    advance(Duration::from_millis(1)).await;
    let peer = harness.accept().await;
    peer.open();
    settle().await;

    assert_eq!(harness.manager.state(), ConnectionState::Opened);
    assert_eq!(harness.recorder.take(), vec![Seen::Opened]);
}

#[tokio::test(start_paused = true)]
async fn test_open_resets_backoff() {
    let harness = Harness::start(|b| {
        b.reconnect(true).backoff(
            Duration::from_millis(100),
            Duration::from_millis(100),
            Duration::from_secs(60),
        )
    });
    let peer = harness.open().await;

    peer.close(1006, "first drop");
    advance(Duration::from_millis(100)).await;
    let peer = harness.accept().await;
    peer.close(1006, "never opened");
    settle().await;

    // Second delay in the sequence
    advance(Duration::from_millis(149)).await;
    assert_eq!(harness.connector.opened(), 2);
    advance(Duration::from_millis(1)).await;
    assert_eq!(harness.connector.opened(), 3);

    let peer = harness.accept().await;
    peer.open();
    settle().await;
    peer.close(1006, "after open");
    settle().await;

    // Back to the initial delay
    advance(Duration::from_millis(100)).await;
    assert_eq!(harness.connector.opened(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_budget_exhaustion_destroys() {
    verbose_println!("Testing reconnect budget exhaustion...");

    let harness = Harness::start_with(
        |c| c.fail_next(usize::MAX),
        |b| {
            b.reconnect(true)
                .backoff(
                    Duration::from_millis(100),
                    Duration::from_millis(100),
                    Duration::from_secs(60),
                )
                .reconnect_budget(Duration::from_millis(200))
        },
    );

    // 100ms charged (within budget) -> attempt; 250ms charged -> give up
    advance(Duration::from_millis(300)).await;

    assert_eq!(harness.manager.state(), ConnectionState::Destroyed);
    assert_eq!(harness.manager.metrics().reconnect_attempts, 1);
    assert_eq!(harness.recorder.take(), vec![Seen::Destroyed]);
    assert!(!harness.manager.is_reconnect_pending());

    advance(Duration::from_secs(60)).await;
    assert_eq!(harness.manager.metrics().reconnect_attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_destroy_cancels_pending_reconnect() {
    let harness = Harness::start(|b| {
        b.reconnect(true).backoff(
            Duration::from_millis(500),
            Duration::from_millis(500),
            Duration::from_secs(60),
        )
    });
    let peer = harness.open().await;

    peer.close(1006, "lost");
    settle().await;
    assert!(harness.manager.is_reconnect_pending());

    harness.manager.destroy();
    settle().await;
    assert!(!harness.manager.is_reconnect_pending());

    advance(Duration::from_secs(5)).await;
    assert_eq!(harness.connector.opened(), 1);
}
