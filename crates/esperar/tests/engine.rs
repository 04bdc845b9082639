//! End-to-end timing behavior against the real clock.
//!
//! Unit tests cover loop logic on a fake clock; these exercise actual
//! sleeps, cross-thread condition changes, and cross-thread cancellation.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use esperar::{EsperarError, PollOptions, Poller, Retrier, RetryError};

fn quick_poller(timeout_ms: u64, poll_interval_ms: u64) -> Poller {
    Poller::with_options(
        PollOptions::new()
            .with_timeout(timeout_ms)
            .with_poll_interval(poll_interval_ms),
    )
}

#[test]
fn poll_returns_when_condition_becomes_true() {
    let flag = Arc::new(AtomicBool::new(false));
    let setter = Arc::clone(&flag);

    thread::spawn(move || {
        thread::sleep(Duration::from_millis(60));
        setter.store(true, Ordering::SeqCst);
    });

    let poller = quick_poller(2_000, 10);
    let ready = poller
        .poll_until("flag raised", || {
            Ok::<bool, std::convert::Infallible>(flag.load(Ordering::SeqCst))
        })
        .expect("flag should be observed before the deadline");
    assert!(ready);
}

#[test]
fn poll_timeout_failure_mentions_the_label() {
    let poller = quick_poller(150, 20);
    let start = Instant::now();

    let err = poller
        .poll("ready", || Ok::<Option<()>, std::convert::Infallible>(None))
        .unwrap_err();

    assert!(start.elapsed() >= Duration::from_millis(150));
    assert!(err.to_string().contains("ready"));
    assert!(matches!(err, EsperarError::Timeout { .. }));
}

#[test]
fn attempts_are_sequential_and_spaced_by_the_interval() {
    let interval_ms = 20u64;
    let poller = quick_poller(2_000, interval_ms);
    let stamps: Mutex<Vec<Instant>> = Mutex::new(Vec::new());

    let _ = poller
        .poll("spaced", || {
            let mut stamps = stamps.lock().unwrap();
            stamps.push(Instant::now());
            let done = stamps.len() >= 4;
            Ok::<Option<()>, std::convert::Infallible>(done.then_some(()))
        })
        .unwrap();

    let stamps = stamps.lock().unwrap();
    assert_eq!(stamps.len(), 4);
    for pair in stamps.windows(2) {
        // each attempt starts only after the previous one's sleep completed
        let gap = pair[1].duration_since(pair[0]);
        assert!(
            gap >= Duration::from_millis(interval_ms),
            "attempts overlapped or ran early: gap {gap:?}"
        );
    }
}

#[test]
fn cancellation_aborts_a_parked_wait_early() {
    let poller = quick_poller(30_000, 25);
    let token = poller.cancel_token();

    thread::spawn(move || {
        thread::sleep(Duration::from_millis(60));
        token.cancel();
    });

    let start = Instant::now();
    let err = poller
        .poll("never ready", || {
            Ok::<Option<()>, std::convert::Infallible>(None)
        })
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(
        start.elapsed() < Duration::from_secs(5),
        "cancellation should not wait out the 30s deadline"
    );
}

#[test]
fn retry_pair_recovers_after_flaky_attempts() {
    let retrier = Retrier::new();
    let calls = AtomicUsize::new(0);

    let value = retrier
        .retry(5, Duration::from_millis(20), |index| {
            calls.fetch_add(1, Ordering::SeqCst);
            if index < 2 {
                Err(std::io::Error::other("state not settled yet"))
            } else {
                Ok("clicked")
            }
        })
        .expect("third attempt should succeed");

    assert_eq!(value, "clicked");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn retry_exhaustion_surfaces_the_underlying_io_error() {
    let retrier = Retrier::new();

    let err = retrier
        .retry(2, Duration::from_millis(10), |_| {
            Err::<(), _>(std::io::Error::other("download incomplete"))
        })
        .unwrap_err();

    // transparent: the io::Error's own message, unwrapped
    assert_eq!(err.to_string(), "download incomplete");
    assert!(matches!(err, RetryError::Exhausted(_)));
}

#[test]
fn best_effort_scan_returns_what_was_found() {
    let retrier = Retrier::new();

    let found: Option<&str> =
        retrier.retry_until_some(3, Duration::from_millis(10), |_| None);

    assert_eq!(found, None);
}
