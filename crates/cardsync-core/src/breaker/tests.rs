use super::*;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

#[test]
fn test_try_enter_is_exclusive() {
    let breaker = CircuitBreaker::new(Direction::LocalToExternal);

    assert!(breaker.try_enter());
    assert!(breaker.is_engaged());
    assert!(!breaker.try_enter());

    assert!(breaker.release());
    assert!(!breaker.release());
    assert!(breaker.try_enter());

    let summary = breaker.summary();
    assert_eq!(summary.total_trips, 2);
    assert_eq!(summary.total_releases, 1);
}

#[tokio::test]
async fn test_scheduled_release_clears_flag_and_runs_callback() {
    let breaker = CircuitBreaker::new(Direction::ExternalToLocal);
    let (_tx, rx) = shutdown_channel();
    let calls = Arc::new(AtomicUsize::new(0));

    assert!(breaker.try_enter());
    let calls_in_task = Arc::clone(&calls);
    let handle = breaker.schedule_release(Duration::from_millis(20), rx, move || {
        calls_in_task.fetch_add(1, Ordering::SeqCst);
    });

    assert!(breaker.is_engaged());
    assert_eq!(breaker.summary().pending_releases, 1);

    handle.await.unwrap();

    assert!(!breaker.is_engaged());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(breaker.summary().is_settled());
}

#[tokio::test]
async fn test_multiple_releases_clear_once_each() {
    let breaker = CircuitBreaker::new(Direction::LocalToExternal);
    let (_tx, rx) = shutdown_channel();

    assert!(breaker.try_enter());
    let first = breaker.schedule_release(Duration::from_millis(10), rx.clone(), || {});
    let second = breaker.schedule_release(Duration::from_millis(30), rx, || {});

    first.await.unwrap();
    assert!(!breaker.is_engaged());

    // Re-engaged between the two fires: the trailing release clears it early.
    assert!(breaker.try_enter());
    second.await.unwrap();
    assert!(!breaker.is_engaged());

    let summary = breaker.summary();
    assert_eq!(summary.total_trips, 2);
    assert_eq!(summary.total_releases, 2);
    assert_eq!(summary.pending_releases, 0);
}

#[tokio::test]
async fn test_shutdown_cancels_pending_release() {
    let breaker = CircuitBreaker::new(Direction::LocalToExternal);
    let (tx, rx) = shutdown_channel();
    let calls = Arc::new(AtomicUsize::new(0));

    assert!(breaker.try_enter());
    let calls_in_task = Arc::clone(&calls);
    let handle = breaker.schedule_release(Duration::from_secs(30), rx, move || {
        calls_in_task.fetch_add(1, Ordering::SeqCst);
    });

    tx.send_replace(true);
    handle.await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(breaker.summary().pending_releases, 0);
    // Cancelled, not fired: teardown is responsible for the flag.
    assert!(breaker.is_engaged());
    breaker.reset();
    assert!(!breaker.is_engaged());
}

#[tokio::test]
async fn test_release_after_breaker_dropped_is_noop() {
    let breaker = CircuitBreaker::new(Direction::ExternalToLocal);
    let (_tx, rx) = shutdown_channel();
    let calls = Arc::new(AtomicUsize::new(0));

    assert!(breaker.try_enter());
    let calls_in_task = Arc::clone(&calls);
    let handle = breaker.schedule_release(Duration::from_millis(10), rx, move || {
        calls_in_task.fetch_add(1, Ordering::SeqCst);
    });
    drop(breaker);

    handle.await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_already_shut_down_never_fires() {
    let breaker = CircuitBreaker::new(Direction::LocalToExternal);
    let (tx, rx) = shutdown_channel();
    tx.send_replace(true);

    assert!(breaker.try_enter());
    breaker.schedule_release(Duration::from_millis(1), rx, || {}).await.unwrap();

    assert!(breaker.is_engaged());
    assert_eq!(breaker.summary().total_releases, 0);
}
