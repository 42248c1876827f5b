/*!
 * Async Bridge Tests
 * Delivery handoff onto the scheduler's own turn
 */

use nix::sys::signal::{raise, Signal as OsSignal};
use serial_test::serial;
use sigctl::*;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn usr2() -> SigId {
    capability::resolve("SIGUSR2").unwrap()
}

#[test]
#[serial]
fn test_bridge_requires_running_scheduler() {
    let result = async_handler(&[usr2()], |_| {});
    assert!(matches!(result, Err(SignalError::BridgeUnavailable(_))));
}

#[tokio::test]
#[serial]
async fn test_callback_runs_on_scheduler_turn() {
    let hits = Arc::new(AtomicUsize::new(0));
    let seen_signo = Arc::new(AtomicI32::new(0));
    let scheduler_visible = Arc::new(AtomicBool::new(false));

    let hits_in_cb = Arc::clone(&hits);
    let seen_in_cb = Arc::clone(&seen_signo);
    let sched_in_cb = Arc::clone(&scheduler_visible);
    async_handler(&[usr2()], move |sig| {
        // A scheduler-only operation must work here: the callback runs on a
        // scheduler turn, not inside the delivery context.
        sched_in_cb.store(
            tokio::runtime::Handle::try_current().is_ok(),
            Ordering::SeqCst,
        );
        seen_in_cb.store(sig.number(), Ordering::SeqCst);
        hits_in_cb.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    raise(OsSignal::SIGUSR2).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(seen_signo.load(Ordering::SeqCst), usr2().number());
    assert!(scheduler_visible.load(Ordering::SeqCst));

    bridge::unregister(&[usr2()]).unwrap();
    assert_eq!(get_setting(usr2()).kind(), ReactionKind::Default);
}

#[tokio::test]
#[serial]
async fn test_reregistering_replaces_previous_callback() {
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    let first_in_cb = Arc::clone(&first);
    async_handler(&[usr2()], move |_| {
        first_in_cb.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    let second_in_cb = Arc::clone(&second);
    async_handler(&[usr2()], move |_| {
        second_in_cb.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    raise(OsSignal::SIGUSR2).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Replacement, not chaining: only the latest registration runs.
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);

    bridge::unregister(&[usr2()]).unwrap();
}

#[tokio::test]
#[serial]
async fn test_bridge_counts_wakeups() {
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_in_cb = Arc::clone(&hits);
    async_handler(&[usr2()], move |_| {
        hits_in_cb.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    let before = stats().bridge_wakeups;
    raise(OsSignal::SIGUSR2).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(stats().bridge_wakeups, before + 1);

    bridge::unregister(&[usr2()]).unwrap();
}

#[tokio::test]
#[serial]
async fn test_registering_uncatchable_is_refused() {
    let kill = capability::resolve("SIGKILL").unwrap();
    let result = async_handler(&[kill], |_| {});
    assert!(matches!(result, Err(SignalError::Uncatchable(_))));
}
