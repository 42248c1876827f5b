/*!
 * Block/Mask Controller Tests
 * Deferred delivery, coalescing, and reaction-at-unblock-time semantics
 */

use nix::sys::signal::{raise, Signal as OsSignal};
use serial_test::serial;
use sigctl::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn usr1() -> SigId {
    capability::resolve("SIGUSR1").unwrap()
}

fn counting_reaction(counter: &Arc<AtomicUsize>) -> Reaction {
    let counter = Arc::clone(counter);
    let (chain, _token) = HandlerChain::single(Arc::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));
    Reaction::Callback(chain)
}

#[test]
#[serial]
fn test_blocked_arrivals_are_deferred_and_coalesced() {
    let registry = SignalRegistry::global();
    let id = usr1();

    let counter = Arc::new(AtomicUsize::new(0));
    registry.set_one(id, counting_reaction(&counter)).unwrap();

    let guard = MaskGuard::enter(&[id]).unwrap();
    assert!(registry.is_blocked(id));
    assert!(registry.blocked_set().contains(&id));

    raise(OsSignal::SIGUSR1).unwrap();
    raise(OsSignal::SIGUSR1).unwrap();
    // Nothing runs while the id is masked.
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    guard.exit().unwrap();

    // Two pending occurrences of a standard signal coalesce into one
    // delivery on unblock: platform contract, not a crate bug.
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(!registry.is_blocked(id));

    registry.set_one(id, Reaction::Default).unwrap();
}

#[test]
#[serial]
fn test_unblock_uses_reaction_current_at_unblock_time() {
    let registry = SignalRegistry::global();
    let id = usr1();

    let at_block_time = Arc::new(AtomicUsize::new(0));
    let at_unblock_time = Arc::new(AtomicUsize::new(0));
    registry
        .set_one(id, counting_reaction(&at_block_time))
        .unwrap();

    let guard = MaskGuard::enter(&[id]).unwrap();
    raise(OsSignal::SIGUSR1).unwrap();

    // The reaction is rewritten while the arrival is still pending.
    registry
        .set_one(id, counting_reaction(&at_unblock_time))
        .unwrap();
    guard.exit().unwrap();

    assert_eq!(at_block_time.load(Ordering::SeqCst), 0);
    assert_eq!(at_unblock_time.load(Ordering::SeqCst), 1);

    registry.set_one(id, Reaction::Default).unwrap();
}

#[test]
#[serial]
fn test_with_blocked_closure_form() {
    let registry = SignalRegistry::global();
    let id = usr1();

    let counter = Arc::new(AtomicUsize::new(0));
    registry.set_one(id, counting_reaction(&counter)).unwrap();

    with_blocked(&[id], || {
        raise(OsSignal::SIGUSR1).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    })
    .unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    registry.set_one(id, Reaction::Default).unwrap();
}

#[test]
#[serial]
fn test_nested_masks_unblock_only_on_outermost_exit() {
    let registry = SignalRegistry::global();
    let id = usr1();

    let counter = Arc::new(AtomicUsize::new(0));
    registry.set_one(id, counting_reaction(&counter)).unwrap();

    let outer = MaskGuard::enter(&[id]).unwrap();
    let inner = MaskGuard::enter(&[id]).unwrap();

    raise(OsSignal::SIGUSR1).unwrap();
    inner.exit().unwrap();
    // The outer frame still owns the mask.
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    outer.exit().unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    registry.set_one(id, Reaction::Default).unwrap();
}

#[test]
#[serial]
fn test_masking_uncatchable_is_refused() {
    let kill = capability::resolve("SIGKILL").unwrap();
    assert!(matches!(
        MaskGuard::enter(&[kill]),
        Err(SignalError::Uncatchable(_))
    ));
}
