/*!
 * Disposition Registry Tests
 * Process-wide set/get/reset behavior against real OS dispositions
 */

use nix::sys::signal::{raise, Signal as OsSignal};
use serial_test::serial;
use sigctl::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn usr1() -> SigId {
    capability::resolve("SIGUSR1").unwrap()
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
#[serial]
fn test_get_after_set_default() {
    init_logging();
    let registry = SignalRegistry::global();
    let id = usr1();

    registry.set_one(id, Reaction::Ignore).unwrap();
    registry.set_one(id, Reaction::Default).unwrap();
    assert_eq!(registry.get(id).kind(), ReactionKind::Default);
}

#[test]
#[serial]
fn test_set_returns_previous_reaction() {
    let registry = SignalRegistry::global();
    let id = usr1();
    registry.set_one(id, Reaction::Default).unwrap();

    let previous = registry.set_one(id, Reaction::Ignore).unwrap();
    assert_eq!(previous.kind(), ReactionKind::Default);

    let previous = registry.set_one(id, Reaction::Default).unwrap();
    assert_eq!(previous.kind(), ReactionKind::Ignore);
}

#[test]
#[serial]
fn test_set_many_reports_each_previous() {
    let registry = SignalRegistry::global();
    let ids = [usr1(), capability::resolve("SIGUSR2").unwrap()];
    registry.set(&ids, Reaction::Default).unwrap();

    let previous = registry.set(&ids, Reaction::Ignore).unwrap();
    assert_eq!(previous.len(), 2);
    for (id, reaction) in previous {
        assert!(ids.contains(&id));
        assert_eq!(reaction.kind(), ReactionKind::Default);
    }

    registry.set(&ids, Reaction::Default).unwrap();
}

#[test]
#[serial]
fn test_ignored_signal_is_discarded() {
    let registry = SignalRegistry::global();
    let id = usr1();

    registry.set_one(id, Reaction::Ignore).unwrap();
    // Delivery is discarded by the OS; the process simply survives this.
    raise(OsSignal::SIGUSR1).unwrap();

    registry.set_one(id, Reaction::Default).unwrap();
}

#[test]
#[serial]
fn test_callback_reaction_fires() {
    let registry = SignalRegistry::global();
    let id = usr1();

    let hits = Arc::new(AtomicUsize::new(0));
    let hits_in_chain = Arc::clone(&hits);
    let (chain, _token) = HandlerChain::single(Arc::new(move |_| {
        hits_in_chain.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));
    registry.set_one(id, Reaction::Callback(chain)).unwrap();

    raise(OsSignal::SIGUSR1).unwrap();
    raise(OsSignal::SIGUSR1).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    registry.set_one(id, Reaction::Default).unwrap();
}

#[test]
#[serial]
fn test_uncatchable_signals_are_refused() {
    let registry = SignalRegistry::global();
    let kill = capability::resolve("SIGKILL").unwrap();
    let stop = capability::resolve("SIGSTOP").unwrap();

    assert!(matches!(
        registry.set_one(kill, Reaction::Ignore),
        Err(SignalError::Uncatchable(_))
    ));
    assert!(matches!(
        registry.set_one(stop, Reaction::Ignore),
        Err(SignalError::Uncatchable(_))
    ));
}

#[test]
#[serial]
fn test_generation_increments_on_every_mutation() {
    let registry = SignalRegistry::global();
    let id = usr1();

    let g0 = registry.generation(id);
    registry.set_one(id, Reaction::Ignore).unwrap();
    let g1 = registry.generation(id);
    registry.set_one(id, Reaction::Default).unwrap();
    let g2 = registry.generation(id);

    assert!(g1 > g0);
    assert!(g2 > g1);
}

#[test]
#[serial]
fn test_reset_all_is_idempotent() {
    let registry = SignalRegistry::global();
    let id = usr1();
    registry.set_one(id, Reaction::Ignore).unwrap();

    let first = registry.reset_all().unwrap();
    assert!(first > 0);
    assert_eq!(registry.get(id).kind(), ReactionKind::Default);

    let second = registry.reset_all().unwrap();
    assert_eq!(first, second);
    for checked in capability::all().filter(|s| s.can_catch()) {
        assert_eq!(registry.get(checked).kind(), ReactionKind::Default);
    }
}

#[test]
#[serial]
fn test_stats_track_deliveries() {
    let registry = SignalRegistry::global();
    let id = usr1();

    let (chain, _token) = HandlerChain::single(Arc::new(|_| Ok(())));
    registry.set_one(id, Reaction::Callback(chain)).unwrap();

    let before = registry.stats().signals_delivered;
    raise(OsSignal::SIGUSR1).unwrap();
    assert_eq!(registry.stats().signals_delivered, before + 1);

    registry.set_one(id, Reaction::Default).unwrap();
}
