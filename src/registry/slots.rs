/*!
 * Delivery Slots
 * Lock-free per-signal reaction snapshots consumed by the OS trampoline
 *
 * The trampoline is the single piece of code the OS invokes at delivery
 * time. It may run between any two program steps, so it restricts itself to
 * one RCU-style pointer load plus the chain body; it never touches locks or
 * the bookkeeping map.
 */

use crate::core::atomic_stats;
use crate::core::types::SigId;
use crate::handler::HandlerChain;
use arc_swap::ArcSwapOption;
use libc::c_int;
use log::error;
use std::sync::Arc;

/// Upper bound on platform signal numbers tracked by the slot table
pub(crate) const MAX_SIGNAL: usize = 64;

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_SLOT: ArcSwapOption<HandlerChain> = ArcSwapOption::const_empty();

static SLOTS: [ArcSwapOption<HandlerChain>; MAX_SIGNAL] = [EMPTY_SLOT; MAX_SIGNAL];

/// Publish the chain the trampoline should run for `id`
///
/// `None` clears the slot; used when the id moves to `Default`/`Ignore` and
/// the OS handles delivery without re-entering the crate.
pub(crate) fn publish(id: SigId, chain: Option<HandlerChain>) {
    if let Some(slot) = usize::try_from(id.number())
        .ok()
        .and_then(|n| SLOTS.get(n))
    {
        slot.store(chain.map(Arc::new));
    }
}

/// OS-facing entry point for every caught signal
///
/// Installed via sigaction for any id whose reaction is `Callback`. A slot
/// that is empty by the time the signal lands means the disposition was
/// swapped concurrently; the arrival is dropped here because the new
/// registration already owns it.
pub(crate) extern "C" fn trampoline(signo: c_int) {
    let Some(chain) = usize::try_from(signo)
        .ok()
        .and_then(|n| SLOTS.get(n))
        .and_then(|slot| slot.load_full())
    else {
        return;
    };
    deliver(SigId::from_raw(signo), &chain);
}

/// Run one delivery through a chain, reporting failures without dropping them
fn deliver(id: SigId, chain: &HandlerChain) {
    let failures = chain.run(id);
    atomic_stats::global().inc_delivered();
    if !failures.is_empty() {
        atomic_stats::global().inc_chain_failures(failures.len() as u64);
        for (token, err) in failures {
            error!("Chain entry {:?} for {} failed: {}", token, id, err);
        }
    }
}
