/*!
 * Convenience API
 * Free functions over the process-wide registry, plus the shutdown and
 * terminal presets
 */

use crate::bridge;
use crate::capability::{self, SigQuery};
use crate::core::traits::{DispositionStore, HandlerChaining};
use crate::core::types::{Reaction, SigId, SignalResult, SignalStats};
use crate::handler::{ChainPosition, HandlerChain, HandlerFn, HandlerToken};
use crate::platform;
use crate::registry::SignalRegistry;
use crate::scope;
use log::{info, warn};
use std::sync::Arc;

/// Check if a signal exists on this system by name or number
pub fn has_sig<'a, Q: Into<SigQuery<'a>>>(query: Q) -> bool {
    capability::exists(query)
}

/// Set the reaction for one or more signals, returning the previous
/// reaction per id
pub fn set_handler(ids: &[SigId], reaction: Reaction) -> SignalResult<Vec<(SigId, Reaction)>> {
    SignalRegistry::global().set(ids, reaction)
}

/// Current reaction for a signal
pub fn get_setting(id: SigId) -> Reaction {
    SignalRegistry::global().get(id)
}

/// Reset every catchable signal to its OS default
pub fn reset_to_defaults() -> SignalResult<usize> {
    SignalRegistry::global().reset_all()
}

/// Add a callback to a signal's handler chain
pub fn chain_handler(
    id: SigId,
    position: ChainPosition,
    func: HandlerFn,
) -> SignalResult<HandlerToken> {
    SignalRegistry::global().chain(id, position, func)
}

/// Remove a chained callback by token
pub fn remove_handler(id: SigId, token: HandlerToken) -> SignalResult<bool> {
    SignalRegistry::global().unchain(id, token)
}

/// Run `body` with a temporary reaction installed, restoring on every exit
pub fn temp_handler<T, F>(ids: &[SigId], reaction: Reaction, body: F) -> SignalResult<T>
where
    F: FnOnce() -> T,
{
    scope::with_override(ids, reaction, body)
}

/// Run `body` with delivery of `ids` suspended; pending arrivals are
/// released on exit
pub fn block_signals<T, F>(ids: &[SigId], body: F) -> SignalResult<T>
where
    F: FnOnce() -> T,
{
    scope::with_blocked(ids, body)
}

/// Register an event-loop callback for one or more signals
pub fn async_handler<F>(ids: &[SigId], callback: F) -> SignalResult<()>
where
    F: Fn(SigId) + Send + Sync + 'static,
{
    bridge::register(ids, callback)
}

/// Signal statistics snapshot
pub fn stats() -> SignalStats {
    SignalRegistry::global().stats()
}

/// Install `callback` across every catchable terminating-by-default signal
///
/// When one of those signals arrives, the callback runs once and the signal
/// is then handed back to the OS default action, so the process exits with
/// the conventional `128 + signo` status through the OS's own mechanism.
/// Returns the ids that were covered.
pub fn graceful_shutdown<F>(callback: F) -> SignalResult<Vec<SigId>>
where
    F: Fn() + Send + Sync + 'static,
{
    let callback = Arc::new(callback);
    let registry = SignalRegistry::global();
    let mut installed = Vec::new();

    for id in capability::terminating_by_default() {
        if !capability::can_catch(id) {
            continue;
        }
        let callback = Arc::clone(&callback);
        let (chain, _token) = HandlerChain::single(Arc::new(move |sig: SigId| {
            warn!("Received terminating signal {}. Initiating shutdown.", sig);
            callback();
            // Hand the signal back to the OS: the id is masked during its
            // own handler, so the re-raise lands right after the restore.
            SignalRegistry::global().set_one(sig, Reaction::Default)?;
            platform::raise(sig)
        }));
        registry.set_one(id, Reaction::Callback(chain))?;
        installed.push(id);
    }

    info!(
        "Registered graceful shutdown across {} terminating signal(s)",
        installed.len()
    );
    Ok(installed)
}

/// Ignore every signal tied to the controlling terminal
///
/// Returns the ids that were set to `Ignore`.
pub fn ignore_terminal_signals() -> SignalResult<Vec<SigId>> {
    let ids = capability::terminal_related();
    SignalRegistry::global().set(&ids, Reaction::Ignore)?;
    info!(
        "Ignoring terminal signals: {:?}",
        ids.iter().map(|id| id.name()).collect::<Vec<_>>()
    );
    Ok(ids)
}
