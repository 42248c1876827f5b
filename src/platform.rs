/*!
 * OS Delivery Interface
 * The only calls the crate makes into the operating environment: disposition
 * installation, thread signal-mask updates, the one-shot alarm, and raise
 */

use crate::core::types::{SigId, SignalError, SignalResult};
use nix::sys::signal::{
    self, pthread_sigmask, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal,
};

/// OS-level registration for one signal id
pub(crate) enum OsDisposition {
    Default,
    Ignore,
    Catch,
}

fn os_signal(id: SigId) -> SignalResult<Signal> {
    Signal::try_from(id.number())
        .map_err(|e| SignalError::OperationFailed(format!("signal {} is not usable: {}", id, e)))
}

fn sigset_of(ids: &[SigId]) -> SignalResult<SigSet> {
    let mut set = SigSet::empty();
    for &id in ids {
        set.add(os_signal(id)?);
    }
    Ok(set)
}

/// Install the OS-level disposition for one signal id
///
/// `SA_RESTART` is deliberately left out: a caught signal must interrupt
/// blocking calls so deadline expiry is observed promptly.
pub(crate) fn install(id: SigId, disposition: OsDisposition) -> SignalResult<()> {
    let handler = match disposition {
        OsDisposition::Default => SigHandler::SigDfl,
        OsDisposition::Ignore => SigHandler::SigIgn,
        OsDisposition::Catch => SigHandler::Handler(crate::registry::slots::trampoline),
    };
    let action = SigAction::new(handler, SaFlags::empty(), SigSet::empty());
    unsafe { signal::sigaction(os_signal(id)?, &action) }
        .map(|_| ())
        .map_err(|e| SignalError::OperationFailed(format!("sigaction({}) failed: {}", id, e)))
}

/// Block delivery of `ids` on the calling thread, returning the prior mask
pub(crate) fn block(ids: &[SigId]) -> SignalResult<SigSet> {
    let set = sigset_of(ids)?;
    let mut previous = SigSet::empty();
    pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&set), Some(&mut previous))
        .map_err(|e| SignalError::OperationFailed(format!("sigmask block failed: {}", e)))?;
    Ok(previous)
}

/// Restore a mask previously returned by [`block`]
pub(crate) fn restore_mask(previous: &SigSet) -> SignalResult<()> {
    pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(previous), None)
        .map_err(|e| SignalError::OperationFailed(format!("sigmask restore failed: {}", e)))
}

/// Unblock delivery of `ids`; anything pending is delivered during this call
pub(crate) fn unblock(ids: &[SigId]) -> SignalResult<()> {
    let set = sigset_of(ids)?;
    pthread_sigmask(SigmaskHow::SIG_UNBLOCK, Some(&set), None)
        .map_err(|e| SignalError::OperationFailed(format!("sigmask unblock failed: {}", e)))
}

/// Check whether an id was already blocked in a saved mask
pub(crate) fn mask_contains(mask: &SigSet, id: SigId) -> bool {
    os_signal(id).map(|s| mask.contains(s)).unwrap_or(false)
}

/// Arm the singular one-shot process alarm
pub(crate) fn alarm_after(seconds: u32) {
    let _ = nix::unistd::alarm::set(seconds);
}

/// Disarm the process alarm
pub(crate) fn alarm_cancel() {
    let _ = nix::unistd::alarm::cancel();
}

/// Send a signal to the calling thread
pub(crate) fn raise(id: SigId) -> SignalResult<()> {
    signal::raise(os_signal(id)?)
        .map_err(|e| SignalError::OperationFailed(format!("raise({}) failed: {}", id, e)))
}
