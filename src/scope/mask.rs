/*!
 * Block/Mask Controller
 * Scoped suspension of signal delivery with deferred, not lost, arrivals
 */

use crate::capability;
use crate::core::types::{SigId, SignalError, SignalResult};
use crate::platform;
use crate::registry::SignalRegistry;
use log::{debug, warn};

/// Scoped delivery suspension
///
/// While the guard lives, the covered signals are masked on the calling
/// thread: arrivals are queued by the OS instead of delivered. Exiting the
/// scope unmasks only the ids this frame actually added and releases
/// anything pending against whatever reaction is installed *at that moment*.
/// Standard signals coalesce — N identical arrivals while masked deliver as
/// one — which is the platform contract, deliberately left untouched.
pub struct MaskGuard {
    registry: &'static SignalRegistry,
    newly_blocked: Vec<SigId>,
    released: bool,
}

impl MaskGuard {
    /// Suspend delivery of `ids`
    pub fn enter(ids: &[SigId]) -> SignalResult<Self> {
        let registry = SignalRegistry::global();
        for &id in ids {
            capability::ensure_known(id)?;
            if !capability::can_catch(id) {
                return Err(SignalError::Uncatchable(id));
            }
        }

        let previous_mask = platform::block(ids)?;
        // Nested scopes over the same id: only the frame that actually added
        // an id to the mask unblocks it on exit.
        let newly_blocked: Vec<SigId> = ids
            .iter()
            .copied()
            .filter(|&id| !platform::mask_contains(&previous_mask, id))
            .collect();
        registry.note_blocked(&newly_blocked);
        debug!("Blocking delivery of {} signal(s)", ids.len());

        Ok(Self {
            registry,
            newly_blocked,
            released: false,
        })
    }

    /// Lift the suspension now instead of waiting for drop
    ///
    /// Pending arrivals are delivered during this call, coalesced, using the
    /// currently installed reaction.
    pub fn exit(mut self) -> SignalResult<()> {
        self.release()
    }

    fn release(&mut self) -> SignalResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        // Mirror first: handlers running during the unblock observe the ids
        // as no longer blocked.
        self.registry.note_unblocked(&self.newly_blocked);
        debug!("Unblocking {} signal(s)", self.newly_blocked.len());
        platform::unblock(&self.newly_blocked)
    }
}

impl Drop for MaskGuard {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to unblock signals on scope exit: {}", e);
        }
    }
}

/// Run `body` with delivery of `ids` suspended
///
/// The mask is lifted whether `body` returns or panics.
pub fn with_blocked<T, F>(ids: &[SigId], body: F) -> SignalResult<T>
where
    F: FnOnce() -> T,
{
    let guard = MaskGuard::enter(ids)?;
    let value = body();
    guard.exit()?;
    Ok(value)
}
