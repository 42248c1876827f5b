/*!
 * Scoped Overrides
 * Swap dispositions now, restore them on every exit path
 */

use crate::core::traits::DispositionStore;
use crate::core::types::{Reaction, SigId, SignalResult};
use crate::registry::SignalRegistry;
use log::{debug, warn};

/// Snapshot of one id taken at scope entry
///
/// `at_entry` is the generation before this scope's install, `installed` the
/// generation right after it. On restore, a current generation other than
/// `installed` means a foreign actor mutated the id inside the scope; the
/// saved value is forced anyway and the row's generation rolls back to
/// `at_entry`, which is what keeps well-nested scopes conflict-free.
struct SavedDisposition {
    id: SigId,
    previous: Reaction,
    at_entry: u64,
    installed: u64,
}

/// Scoped disposition override with guaranteed restoration
///
/// Restoration runs exactly once, on explicit [`exit`](OverrideGuard::exit)
/// or on drop — including a drop driven by panic unwinding — so the
/// registry returns to its snapshot on every control-flow exit. Nested
/// guards over the same id restore in strict LIFO order.
pub struct OverrideGuard {
    registry: &'static SignalRegistry,
    saved: Vec<SavedDisposition>,
    restored: bool,
}

impl OverrideGuard {
    /// Install `reaction` for every id, capturing what to restore
    ///
    /// If any id refuses the override, the ids already swapped are restored
    /// before the error surfaces.
    pub fn enter(ids: &[SigId], reaction: Reaction) -> SignalResult<Self> {
        let registry = SignalRegistry::global();
        let mut saved: Vec<SavedDisposition> = Vec::with_capacity(ids.len());
        for &id in ids {
            let at_entry = registry.generation(id);
            match registry.set_one(id, reaction.clone()) {
                Ok(previous) => saved.push(SavedDisposition {
                    id,
                    previous,
                    at_entry,
                    installed: registry.generation(id),
                }),
                Err(e) => {
                    Self::restore_frames(registry, &mut saved);
                    return Err(e);
                }
            }
        }
        debug!("Entered override scope covering {} signal(s)", saved.len());
        Ok(Self {
            registry,
            saved,
            restored: false,
        })
    }

    /// Restore the snapshot now instead of waiting for drop
    pub fn exit(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;
        Self::restore_frames(self.registry, &mut self.saved);
        debug!("Exited override scope");
    }

    fn restore_frames(registry: &SignalRegistry, saved: &mut Vec<SavedDisposition>) {
        for frame in saved.drain(..).rev() {
            // Conflicts are reported inside restore_one; a failed restore is
            // reported here but never stops the remaining frames.
            if let Err(e) =
                registry.restore_one(frame.id, frame.previous, frame.installed, frame.at_entry)
            {
                warn!("Failed to restore disposition of {}: {}", frame.id, e);
            }
        }
    }
}

impl Drop for OverrideGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Run `body` with `reaction` temporarily installed for `ids`
///
/// The previous dispositions are restored whether `body` returns or panics.
pub fn with_override<T, F>(ids: &[SigId], reaction: Reaction, body: F) -> SignalResult<T>
where
    F: FnOnce() -> T,
{
    let guard = OverrideGuard::enter(ids, reaction)?;
    let value = body();
    guard.exit();
    Ok(value)
}
