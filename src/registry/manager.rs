/*!
 * Signal Registry
 * Process-wide single source of truth for signal dispositions
 */

use crate::capability;
use crate::core::atomic_stats;
use crate::core::traits::{DispositionStore, HandlerChaining, MaskBookkeeping};
use crate::core::types::{Reaction, SigId, SignalError, SignalResult, SignalStats};
use crate::handler::{ChainPosition, HandlerChain, HandlerFn, HandlerToken};
use crate::platform::{self, OsDisposition};
use crate::registry::slots;
use ahash::RandomState;
use dashmap::DashMap;
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::OnceLock;

/// One bookkeeping row per referenced signal id
///
/// Rows are created lazily on first reference and live for the process
/// lifetime. The generation counter increments on every mutation and lets a
/// scope detect that somebody else touched the id while it was overridden.
struct RegistryEntry {
    reaction: Reaction,
    generation: u64,
}

impl Default for RegistryEntry {
    fn default() -> Self {
        Self {
            reaction: Reaction::Default,
            generation: 0,
        }
    }
}

/// Process-wide disposition registry
///
/// OS signal dispositions are per-process state, so there is exactly one
/// registry per process, reached through [`SignalRegistry::global`]. Every
/// mutation funnels through it; the delivery trampoline reads only the
/// lock-free slots it publishes.
pub struct SignalRegistry {
    entries: DashMap<SigId, RegistryEntry, RandomState>,
    blocked: RwLock<HashSet<SigId>>,
}

static GLOBAL: OnceLock<SignalRegistry> = OnceLock::new();

impl SignalRegistry {
    fn new() -> Self {
        info!("Signal registry initialized");
        Self {
            entries: DashMap::with_hasher(RandomState::new()),
            blocked: RwLock::new(HashSet::new()),
        }
    }

    /// The process-wide registry instance
    pub fn global() -> &'static SignalRegistry {
        GLOBAL.get_or_init(SignalRegistry::new)
    }

    /// Get signal statistics
    pub fn stats(&self) -> SignalStats {
        atomic_stats::global().snapshot()
    }

    /// Swap one id's disposition, returning the previous reaction and the
    /// generation before the swap
    ///
    /// The id's delivery is deferred for the duration of the swap: an arrival
    /// in the middle is queued by the OS and released against the new
    /// reaction once the mask is restored.
    fn apply(
        &self,
        id: SigId,
        reaction: Reaction,
        generation: Option<u64>,
    ) -> SignalResult<(Reaction, u64)> {
        capability::ensure_known(id)?;
        if !capability::can_catch(id) {
            return Err(SignalError::Uncatchable(id));
        }

        let previous_mask = platform::block(&[id])?;
        let swapped = self.swap_locked(id, reaction, generation);
        let unmasked = platform::restore_mask(&previous_mask);
        let value = swapped?;
        unmasked?;
        Ok(value)
    }

    fn swap_locked(
        &self,
        id: SigId,
        reaction: Reaction,
        generation: Option<u64>,
    ) -> SignalResult<(Reaction, u64)> {
        let mut entry = self.entries.entry(id).or_default();

        // The slot is published before the OS-level swap so the trampoline
        // can never observe a caught signal without a chain behind it.
        let installed = match &reaction {
            Reaction::Callback(chain) => {
                slots::publish(id, Some(chain.clone()));
                platform::install(id, OsDisposition::Catch)
            }
            Reaction::Ignore => {
                let result = platform::install(id, OsDisposition::Ignore);
                if result.is_ok() {
                    slots::publish(id, None);
                }
                result
            }
            Reaction::Default => {
                let result = platform::install(id, OsDisposition::Default);
                if result.is_ok() {
                    slots::publish(id, None);
                }
                result
            }
        };
        if let Err(e) = installed {
            // Re-publish the slot for the reaction that is still installed.
            slots::publish(id, entry.reaction.chain().cloned());
            return Err(e);
        }

        let before = entry.generation;
        entry.generation = generation.unwrap_or(before + 1);
        let previous = std::mem::replace(&mut entry.reaction, reaction);
        debug!(
            "Swapped disposition of {} to {:?} (generation {})",
            id,
            entry.reaction.kind(),
            entry.generation
        );
        Ok((previous, before))
    }

    /// Restore a scope's saved disposition, forcing it even over a foreign
    /// update (last exit wins); returns whether such a conflict was detected
    pub(crate) fn restore_one(
        &self,
        id: SigId,
        reaction: Reaction,
        expected_generation: u64,
        rollback_generation: u64,
    ) -> SignalResult<bool> {
        let (_previous, before) = self.apply(id, reaction, Some(rollback_generation))?;
        let conflict = before != expected_generation;
        if conflict {
            warn!(
                "Restoring {} over a foreign update (generation {} != saved {}); last exit wins",
                id, before, expected_generation
            );
            atomic_stats::global().inc_override_conflicts();
        }
        Ok(conflict)
    }

    /// Record ids entering the blocked set
    pub(crate) fn note_blocked(&self, ids: &[SigId]) {
        let mut blocked = self.blocked.write();
        for &id in ids {
            blocked.insert(id);
        }
    }

    /// Record ids leaving the blocked set
    pub(crate) fn note_unblocked(&self, ids: &[SigId]) {
        let mut blocked = self.blocked.write();
        for id in ids {
            blocked.remove(id);
        }
    }
}

impl DispositionStore for SignalRegistry {
    fn set(&self, ids: &[SigId], reaction: Reaction) -> SignalResult<Vec<(SigId, Reaction)>> {
        let mut previous = Vec::with_capacity(ids.len());
        for &id in ids {
            previous.push((id, self.set_one(id, reaction.clone())?));
        }
        Ok(previous)
    }

    fn set_one(&self, id: SigId, reaction: Reaction) -> SignalResult<Reaction> {
        let kind = reaction.kind();
        let (previous, _) = self.apply(id, reaction, None)?;
        info!("Set disposition of {} to {:?}", id, kind);
        Ok(previous)
    }

    fn get(&self, id: SigId) -> Reaction {
        self.entries
            .get(&id)
            .map(|entry| entry.reaction.clone())
            .unwrap_or(Reaction::Default)
    }

    fn generation(&self, id: SigId) -> u64 {
        self.entries
            .get(&id)
            .map(|entry| entry.generation)
            .unwrap_or(0)
    }

    fn reset_all(&self) -> SignalResult<usize> {
        let mut count = 0;
        for id in capability::all() {
            if !capability::can_catch(id) {
                continue;
            }
            match self.set_one(id, Reaction::Default) {
                Ok(_) => count += 1,
                // Uncatchable-in-practice ids surface here on some platforms
                Err(e) => debug!("Could not reset {}: {}", id, e),
            }
        }
        atomic_stats::global().inc_resets();
        info!("Reset {} signal dispositions to default", count);
        Ok(count)
    }
}

impl HandlerChaining for SignalRegistry {
    fn chain(
        &self,
        id: SigId,
        position: ChainPosition,
        func: HandlerFn,
    ) -> SignalResult<HandlerToken> {
        let (next, token) = match self.get(id) {
            Reaction::Callback(mut chain) => {
                let token = chain.insert(position, func);
                (chain, token)
            }
            // Chaining onto Default/Ignore starts a fresh single-entry chain.
            Reaction::Default | Reaction::Ignore => HandlerChain::single(func),
        };
        self.apply(id, Reaction::Callback(next), None)?;
        info!("Chained handler {:?} to {} ({:?})", token, id, position);
        Ok(token)
    }

    fn unchain(&self, id: SigId, token: HandlerToken) -> SignalResult<bool> {
        let Reaction::Callback(mut chain) = self.get(id) else {
            return Ok(false);
        };
        if !chain.remove(token) {
            return Ok(false);
        }
        let next = if chain.is_empty() {
            // Removing the last entry degrades the signal to Default.
            Reaction::Default
        } else {
            Reaction::Callback(chain)
        };
        self.apply(id, next, None)?;
        info!("Removed handler {:?} from {}", token, id);
        Ok(true)
    }
}

impl MaskBookkeeping for SignalRegistry {
    fn is_blocked(&self, id: SigId) -> bool {
        self.blocked.read().contains(&id)
    }

    fn blocked_set(&self) -> Vec<SigId> {
        self.blocked.read().iter().copied().collect()
    }
}
