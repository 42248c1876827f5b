/*!
 * Registry Traits
 * Disposition management abstractions
 */

use super::types::{Reaction, SigId, SignalResult};
use crate::handler::{ChainPosition, HandlerFn, HandlerToken};

/// Disposition bookkeeping and OS registration
pub trait DispositionStore: Send + Sync {
    /// Set the reaction for each id, returning the previous reaction per id
    fn set(&self, ids: &[SigId], reaction: Reaction) -> SignalResult<Vec<(SigId, Reaction)>>;

    /// Set the reaction for a single id, returning the previous reaction
    fn set_one(&self, id: SigId, reaction: Reaction) -> SignalResult<Reaction>;

    /// Current reaction for an id (lazily `Default`)
    fn get(&self, id: SigId) -> Reaction;

    /// Mutation counter for an id; increments on every disposition change
    fn generation(&self, id: SigId) -> u64;

    /// Reset every catchable id to `Default`; returns how many were reset
    fn reset_all(&self) -> SignalResult<usize>;
}

/// Callback chain composition on top of the store
pub trait HandlerChaining: Send + Sync {
    /// Add a callback to the id's chain; chaining onto `Default`/`Ignore`
    /// creates a single-entry chain first
    fn chain(
        &self,
        id: SigId,
        position: ChainPosition,
        func: HandlerFn,
    ) -> SignalResult<HandlerToken>;

    /// Remove one chain entry by token; removing the last entry degrades the
    /// id to `Default`. Returns whether an entry was removed.
    fn unchain(&self, id: SigId, token: HandlerToken) -> SignalResult<bool>;
}

/// Queries over the blocked-signal mirror
pub trait MaskBookkeeping: Send + Sync {
    /// Check if delivery of an id is currently suspended
    fn is_blocked(&self, id: SigId) -> bool;

    /// All ids currently in the blocked set
    fn blocked_set(&self) -> Vec<SigId>;
}

/// Combined registry trait
pub trait DispositionRegistry: DispositionStore + HandlerChaining + MaskBookkeeping {}

/// Implement DispositionRegistry for types that implement all required traits
impl<T> DispositionRegistry for T where T: DispositionStore + HandlerChaining + MaskBookkeeping {}
