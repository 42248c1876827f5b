/*!
 * Core Module
 * Shared types, traits and statistics
 */

pub mod atomic_stats;
pub mod traits;
pub mod types;

pub use traits::*;
pub use types::{Reaction, ReactionKind, SigId, SignalError, SignalResult, SignalStats};
