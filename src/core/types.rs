/*!
 * Core Types
 * Signal identifiers, reactions and result types
 */

use crate::capability;
use crate::handler::HandlerChain;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Signal operation result
pub type SignalResult<T> = Result<T, SignalError>;

/// Signal errors
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum SignalError {
    #[error("Unknown signal: {0}")]
    UnknownSignal(String),

    #[error("Signal {0} cannot be caught or blocked")]
    Uncatchable(SigId),

    #[error("A deadline is already armed for this process")]
    DeadlineAlreadyArmed,

    #[error("No task scheduler is running: {0}")]
    BridgeUnavailable(String),

    #[error("Timeout exceeded: {0}")]
    TimeoutExceeded(String),

    #[error("Handler error: {0}")]
    HandlerError(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Opaque platform-scoped signal identifier
///
/// Obtained through [`capability::resolve`](crate::capability::resolve);
/// equality and hashing go by the numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SigId(i32);

impl SigId {
    /// Wrap a raw signal number without consulting the capability table
    pub(crate) const fn from_raw(n: i32) -> Self {
        Self(n)
    }

    /// Get signal number
    pub fn number(&self) -> i32 {
        self.0
    }

    /// Canonical name from the capability table
    pub fn name(&self) -> &'static str {
        capability::name_of(*self).unwrap_or("SIG?")
    }

    /// Check if the platform allows intercepting this signal
    pub fn can_catch(&self) -> bool {
        capability::can_catch(*self)
    }
}

impl fmt::Display for SigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

/// What happens when a signal is delivered
///
/// Exactly one form is active per signal id at any time. A `Callback` chain
/// is never empty: removing the last entry degrades the id to `Default`.
#[derive(Clone)]
pub enum Reaction {
    /// OS default action
    Default,
    /// Delivery discarded by the OS
    Ignore,
    /// Ordered callback chain run at delivery time
    Callback(HandlerChain),
}

impl Reaction {
    /// Discriminant without the chain payload
    pub fn kind(&self) -> ReactionKind {
        match self {
            Reaction::Default => ReactionKind::Default,
            Reaction::Ignore => ReactionKind::Ignore,
            Reaction::Callback(_) => ReactionKind::Callback,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Reaction::Default)
    }

    pub fn is_ignore(&self) -> bool {
        matches!(self, Reaction::Ignore)
    }

    /// The chain behind a `Callback` reaction
    pub fn chain(&self) -> Option<&HandlerChain> {
        match self {
            Reaction::Callback(chain) => Some(chain),
            _ => None,
        }
    }
}

impl fmt::Debug for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reaction::Default => write!(f, "Default"),
            Reaction::Ignore => write!(f, "Ignore"),
            Reaction::Callback(chain) => write!(f, "Callback({} entries)", chain.len()),
        }
    }
}

/// Reaction discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReactionKind {
    Default,
    Ignore,
    Callback,
}

/// Signal statistics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalStats {
    pub signals_delivered: u64,
    pub chain_failures: u64,
    pub bridge_wakeups: u64,
    pub override_conflicts: u64,
    pub registry_resets: u64,
}
