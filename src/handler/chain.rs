/*!
 * Handler Chain
 * Ordered callback sequences composed into a single signal reaction
 */

use crate::core::types::{SigId, SignalError, SignalResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Signal handler callback function type
pub type HandlerFn = Arc<dyn Fn(SigId) -> SignalResult<()> + Send + Sync>;

/// Process-unique identity of one chain entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerToken(u64);

/// Placement of a new entry relative to the existing chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainPosition {
    /// Insert at the head; runs first
    Before,
    /// Append at the tail; runs last
    After,
}

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// One callback entry with its identity token
#[derive(Clone)]
pub struct ChainEntry {
    token: HandlerToken,
    func: HandlerFn,
}

impl ChainEntry {
    fn new(func: HandlerFn) -> Self {
        Self {
            token: HandlerToken(NEXT_TOKEN.fetch_add(1, Ordering::SeqCst)),
            func,
        }
    }

    pub fn token(&self) -> HandlerToken {
        self.token
    }
}

impl fmt::Debug for ChainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainEntry")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// Ordered callback sequence behind a `Callback` reaction
///
/// The non-emptiness invariant is owned by the registry: removing the last
/// entry degrades the signal to `Default` instead of keeping an empty chain.
#[derive(Clone)]
pub struct HandlerChain {
    entries: Vec<ChainEntry>,
}

impl HandlerChain {
    /// Build a one-entry chain
    pub fn single(func: HandlerFn) -> (Self, HandlerToken) {
        let entry = ChainEntry::new(func);
        let token = entry.token;
        (
            Self {
                entries: vec![entry],
            },
            token,
        )
    }

    /// Add an entry at the head (`Before`, runs first) or tail (`After`,
    /// runs last)
    pub fn insert(&mut self, position: ChainPosition, func: HandlerFn) -> HandlerToken {
        let entry = ChainEntry::new(func);
        let token = entry.token;
        match position {
            ChainPosition::Before => self.entries.insert(0, entry),
            ChainPosition::After => self.entries.push(entry),
        }
        token
    }

    /// Remove the entry with `token`, keeping the order of the rest
    pub fn remove(&mut self, token: HandlerToken) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.token != token);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry tokens in execution order
    pub fn tokens(&self) -> Vec<HandlerToken> {
        self.entries.iter().map(|entry| entry.token).collect()
    }

    /// Run every entry in order
    ///
    /// A failing entry never prevents the entries after it from running;
    /// failures are collected and handed back for reporting.
    pub fn run(&self, id: SigId) -> Vec<(HandlerToken, SignalError)> {
        let mut failures = Vec::new();
        for entry in &self.entries {
            if let Err(e) = (entry.func)(id) {
                failures.push((entry.token, e));
            }
        }
        failures
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain")
            .field("tokens", &self.tokens())
            .finish()
    }
}
