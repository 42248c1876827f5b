/*!
 * Lock-Free Signal Statistics
 * Atomic counters safe to touch from the delivery context
 */

use super::types::SignalStats;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic signal statistics for lock-free updates
///
/// # Performance
/// - Cache-line aligned to prevent false sharing
/// - All operations use relaxed ordering; atomics are the only primitive the
///   delivery context is allowed to update
#[repr(C, align(64))]
pub struct AtomicSignalStats {
    signals_delivered: AtomicU64,
    chain_failures: AtomicU64,
    bridge_wakeups: AtomicU64,
    override_conflicts: AtomicU64,
    registry_resets: AtomicU64,
}

impl AtomicSignalStats {
    #[inline]
    pub const fn new() -> Self {
        Self {
            signals_delivered: AtomicU64::new(0),
            chain_failures: AtomicU64::new(0),
            bridge_wakeups: AtomicU64::new(0),
            override_conflicts: AtomicU64::new(0),
            registry_resets: AtomicU64::new(0),
        }
    }

    /// Increment delivered count (lock-free)
    ///
    /// # Performance
    /// Hot path - called on every trampoline dispatch
    #[inline(always)]
    pub fn inc_delivered(&self) {
        self.signals_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Add chain-entry failures observed during one delivery (lock-free)
    #[inline(always)]
    pub fn inc_chain_failures(&self, count: u64) {
        self.chain_failures.fetch_add(count, Ordering::Relaxed);
    }

    /// Increment bridge wakeup count (lock-free)
    #[inline(always)]
    pub fn inc_bridge_wakeups(&self) {
        self.bridge_wakeups.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment override restore conflicts (lock-free)
    #[inline(always)]
    pub fn inc_override_conflicts(&self) {
        self.override_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment registry-wide resets (lock-free)
    #[inline(always)]
    pub fn inc_resets(&self) {
        self.registry_resets.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current stats (no locks required)
    ///
    /// # Note
    /// Values may not be perfectly consistent with each other due to
    /// concurrent updates, but each individual value is accurate. This is
    /// acceptable for monitoring.
    #[inline]
    pub fn snapshot(&self) -> SignalStats {
        SignalStats {
            signals_delivered: self.signals_delivered.load(Ordering::Relaxed),
            chain_failures: self.chain_failures.load(Ordering::Relaxed),
            bridge_wakeups: self.bridge_wakeups.load(Ordering::Relaxed),
            override_conflicts: self.override_conflicts.load(Ordering::Relaxed),
            registry_resets: self.registry_resets.load(Ordering::Relaxed),
        }
    }
}

impl Default for AtomicSignalStats {
    fn default() -> Self {
        Self::new()
    }
}

static STATS: AtomicSignalStats = AtomicSignalStats::new();

/// Process-wide stats instance shared by the registry and the trampoline
pub fn global() -> &'static AtomicSignalStats {
    &STATS
}
