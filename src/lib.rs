/*!
 * sigctl
 * Structured management of OS signal dispositions for a single process:
 * a process-wide registry, ordered handler chains, scoped overrides with
 * guaranteed restoration, alarm-backed deadlines, delivery masking, and a
 * bridge that hands arrivals to a running task scheduler.
 *
 * Unix-only: the crate talks to the OS through sigaction, the thread signal
 * mask and the process alarm, and nothing else.
 */

pub mod api;
pub mod bridge;
pub mod capability;
pub mod core;
pub mod handler;
mod platform;
pub mod registry;
pub mod scope;

// Re-export public API
pub use api::{
    async_handler, block_signals, chain_handler, get_setting, graceful_shutdown, has_sig,
    ignore_terminal_signals, remove_handler, reset_to_defaults, set_handler, stats, temp_handler,
};
pub use bridge::BridgeCallback;
pub use capability::SigQuery;
pub use crate::core::traits::*;
pub use crate::core::types::{Reaction, ReactionKind, SigId, SignalError, SignalResult, SignalStats};
pub use handler::{ChainPosition, HandlerChain, HandlerFn, HandlerToken};
pub use registry::SignalRegistry;
pub use scope::{
    with_blocked, with_override, with_timeout, with_timeout_message, DeadlineGuard, MaskGuard,
    OverrideGuard,
};
