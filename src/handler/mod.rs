/*!
 * Handler Module
 * Callback chains attached to signal ids
 */

mod chain;

pub use chain::{ChainEntry, ChainPosition, HandlerChain, HandlerFn, HandlerToken};
