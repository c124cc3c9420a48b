//! Downstream consumer capabilities.
//!
//! Handlers are external collaborators: the core hands each schema-valid
//! record to every registered handler, in registration order, and otherwise
//! stays out of their way. Backpressure is the handler's own problem.

use serde_json::Value;

/// A downstream consumer of records.
pub trait RecordHandler {
    /// Handle one schema-valid record. Must return fast enough not to block
    /// the stream; the core does no queuing or dropping on the handler's
    /// behalf.
    fn process_one(&mut self, record: &Value);

    /// Optional liveness capability for handlers backed by their own worker
    /// thread or process. A handler that returns `Some` here is probed
    /// before every delivery; a dead probe aborts the whole session.
    fn liveness(&self) -> Option<&dyn Liveness> {
        None
    }

    /// Short name for the startup summary log.
    fn name(&self) -> &str {
        "handler"
    }
}

/// Liveness probe for handlers with an independent execution context.
pub trait Liveness {
    fn is_alive(&self) -> bool;
}
