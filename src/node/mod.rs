// Node module - ONE PEER, RUNNING
// Async event loop that drives a RelayController over a Transport

mod handle;
mod runtime;

pub use handle::{NodeError, NodeHandle, NodeSnapshot, SubmitOutcome};
pub use runtime::{Node, EVENT_QUEUE_SIZE};
