// Transport module - THE WIRE (abstract)
// The collaborator seam plus an in-process hub for simulation and tests

mod memory;
mod traits;

pub use memory::{MemoryHub, MemoryTransport};
pub use traits::{Envelope, Transport, TransportError};
