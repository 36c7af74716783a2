// microledger - peer-to-peer micro-ledger sync core
//
// Layers, bottom-up:
// - identity:  opaque peer identifiers
// - clock:     Lamport logical clock
// - admission: proof-of-work puzzle gating every transaction
// - ledger:    transactions and the balances they move
// - audit:     append-only log and its Merkle root
// - sync:      wire protocol, peer snapshot and the relay controller
// - transport: the networking seam, plus an in-process hub
// - node:      tokio event loop tying a controller to a transport

pub mod admission;
pub mod audit;
pub mod clock;
pub mod config;
pub mod identity;
pub mod ledger;
pub mod node;
pub mod sync;
pub mod transport;

pub use config::{ConfigError, NodeConfig};
pub use identity::PeerId;
pub use node::{Node, NodeError, NodeHandle, NodeSnapshot};
