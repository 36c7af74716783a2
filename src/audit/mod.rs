// Audit module - WHAT WE SAW
// Append-only transaction log and the Merkle root computed over it

mod log;
mod merkle;

pub use log::TransactionLog;
pub use merkle::{hash_pair, merkle_root, MerkleNode, MerkleTree, EMPTY_ROOT};
