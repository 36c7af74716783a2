// Merkle Auditor - tamper-evident digest over the transaction log
//
// The tree is split by count at floor(n/2), so its shape depends only on the
// log length. The root therefore reflects local arrival order: two peers
// holding the same digests in a different order get different roots.
//
// Trees are rebuilt on demand from an index range of the log and dropped as
// soon as the root is read.

use sha2::{Digest, Sha256};

/// Root of an empty log: hex SHA-256 of the empty string
pub const EMPTY_ROOT: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// A node in an ephemeral Merkle tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MerkleNode {
    Leaf {
        digest: String,
    },
    Branch {
        digest: String,
        left: Box<MerkleNode>,
        right: Box<MerkleNode>,
    },
}

impl MerkleNode {
    /// Digest held by this node
    pub fn digest(&self) -> &str {
        match self {
            MerkleNode::Leaf { digest } | MerkleNode::Branch { digest, .. } => digest,
        }
    }

    /// Longest path from this node to a leaf (a leaf has depth 0)
    pub fn depth(&self) -> usize {
        match self {
            MerkleNode::Leaf { .. } => 0,
            MerkleNode::Branch { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// Number of leaves under this node
    pub fn leaf_count(&self) -> usize {
        match self {
            MerkleNode::Leaf { .. } => 1,
            MerkleNode::Branch { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }

    /// Consume the tree and keep only the root digest
    pub fn into_digest(self) -> String {
        match self {
            MerkleNode::Leaf { digest } | MerkleNode::Branch { digest, .. } => digest,
        }
    }
}

/// Hash two child digests concatenated as text
pub fn hash_pair(left: &str, right: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    hex::encode(hasher.finalize())
}

/// Builder for count-split Merkle trees
pub struct MerkleTree;

impl MerkleTree {
    /// Build a tree over the ordered entries; `None` when empty
    pub fn build(entries: &[String]) -> Option<MerkleNode> {
        if entries.is_empty() {
            return None;
        }
        Some(Self::build_range(entries, 0, entries.len()))
    }

    // Caller guarantees start < end
    fn build_range(entries: &[String], start: usize, end: usize) -> MerkleNode {
        let count = end - start;
        if count == 1 {
            return MerkleNode::Leaf {
                digest: entries[start].clone(),
            };
        }

        let mid = start + count / 2;
        let left = Self::build_range(entries, start, mid);
        let right = Self::build_range(entries, mid, end);
        let digest = hash_pair(left.digest(), right.digest());

        MerkleNode::Branch {
            digest,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

/// Root digest over the ordered entries, [`EMPTY_ROOT`] when empty
pub fn merkle_root(entries: &[String]) -> String {
    MerkleTree::build(entries)
        .map(MerkleNode::into_digest)
        .unwrap_or_else(|| EMPTY_ROOT.to_string())
}
