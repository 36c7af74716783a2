// Transaction Log - append-only record of accepted transaction digests
//
// Insertion order is arrival order at this peer, not a global order.

use crate::audit::merkle::merkle_root;

/// Ordered, append-only sequence of transaction digests
#[derive(Clone, Debug, Default)]
pub struct TransactionLog {
    entries: Vec<String>,
}

impl TransactionLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a digest
    pub fn record(&mut self, digest: impl Into<String>) {
        self.entries.push(digest.into());
    }

    /// Rebuild the Merkle tree and return its root
    pub fn root(&self) -> String {
        merkle_root(&self.entries)
    }

    /// All digests in arrival order
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Check if a digest was recorded
    pub fn contains(&self, digest: &str) -> bool {
        self.entries.iter().any(|d| d == digest)
    }

    /// Most recent digest
    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    /// Number of recorded digests
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
