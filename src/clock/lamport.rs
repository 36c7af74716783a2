// Lamport Clock - causal ordering without synchronized wall clocks

use serde::{Deserialize, Serialize};

/// A per-peer logical counter.
///
/// Starts at 0 and never decreases. Every observed remote value ends up
/// strictly below the local value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LamportClock {
    value: u64,
}

impl LamportClock {
    /// Create a clock at 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a local event
    pub fn tick(&mut self) -> u64 {
        self.value = self.value.saturating_add(1);
        self.value
    }

    /// Merge a remote clock value: `max(local, remote) + 1`
    pub fn observe(&mut self, remote: u64) -> u64 {
        self.value = self.value.max(remote).saturating_add(1);
        self.value
    }

    /// Current value, no side effect
    pub fn current(&self) -> u64 {
        self.value
    }

    /// True until anything has happened
    pub fn is_initial(&self) -> bool {
        self.value == 0
    }
}
