// Node Configuration - tunables for one peer process
//
// Builder-style like the rest of the crate. The defaults leave dedup off and
// allow overdrafts, so a relayed transaction is applied every time it arrives.

use crate::admission::MAX_DIFFICULTY;
use crate::ledger::OverdraftPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Difficulty {0} exceeds the digest length")]
    DifficultyTooHigh(u32),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Configuration for a peer node
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Leading hex zeros required on admission proofs
    pub difficulty: u32,
    /// Balance credited to peers the ledger has never seen
    pub initial_balance: i64,
    /// Clock-sync timer period while synchronizing
    pub sync_interval_ms: u64,
    /// Give up on a puzzle after this long
    pub solve_timeout_ms: u64,
    /// Drop transactions that carry no proof
    pub require_proof: bool,
    /// Require the proof challenge to equal the transaction digest
    pub bind_challenge: bool,
    /// Drop transactions whose digest was already seen
    pub dedup: bool,
    /// How long the dedup cache remembers a digest
    pub seen_ttl_secs: u64,
    /// Maximum digests in the dedup cache
    pub max_seen: usize,
    /// What to do when a debit exceeds the sender's balance
    pub overdraft: OverdraftPolicy,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            difficulty: 2,
            initial_balance: 100,
            sync_interval_ms: 5_000,
            solve_timeout_ms: 30_000,
            require_proof: true,
            bind_challenge: true,
            dedup: false,
            seen_ttl_secs: 300,
            max_seen: 10_000,
            overdraft: OverdraftPolicy::Allow,
        }
    }
}

impl NodeConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set puzzle difficulty
    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Set the initial grant
    pub fn with_initial_balance(mut self, balance: i64) -> Self {
        self.initial_balance = balance;
        self
    }

    /// Set the clock-sync timer period
    pub fn with_sync_interval_ms(mut self, ms: u64) -> Self {
        self.sync_interval_ms = ms;
        self
    }

    /// Set the puzzle timeout
    pub fn with_solve_timeout_ms(mut self, ms: u64) -> Self {
        self.solve_timeout_ms = ms;
        self
    }

    /// Require a proof on every transaction
    pub fn with_require_proof(mut self, require: bool) -> Self {
        self.require_proof = require;
        self
    }

    /// Require proofs to commit to their transaction
    pub fn with_bind_challenge(mut self, bind: bool) -> Self {
        self.bind_challenge = bind;
        self
    }

    /// Enable or disable the dedup cache
    pub fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    /// Set dedup cache TTL
    pub fn with_seen_ttl_secs(mut self, secs: u64) -> Self {
        self.seen_ttl_secs = secs;
        self
    }

    /// Set dedup cache capacity
    pub fn with_max_seen(mut self, max: usize) -> Self {
        self.max_seen = max;
        self
    }

    /// Set the overdraft policy
    pub fn with_overdraft(mut self, policy: OverdraftPolicy) -> Self {
        self.overdraft = policy;
        self
    }

    /// Timer period as a Duration
    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    /// Puzzle timeout as a Duration
    pub fn solve_timeout(&self) -> Duration {
        Duration::from_millis(self.solve_timeout_ms)
    }

    /// Dedup TTL as a Duration
    pub fn seen_ttl(&self) -> Duration {
        Duration::from_secs(self.seen_ttl_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(ConfigError::DifficultyTooHigh(self.difficulty));
        }
        if self.sync_interval_ms == 0 {
            return Err(ConfigError::Invalid("sync_interval_ms cannot be 0".to_string()));
        }
        if self.solve_timeout_ms == 0 {
            return Err(ConfigError::Invalid("solve_timeout_ms cannot be 0".to_string()));
        }
        if self.dedup && self.max_seen == 0 {
            return Err(ConfigError::Invalid(
                "max_seen cannot be 0 when dedup is enabled".to_string(),
            ));
        }
        Ok(())
    }
}
