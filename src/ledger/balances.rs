// Ledger - who holds how much
//
// Best-effort, eventually-consistent bookkeeping. Every apply is visible to
// the next balance_of; there is no rollback.

use crate::identity::PeerId;
use crate::ledger::transaction::{Transaction, TransactionKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised when applying a transaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Negative amount: {0}")]
    NegativeAmount(i64),

    #[error("Insufficient balance for {peer}: has {balance}, needs {amount}")]
    InsufficientBalance {
        peer: PeerId,
        balance: i64,
        amount: i64,
    },
}

/// What to do with a debit that would push a sender below zero
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverdraftPolicy {
    /// Let balances go negative
    #[default]
    Allow,
    /// Refuse the whole transaction
    Reject,
}

/// Balances after an apply
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBalances {
    pub recipient: (PeerId, i64),
    pub sender: Option<(PeerId, i64)>,
}

/// Mapping of peer to signed balance
#[derive(Clone, Debug)]
pub struct Ledger {
    balances: HashMap<PeerId, i64>,
    initial_balance: i64,
    overdraft: OverdraftPolicy,
}

impl Ledger {
    /// Create an empty ledger; unseen peers start at `initial_balance`
    pub fn new(initial_balance: i64) -> Self {
        Self {
            balances: HashMap::new(),
            initial_balance,
            overdraft: OverdraftPolicy::default(),
        }
    }

    /// Set the overdraft policy
    pub fn with_overdraft_policy(mut self, policy: OverdraftPolicy) -> Self {
        self.overdraft = policy;
        self
    }

    /// Get the overdraft policy
    pub fn overdraft_policy(&self) -> OverdraftPolicy {
        self.overdraft
    }

    /// Get the starting balance for unseen peers
    pub fn initial_balance(&self) -> i64 {
        self.initial_balance
    }

    /// Current balance, or the initial grant if never seen
    pub fn balance_of(&self, peer: &PeerId) -> i64 {
        self.balances
            .get(peer)
            .copied()
            .unwrap_or(self.initial_balance)
    }

    /// Materialize an entry at the initial grant (peer discovery bootstrap)
    pub fn grant(&mut self, peer: &PeerId) -> i64 {
        *self.balances.entry(*peer).or_insert(self.initial_balance)
    }

    /// Apply a transaction's effect
    pub fn apply(&mut self, tx: &Transaction) -> Result<NewBalances, LedgerError> {
        let amount = tx.amount();
        if amount < 0 {
            return Err(LedgerError::NegativeAmount(amount));
        }

        let debited = match (tx.kind(), tx.sender()) {
            (TransactionKind::Transfer, Some(sender)) => Some(*sender),
            _ => None,
        };

        // A self-transfer nets to zero, so it can never overdraw
        if let Some(sender) = debited.filter(|sender| sender != tx.recipient()) {
            let balance = self.balance_of(&sender);
            if self.overdraft == OverdraftPolicy::Reject && balance < amount {
                return Err(LedgerError::InsufficientBalance {
                    peer: sender,
                    balance,
                    amount,
                });
            }
        }

        if let Some(peer) = debited {
            let entry = self.balances.entry(peer).or_insert(self.initial_balance);
            *entry = entry.saturating_sub(amount);
        }

        let recipient = *tx.recipient();
        let entry = self
            .balances
            .entry(recipient)
            .or_insert(self.initial_balance);
        *entry = entry.saturating_add(amount);

        let recipient = (recipient, *entry);

        Ok(NewBalances {
            recipient,
            sender: debited.map(|peer| (peer, self.balance_of(&peer))),
        })
    }

    /// Iterate all materialized entries
    pub fn balances(&self) -> impl Iterator<Item = (&PeerId, &i64)> {
        self.balances.iter()
    }

    /// Number of materialized entries
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    /// Check if no entry has been materialized
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}
