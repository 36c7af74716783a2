// Transaction - the balance-affecting value relayed between peers
//
// Immutable once built. Its digest is what the audit log records and what
// a puzzle proof has to commit to.

use crate::identity::PeerId;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors that can occur when building a transaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Missing recipient: recipient peer is required")]
    MissingRecipient,

    #[error("Missing amount: transfer amount is required")]
    MissingAmount,

    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),
}

/// How a transaction moves value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Debit the sender (if any), credit the recipient
    Transfer,
    /// Credit the recipient only (bootstrap grants)
    Mint,
}

impl TransactionKind {
    fn tag(self) -> u8 {
        match self {
            TransactionKind::Transfer => 0,
            TransactionKind::Mint => 1,
        }
    }
}

/// A transfer request
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    amount: i64,
    recipient: PeerId,
    sender: Option<PeerId>,
    kind: TransactionKind,
    nonce: u64,
}

impl Transaction {
    /// Create a transaction from parts
    pub fn new(
        amount: i64,
        recipient: PeerId,
        sender: Option<PeerId>,
        kind: TransactionKind,
        nonce: u64,
    ) -> Self {
        Self {
            amount,
            recipient,
            sender,
            kind,
            nonce,
        }
    }

    /// Get the amount
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Get the recipient
    pub fn recipient(&self) -> &PeerId {
        &self.recipient
    }

    /// Get the sender, if any
    pub fn sender(&self) -> Option<&PeerId> {
        self.sender.as_ref()
    }

    /// Get the kind
    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Get the nonce
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Deterministic byte encoding used for the digest
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(3 + 1 + 8 + 32 + 1 + 32 + 8);
        bytes.extend_from_slice(b"tx:");
        bytes.push(self.kind.tag());
        bytes.extend_from_slice(&self.amount.to_le_bytes());
        bytes.extend_from_slice(self.recipient.as_bytes());
        match &self.sender {
            Some(sender) => {
                bytes.push(1);
                bytes.extend_from_slice(sender.as_bytes());
            }
            None => bytes.push(0),
        }
        bytes.extend_from_slice(&self.nonce.to_le_bytes());
        bytes
    }

    /// Lowercase hex SHA-256 of the canonical bytes
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.canonical_bytes()))
    }

    /// The puzzle challenge a proof for this transaction must use
    pub fn challenge(&self) -> String {
        self.digest()
    }
}

/// Builder for transactions
#[derive(Default)]
pub struct TransactionBuilder {
    amount: Option<i64>,
    recipient: Option<PeerId>,
    sender: Option<PeerId>,
    kind: Option<TransactionKind>,
    nonce: Option<u64>,
}

impl TransactionBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the recipient (required)
    pub fn recipient(mut self, recipient: PeerId) -> Self {
        self.recipient = Some(recipient);
        self
    }

    /// Set the sender (optional)
    pub fn sender(mut self, sender: PeerId) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Set the amount (required)
    pub fn amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Set the kind (defaults to Transfer)
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Set the nonce (optional - random if not provided)
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Build the transaction
    pub fn build(self) -> Result<Transaction, TransactionError> {
        let recipient = self.recipient.ok_or(TransactionError::MissingRecipient)?;
        let amount = self.amount.ok_or(TransactionError::MissingAmount)?;

        if amount < 0 {
            return Err(TransactionError::InvalidAmount(amount));
        }

        let nonce = self.nonce.unwrap_or_else(|| rand::thread_rng().gen());

        Ok(Transaction::new(
            amount,
            recipient,
            self.sender,
            self.kind.unwrap_or(TransactionKind::Transfer),
            nonce,
        ))
    }
}
