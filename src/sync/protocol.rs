// Protocol - Message types exchanged between peers
//
// - ClockSync: Lamport clock convergence, point-to-point. A request is
//   answered once; a reply is never answered.
// - Transaction: a transfer plus the puzzle proof that admits it
//
// Wire encoding is postcard; framing and authentication belong to the
// transport.

use crate::admission::PuzzleProof;
use crate::ledger::Transaction;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest encoded message we will try to decode
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Kinds of messages in the protocol
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    ClockSync,
    Transaction,
}

/// Protocol errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization failed")]
    DeserializationFailed,

    #[error("Message too large: {0} bytes")]
    MessageTooLarge(usize),
}

/// Wrapper for all message kinds
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    ClockSync(ClockSync),
    Transaction(TransactionMessage),
}

impl Message {
    /// Build a clock-sync request (expects one reply)
    pub fn clock_sync(clock: u64) -> Self {
        Message::ClockSync(ClockSync::request(clock))
    }

    /// Build the answer to a clock-sync request
    pub fn clock_sync_reply(clock: u64) -> Self {
        Message::ClockSync(ClockSync::reply(clock))
    }

    /// Build a transaction message
    pub fn transaction(transaction: Transaction, proof: Option<PuzzleProof>) -> Self {
        Message::Transaction(TransactionMessage::new(transaction, proof))
    }

    /// Get the message type
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::ClockSync(_) => MessageType::ClockSync,
            Message::Transaction(_) => MessageType::Transaction,
        }
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        postcard::to_allocvec(self).map_err(|e| ProtocolError::SerializationFailed(e.to_string()))
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge(bytes.len()));
        }
        postcard::from_bytes(bytes).map_err(|_| ProtocolError::DeserializationFailed)
    }
}

// ============================================================================
// CLOCK SYNC
// ============================================================================

/// Carries the sender's Lamport clock
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSync {
    clock: u64,
    reply: bool,
}

impl ClockSync {
    /// A sync the receiver should answer
    pub fn request(clock: u64) -> Self {
        Self { clock, reply: false }
    }

    /// An answer to a request; observed, never answered
    pub fn reply(clock: u64) -> Self {
        Self { clock, reply: true }
    }

    /// Get the clock value
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Check if this answers an earlier request
    pub fn is_reply(&self) -> bool {
        self.reply
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

/// A transaction and its admission proof
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMessage {
    transaction: Transaction,
    proof: Option<PuzzleProof>,
}

impl TransactionMessage {
    /// Create a new transaction message
    pub fn new(transaction: Transaction, proof: Option<PuzzleProof>) -> Self {
        Self { transaction, proof }
    }

    /// Get the transaction
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Get the proof, if attached
    pub fn proof(&self) -> Option<&PuzzleProof> {
        self.proof.as_ref()
    }
}
