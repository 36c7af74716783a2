// Node Handle - cloneable front door to a running node

use crate::config::ConfigError;
use crate::admission::SolveError;
use crate::identity::PeerId;
use crate::sync::{Message, RelayError, RelayState, RelayStats};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use super::runtime::NodeEvent;

/// Errors reported to the local operator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("Puzzle error: {0}")]
    Solve(#[from] SolveError),

    #[error("Node has stopped")]
    Stopped,
}

/// Result of a successful local submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Digest recorded in the local log
    pub digest: String,
    /// Nonce that solved the admission puzzle
    pub nonce: u64,
    /// How many peers the transaction was sent to
    pub recipients: usize,
    /// Local clock after the submission
    pub clock: u64,
}

/// Point-in-time view of a node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub peer: PeerId,
    pub state: RelayState,
    pub clock: u64,
    pub difficulty: u32,
    pub balances: BTreeMap<PeerId, i64>,
    pub log: Vec<String>,
    pub root: String,
    pub known_peers: Vec<PeerId>,
    pub stats: RelayStats,
}

impl NodeSnapshot {
    /// Balance of `peer` as seen by this node, if materialized
    pub fn balance(&self, peer: &PeerId) -> Option<i64> {
        self.balances.get(peer).copied()
    }
}

/// Handle for talking to a node task
#[derive(Clone, Debug)]
pub struct NodeHandle {
    peer: PeerId,
    events: mpsc::Sender<NodeEvent>,
}

impl NodeHandle {
    pub(super) fn new(peer: PeerId, events: mpsc::Sender<NodeEvent>) -> Self {
        Self { peer, events }
    }

    /// The node's peer ID
    pub fn peer_id(&self) -> &PeerId {
        &self.peer
    }

    /// Check if the node task is gone
    pub fn is_stopped(&self) -> bool {
        self.events.is_closed()
    }

    /// Hand the node a message that arrived from `sender`
    pub async fn deliver(&self, sender: PeerId, message: Message) -> Result<(), NodeError> {
        self.send(NodeEvent::Received { sender, message }).await
    }

    /// Solve a puzzle, then transfer `amount` from this node to `recipient`
    pub async fn submit(&self, recipient: PeerId, amount: i64) -> Result<SubmitOutcome, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.send(NodeEvent::Submit {
            recipient,
            amount,
            reply,
        })
        .await?;
        rx.await.map_err(|_| NodeError::Stopped)?
    }

    /// Read the node's current state
    pub async fn snapshot(&self) -> Result<NodeSnapshot, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.send(NodeEvent::Snapshot(reply)).await?;
        rx.await.map_err(|_| NodeError::Stopped)
    }

    /// Change the difficulty required on inbound proofs
    pub async fn set_difficulty(&self, difficulty: u32) -> Result<(), NodeError> {
        let (reply, rx) = oneshot::channel();
        self.send(NodeEvent::SetDifficulty { difficulty, reply }).await?;
        rx.await.map_err(|_| NodeError::Stopped)?
    }

    /// Stop the node, its timer and any puzzle in flight
    pub async fn shutdown(&self) -> Result<(), NodeError> {
        let (ack, rx) = oneshot::channel();
        self.send(NodeEvent::Shutdown(ack)).await?;
        rx.await.map_err(|_| NodeError::Stopped)
    }

    async fn send(&self, event: NodeEvent) -> Result<(), NodeError> {
        self.events.send(event).await.map_err(|_| NodeError::Stopped)
    }
}
