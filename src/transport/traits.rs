// Transport Traits - the seam to the networking collaborator
//
// The real overlay (discovery, framing, authentication) lives outside this
// crate. It tells us who our neighbors are and carries messages; that is all
// the relay needs.

use crate::identity::PeerId;
use crate::sync::Message;
use async_trait::async_trait;
use thiserror::Error;

/// Transport errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Peer unreachable: {0}")]
    PeerUnreachable(PeerId),

    #[error("Channel to {0} closed")]
    ChannelClosed(PeerId),

    #[error("Encoding failed: {0}")]
    Encoding(String),
}

/// An encoded message tagged with the authenticated sender
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub sender: PeerId,
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Create a new envelope
    pub fn new(sender: PeerId, payload: Vec<u8>) -> Self {
        Self { sender, payload }
    }

    /// Encode a message into an envelope
    pub fn encode(sender: PeerId, message: &Message) -> Result<Self, TransportError> {
        let payload = message
            .to_bytes()
            .map_err(|e| TransportError::Encoding(e.to_string()))?;
        Ok(Self { sender, payload })
    }
}

/// What the core consumes from the networking collaborator
#[async_trait]
pub trait Transport: Send + Sync {
    /// Our own identity on the overlay
    fn local_peer(&self) -> PeerId;

    /// Read-only snapshot of current neighbors
    fn known_peers(&self) -> Vec<PeerId>;

    /// Fire-and-forget send; no delivery guarantee
    async fn send(&self, peer: &PeerId, message: Message) -> Result<(), TransportError>;
}
