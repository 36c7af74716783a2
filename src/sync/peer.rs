// Peer Management - the known-peer snapshot the relay works against
//
// Discovery and membership live outside this crate; the collaborator adds and
// removes peers here as its overlay changes. The registry also remembers the
// last clock each peer reported, which is handy for diagnostics.

use crate::identity::PeerId;
use rand::seq::IteratorRandom;
use std::collections::HashMap;
use thiserror::Error;

/// Peer-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeerError {
    #[error("Cannot add self as a peer")]
    CannotAddSelf,

    #[error("Peer not found")]
    PeerNotFound,

    #[error("No known peers")]
    NoPeers,
}

/// Information about a known peer
#[derive(Clone, Debug)]
pub struct PeerInfo {
    peer_id: PeerId,
    last_clock: Option<u64>,
    messages_received: u64,
}

impl PeerInfo {
    /// Create a new peer info
    pub fn new(peer_id: PeerId) -> Self {
        Self {
            peer_id,
            last_clock: None,
            messages_received: 0,
        }
    }

    /// Get the peer ID
    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// Last clock value this peer sent us
    pub fn last_clock(&self) -> Option<u64> {
        self.last_clock
    }

    /// Number of messages received from this peer
    pub fn messages_received(&self) -> u64 {
        self.messages_received
    }

    /// Record that we heard from this peer
    pub fn touch(&mut self) {
        self.messages_received = self.messages_received.saturating_add(1);
    }

    /// Record a clock value reported by this peer
    pub fn record_clock(&mut self, clock: u64) {
        self.last_clock = Some(clock);
    }
}

/// Registry of known peers
#[derive(Clone, Debug)]
pub struct PeerRegistry {
    my_peer_id: PeerId,
    peers: HashMap<PeerId, PeerInfo>,
}

impl PeerRegistry {
    /// Create a new peer registry
    pub fn new(my_peer_id: PeerId) -> Self {
        Self {
            my_peer_id,
            peers: HashMap::new(),
        }
    }

    /// Our own peer ID
    pub fn local_peer(&self) -> &PeerId {
        &self.my_peer_id
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Get number of peers
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Check if we know a peer
    pub fn has_peer(&self, peer_id: &PeerId) -> bool {
        self.peers.contains_key(peer_id)
    }

    /// Add a peer; returns true if it was new
    pub fn add_peer(&mut self, peer_id: PeerId) -> Result<bool, PeerError> {
        if peer_id == self.my_peer_id {
            return Err(PeerError::CannotAddSelf);
        }

        if self.peers.contains_key(&peer_id) {
            return Ok(false);
        }
        self.peers.insert(peer_id, PeerInfo::new(peer_id));
        Ok(true)
    }

    /// Remove a peer
    pub fn remove_peer(&mut self, peer_id: &PeerId) -> Result<(), PeerError> {
        self.peers
            .remove(peer_id)
            .map(|_| ())
            .ok_or(PeerError::PeerNotFound)
    }

    /// Get a peer by ID
    pub fn get_peer(&self, peer_id: &PeerId) -> Option<&PeerInfo> {
        self.peers.get(peer_id)
    }

    /// Get a mutable reference to a peer
    pub fn get_peer_mut(&mut self, peer_id: &PeerId) -> Option<&mut PeerInfo> {
        self.peers.get_mut(peer_id)
    }

    /// Sorted snapshot of known peer IDs
    pub fn peers(&self) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = self.peers.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Every known peer except `excluded`
    pub fn peers_except(&self, excluded: &PeerId) -> Vec<PeerId> {
        self.peers()
            .into_iter()
            .filter(|id| id != excluded)
            .collect()
    }

    /// Pick one known peer at random
    pub fn select_random_peer(&self) -> Result<PeerId, PeerError> {
        let mut rng = rand::thread_rng();
        self.peers
            .keys()
            .copied()
            .choose(&mut rng)
            .ok_or(PeerError::NoPeers)
    }
}
