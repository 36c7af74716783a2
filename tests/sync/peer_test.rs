// Peer Tests
// Tests for the known-peer registry

use microledger::identity::PeerId;
use microledger::sync::{PeerError, PeerInfo, PeerRegistry};

// ============================================================================
// PEER INFO
// ============================================================================

#[test]
fn test_peer_info_creation() {
    let peer_id = PeerId::generate();
    let info = PeerInfo::new(peer_id);

    assert_eq!(info.peer_id(), &peer_id);
    assert_eq!(info.last_clock(), None);
    assert_eq!(info.messages_received(), 0);
}

#[test]
fn test_peer_info_tracking() {
    let mut info = PeerInfo::new(PeerId::generate());
    info.touch();
    info.touch();
    info.record_clock(7);

    assert_eq!(info.messages_received(), 2);
    assert_eq!(info.last_clock(), Some(7));
}

// ============================================================================
// REGISTRY
// ============================================================================

#[test]
fn test_registry_starts_empty() {
    let me = PeerId::generate();
    let registry = PeerRegistry::new(me);

    assert!(registry.is_empty());
    assert_eq!(registry.local_peer(), &me);
    assert!(registry.peers().is_empty());
}

#[test]
fn test_registry_rejects_self() {
    let me = PeerId::generate();
    let mut registry = PeerRegistry::new(me);
    assert_eq!(registry.add_peer(me), Err(PeerError::CannotAddSelf));
    assert!(registry.is_empty());
}

#[test]
fn test_registry_add_is_idempotent() {
    let mut registry = PeerRegistry::new(PeerId::generate());
    let peer = PeerId::generate();

    assert_eq!(registry.add_peer(peer), Ok(true));
    assert_eq!(registry.add_peer(peer), Ok(false));
    assert_eq!(registry.peer_count(), 1);
    assert!(registry.has_peer(&peer));
}

#[test]
fn test_registry_remove_unknown() {
    let mut registry = PeerRegistry::new(PeerId::generate());
    assert_eq!(
        registry.remove_peer(&PeerId::generate()),
        Err(PeerError::PeerNotFound)
    );
}

#[test]
fn test_registry_snapshot_is_sorted() {
    let mut registry = PeerRegistry::new(PeerId::from_bytes([0; 32]));
    for byte in [9u8, 3, 7, 1] {
        registry.add_peer(PeerId::from_bytes([byte; 32])).unwrap();
    }

    let bytes: Vec<u8> = registry.peers().iter().map(|p| p.as_bytes()[0]).collect();
    assert_eq!(bytes, vec![1, 3, 7, 9]);
}

#[test]
fn test_peers_except_excludes_sender() {
    let mut registry = PeerRegistry::new(PeerId::generate());
    let a = PeerId::generate();
    let b = PeerId::generate();
    registry.add_peer(a).unwrap();
    registry.add_peer(b).unwrap();

    assert_eq!(registry.peers_except(&a), vec![b]);
    assert_eq!(registry.peers_except(&PeerId::generate()).len(), 2);
}

#[test]
fn test_select_random_peer_empty() {
    let registry = PeerRegistry::new(PeerId::generate());
    assert_eq!(registry.select_random_peer(), Err(PeerError::NoPeers));
}

#[test]
fn test_select_random_peer_picks_known() {
    let mut registry = PeerRegistry::new(PeerId::generate());
    let peers: Vec<PeerId> = (0..5).map(|_| PeerId::generate()).collect();
    for peer in &peers {
        registry.add_peer(*peer).unwrap();
    }

    for _ in 0..20 {
        let chosen = registry.select_random_peer().unwrap();
        assert!(peers.contains(&chosen));
    }
}
