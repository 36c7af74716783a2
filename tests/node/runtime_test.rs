// Runtime Tests
// Tests for the node event loop, its timer and off-path solving

use crate::{fast_config, spawn_node, wait_for};
use microledger::admission::{SolveError, MAX_DIFFICULTY};
use microledger::config::{ConfigError, NodeConfig};
use microledger::identity::PeerId;
use microledger::node::{Node, NodeError};
use microledger::sync::{Message, RelayError, RelayState};
use microledger::transport::{Envelope, MemoryHub, Transport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// LIFECYCLE
// ============================================================================

#[tokio::test]
async fn test_spawn_rejects_invalid_config() {
    let hub = MemoryHub::new();
    let peer = PeerId::generate();
    let inbox = hub.register(peer);

    let result = Node::spawn(
        NodeConfig::new().with_difficulty(MAX_DIFFICULTY + 1),
        Arc::new(hub.transport_for(peer)),
        inbox,
    );

    assert!(matches!(
        result,
        Err(NodeError::Config(ConfigError::DifficultyTooHigh(d))) if d == MAX_DIFFICULTY + 1
    ));
}

#[tokio::test]
async fn test_new_node_snapshot() {
    let hub = MemoryHub::new();
    let peer = PeerId::generate();
    let node = spawn_node(&hub, peer, fast_config());

    let snapshot = node.snapshot().await.unwrap();
    assert_eq!(node.peer_id(), &peer);
    assert_eq!(snapshot.peer, peer);
    assert_eq!(snapshot.state, RelayState::Synchronizing);
    assert_eq!(snapshot.clock, 0);
    assert_eq!(snapshot.difficulty, 1);
    assert!(snapshot.log.is_empty());
    assert_eq!(snapshot.root, microledger::audit::EMPTY_ROOT);

    node.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_stops_node() {
    let hub = MemoryHub::new();
    let node = spawn_node(&hub, PeerId::generate(), fast_config());

    node.shutdown().await.unwrap();

    assert!(matches!(node.snapshot().await, Err(NodeError::Stopped)));
    assert!(node.is_stopped());
}

// ============================================================================
// PEER DISCOVERY
// ============================================================================

#[tokio::test]
async fn test_neighbors_become_peers_with_grant() {
    let hub = MemoryHub::new();
    let a = PeerId::generate();
    let b = PeerId::generate();
    let c = PeerId::generate();
    hub.connect(a, b);
    hub.connect(a, c);

    let node = spawn_node(&hub, a, fast_config().with_initial_balance(250));
    let snapshot = node.snapshot().await.unwrap();

    let mut expected = vec![b, c];
    expected.sort();
    assert_eq!(snapshot.known_peers, expected);
    assert_eq!(snapshot.balance(&b), Some(250));
    assert_eq!(snapshot.balance(&c), Some(250));

    hub.disconnect(a, c);
    let snapshot = node.snapshot().await.unwrap();
    assert_eq!(snapshot.known_peers, vec![b]);
    // The grant stays in the ledger
    assert_eq!(snapshot.balance(&c), Some(250));

    node.shutdown().await.unwrap();
}

// ============================================================================
// CLOCK SYNC TIMER
// ============================================================================

#[tokio::test]
async fn test_clock_handshake_with_raw_peer() {
    let hub = MemoryHub::new();
    let a = PeerId::generate();
    let b = PeerId::generate();
    let mut inbox_b = hub.register(b);
    hub.connect(a, b);

    let node = spawn_node(&hub, a, fast_config());

    // The timer broadcasts our initial clock
    let first = tokio::time::timeout(Duration::from_secs(5), inbox_b.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.sender, a);
    assert_eq!(Message::from_bytes(&first.payload).unwrap(), Message::clock_sync(0));

    // B answers with clock 1
    hub.transport_for(b)
        .send(&a, Message::clock_sync_reply(1))
        .await
        .unwrap();

    let snapshot = wait_for(&node, |s| s.state == RelayState::Steady).await;
    assert_eq!(snapshot.clock, 2);

    // A reply is never answered, so only the timer broadcasts reached B
    tokio::time::sleep(Duration::from_millis(50)).await;
    while let Ok(envelope) = inbox_b.try_recv() {
        let message = Message::from_bytes(&envelope.payload).unwrap();
        assert_eq!(message, Message::clock_sync(0));
    }

    // A fresh request gets one point-to-point reply carrying A's new clock
    hub.transport_for(b)
        .send(&a, Message::clock_sync(2))
        .await
        .unwrap();
    let reply = tokio::time::timeout(Duration::from_secs(5), inbox_b.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        Message::from_bytes(&reply.payload).unwrap(),
        Message::clock_sync_reply(3)
    );

    node.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_timer_stops_after_progress() {
    let hub = MemoryHub::new();
    let a = PeerId::generate();
    let b = PeerId::generate();
    let mut inbox_b = hub.register(b);
    hub.connect(a, b);

    let node = spawn_node(&hub, a, fast_config());
    node.deliver(b, Message::clock_sync(4)).await.unwrap();
    wait_for(&node, |s| s.state == RelayState::Steady).await;

    // Drain what was sent so far, then nothing more should arrive
    tokio::time::sleep(Duration::from_millis(50)).await;
    while inbox_b.try_recv().is_ok() {}
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(inbox_b.try_recv().is_err());

    let snapshot = node.snapshot().await.unwrap();
    assert_eq!(snapshot.clock, 5);

    node.shutdown().await.unwrap();
}

// ============================================================================
// INBOUND
// ============================================================================

#[tokio::test]
async fn test_deliver_injects_message() {
    let hub = MemoryHub::new();
    let a = PeerId::generate();
    let node = spawn_node(&hub, a, fast_config().with_sync_interval_ms(60_000));

    node.deliver(PeerId::generate(), Message::clock_sync(5)).await.unwrap();

    let snapshot = node.snapshot().await.unwrap();
    assert_eq!(snapshot.clock, 6);
    assert_eq!(snapshot.stats.clock_syncs_received, 1);

    node.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_undecodable_envelope_dropped() {
    let hub = MemoryHub::new();
    let a = PeerId::generate();
    let b = PeerId::generate();
    let (tx, rx) = mpsc::unbounded_channel();
    let node = Node::spawn(
        fast_config().with_sync_interval_ms(60_000),
        Arc::new(hub.transport_for(a)),
        rx,
    )
    .unwrap();

    tx.send(Envelope::new(b, vec![0xFF, 0xFF, 0xFF])).unwrap();
    tx.send(Envelope::encode(b, &Message::clock_sync(3)).unwrap())
        .unwrap();

    let snapshot = wait_for(&node, |s| s.clock > 0).await;
    assert_eq!(snapshot.clock, 4);
    assert_eq!(snapshot.stats.messages_processed, 1);

    node.shutdown().await.unwrap();
}

// ============================================================================
// SUBMISSION
// ============================================================================

#[tokio::test]
async fn test_submit_without_peers() {
    let hub = MemoryHub::new();
    let node = spawn_node(&hub, PeerId::generate(), fast_config());

    let result = node.submit(PeerId::generate(), 10).await;
    assert_eq!(result, Err(NodeError::Relay(RelayError::NoPeers)));

    node.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_submit_negative_amount() {
    let hub = MemoryHub::new();
    let a = PeerId::generate();
    let b = PeerId::generate();
    let _inbox_b = hub.register(b);
    hub.connect(a, b);
    let node = spawn_node(&hub, a, fast_config());

    let result = node.submit(b, -10).await;
    assert!(matches!(result, Err(NodeError::Relay(RelayError::Transaction(_)))));

    node.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_submit_timeout_is_recoverable() {
    let hub = MemoryHub::new();
    let a = PeerId::generate();
    let b = PeerId::generate();
    let _inbox_b = hub.register(b);
    hub.connect(a, b);

    let config = fast_config()
        .with_difficulty(MAX_DIFFICULTY)
        .with_solve_timeout_ms(50);
    let node = spawn_node(&hub, a, config);

    let result = node.submit(b, 10).await;
    assert_eq!(
        result,
        Err(NodeError::Solve(SolveError::TimedOut { timeout_ms: 50 }))
    );

    // Still alive, nothing applied
    let snapshot = node.snapshot().await.unwrap();
    assert!(snapshot.log.is_empty());
    assert_eq!(snapshot.balance(&b), Some(100));

    // A later, easier submission still goes through
    node.set_difficulty(1).await.unwrap();
    let outcome = node.submit(b, 10).await.unwrap();
    assert_eq!(outcome.recipients, 1);
    assert_eq!(node.snapshot().await.unwrap().log, vec![outcome.digest]);

    node.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_event_loop_responsive_while_solving() {
    let hub = MemoryHub::new();
    let a = PeerId::generate();
    let b = PeerId::generate();
    let _inbox_b = hub.register(b);
    hub.connect(a, b);

    let config = fast_config()
        .with_difficulty(MAX_DIFFICULTY)
        .with_solve_timeout_ms(30_000);
    let node = spawn_node(&hub, a, config);

    let submitter = node.clone();
    let pending = tokio::spawn(async move { submitter.submit(b, 10).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = tokio::time::timeout(Duration::from_millis(500), node.snapshot())
        .await
        .unwrap()
        .unwrap();
    assert!(snapshot.log.is_empty());

    // Shutdown cancels the search instead of waiting out the timeout
    node.shutdown().await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), pending)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        result,
        Err(NodeError::Stopped) | Err(NodeError::Solve(SolveError::Cancelled))
    ));
}

#[tokio::test]
async fn test_set_difficulty_bounds() {
    let hub = MemoryHub::new();
    let node = spawn_node(&hub, PeerId::generate(), fast_config());

    node.set_difficulty(3).await.unwrap();
    assert_eq!(node.snapshot().await.unwrap().difficulty, 3);

    assert_eq!(
        node.set_difficulty(MAX_DIFFICULTY + 1).await,
        Err(NodeError::Relay(RelayError::InvalidDifficulty(MAX_DIFFICULTY + 1)))
    );

    node.shutdown().await.unwrap();
}
