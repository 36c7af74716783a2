// Node integration tests
// End-to-end runs over the in-process hub

mod runtime_test;

use microledger::config::NodeConfig;
use microledger::identity::PeerId;
use microledger::node::{Node, NodeHandle, NodeSnapshot};
use microledger::transport::MemoryHub;
use std::sync::Arc;
use std::time::Duration;

/// Config with a short timer and cheap puzzles
pub fn fast_config() -> NodeConfig {
    NodeConfig::new().with_difficulty(1).with_sync_interval_ms(20)
}

/// Spawn a node for `peer` on `hub`
pub fn spawn_node(hub: &MemoryHub, peer: PeerId, config: NodeConfig) -> NodeHandle {
    let inbox = hub.register(peer);
    Node::spawn(config, Arc::new(hub.transport_for(peer)), inbox).unwrap()
}

/// Poll `handle` until `check` holds, panicking after five seconds
pub async fn wait_for<F>(handle: &NodeHandle, check: F) -> NodeSnapshot
where
    F: Fn(&NodeSnapshot) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = handle.snapshot().await.unwrap();
        if check(&snapshot) {
            return snapshot;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("condition never held, last snapshot: {:?}", snapshot);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
