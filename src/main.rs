// mesh-sim - run a handful of in-process peers and watch them converge
//
// Every peer gets its own node task on a shared MemoryHub. After the clock
// sync rounds settle, the first peer pays the second and the run prints each
// node's clock, balances and audit root.

use clap::{Parser, ValueEnum};
use microledger::identity::PeerId;
use microledger::ledger::OverdraftPolicy;
use microledger::node::{Node, NodeHandle, NodeSnapshot};
use microledger::transport::MemoryHub;
use microledger::NodeConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Topology {
    /// Every peer linked to the first one; no cycles
    Star,
    /// Every peer linked to every other peer
    Full,
    /// Each peer linked to its two ring neighbors
    Ring,
}

#[derive(Parser, Debug)]
#[command(name = "mesh-sim")]
#[command(about = "Simulate a micro-ledger mesh in one process", long_about = None)]
struct Cli {
    /// Number of peers to spawn
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u16).range(2..))]
    peers: u16,

    /// Leading zero hex digits required on admission proofs
    #[arg(long, default_value_t = 2)]
    difficulty: u32,

    /// Amount the first peer sends to the second
    #[arg(long, default_value_t = 10)]
    amount: i64,

    /// Balance granted to every newly discovered peer
    #[arg(long, default_value_t = 100)]
    initial_balance: i64,

    /// Clock sync timer period
    #[arg(long, default_value_t = 200)]
    sync_interval_ms: u64,

    /// Drop transactions already seen instead of re-relaying them
    #[arg(long)]
    dedup: bool,

    /// Refuse transfers that would overdraw the sender
    #[arg(long)]
    reject_overdraft: bool,

    /// How peers are linked. Without --dedup, full and ring keep relaying
    /// around their cycles forever.
    #[arg(long, value_enum, default_value_t = Topology::Star)]
    topology: Topology,

    /// How long to let messages settle after each phase
    #[arg(long, default_value_t = 500)]
    settle_ms: u64,
}

impl Cli {
    fn node_config(&self) -> NodeConfig {
        let overdraft = if self.reject_overdraft {
            OverdraftPolicy::Reject
        } else {
            OverdraftPolicy::Allow
        };

        NodeConfig::new()
            .with_difficulty(self.difficulty)
            .with_initial_balance(self.initial_balance)
            .with_sync_interval_ms(self.sync_interval_ms)
            .with_dedup(self.dedup)
            .with_overdraft(overdraft)
    }
}

fn link(hub: &MemoryHub, peers: &[PeerId], topology: Topology) {
    match topology {
        Topology::Star => {
            for peer in &peers[1..] {
                hub.connect(peers[0], *peer);
            }
        }
        Topology::Full => {
            for (i, a) in peers.iter().enumerate() {
                for b in &peers[i + 1..] {
                    hub.connect(*a, *b);
                }
            }
        }
        Topology::Ring => {
            for (i, a) in peers.iter().enumerate() {
                hub.connect(*a, peers[(i + 1) % peers.len()]);
            }
        }
    }
}

fn print_snapshot(snapshot: &NodeSnapshot, peers: &[PeerId]) {
    println!(
        "peer {} state={:?} clock={} log={} root={}",
        snapshot.peer.short(),
        snapshot.state,
        snapshot.clock,
        snapshot.log.len(),
        snapshot.root
    );
    for peer in peers {
        match snapshot.balance(peer) {
            Some(balance) => println!("    {} -> {}", peer.short(), balance),
            None => println!("    {} -> (unknown)", peer.short()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "microledger=info,mesh_sim=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.node_config();
    config.validate()?;

    let hub = MemoryHub::new();
    let peers: Vec<PeerId> = (0..cli.peers).map(|_| PeerId::generate()).collect();
    let inboxes: Vec<_> = peers.iter().map(|peer| hub.register(*peer)).collect();
    link(&hub, &peers, cli.topology);

    let mut nodes: Vec<NodeHandle> = Vec::with_capacity(peers.len());
    for (peer, inbox) in peers.iter().zip(inboxes) {
        let transport = Arc::new(hub.transport_for(*peer));
        nodes.push(Node::spawn(config.clone(), transport, inbox)?);
    }
    info!(peers = nodes.len(), topology = ?cli.topology, "mesh started");

    let settle = Duration::from_millis(cli.settle_ms);
    tokio::time::sleep(Duration::from_millis(cli.sync_interval_ms) + settle).await;

    let payer = &nodes[0];
    let payee = peers[1];
    match payer.submit(payee, cli.amount).await {
        Ok(outcome) => info!(
            tx = %outcome.digest,
            nonce = outcome.nonce,
            recipients = outcome.recipients,
            "transfer submitted"
        ),
        Err(e) => warn!(error = %e, "transfer failed"),
    }
    tokio::time::sleep(settle).await;

    for node in &nodes {
        let snapshot = node.snapshot().await?;
        print_snapshot(&snapshot, &peers);
    }

    for node in &nodes {
        node.shutdown().await?;
    }
    Ok(())
}
