// Node Runtime - one tokio task per peer
//
// The task owns the RelayController and processes one event at a time, so
// the clock, ledger and log are only ever touched from here. Work that can
// block (puzzle solving) and the recurring clock-sync timer run in their own
// tasks and post their results back as events.

use crate::admission::{PuzzleProof, PuzzleSolver, SolveError};
use crate::config::NodeConfig;
use crate::identity::PeerId;
use crate::ledger::Transaction;
use crate::sync::{Message, Outbound, RelayController, RelayError};
use crate::transport::{Envelope, Transport};
use std::collections::BTreeSet;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::handle::{NodeError, NodeHandle, NodeSnapshot, SubmitOutcome};

/// Capacity of a node's event queue
pub const EVENT_QUEUE_SIZE: usize = 1024;

pub(crate) enum NodeEvent {
    Received {
        sender: PeerId,
        message: Message,
    },
    Tick,
    Submit {
        recipient: PeerId,
        amount: i64,
        reply: oneshot::Sender<Result<SubmitOutcome, NodeError>>,
    },
    ProofReady {
        transaction: Transaction,
        result: Result<PuzzleProof, SolveError>,
        reply: oneshot::Sender<Result<SubmitOutcome, NodeError>>,
    },
    SetDifficulty {
        difficulty: u32,
        reply: oneshot::Sender<Result<(), NodeError>>,
    },
    Snapshot(oneshot::Sender<NodeSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

/// A running peer
pub struct Node {
    relay: RelayController,
    transport: Arc<dyn Transport>,
    solver: PuzzleSolver,
    sync_interval: Duration,
    events_tx: mpsc::Sender<NodeEvent>,
    timer: Option<JoinHandle<()>>,
    /// Cancel flags of puzzle searches that may still be running
    solves: Vec<Arc<AtomicBool>>,
}

impl Node {
    /// Validate `config`, start the node task and return its handle.
    ///
    /// Must be called from within a tokio runtime. The node keeps running
    /// until [`NodeHandle::shutdown`] is called.
    pub fn spawn(
        config: NodeConfig,
        transport: Arc<dyn Transport>,
        inbox: mpsc::UnboundedReceiver<Envelope>,
    ) -> Result<NodeHandle, NodeError> {
        config.validate()?;

        let local = transport.local_peer();
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_SIZE);

        let node = Node {
            solver: PuzzleSolver::new(config.solve_timeout()),
            sync_interval: config.sync_interval(),
            relay: RelayController::new(local, config),
            transport,
            events_tx: events_tx.clone(),
            timer: None,
            solves: Vec::new(),
        };

        tokio::spawn(node.run(events_rx, inbox));
        Ok(NodeHandle::new(local, events_tx))
    }

    async fn run(
        mut self,
        mut events: mpsc::Receiver<NodeEvent>,
        mut inbox: mpsc::UnboundedReceiver<Envelope>,
    ) {
        self.refresh_peers();
        if let Err(e) = self.relay.start() {
            warn!(peer = %self.short_id(), error = %e, "relay failed to start");
        }
        self.arm_timer();

        loop {
            tokio::select! {
                Some(envelope) = inbox.recv() => self.on_envelope(envelope).await,
                event = events.recv() => match event {
                    Some(event) => {
                        if self.on_event(event).await.is_break() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        info!(peer = %self.short_id(), "node stopped");
    }

    fn short_id(&self) -> String {
        self.relay.local_peer().short()
    }

    // ========================================================================
    // EVENTS
    // ========================================================================

    async fn on_envelope(&mut self, envelope: Envelope) {
        self.refresh_peers();

        let message = match Message::from_bytes(&envelope.payload) {
            Ok(message) => message,
            Err(e) => {
                debug!(peer = %self.short_id(), from = %envelope.sender.short(), error = %e, "undecodable message dropped");
                return;
            }
        };

        self.on_message(envelope.sender, message).await;
    }

    async fn on_message(&mut self, sender: PeerId, message: Message) {
        let outbound = self.relay.handle_message(sender, message);
        self.dispatch(outbound).await;
    }

    /// Handle one event; `Break` once the node has shut down
    async fn on_event(&mut self, event: NodeEvent) -> ControlFlow<()> {
        self.refresh_peers();

        match event {
            NodeEvent::Received { sender, message } => self.on_message(sender, message).await,
            NodeEvent::Tick => {
                let outcome = self.relay.on_tick();
                self.dispatch(outcome.outbound).await;
                if outcome.cancel_timer {
                    self.cancel_timer();
                }
            }
            NodeEvent::Submit {
                recipient,
                amount,
                reply,
            } => self.on_submit(recipient, amount, reply),
            NodeEvent::ProofReady {
                transaction,
                result,
                reply,
            } => {
                let outcome = self.on_proof_ready(transaction, result).await;
                let _ = reply.send(outcome);
            }
            NodeEvent::SetDifficulty { difficulty, reply } => {
                let _ = reply.send(self.relay.set_difficulty(difficulty).map_err(Into::into));
            }
            NodeEvent::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            NodeEvent::Shutdown(ack) => {
                self.stop();
                let _ = ack.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn on_submit(
        &mut self,
        recipient: PeerId,
        amount: i64,
        reply: oneshot::Sender<Result<SubmitOutcome, NodeError>>,
    ) {
        if self.relay.peers().is_empty() {
            let _ = reply.send(Err(RelayError::NoPeers.into()));
            return;
        }

        let transaction = match self.relay.prepare_transaction(recipient, amount) {
            Ok(transaction) => transaction,
            Err(e) => {
                let _ = reply.send(Err(e.into()));
                return;
            }
        };

        // A timeout raises the flag it was given, so every search gets its own
        let cancel = Arc::new(AtomicBool::new(false));
        self.solves.retain(|flag| Arc::strong_count(flag) > 1);
        self.solves.push(Arc::clone(&cancel));

        let solver = self.solver.clone();
        let events = self.events_tx.clone();
        let difficulty = self.relay.difficulty();
        let challenge = transaction.challenge();

        debug!(peer = %self.short_id(), difficulty, "solving admission puzzle");
        tokio::spawn(async move {
            let result = solver.solve_with_flag(challenge, difficulty, cancel).await;
            let _ = events
                .send(NodeEvent::ProofReady {
                    transaction,
                    result,
                    reply,
                })
                .await;
        });
    }

    async fn on_proof_ready(
        &mut self,
        transaction: Transaction,
        result: Result<PuzzleProof, SolveError>,
    ) -> Result<SubmitOutcome, NodeError> {
        let proof = result.map_err(|e| {
            warn!(peer = %self.short_id(), error = %e, "puzzle solving failed");
            NodeError::from(e)
        })?;

        let digest = transaction.digest();
        let nonce = proof.nonce();
        let outbound = self.relay.initiate_transaction(transaction, proof)?;
        let recipients = outbound.len();
        self.dispatch(outbound).await;

        Ok(SubmitOutcome {
            digest,
            nonce,
            recipients,
            clock: self.relay.clock().current(),
        })
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    async fn dispatch(&self, outbound: Vec<Outbound>) {
        for Outbound { peer, message } in outbound {
            if let Err(e) = self.transport.send(&peer, message).await {
                warn!(peer = %self.short_id(), to = %peer.short(), error = %e, "send failed");
            }
        }
    }

    /// Bring the registry in line with the transport's neighbor snapshot
    fn refresh_peers(&mut self) {
        let local = *self.relay.local_peer();
        let current: BTreeSet<PeerId> = self
            .transport
            .known_peers()
            .into_iter()
            .filter(|peer| *peer != local)
            .collect();

        for peer in self.relay.peers().peers() {
            if !current.contains(&peer) {
                let _ = self.relay.on_peer_removed(&peer);
            }
        }
        for peer in current {
            if let Err(e) = self.relay.on_peer_added(peer) {
                debug!(peer = %self.short_id(), error = %e, "peer not added");
            }
        }
    }

    fn arm_timer(&mut self) {
        let events = self.events_tx.clone();
        let period = self.sync_interval;

        self.timer = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if events.send(NodeEvent::Tick).await.is_err() {
                    break;
                }
            }
        }));
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            info!(peer = %self.short_id(), "clock sync timer cancelled");
        }
    }

    fn stop(&mut self) {
        self.cancel_timer();
        for flag in self.solves.drain(..) {
            flag.store(true, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            peer: *self.relay.local_peer(),
            state: self.relay.state(),
            clock: self.relay.clock().current(),
            difficulty: self.relay.difficulty(),
            balances: self
                .relay
                .ledger()
                .balances()
                .map(|(peer, balance)| (*peer, *balance))
                .collect(),
            log: self.relay.log().entries().to_vec(),
            root: self.relay.audit_root(),
            known_peers: self.relay.peers().peers(),
            stats: self.relay.stats().clone(),
        }
    }
}
