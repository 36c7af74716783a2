// Relay Controller - The heart of peer synchronization
//
// Owns one peer's clock, ledger, log and peer snapshot, and turns inbound
// events into outbound messages:
// - ClockSync: observe the remote clock; answer a request point-to-point,
//   never answer a reply
// - Transaction: admit via puzzle proof, apply, record, relay to everyone
//   except the sender
// - Timer tick: broadcast ClockSync until the local clock moves
//
// No IO happens here. Callers hand the returned `Outbound`s to a transport.

use crate::admission::{Puzzle, PuzzleProof, MAX_DIFFICULTY};
use crate::audit::TransactionLog;
use crate::clock::LamportClock;
use crate::config::NodeConfig;
use crate::identity::PeerId;
use crate::ledger::{Ledger, LedgerError, Transaction, TransactionBuilder, TransactionError};
use crate::sync::peer::{PeerError, PeerRegistry};
use crate::sync::protocol::{ClockSync, Message, TransactionMessage};
use crate::sync::seen::SeenCache;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, trace};

/// Errors surfaced to the local operator (never to peers)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Relay already started")]
    AlreadyStarted,

    #[error("No known peers to send to")]
    NoPeers,

    #[error("Proof does not admit this transaction")]
    InvalidProof,

    #[error("Difficulty {0} exceeds the digest length")]
    InvalidDifficulty(u32),

    #[error("Ledger rejected transaction: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Invalid transaction: {0}")]
    Transaction(#[from] TransactionError),

    #[error("Peer error: {0}")]
    Peer(#[from] PeerError),
}

/// Lifecycle of the controller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelayState {
    /// Constructed, not started
    Idle,
    /// Broadcasting clock syncs on every tick
    Synchronizing,
    /// Purely event-driven
    Steady,
}

/// Why an inbound transaction was discarded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    MissingProof,
    InvalidProof,
    InsufficientDifficulty,
    UnboundChallenge,
    Duplicate,
    Rejected,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DropReason::MissingProof => "missing proof",
            DropReason::InvalidProof => "invalid proof",
            DropReason::InsufficientDifficulty => "insufficient difficulty",
            DropReason::UnboundChallenge => "proof not bound to transaction",
            DropReason::Duplicate => "duplicate",
            DropReason::Rejected => "rejected by ledger",
        };
        f.write_str(reason)
    }
}

/// A message to hand to the transport
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outbound {
    pub peer: PeerId,
    pub message: Message,
}

impl Outbound {
    /// Create a new outbound message
    pub fn new(peer: PeerId, message: Message) -> Self {
        Self { peer, message }
    }
}

/// Result of a timer tick
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub outbound: Vec<Outbound>,
    /// The recurring timer is no longer needed
    pub cancel_timer: bool,
}

/// Statistics about the relay
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub messages_processed: u64,
    pub clock_syncs_received: u64,
    pub clock_syncs_sent: u64,
    pub transactions_applied: u64,
    pub transactions_originated: u64,
    pub messages_relayed: u64,
    pub dropped_missing_proof: u64,
    pub dropped_invalid_proof: u64,
    pub dropped_duplicate: u64,
    pub dropped_rejected: u64,
}

impl RelayStats {
    /// All discarded transactions, whatever the reason
    pub fn dropped_total(&self) -> u64 {
        self.dropped_missing_proof
            + self.dropped_invalid_proof
            + self.dropped_duplicate
            + self.dropped_rejected
    }

    fn record_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::MissingProof => self.dropped_missing_proof += 1,
            DropReason::InvalidProof
            | DropReason::InsufficientDifficulty
            | DropReason::UnboundChallenge => self.dropped_invalid_proof += 1,
            DropReason::Duplicate => self.dropped_duplicate += 1,
            DropReason::Rejected => self.dropped_rejected += 1,
        }
    }
}

/// The relay controller - one per peer process
pub struct RelayController {
    local: PeerId,
    config: NodeConfig,
    difficulty: u32,
    state: RelayState,
    clock: LamportClock,
    ledger: Ledger,
    log: TransactionLog,
    peers: PeerRegistry,
    seen: Option<SeenCache>,
    stats: RelayStats,
}

impl RelayController {
    /// Create a controller for `local` in the Idle state
    pub fn new(local: PeerId, config: NodeConfig) -> Self {
        let ledger = Ledger::new(config.initial_balance).with_overdraft_policy(config.overdraft);
        let seen = config
            .dedup
            .then(|| SeenCache::new(config.seen_ttl(), config.max_seen));

        Self {
            local,
            difficulty: config.difficulty,
            config,
            state: RelayState::Idle,
            clock: LamportClock::new(),
            ledger,
            log: TransactionLog::new(),
            peers: PeerRegistry::new(local),
            seen,
            stats: RelayStats::default(),
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// Our peer ID
    pub fn local_peer(&self) -> &PeerId {
        &self.local
    }

    /// Current lifecycle state
    pub fn state(&self) -> RelayState {
        self.state
    }

    /// The Lamport clock
    pub fn clock(&self) -> &LamportClock {
        &self.clock
    }

    /// The ledger
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The transaction log
    pub fn log(&self) -> &TransactionLog {
        &self.log
    }

    /// Merkle root over the log, rebuilt now
    pub fn audit_root(&self) -> String {
        self.log.root()
    }

    /// The known-peer snapshot
    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    /// Mutable access to the known-peer snapshot
    pub fn peers_mut(&mut self) -> &mut PeerRegistry {
        &mut self.peers
    }

    /// Statistics
    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    /// Configuration this controller was built with
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Difficulty currently required on inbound proofs
    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Raise or lower the required difficulty (backpressure)
    pub fn set_difficulty(&mut self, difficulty: u32) -> Result<(), RelayError> {
        if difficulty > MAX_DIFFICULTY {
            return Err(RelayError::InvalidDifficulty(difficulty));
        }
        info!(peer = %self.local.short(), from = self.difficulty, to = difficulty, "difficulty changed");
        self.difficulty = difficulty;
        Ok(())
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Idle -> Synchronizing. The caller arms the recurring timer.
    pub fn start(&mut self) -> Result<(), RelayError> {
        if self.state != RelayState::Idle {
            return Err(RelayError::AlreadyStarted);
        }
        self.state = RelayState::Synchronizing;
        info!(peer = %self.local.short(), "relay synchronizing");
        Ok(())
    }

    /// Handle a timer tick
    pub fn on_tick(&mut self) -> TickOutcome {
        if self.state != RelayState::Synchronizing {
            return TickOutcome {
                outbound: Vec::new(),
                cancel_timer: self.state == RelayState::Steady,
            };
        }

        if !self.clock.is_initial() {
            self.state = RelayState::Steady;
            info!(peer = %self.local.short(), clock = self.clock.current(), "relay steady");
            return TickOutcome {
                outbound: Vec::new(),
                cancel_timer: true,
            };
        }

        let clock = self.clock.current();
        let outbound: Vec<Outbound> = self
            .peers
            .peers()
            .into_iter()
            .map(|peer| Outbound::new(peer, Message::clock_sync(clock)))
            .collect();
        self.stats.clock_syncs_sent += outbound.len() as u64;

        trace!(peer = %self.local.short(), targets = outbound.len(), "clock sync broadcast");
        TickOutcome {
            outbound,
            cancel_timer: false,
        }
    }

    // ========================================================================
    // PEER MEMBERSHIP
    // ========================================================================

    /// A peer joined the overlay; credit it the initial grant
    pub fn on_peer_added(&mut self, peer: PeerId) -> Result<bool, RelayError> {
        let added = self.peers.add_peer(peer)?;
        if added {
            let balance = self.ledger.grant(&peer);
            info!(peer = %self.local.short(), found = %peer.short(), balance, "peer added");
        }
        Ok(added)
    }

    /// A peer left the overlay
    pub fn on_peer_removed(&mut self, peer: &PeerId) -> Result<(), RelayError> {
        self.peers.remove_peer(peer)?;
        debug!(peer = %self.local.short(), lost = %peer.short(), "peer removed");
        Ok(())
    }

    // ========================================================================
    // MESSAGE PROCESSING
    // ========================================================================

    /// Process an inbound message from `sender`
    pub fn handle_message(&mut self, sender: PeerId, message: Message) -> Vec<Outbound> {
        self.stats.messages_processed += 1;
        if let Some(info) = self.peers.get_peer_mut(&sender) {
            info.touch();
        }

        match message {
            Message::ClockSync(sync) => self.handle_clock_sync(sender, sync),
            Message::Transaction(tx_message) => self.handle_transaction(sender, tx_message),
        }
    }

    fn handle_clock_sync(&mut self, sender: PeerId, sync: ClockSync) -> Vec<Outbound> {
        self.stats.clock_syncs_received += 1;
        if let Some(info) = self.peers.get_peer_mut(&sender) {
            info.record_clock(sync.clock());
        }

        let clock = self.clock.observe(sync.clock());
        debug!(
            peer = %self.local.short(),
            from = %sender.short(),
            remote = sync.clock(),
            clock,
            "clock observed"
        );

        if sync.is_reply() {
            return Vec::new();
        }

        self.stats.clock_syncs_sent += 1;
        vec![Outbound::new(sender, Message::clock_sync_reply(clock))]
    }

    fn handle_transaction(&mut self, sender: PeerId, tx_message: TransactionMessage) -> Vec<Outbound> {
        let transaction = tx_message.transaction();
        let digest = transaction.digest();

        if let Err(reason) = self.check_admission(&tx_message) {
            return self.drop_transaction(sender, &digest, reason);
        }

        if self.seen.as_ref().is_some_and(|seen| seen.contains(&digest)) {
            return self.drop_transaction(sender, &digest, DropReason::Duplicate);
        }

        let balances = match self.ledger.apply(transaction) {
            Ok(balances) => balances,
            Err(e) => {
                debug!(peer = %self.local.short(), error = %e, "ledger refused transaction");
                return self.drop_transaction(sender, &digest, DropReason::Rejected);
            }
        };

        if let Some(seen) = self.seen.as_mut() {
            seen.check_and_insert(&digest);
        }
        self.log.record(digest.clone());
        let clock = self.clock.tick();
        self.stats.transactions_applied += 1;

        info!(
            peer = %self.local.short(),
            from = %sender.short(),
            amount = transaction.amount(),
            recipient = %balances.recipient.0.short(),
            balance = balances.recipient.1,
            clock,
            "transaction applied"
        );

        let outbound: Vec<Outbound> = self
            .peers
            .peers_except(&sender)
            .into_iter()
            .map(|peer| Outbound::new(peer, Message::Transaction(tx_message.clone())))
            .collect();
        self.stats.messages_relayed += outbound.len() as u64;

        trace!(peer = %self.local.short(), tx = &digest[..16], targets = outbound.len(), "relaying");
        outbound
    }

    fn check_admission(&self, tx_message: &TransactionMessage) -> Result<(), DropReason> {
        let proof = match tx_message.proof() {
            Some(proof) => proof,
            None if self.config.require_proof => return Err(DropReason::MissingProof),
            None => return Ok(()),
        };

        if !Puzzle::verify(proof) {
            return Err(DropReason::InvalidProof);
        }

        if !self.config.require_proof {
            return Ok(());
        }

        if proof.difficulty() < self.difficulty {
            return Err(DropReason::InsufficientDifficulty);
        }

        if self.config.bind_challenge && proof.challenge() != tx_message.transaction().challenge() {
            return Err(DropReason::UnboundChallenge);
        }

        Ok(())
    }

    fn drop_transaction(&mut self, sender: PeerId, digest: &str, reason: DropReason) -> Vec<Outbound> {
        self.stats.record_drop(reason);
        debug!(
            peer = %self.local.short(),
            from = %sender.short(),
            tx = &digest[..16],
            %reason,
            "transaction dropped"
        );
        Vec::new()
    }

    // ========================================================================
    // LOCAL ORIGINATION
    // ========================================================================

    /// Build a transfer from this peer to `recipient`
    pub fn prepare_transaction(&self, recipient: PeerId, amount: i64) -> Result<Transaction, RelayError> {
        Ok(TransactionBuilder::new()
            .sender(self.local)
            .recipient(recipient)
            .amount(amount)
            .build()?)
    }

    /// Apply a locally originated transaction and send it to every peer.
    ///
    /// The proof must already be solved; see
    /// [`PuzzleSolver`](crate::admission::PuzzleSolver).
    pub fn initiate_transaction(
        &mut self,
        transaction: Transaction,
        proof: PuzzleProof,
    ) -> Result<Vec<Outbound>, RelayError> {
        if self.peers.is_empty() {
            return Err(RelayError::NoPeers);
        }

        let tx_message = TransactionMessage::new(transaction, Some(proof));
        if self.check_admission(&tx_message).is_err() {
            return Err(RelayError::InvalidProof);
        }

        let transaction = tx_message.transaction();
        let digest = transaction.digest();
        self.ledger.apply(transaction)?;

        if let Some(seen) = self.seen.as_mut() {
            seen.check_and_insert(&digest);
        }
        self.log.record(digest.clone());
        let clock = self.clock.tick();
        self.stats.transactions_originated += 1;

        info!(
            peer = %self.local.short(),
            amount = transaction.amount(),
            recipient = %transaction.recipient().short(),
            clock,
            "transaction originated"
        );

        let outbound = self
            .peers
            .peers()
            .into_iter()
            .map(|peer| Outbound::new(peer, Message::Transaction(tx_message.clone())))
            .collect();
        Ok(outbound)
    }

    /// Address `message` to one random known peer
    pub fn send_to_random_peer(&self, message: Message) -> Result<Outbound, RelayError> {
        let peer = self
            .peers
            .select_random_peer()
            .map_err(|_| RelayError::NoPeers)?;
        Ok(Outbound::new(peer, message))
    }
}
