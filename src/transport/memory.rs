// Memory Transport - in-process hub linking peers over tokio channels
//
// Each registered peer gets an unbounded mailbox, so a send never blocks the
// event loop of the sender. Messages go through the postcard encoding just
// like they would on a real wire. Links are symmetric and can be cut at any
// time to simulate partitions.

use crate::identity::PeerId;
use crate::sync::Message;
use crate::transport::traits::{Envelope, Transport, TransportError};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

#[derive(Default)]
struct HubInner {
    mailboxes: HashMap<PeerId, mpsc::UnboundedSender<Envelope>>,
    links: HashMap<PeerId, BTreeSet<PeerId>>,
}

/// Shared in-memory network
#[derive(Clone, Default)]
pub struct MemoryHub {
    inner: Arc<RwLock<HubInner>>,
}

impl MemoryHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer and get its inbox. Re-registering replaces the inbox.
    pub fn register(&self, peer: PeerId) -> mpsc::UnboundedReceiver<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.mailboxes.insert(peer, tx);
        inner.links.entry(peer).or_default();
        rx
    }

    /// Link two peers in both directions
    pub fn connect(&self, a: PeerId, b: PeerId) {
        if a == b {
            return;
        }
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.links.entry(a).or_default().insert(b);
        inner.links.entry(b).or_default().insert(a);
    }

    /// Cut the link between two peers
    pub fn disconnect(&self, a: PeerId, b: PeerId) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(links) = inner.links.get_mut(&a) {
            links.remove(&b);
        }
        if let Some(links) = inner.links.get_mut(&b) {
            links.remove(&a);
        }
    }

    /// Neighbors of `peer`, sorted
    pub fn neighbors(&self, peer: &PeerId) -> Vec<PeerId> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .links
            .get(peer)
            .map(|links| links.iter().copied().collect())
            .unwrap_or_default()
    }

    /// A transport handle acting as `peer`
    pub fn transport_for(&self, peer: PeerId) -> MemoryTransport {
        MemoryTransport {
            local: peer,
            hub: self.clone(),
        }
    }

    fn deliver(&self, from: PeerId, to: &PeerId, envelope: Envelope) -> Result<(), TransportError> {
        let mailbox = {
            let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
            let linked = inner
                .links
                .get(&from)
                .is_some_and(|links| links.contains(to));
            if !linked {
                return Err(TransportError::PeerUnreachable(*to));
            }
            inner
                .mailboxes
                .get(to)
                .cloned()
                .ok_or(TransportError::PeerUnreachable(*to))?
        };

        mailbox
            .send(envelope)
            .map_err(|_| TransportError::ChannelClosed(*to))
    }
}

/// One peer's view of a [`MemoryHub`]
#[derive(Clone)]
pub struct MemoryTransport {
    local: PeerId,
    hub: MemoryHub,
}

#[async_trait]
impl Transport for MemoryTransport {
    fn local_peer(&self) -> PeerId {
        self.local
    }

    fn known_peers(&self) -> Vec<PeerId> {
        self.hub.neighbors(&self.local)
    }

    async fn send(&self, peer: &PeerId, message: Message) -> Result<(), TransportError> {
        let envelope = Envelope::encode(self.local, &message)?;
        self.hub.deliver(self.local, peer, envelope)
    }
}
