// Sync module - HOW PEERS TALK
// Message protocol, known-peer snapshot, dedup cache and the relay controller

mod peer;
mod protocol;
mod relay;
mod seen;

pub use peer::{PeerError, PeerInfo, PeerRegistry};
pub use protocol::{
    ClockSync, Message, MessageType, ProtocolError, TransactionMessage,
    MAX_MESSAGE_SIZE,
};
pub use relay::{
    DropReason, Outbound, RelayController, RelayError, RelayState, RelayStats, TickOutcome,
};
pub use seen::SeenCache;
