// Identity module - WHO IS TALKING
// Opaque peer identifiers supplied by the external identity layer

mod peer_id;

pub use peer_id::{PeerId, PeerIdError};
