//! Peer wire protocol ([BEP-3]).
//!
//! The codec submodules ([`message`], [`bitfield`]) are pure and
//! stateless; [`session`] layers the per-connection state machine on
//! top of them.
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

mod bitfield;
mod block;
mod error;
mod extensions;
mod message;
mod peer_id;
mod session;
mod transport;

pub use bitfield::Bitfield;
pub use block::{Block, BlockRequest};
pub use error::PeerError;
pub use extensions::Extensions;
pub use message::{Handshake, Message, MessageId};
pub use peer_id::PeerId;
pub use session::{PeerSession, PeerStats, PeerStatus, SessionState};
pub use transport::PeerTransport;
