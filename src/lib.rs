//! remora - a BitTorrent client core
//!
//! This library implements the subsystems at the heart of a BitTorrent
//! client: tracker discovery, the peer wire protocol, and the session
//! coordinator that ties the two together under one process.
//!
//! # Modules
//!
//! - [`bencode`] - BEP-3 bencode encoding/decoding
//! - [`metainfo`] - Torrent metadata and info hashes
//! - [`peer`] - BEP-3 peer wire protocol: handshake, messages, sessions
//! - [`tracker`] - BEP-3/15/23 HTTP and UDP tracker protocols
//! - [`session`] - Client, swarm and handle lifecycle
//! - [`discovery`] - Peer discovery collaborator contract and k-buckets
//! - [`storage`] - Storage engine collaborator contract
//! - [`exchange`] - Exchange scheduler collaborator contract

pub mod bencode;
pub mod constants;
pub mod discovery;
pub mod exchange;
pub mod metainfo;
pub mod peer;
pub mod session;
pub mod storage;
pub mod tracker;

pub use bencode::{decode, encode, BencodeError, Value};
pub use discovery::{Bucket, Node, NodeId, PeerDiscovery};
pub use exchange::{Exchange, PeerLink};
pub use metainfo::{InfoHash, Metainfo, MetainfoError};
pub use peer::{
    Bitfield, Block, BlockRequest, Extensions, Handshake, Message, PeerError, PeerId, PeerSession,
    PeerStatus, SessionState,
};
pub use session::{
    ClientConfig, ClientSession, Event, Progress, SessionError, TorrentHandle, TorrentStatus,
};
pub use storage::{StorageEngine, WriteOutcome};
pub use tracker::{
    AnnounceInfo, AnnounceQuery, HttpTracker, PeerAddress, ScrapeInfo, Tracker, TrackerError,
    TrackerEvent, TrackerSession, UdpTracker,
};
