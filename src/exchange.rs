//! Exchange scheduler collaborator contract.
//!
//! The scheduler decides which blocks to request from which peers. It is
//! fed peer lifecycle and wire events by the session layer and talks back
//! by queueing messages on each peer's outbound channel; it never touches
//! a socket itself.

use std::net::SocketAddr;

use tokio::sync::mpsc;

use crate::peer::{Bitfield, Block, BlockRequest, Message, PeerId};

/// An established peer as seen by the scheduler.
///
/// Messages sent on `outbound` go over the wire FIFO, interleaved with
/// the swarm's broadcasts.
#[derive(Debug, Clone)]
pub struct PeerLink {
    pub addr: SocketAddr,
    pub peer_id: PeerId,
    pub outbound: mpsc::Sender<Message>,
}

/// Receives exchange-relevant events and drives piece traffic.
///
/// Implementations must be cheap and non-blocking: calls arrive from
/// inside peer session tasks.
pub trait Exchange: Send + Sync {
    /// A peer finished its handshake and sent its bitfield slot.
    fn peer_ready(&self, link: PeerLink);

    /// A peer session ended; pending requests to it are void.
    fn peer_closed(&self, addr: SocketAddr);

    /// The peer's piece set changed (Bitfield replacement or Have).
    fn bitfield_updated(&self, addr: SocketAddr, field: &Bitfield);

    /// The peer started or stopped choking us.
    fn choke_changed(&self, addr: SocketAddr, peer_choking: bool);

    /// The peer asked for a block.
    fn request_received(&self, addr: SocketAddr, request: BlockRequest);

    /// The peer withdrew a pending request.
    fn cancel_received(&self, addr: SocketAddr, request: BlockRequest);

    /// A requested block arrived; forward to storage and re-plan.
    fn block_received(&self, addr: SocketAddr, block: Block);
}

/// Scheduler that ignores every event; used while a torrent is paused
/// and in tests.
#[derive(Debug, Default)]
pub struct NullExchange;

impl Exchange for NullExchange {
    fn peer_ready(&self, _link: PeerLink) {}
    fn peer_closed(&self, _addr: SocketAddr) {}
    fn bitfield_updated(&self, _addr: SocketAddr, _field: &Bitfield) {}
    fn choke_changed(&self, _addr: SocketAddr, _peer_choking: bool) {}
    fn request_received(&self, _addr: SocketAddr, _request: BlockRequest) {}
    fn cancel_received(&self, _addr: SocketAddr, _request: BlockRequest) {}
    fn block_received(&self, _addr: SocketAddr, _block: Block) {}
}
