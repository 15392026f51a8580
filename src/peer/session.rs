use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep_until;
use tracing::{debug, trace};

use super::bitfield::Bitfield;
use super::error::PeerError;
use super::extensions::Extensions;
use super::message::{Handshake, Message};
use super::peer_id::PeerId;
use super::transport::PeerTransport;
use crate::constants::{INCOMING_TIMEOUT, KEEPALIVE_INTERVAL};
use crate::discovery::PeerDiscovery;
use crate::exchange::Exchange;
use crate::metainfo::InfoHash;

/// Lifecycle of one peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Handshaking,
    Established,
    Closed,
}

/// The four choke/interest flags for one peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerStatus {
    pub am_choking: bool,
    pub am_interested: bool,
    pub peer_choking: bool,
    pub peer_interested: bool,
}

impl Default for PeerStatus {
    fn default() -> Self {
        Self {
            am_choking: true,
            am_interested: false,
            peer_choking: true,
            peer_interested: false,
        }
    }
}

/// Live counters a session shares with its swarm.
///
/// The swarm's unchoke rotation reads these without touching the session
/// task.
#[derive(Debug, Default)]
pub struct PeerStats {
    pub peer_interested: AtomicBool,
    pub am_choking: AtomicBool,
    pub downloaded: AtomicU64,
    pub uploaded: AtomicU64,
}

impl PeerStats {
    pub fn new() -> Self {
        Self {
            am_choking: AtomicBool::new(true),
            ..Default::default()
        }
    }
}

/// State machine over a single peer TCP connection.
///
/// Construction performs the handshake; [`PeerSession::run`] then drives
/// the established exchange until the socket fails, the peer violates the
/// protocol, the swarm signals shutdown, or the peer goes silent past the
/// incoming deadline.
pub struct PeerSession {
    addr: SocketAddr,
    state: SessionState,
    status: PeerStatus,
    their_id: PeerId,
    enabled_extensions: Extensions,
    their_bitfield: Bitfield,
    piece_count: u32,
    transport: PeerTransport,
}

impl PeerSession {
    /// Dials a peer and exchanges handshakes, ours first.
    pub async fn connect(
        addr: SocketAddr,
        info_hash: InfoHash,
        our_id: PeerId,
        our_extensions: Extensions,
        piece_count: u32,
    ) -> Result<Self, PeerError> {
        let stream = TcpStream::connect(addr).await?;
        let mut transport = PeerTransport::new(stream);

        transport
            .send_handshake(&Handshake::new(info_hash, our_id, our_extensions))
            .await?;
        let theirs = transport.receive_handshake().await?;

        Self::establish(addr, transport, theirs, info_hash, our_extensions, piece_count)
    }

    /// Adopts an inbound connection whose handshake was already read.
    ///
    /// The caller reads the peer's handshake first to route the
    /// connection to the owning swarm by info hash; this answers with
    /// ours and establishes the session.
    pub async fn answer(
        mut transport: PeerTransport,
        theirs: Handshake,
        info_hash: InfoHash,
        our_id: PeerId,
        our_extensions: Extensions,
        piece_count: u32,
    ) -> Result<Self, PeerError> {
        let addr = transport.peer_addr()?;

        transport
            .send_handshake(&Handshake::new(info_hash, our_id, our_extensions))
            .await?;

        Self::establish(addr, transport, theirs, info_hash, our_extensions, piece_count)
    }

    fn establish(
        addr: SocketAddr,
        transport: PeerTransport,
        theirs: Handshake,
        info_hash: InfoHash,
        our_extensions: Extensions,
        piece_count: u32,
    ) -> Result<Self, PeerError> {
        if theirs.info_hash != info_hash {
            return Err(PeerError::Protocol("info hash mismatch".into()));
        }

        Ok(Self {
            addr,
            state: SessionState::Established,
            status: PeerStatus::default(),
            their_id: theirs.peer_id,
            enabled_extensions: our_extensions & theirs.reserved,
            their_bitfield: Bitfield::new(piece_count),
            piece_count,
            transport,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn peer_id(&self) -> PeerId {
        self.their_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn status(&self) -> PeerStatus {
        self.status
    }

    /// Capabilities both sides advertised.
    pub fn enabled_extensions(&self) -> Extensions {
        self.enabled_extensions
    }

    pub fn their_bitfield(&self) -> &Bitfield {
        &self.their_bitfield
    }

    /// Drives the established session to completion.
    ///
    /// Sends our bitfield first, then services the wire, the outbound
    /// queue (exchange requests and swarm broadcasts, FIFO) and the two
    /// timers until the session ends. The error, if any, never leaves the
    /// peer's own task; callers log and drop it.
    pub async fn run(
        mut self,
        our_bitfield: Bitfield,
        stats: Arc<PeerStats>,
        mut outbound: mpsc::Receiver<Message>,
        mut shutdown: watch::Receiver<bool>,
        exchange: Arc<dyn Exchange>,
        discovery: Option<Arc<dyn PeerDiscovery>>,
    ) -> Result<(), PeerError> {
        let result = self
            .exchange_loop(
                our_bitfield,
                &stats,
                &mut outbound,
                &mut shutdown,
                &exchange,
                discovery.as_deref(),
            )
            .await;

        self.state = SessionState::Closed;
        match &result {
            Ok(()) => debug!(addr = %self.addr, "peer session closed"),
            Err(e) => debug!(addr = %self.addr, error = %e, "peer session failed"),
        }
        result
    }

    async fn exchange_loop(
        &mut self,
        our_bitfield: Bitfield,
        stats: &PeerStats,
        outbound: &mut mpsc::Receiver<Message>,
        shutdown: &mut watch::Receiver<bool>,
        exchange: &Arc<dyn Exchange>,
        discovery: Option<&dyn PeerDiscovery>,
    ) -> Result<(), PeerError> {
        // The bitfield must be our first post-handshake message.
        self.transport
            .send_message(&Message::Bitfield(our_bitfield))
            .await?;

        let mut last_sent = Instant::now();
        let mut last_received = Instant::now();
        let mut received_any = false;

        loop {
            let keepalive_at = (last_sent + KEEPALIVE_INTERVAL).into();
            let silence_at = (last_received + INCOMING_TIMEOUT).into();

            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return Ok(());
                    }
                }
                queued = outbound.recv() => {
                    // A closed queue means the swarm dropped this peer.
                    let Some(message) = queued else { return Ok(()) };
                    self.note_outgoing(&message, stats);
                    self.transport.send_message(&message).await?;
                    last_sent = Instant::now();
                }
                incoming = self.transport.receive_message() => {
                    let message = incoming?;
                    last_received = Instant::now();
                    self.handle_message(message, &mut received_any, stats, exchange, discovery)?;
                }
                _ = sleep_until(silence_at) => {
                    return Err(PeerError::Disconnected);
                }
                _ = sleep_until(keepalive_at) => {
                    self.transport.send_message(&Message::KeepAlive).await?;
                    last_sent = Instant::now();
                }
            }
        }
    }

    /// Records the flag effects of a message we are about to send.
    fn note_outgoing(&mut self, message: &Message, stats: &PeerStats) {
        match message {
            Message::Choke => {
                self.status.am_choking = true;
                stats.am_choking.store(true, Ordering::Relaxed);
            }
            Message::Unchoke => {
                self.status.am_choking = false;
                stats.am_choking.store(false, Ordering::Relaxed);
            }
            Message::Interested => self.status.am_interested = true,
            Message::NotInterested => self.status.am_interested = false,
            Message::Piece(block) => {
                stats
                    .uploaded
                    .fetch_add(block.data.len() as u64, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    fn handle_message(
        &mut self,
        message: Message,
        received_any: &mut bool,
        stats: &PeerStats,
        exchange: &Arc<dyn Exchange>,
        discovery: Option<&dyn PeerDiscovery>,
    ) -> Result<(), PeerError> {
        trace!(addr = %self.addr, ?message, "peer message");

        if let Message::Bitfield(field) = message {
            if *received_any {
                return Err(PeerError::Protocol(
                    "bitfield after first message".into(),
                ));
            }
            *received_any = true;
            self.their_bitfield = field.adjust_size(self.piece_count);
            exchange.bitfield_updated(self.addr, &self.their_bitfield);
            return Ok(());
        }
        *received_any = true;

        match message {
            Message::KeepAlive => {}
            Message::Choke => {
                self.status.peer_choking = true;
                exchange.choke_changed(self.addr, true);
            }
            Message::Unchoke => {
                self.status.peer_choking = false;
                exchange.choke_changed(self.addr, false);
            }
            Message::Interested => {
                self.status.peer_interested = true;
                stats.peer_interested.store(true, Ordering::Relaxed);
            }
            Message::NotInterested => {
                self.status.peer_interested = false;
                stats.peer_interested.store(false, Ordering::Relaxed);
            }
            Message::Have(piece) => {
                self.their_bitfield.insert(piece);
                exchange.bitfield_updated(self.addr, &self.their_bitfield);
            }
            Message::Request(request) => exchange.request_received(self.addr, request),
            Message::Cancel(request) => exchange.cancel_received(self.addr, request),
            Message::Piece(block) => {
                stats
                    .downloaded
                    .fetch_add(block.data.len() as u64, Ordering::Relaxed);
                exchange.block_received(self.addr, block);
            }
            Message::Port(port) => {
                if let Some(discovery) = discovery {
                    discovery.observe(SocketAddr::new(self.addr.ip(), port));
                }
            }
            Message::Bitfield(_) => unreachable!("handled above"),
        }

        Ok(())
    }
}
