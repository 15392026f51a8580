use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rand::Rng as _;
use tokio::sync::{mpsc, watch, Notify, OwnedSemaphorePermit, Semaphore};
use tokio::time::{interval, sleep, timeout, Duration, Instant};
use tracing::{debug, warn};

use super::client::ClientShared;
use super::events::Event;
use super::progress::Progress;
use crate::constants::{
    OUTBOUND_QUEUE_DEPTH, SHUTDOWN_DEADLINE, STOP_ANNOUNCE_DEADLINE, TRACKER_BACKOFF_CAP,
    UNCHOKE_INTERVAL, UNCHOKE_SLOTS,
};
use crate::discovery::PeerDiscovery;
use crate::exchange::{Exchange, PeerLink};
use crate::metainfo::InfoHash;
use crate::peer::{
    Bitfield, Handshake, Message, PeerError, PeerSession, PeerStats, PeerTransport,
};
use crate::tracker::{AnnounceQuery, TrackerEvent, TrackerSession};

/// A connected peer as the swarm tracks it.
struct PeerHandle {
    outbound: mpsc::Sender<Message>,
    stats: Arc<PeerStats>,
}

/// Both admission permits, released in reverse acquisition order.
///
/// Field order matters: the swarm permit drops before the client one.
struct AdmissionPermits {
    _vacancy: OwnedSemaphorePermit,
    _thread: OwnedSemaphorePermit,
}

/// Coordinator for one info hash.
///
/// Owns the bounded set of peer sessions, drives the tracker announce
/// loop, rotates unchoke slots, and gives the exchange scheduler its
/// completion view. Peer admission is gated by two semaphores acquired
/// in a fixed order: the client-wide thread budget first, then this
/// swarm's vacancy slots, so no single swarm can starve the others.
pub struct SwarmSession {
    info_hash: InfoHash,
    piece_count: u32,
    private: bool,
    client: Arc<ClientShared>,
    trackers: Arc<TrackerSession>,
    progress: Arc<Progress>,
    exchange: Arc<dyn Exchange>,
    our_bitfield: RwLock<Bitfield>,
    connected_peers: RwLock<HashMap<SocketAddr, PeerHandle>>,
    vacancy: Arc<Semaphore>,
    paused: AtomicBool,
    completed_sent: AtomicBool,
    completion: Notify,
    shutdown: watch::Sender<bool>,
}

impl SwarmSession {
    pub(crate) fn new(
        client: Arc<ClientShared>,
        info_hash: InfoHash,
        piece_count: u32,
        private: bool,
        trackers: Arc<TrackerSession>,
        progress: Arc<Progress>,
        exchange: Arc<dyn Exchange>,
        max_peers: usize,
    ) -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);

        Arc::new(Self {
            info_hash,
            piece_count,
            private,
            client,
            trackers,
            progress,
            exchange,
            our_bitfield: RwLock::new(Bitfield::new(piece_count)),
            connected_peers: RwLock::new(HashMap::new()),
            vacancy: Arc::new(Semaphore::new(max_peers)),
            paused: AtomicBool::new(false),
            completed_sent: AtomicBool::new(false),
            completion: Notify::new(),
            shutdown,
        })
    }

    pub fn info_hash(&self) -> InfoHash {
        self.info_hash
    }

    pub fn peer_count(&self) -> usize {
        self.connected_peers.read().len()
    }

    /// Snapshot of our piece set.
    pub fn our_bitfield(&self) -> Bitfield {
        self.our_bitfield.read().clone()
    }

    pub fn progress(&self) -> &Arc<Progress> {
        &self.progress
    }

    pub(crate) fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    /// Records a verified piece.
    ///
    /// The bitfield update and the Have broadcast to every connected
    /// peer happen under one lock, so a peer admitted later sees the
    /// piece in our bitfield and a peer admitted earlier gets the Have:
    /// nobody misses a completed piece.
    pub fn mark_piece_complete(&self, piece: u32) {
        let mut field = self.our_bitfield.write();
        if field.test(piece) {
            return;
        }
        field.insert(piece);

        for handle in self.connected_peers.read().values() {
            let _ = handle.outbound.try_send(Message::Have(piece));
        }

        if field.have_all() {
            self.completion.notify_one();
        }
    }

    /// Starts the swarm's background loops.
    pub(crate) fn launch(self: &Arc<Self>) {
        let _ = self.shutdown.send(false);
        self.paused.store(false, Ordering::SeqCst);

        let swarm = self.clone();
        tokio::spawn(async move { swarm.tracker_loop().await });

        let swarm = self.clone();
        tokio::spawn(async move { swarm.unchoke_loop().await });

        if !self.private {
            if let Some(discovery) = self.client.discovery.clone() {
                let swarm = self.clone();
                tokio::spawn(async move { swarm.discovery_pump(discovery).await });
            }
        }
    }

    /// Winds the swarm down: cancellation to every peer task, then a
    /// best-effort Stopped announce, then a bounded wait for the peer
    /// set to drain.
    pub(crate) async fn halt(&self) {
        let _ = self.shutdown.send(true);

        let query = self.announce_query(TrackerEvent::Stopped);
        match timeout(STOP_ANNOUNCE_DEADLINE, self.trackers.announce(&query)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => debug!(info_hash = %self.info_hash, error = %e, "stopped announce failed"),
            Err(_) => debug!(info_hash = %self.info_hash, "stopped announce timed out"),
        }

        let deadline = Instant::now() + SHUTDOWN_DEADLINE;
        while !self.connected_peers.read().is_empty() && Instant::now() < deadline {
            sleep(Duration::from_millis(25)).await;
        }
    }

    /// Queues an outbound connection attempt to a discovered peer.
    pub(crate) fn spawn_outbound(self: &Arc<Self>, addr: SocketAddr) {
        if self.paused.load(Ordering::SeqCst) || *self.shutdown.borrow() {
            return;
        }
        if self.connected_peers.read().contains_key(&addr) {
            return;
        }

        let swarm = self.clone();
        tokio::spawn(async move {
            let permits = match swarm.acquire_permits().await {
                Some(permits) => permits,
                None => return,
            };

            let result = async {
                let session = PeerSession::connect(
                    addr,
                    swarm.info_hash,
                    swarm.client.peer_id,
                    swarm.client.extensions,
                    swarm.piece_count,
                )
                .await?;
                swarm.run_session(session).await
            }
            .await;

            if let Err(e) = result {
                debug!(%addr, error = %e, "outbound peer ended");
            }
            drop(permits);
        });
    }

    /// Adopts an inbound connection routed here by the client.
    pub(crate) fn spawn_inbound(self: &Arc<Self>, transport: PeerTransport, theirs: Handshake) {
        if self.paused.load(Ordering::SeqCst) || *self.shutdown.borrow() {
            return;
        }

        let swarm = self.clone();
        tokio::spawn(async move {
            let permits = match swarm.acquire_permits().await {
                Some(permits) => permits,
                None => return,
            };

            let result = async {
                let session = PeerSession::answer(
                    transport,
                    theirs,
                    swarm.info_hash,
                    swarm.client.peer_id,
                    swarm.client.extensions,
                    swarm.piece_count,
                )
                .await?;
                swarm.run_session(session).await
            }
            .await;

            if let Err(e) = result {
                debug!(error = %e, "inbound peer ended");
            }
            drop(permits);
        });
    }

    /// Takes the client permit first, then this swarm's vacancy slot.
    ///
    /// The fixed order is what prevents deadlock between swarms; the
    /// guard's field order releases them in reverse.
    async fn acquire_permits(&self) -> Option<AdmissionPermits> {
        let thread = self
            .client
            .thread_permits
            .clone()
            .acquire_owned()
            .await
            .ok()?;
        let vacancy = self.vacancy.clone().acquire_owned().await.ok()?;
        Some(AdmissionPermits {
            _vacancy: vacancy,
            _thread: thread,
        })
    }

    /// Registers an established session and drives it to completion.
    async fn run_session(&self, session: PeerSession) -> Result<(), PeerError> {
        let addr = session.addr();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        let stats = Arc::new(PeerStats::new());

        {
            let mut peers = self.connected_peers.write();
            if peers.contains_key(&addr) {
                // Simultaneous connect; the established session wins.
                return Ok(());
            }
            peers.insert(
                addr,
                PeerHandle {
                    outbound: outbound_tx.clone(),
                    stats: stats.clone(),
                },
            );
        }

        self.exchange.peer_ready(PeerLink {
            addr,
            peer_id: session.peer_id(),
            outbound: outbound_tx,
        });

        let our_field = self.our_bitfield.read().clone();
        let result = session
            .run(
                our_field,
                stats,
                outbound_rx,
                self.shutdown.subscribe(),
                self.exchange.clone(),
                self.client.discovery.clone(),
            )
            .await;

        self.connected_peers.write().remove(&addr);
        self.exchange.peer_closed(addr);
        result
    }

    async fn tracker_loop(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        let mut event = TrackerEvent::Started;
        let mut backoff: Option<Duration> = None;

        loop {
            if *shutdown.borrow() {
                return;
            }

            let query = self.announce_query(event);
            let delay = match self.trackers.announce(&query).await {
                Ok(info) => {
                    event = TrackerEvent::None;
                    backoff = None;

                    if let Some(warning) = info.warning {
                        self.warn_event("tracker", warning);
                    }
                    if !self.paused.load(Ordering::SeqCst) {
                        for peer in &info.peers {
                            self.spawn_outbound(peer.addr);
                        }
                    }

                    Duration::from_secs(u64::from(info.interval))
                }
                Err(e) => {
                    warn!(info_hash = %self.info_hash, error = %e, "announce failed");
                    self.warn_event("tracker", e.to_string());

                    let next = backoff
                        .map_or(Duration::from_secs(30), |d| (d * 2).min(TRACKER_BACKOFF_CAP));
                    backoff = Some(next);
                    next
                }
            };

            let pause = sleep(delay);
            tokio::pin!(pause);
            loop {
                tokio::select! {
                    _ = &mut pause => break,
                    _ = self.completion.notified() => {
                        if self.our_bitfield.read().have_all()
                            && !self.completed_sent.swap(true, Ordering::SeqCst)
                        {
                            event = TrackerEvent::Completed;
                            break;
                        }
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn unchoke_loop(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        let mut ticker = interval(UNCHOKE_INTERVAL);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.rotate_unchoke(),
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }

    /// Reassigns the unchoke slots.
    ///
    /// The peers feeding us the most keep all but one slot; the last is
    /// an optimistic pick among the remaining interested peers so new
    /// arrivals get a chance to prove themselves.
    fn rotate_unchoke(&self) {
        let peers = self.connected_peers.read();

        let mut interested: Vec<(SocketAddr, &PeerHandle)> = peers
            .iter()
            .filter(|(_, handle)| handle.stats.peer_interested.load(Ordering::Relaxed))
            .map(|(addr, handle)| (*addr, handle))
            .collect();
        interested.sort_by_key(|(_, handle)| {
            std::cmp::Reverse(handle.stats.downloaded.load(Ordering::Relaxed))
        });

        let regular = UNCHOKE_SLOTS.saturating_sub(1).min(interested.len());
        let mut chosen: Vec<SocketAddr> =
            interested[..regular].iter().map(|(addr, _)| *addr).collect();

        let rest = &interested[regular..];
        if !rest.is_empty() {
            let pick = rand::rng().random_range(0..rest.len());
            chosen.push(rest[pick].0);
        }

        for (addr, handle) in peers.iter() {
            let should_unchoke = chosen.contains(addr);
            let is_unchoked = !handle.stats.am_choking.load(Ordering::Relaxed);
            if should_unchoke != is_unchoked {
                let message = if should_unchoke {
                    Message::Unchoke
                } else {
                    Message::Choke
                };
                let _ = handle.outbound.try_send(message);
            }
        }
    }

    async fn discovery_pump(self: Arc<Self>, discovery: Arc<dyn PeerDiscovery>) {
        let mut shutdown = self.shutdown.subscribe();
        let mut peers = discovery.lookup(self.info_hash);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
                peer = peers.recv() => {
                    match peer {
                        Some(peer) => self.spawn_outbound(peer.addr),
                        None => return,
                    }
                }
            }
        }
    }

    fn announce_query(&self, event: TrackerEvent) -> AnnounceQuery {
        let snapshot = self.progress.snapshot();
        AnnounceQuery {
            info_hash: self.info_hash,
            peer_id: self.client.peer_id,
            port: self.client.listen_port,
            uploaded: snapshot.uploaded,
            downloaded: snapshot.downloaded,
            left: snapshot.left,
            event,
        }
    }

    fn warn_event(&self, kind: &'static str, detail: String) {
        let _ = self.client.events.send(Event::Warning {
            info_hash: self.info_hash,
            kind,
            detail,
        });
    }
}
