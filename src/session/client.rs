use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, watch, Semaphore};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, trace, warn};

use super::error::SessionError;
use super::events::Event;
use super::handle::TorrentHandle;
use super::progress::{Progress, ProgressSnapshot};
use super::swarm::SwarmSession;
use crate::constants::{
    DEFAULT_MAX_THREADS, EVENT_CHANNEL_DEPTH, LISTEN_PORT_FIRST, LISTEN_PORT_LAST,
    MAX_PEERS_PER_SWARM,
};
use crate::discovery::PeerDiscovery;
use crate::exchange::Exchange;
use crate::metainfo::{InfoHash, Metainfo};
use crate::peer::{Extensions, PeerId, PeerTransport};
use crate::tracker::TrackerSession;

/// Tunables for a client session.
#[derive(Clone)]
pub struct ClientConfig {
    /// Client-wide budget of concurrent peer tasks.
    pub max_threads: usize,
    /// Peer slots per swarm.
    pub max_peers_per_swarm: usize,
    /// Capabilities advertised in every handshake.
    pub extensions: Extensions,
    /// Ports tried in order for the peer listener.
    pub listen_ports: RangeInclusive<u16>,
    /// Where resume files live; `None` disables persistence.
    pub resume_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_threads: DEFAULT_MAX_THREADS,
            max_peers_per_swarm: MAX_PEERS_PER_SWARM,
            extensions: Extensions::DHT,
            listen_ports: LISTEN_PORT_FIRST..=LISTEN_PORT_LAST,
            resume_dir: None,
        }
    }
}

/// Client state shared with every swarm (the "back-reference").
pub(crate) struct ClientShared {
    pub peer_id: PeerId,
    pub extensions: Extensions,
    pub listen_port: u16,
    pub thread_permits: Arc<Semaphore>,
    pub max_threads: usize,
    pub events: broadcast::Sender<Event>,
    pub discovery: Option<Arc<dyn PeerDiscovery>>,
}

/// The top-level container: one per process.
///
/// Owns the peer id, the listener, the thread budget and the handle
/// map. Torrents are opened through it and controlled through the
/// returned [`TorrentHandle`]s.
pub struct ClientSession {
    shared: Arc<ClientShared>,
    max_peers_per_swarm: usize,
    resume_dir: Option<PathBuf>,
    handles: DashMap<InfoHash, Arc<TorrentHandle>>,
    shutdown: watch::Sender<bool>,
}

impl ClientSession {
    /// Creates a client: generates the peer id, binds the listener by
    /// scanning the configured port range, and starts accepting.
    ///
    /// Failing to bind every port in the range is fatal.
    pub async fn new(
        config: ClientConfig,
        discovery: Option<Arc<dyn PeerDiscovery>>,
    ) -> Result<Arc<Self>, SessionError> {
        let peer_id = PeerId::generate();
        let (listener, listen_port) = bind_listener(&config.listen_ports).await?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_DEPTH);
        let (shutdown, _) = watch::channel(false);

        let shared = Arc::new(ClientShared {
            peer_id,
            extensions: config.extensions,
            listen_port,
            thread_permits: Arc::new(Semaphore::new(config.max_threads)),
            max_threads: config.max_threads,
            events,
            discovery,
        });

        let client = Arc::new(Self {
            shared,
            max_peers_per_swarm: config.max_peers_per_swarm,
            resume_dir: config.resume_dir,
            handles: DashMap::new(),
            shutdown,
        });

        tokio::spawn(client.clone().accept_loop(listener));
        info!(peer_id = %peer_id, port = listen_port, "client session started");
        Ok(client)
    }

    pub fn peer_id(&self) -> PeerId {
        self.shared.peer_id
    }

    pub fn listen_port(&self) -> u16 {
        self.shared.listen_port
    }

    /// Subscribes to the client's event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.shared.events.subscribe()
    }

    /// Opens a torrent from parsed metadata, idempotently by info hash.
    ///
    /// Re-opening an existing info hash returns the existing handle
    /// unchanged and emits no event.
    pub fn open_torrent(
        &self,
        meta: &Metainfo,
        exchange: Arc<dyn Exchange>,
    ) -> Arc<TorrentHandle> {
        self.open(
            meta.info_hash,
            meta.piece_count,
            meta.total_length,
            meta.private,
            &meta.trackers,
            exchange,
        )
    }

    /// Opens a torrent from a bare info hash (magnet-style).
    ///
    /// The piece geometry is unknown until the metadata arrives from a
    /// collaborator; the swarm starts with an empty view.
    pub fn open_magnet(
        &self,
        info_hash: InfoHash,
        trackers: &[String],
        exchange: Arc<dyn Exchange>,
    ) -> Arc<TorrentHandle> {
        self.open(info_hash, 0, 0, false, trackers, exchange)
    }

    fn open(
        &self,
        info_hash: InfoHash,
        piece_count: u32,
        total_length: u64,
        private: bool,
        tracker_urls: &[String],
        exchange: Arc<dyn Exchange>,
    ) -> Arc<TorrentHandle> {
        use dashmap::mapref::entry::Entry;

        match self.handles.entry(info_hash) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => {
                let resume_path = self
                    .resume_dir
                    .as_ref()
                    .map(|dir| dir.join(format!("{}.resume", info_hash)));

                let progress = match &resume_path {
                    Some(path) => Progress::load(path, total_length).unwrap_or_else(|e| {
                        warn!(info_hash = %info_hash, error = %e, "ignoring bad resume file");
                        Progress::fresh(total_length)
                    }),
                    None => Progress::fresh(total_length),
                };
                let progress = Arc::new(progress);

                let trackers = Arc::new(TrackerSession::new(tracker_urls));
                let swarm = SwarmSession::new(
                    self.shared.clone(),
                    info_hash,
                    piece_count,
                    private,
                    trackers.clone(),
                    progress.clone(),
                    exchange,
                    self.max_peers_per_swarm,
                );

                let handle = Arc::new(TorrentHandle::new(
                    info_hash,
                    private,
                    swarm,
                    trackers,
                    progress,
                    resume_path,
                    self.shared.clone(),
                ));
                slot.insert(handle.clone());

                let _ = self.shared.events.send(Event::TorrentAdded(info_hash));
                handle
            }
        }
    }

    /// The handle for an open torrent, if any.
    pub fn handle(&self, info_hash: InfoHash) -> Option<Arc<TorrentHandle>> {
        self.handles.get(&info_hash).map(|entry| entry.value().clone())
    }

    /// Number of open swarms.
    pub fn swarm_count(&self) -> usize {
        self.handles.len()
    }

    /// Number of peer tasks currently holding a thread permit.
    pub fn peer_count(&self) -> usize {
        self.shared.max_threads - self.shared.thread_permits.available_permits()
    }

    /// Client-wide transfer totals across all open torrents.
    pub fn current_progress(&self) -> ProgressSnapshot {
        let mut total = ProgressSnapshot::default();
        for entry in self.handles.iter() {
            total.merge(entry.progress());
        }
        total
    }

    /// Stops a torrent, persists its progress, and forgets the handle.
    pub async fn close_handle(&self, info_hash: InfoHash) {
        if let Some((_, handle)) = self.handles.remove(&info_hash) {
            handle.close().await;
        }
    }

    /// Stops everything: all torrents, then the listener.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);

        let open: Vec<InfoHash> = self.handles.iter().map(|entry| *entry.key()).collect();
        for info_hash in open {
            self.close_handle(info_hash).await;
        }
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        let mut shutdown = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            trace!(%addr, "inbound connection");
                            let client = self.clone();
                            tokio::spawn(async move { client.route_inbound(stream).await });
                        }
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                            sleep(Duration::from_millis(100)).await;
                        }
                    }
                }
            }
        }
    }

    /// Reads the inbound handshake and routes by info hash.
    ///
    /// Unknown info hashes and stopped torrents drop the connection.
    async fn route_inbound(self: Arc<Self>, stream: TcpStream) {
        let mut transport = PeerTransport::new(stream);
        let theirs = match transport.receive_handshake().await {
            Ok(handshake) => handshake,
            Err(e) => {
                debug!(error = %e, "inbound handshake failed");
                return;
            }
        };

        match self.handle(theirs.info_hash) {
            Some(handle) => handle.route_inbound(transport, theirs),
            None => debug!(info_hash = %theirs.info_hash, "inbound for unknown torrent"),
        }
    }
}

async fn bind_listener(
    range: &RangeInclusive<u16>,
) -> Result<(TcpListener, u16), SessionError> {
    for port in range.clone() {
        match TcpListener::bind(("0.0.0.0", port)).await {
            Ok(listener) => {
                let port = listener.local_addr()?.port();
                return Ok((listener, port));
            }
            Err(e) => debug!(port, error = %e, "listen bind failed"),
        }
    }

    Err(SessionError::NoListenPort(*range.start(), *range.end()))
}
