use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::client::ClientShared;
use super::events::{Event, TorrentStatus};
use super::progress::{Progress, ProgressSnapshot};
use super::swarm::SwarmSession;
use crate::metainfo::InfoHash;
use crate::peer::{Handshake, PeerTransport};
use crate::tracker::{ScrapeInfo, TrackerError, TrackerSession};

/// The user-facing control surface for one torrent.
///
/// A handle is created by [`ClientSession::open_torrent`] in the
/// `Stopped` state and moves between `Stopped`, `Running` and `Paused`.
/// All transitions are idempotent: repeating one is a silent no-op, so
/// `start` twice announces `Started` exactly once.
///
/// [`ClientSession::open_torrent`]: super::ClientSession::open_torrent
pub struct TorrentHandle {
    info_hash: InfoHash,
    private: bool,
    status: Mutex<TorrentStatus>,
    swarm: Arc<SwarmSession>,
    trackers: Arc<TrackerSession>,
    progress: Arc<Progress>,
    resume_path: Option<PathBuf>,
    client: Arc<ClientShared>,
}

impl TorrentHandle {
    pub(crate) fn new(
        info_hash: InfoHash,
        private: bool,
        swarm: Arc<SwarmSession>,
        trackers: Arc<TrackerSession>,
        progress: Arc<Progress>,
        resume_path: Option<PathBuf>,
        client: Arc<ClientShared>,
    ) -> Self {
        Self {
            info_hash,
            private,
            status: Mutex::new(TorrentStatus::Stopped),
            swarm,
            trackers,
            progress,
            resume_path,
            client,
        }
    }

    pub fn info_hash(&self) -> InfoHash {
        self.info_hash
    }

    /// True when peers must come only from trackers.
    pub fn is_private(&self) -> bool {
        self.private
    }

    pub fn status(&self) -> TorrentStatus {
        *self.status.lock()
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// The live counters, for the exchange collaborator to advance.
    pub fn progress_counters(&self) -> &Arc<Progress> {
        &self.progress
    }

    pub fn swarm(&self) -> &Arc<SwarmSession> {
        &self.swarm
    }

    /// Subscribes to the client's event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.client.events.subscribe()
    }

    /// Starts (or resumes) the torrent.
    ///
    /// `Stopped` launches the swarm loops, registers with the discovery
    /// collaborator when the torrent is not private, and lets the
    /// tracker loop send its `Started` announce. `Paused` merely
    /// resumes peer admission. `Running` is a no-op with no event.
    pub fn start(&self) {
        let mut status = self.status.lock();
        match *status {
            TorrentStatus::Running => return,
            TorrentStatus::Stopped => {
                self.swarm.launch();
                if !self.private {
                    if let Some(discovery) = &self.client.discovery {
                        discovery.insert(self.info_hash);
                    }
                }
            }
            TorrentStatus::Paused => self.swarm.set_paused(false),
        }

        *status = TorrentStatus::Running;
        self.emit_status(TorrentStatus::Running);
    }

    /// Keeps established peers but admits no new ones.
    pub fn pause(&self) {
        let mut status = self.status.lock();
        if *status != TorrentStatus::Running {
            return;
        }

        self.swarm.set_paused(true);
        *status = TorrentStatus::Paused;
        self.emit_status(TorrentStatus::Paused);
    }

    /// Stops the torrent: deregisters from discovery, announces
    /// `Stopped` best-effort, and winds down every peer session.
    /// Idempotent.
    pub async fn stop(&self) {
        {
            let mut status = self.status.lock();
            if *status == TorrentStatus::Stopped {
                return;
            }
            *status = TorrentStatus::Stopped;
        }

        if !self.private {
            if let Some(discovery) = &self.client.discovery {
                discovery.remove(self.info_hash);
            }
        }

        self.swarm.halt().await;
        self.emit_status(TorrentStatus::Stopped);
    }

    /// Stops and persists progress; called when the handle is closed.
    pub(crate) async fn close(&self) {
        self.stop().await;

        if let Some(path) = &self.resume_path {
            if let Err(e) = self.progress.save(path) {
                warn!(info_hash = %self.info_hash, error = %e, "failed to save resume file");
            }
        }
    }

    /// Asks the trackers for this torrent's aggregate statistics.
    pub async fn scrape(&self) -> Result<Option<ScrapeInfo>, TrackerError> {
        let entries = self.trackers.scrape(&[self.info_hash]).await?;
        Ok(entries
            .into_iter()
            .find(|(info_hash, _)| *info_hash == self.info_hash)
            .map(|(_, info)| info))
    }

    /// Records a verified piece and broadcasts the Have.
    pub fn mark_piece_complete(&self, piece: u32) {
        self.swarm.mark_piece_complete(piece);
    }

    pub(crate) fn route_inbound(&self, transport: PeerTransport, theirs: Handshake) {
        if self.status() != TorrentStatus::Running {
            debug!(info_hash = %self.info_hash, "dropping inbound peer, torrent not running");
            return;
        }
        self.swarm.spawn_inbound(transport, theirs);
    }

    fn emit_status(&self, status: TorrentStatus) {
        let _ = self
            .client
            .events
            .send(Event::StatusChanged(self.info_hash, status));
    }
}
