use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::error::TrackerError;
use super::http::HttpTracker;
use super::query::AnnounceQuery;
use super::response::{AnnounceInfo, ScrapeInfo};
use super::udp::UdpTracker;
use crate::metainfo::InfoHash;

/// A tracker of either transport, chosen by URL scheme.
pub enum Tracker {
    Http(HttpTracker),
    Udp(UdpTracker),
}

impl Tracker {
    pub fn new(url: &str) -> Result<Self, TrackerError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            Ok(Tracker::Http(HttpTracker::new(url)?))
        } else if url.starts_with("udp://") {
            Ok(Tracker::Udp(UdpTracker::new(url)?))
        } else {
            Err(TrackerError::UnsupportedProtocol(url.to_string()))
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Tracker::Http(t) => t.url(),
            Tracker::Udp(t) => t.url(),
        }
    }

    pub async fn announce(&mut self, query: &AnnounceQuery) -> Result<AnnounceInfo, TrackerError> {
        match self {
            Tracker::Http(t) => t.announce(query).await,
            Tracker::Udp(t) => t.announce(query).await,
        }
    }

    pub async fn scrape(
        &mut self,
        info_hashes: &[InfoHash],
    ) -> Result<Vec<(InfoHash, ScrapeInfo)>, TrackerError> {
        match self {
            Tracker::Http(t) => t.scrape(info_hashes).await,
            Tracker::Udp(t) => t.scrape(info_hashes).await,
        }
    }
}

/// A swarm's tracker list behind one lock.
///
/// Holding the lock across each call serialises a swarm's announces:
/// at most one is in flight at any time, per the announce protocol's
/// expectations. Trackers are tried in metainfo order; the first answer
/// wins.
pub struct TrackerSession {
    trackers: Mutex<Vec<Tracker>>,
}

impl TrackerSession {
    /// Builds a session from tracker URLs, skipping unusable ones.
    pub fn new(urls: &[String]) -> Self {
        let trackers = urls
            .iter()
            .filter_map(|url| match Tracker::new(url) {
                Ok(tracker) => Some(tracker),
                Err(e) => {
                    warn!(url = %url, error = %e, "skipping tracker");
                    None
                }
            })
            .collect();

        Self {
            trackers: Mutex::new(trackers),
        }
    }

    pub async fn tracker_count(&self) -> usize {
        self.trackers.lock().await.len()
    }

    /// Announces to the first tracker that answers.
    pub async fn announce(&self, query: &AnnounceQuery) -> Result<AnnounceInfo, TrackerError> {
        let mut trackers = self.trackers.lock().await;

        let mut last_error = TrackerError::InvalidUrl("no usable trackers".into());
        for tracker in trackers.iter_mut() {
            match tracker.announce(query).await {
                Ok(info) => {
                    debug!(
                        url = %tracker.url(),
                        peers = info.peers.len(),
                        interval = info.interval,
                        "announce ok"
                    );
                    return Ok(info);
                }
                Err(e) => {
                    debug!(url = %tracker.url(), error = %e, "announce failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Scrapes the first tracker that answers.
    pub async fn scrape(
        &self,
        info_hashes: &[InfoHash],
    ) -> Result<Vec<(InfoHash, ScrapeInfo)>, TrackerError> {
        let mut trackers = self.trackers.lock().await;

        let mut last_error = TrackerError::InvalidUrl("no usable trackers".into());
        for tracker in trackers.iter_mut() {
            match tracker.scrape(info_hashes).await {
                Ok(entries) => return Ok(entries),
                Err(e) => last_error = e,
            }
        }

        Err(last_error)
    }
}
