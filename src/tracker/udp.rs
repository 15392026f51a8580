use std::net::SocketAddr;
use std::time::Instant;

use rand::Rng as _;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout_at;
use tracing::{debug, trace};

use super::error::TrackerError;
use super::query::AnnounceQuery;
use super::response::{parse_compact_peers, AnnounceInfo, ScrapeInfo};
use crate::constants::{
    UDP_CONNECTION_LIFETIME, UDP_MAX_ATTEMPTS, UDP_RECV_BUFFER, UDP_TIMEOUT_BASE,
};
use crate::metainfo::InfoHash;

/// The magic connection id that opens every BEP-15 conversation.
const PROTOCOL_MAGIC: u64 = 0x41727101980;

const ACTION_CONNECT: u32 = 0;
const ACTION_ANNOUNCE: u32 = 1;
const ACTION_SCRAPE: u32 = 2;
const ACTION_ERROR: u32 = 3;

/// A UDP tracker client ([BEP-15]).
///
/// The protocol is two-phase: a `connect` exchange yields a connection
/// id valid for 60 seconds, which then authorises announces and scrapes.
/// Expiry is handled transparently; callers never see the connect
/// round-trip.
///
/// [BEP-15]: http://bittorrent.org/beps/bep_0015.html
pub struct UdpTracker {
    url: String,
    host: String,
    socket: Option<UdpSocket>,
    remote: Option<SocketAddr>,
    connection: Option<Connection>,
}

#[derive(Clone, Copy)]
struct Connection {
    id: u64,
    obtained_at: Instant,
}

impl Connection {
    fn expired(&self) -> bool {
        self.obtained_at.elapsed() >= UDP_CONNECTION_LIFETIME
    }
}

impl UdpTracker {
    /// Parses a `udp://host:port[/path]` tracker URL.
    ///
    /// Name resolution and socket binding are deferred to the first
    /// call, so building a tracker list never blocks.
    pub fn new(url: &str) -> Result<Self, TrackerError> {
        let rest = url
            .strip_prefix("udp://")
            .ok_or_else(|| TrackerError::InvalidUrl(url.to_string()))?;

        let host = rest.split('/').next().unwrap_or(rest);
        if host.is_empty() {
            return Err(TrackerError::InvalidUrl(url.to_string()));
        }

        Ok(Self {
            url: url.to_string(),
            host: host.to_string(),
            socket: None,
            remote: None,
            connection: None,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn announce(
        &mut self,
        query: &AnnounceQuery,
    ) -> Result<AnnounceInfo, TrackerError> {
        debug!(url = %self.url, event = query.event.as_str(), "udp announce");

        let mut tail = Vec::with_capacity(82);
        tail.extend_from_slice(query.info_hash.as_bytes());
        tail.extend_from_slice(query.peer_id.as_bytes());
        tail.extend_from_slice(&query.downloaded.to_be_bytes());
        tail.extend_from_slice(&query.left.to_be_bytes());
        tail.extend_from_slice(&query.uploaded.to_be_bytes());
        tail.extend_from_slice(&query.event.as_udp_id().to_be_bytes());
        tail.extend_from_slice(&0u32.to_be_bytes()); // IP: let the tracker use the source
        tail.extend_from_slice(&rand::rng().random::<u32>().to_be_bytes()); // key
        tail.extend_from_slice(&(-1i32).to_be_bytes()); // num_want: tracker default
        tail.extend_from_slice(&query.port.to_be_bytes());

        let response = self.request(ACTION_ANNOUNCE, &tail, 20).await?;

        let interval = be_u32(&response[8..12]);
        let leechers = be_u32(&response[12..16]);
        let seeders = be_u32(&response[16..20]);

        let mut info = AnnounceInfo::new(interval);
        info.complete = Some(seeders);
        info.incomplete = Some(leechers);
        info.peers = parse_compact_peers(&response[20..]);

        Ok(info)
    }

    /// Scrapes statistics; entries come back in request order.
    pub async fn scrape(
        &mut self,
        info_hashes: &[InfoHash],
    ) -> Result<Vec<(InfoHash, ScrapeInfo)>, TrackerError> {
        let mut tail = Vec::with_capacity(info_hashes.len() * 20);
        for hash in info_hashes {
            tail.extend_from_slice(hash.as_bytes());
        }

        let needed = 8 + info_hashes.len() * 12;
        let response = self.request(ACTION_SCRAPE, &tail, needed).await?;

        let entries = response[8..]
            .chunks_exact(12)
            .zip(info_hashes)
            .map(|(chunk, &hash)| {
                (
                    hash,
                    ScrapeInfo {
                        complete: be_u32(&chunk[0..4]),
                        downloaded: be_u32(&chunk[4..8]),
                        incomplete: be_u32(&chunk[8..12]),
                        name: None,
                    },
                )
            })
            .collect();

        Ok(entries)
    }

    /// Runs an announce or scrape through the retransmission schedule.
    ///
    /// Each attempt carries a fresh transaction id and re-establishes
    /// the connection id first whenever the stored one has expired, so a
    /// long schedule never sends with a stale id.
    async fn request(
        &mut self,
        action: u32,
        tail: &[u8],
        min_len: usize,
    ) -> Result<Vec<u8>, TrackerError> {
        self.ensure_socket().await?;

        for attempt in 0..UDP_MAX_ATTEMPTS {
            let connection_id = self.connection_id().await?;
            let window = UDP_TIMEOUT_BASE * 2u32.pow(attempt);

            let socket = self.socket.as_ref().expect("socket ensured above");
            let remote = self.remote.expect("remote ensured above");

            match attempt_exchange(socket, remote, connection_id, action, tail, window).await? {
                Some(response) => {
                    if response.len() < min_len {
                        return Err(TrackerError::InvalidResponse(format!(
                            "{} byte response, needed {}",
                            response.len(),
                            min_len
                        )));
                    }
                    return Ok(response);
                }
                None => {
                    trace!(url = %self.url, attempt, "udp window elapsed, retransmitting");
                }
            }
        }

        Err(TrackerError::Timeout)
    }

    /// Returns a live connection id, running connect when needed.
    ///
    /// Connect uses the same retransmission schedule as every other
    /// action, with the magic id in the connection field.
    async fn connection_id(&mut self) -> Result<u64, TrackerError> {
        if let Some(connection) = self.connection.filter(|c| !c.expired()) {
            return Ok(connection.id);
        }
        self.connection = None;

        let socket = self.socket.as_ref().expect("socket ensured by caller");
        let remote = self.remote.expect("remote ensured by caller");

        for attempt in 0..UDP_MAX_ATTEMPTS {
            let window = UDP_TIMEOUT_BASE * 2u32.pow(attempt);

            match attempt_exchange(socket, remote, PROTOCOL_MAGIC, ACTION_CONNECT, &[], window)
                .await?
            {
                Some(response) if response.len() >= 16 => {
                    let connection = Connection {
                        id: be_u64(&response[8..16]),
                        obtained_at: Instant::now(),
                    };
                    self.connection = Some(connection);
                    debug!(url = %self.url, "udp tracker connected");
                    return Ok(connection.id);
                }
                Some(_) => {
                    return Err(TrackerError::InvalidResponse(
                        "short connect response".into(),
                    ))
                }
                None => {
                    trace!(url = %self.url, attempt, "udp connect window elapsed");
                }
            }
        }

        Err(TrackerError::Timeout)
    }

    async fn ensure_socket(&mut self) -> Result<(), TrackerError> {
        if self.socket.is_some() {
            return Ok(());
        }

        let remote = lookup_host(&self.host)
            .await?
            .next()
            .ok_or_else(|| TrackerError::InvalidUrl(self.host.clone()))?;

        let bind_addr = if remote.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        self.socket = Some(UdpSocket::bind(bind_addr).await?);
        self.remote = Some(remote);
        Ok(())
    }
}

/// Sends one packet and waits out one retransmission window.
///
/// `None` means the window closed without a matching response; the
/// caller retransmits with a fresh transaction id.
async fn attempt_exchange(
    socket: &UdpSocket,
    remote: SocketAddr,
    connection_id: u64,
    action: u32,
    tail: &[u8],
    window: std::time::Duration,
) -> Result<Option<Vec<u8>>, TrackerError> {
    let transaction_id: u32 = rand::rng().random();

    let mut packet = Vec::with_capacity(16 + tail.len());
    packet.extend_from_slice(&connection_id.to_be_bytes());
    packet.extend_from_slice(&action.to_be_bytes());
    packet.extend_from_slice(&transaction_id.to_be_bytes());
    packet.extend_from_slice(tail);

    socket.send_to(&packet, remote).await?;

    let deadline = tokio::time::Instant::now() + window;
    let mut buf = vec![0u8; UDP_RECV_BUFFER];

    loop {
        let (len, from) = match timeout_at(deadline, socket.recv_from(&mut buf)).await {
            Err(_) => return Ok(None),
            Ok(received) => received?,
        };
        let data = &buf[..len];

        match validate(data, from, remote, transaction_id) {
            Err(TrackerError::TransactionMismatch) => {
                trace!(%from, "discarding mismatched datagram");
                continue;
            }
            Err(other) => return Err(other),
            Ok(ACTION_ERROR) => {
                let message = String::from_utf8_lossy(&data[8..]).into_owned();
                return Err(TrackerError::Failure(message));
            }
            Ok(received_action) if received_action != action => {
                return Err(TrackerError::InvalidResponse(format!(
                    "action {} to a {} request",
                    received_action, action
                )));
            }
            Ok(_) => return Ok(Some(data.to_vec())),
        }
    }
}

/// Checks sender and transaction id; mismatches are discardable.
fn validate(
    data: &[u8],
    from: SocketAddr,
    remote: SocketAddr,
    transaction_id: u32,
) -> Result<u32, TrackerError> {
    if from != remote || data.len() < 8 {
        return Err(TrackerError::TransactionMismatch);
    }
    if be_u32(&data[4..8]) != transaction_id {
        return Err(TrackerError::TransactionMismatch);
    }
    Ok(be_u32(&data[0..4]))
}

fn be_u32(data: &[u8]) -> u32 {
    u32::from_be_bytes(data[..4].try_into().expect("slice of 4"))
}

fn be_u64(data: &[u8]) -> u64 {
    u64::from_be_bytes(data[..8].try_into().expect("slice of 8"))
}
