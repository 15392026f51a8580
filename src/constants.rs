//! Protocol constants and tuning defaults.
//!
//! Values follow the defaults of mainstream clients (libtorrent,
//! Transmission, qBittorrent) where the protocol itself does not pin them.

use std::time::Duration;

/// Client ID prefix for peer ID generation (Azureus-style).
pub const CLIENT_PREFIX: &[u8] = b"-RM0001-";

/// First port of the default listener scan range.
pub const LISTEN_PORT_FIRST: u16 = 6881;

/// Last port (inclusive) of the default listener scan range.
pub const LISTEN_PORT_LAST: u16 = 6889;

/// Default client-wide task budget for peer sessions.
pub const DEFAULT_MAX_THREADS: usize = 1000;

/// Peer slots per swarm while leeching.
pub const MAX_PEERS_PER_SWARM: usize = 50;

/// Concurrent unchoked peers per swarm (upload slots).
pub const UNCHOKE_SLOTS: usize = 4;

/// Interval between unchoke rotations.
pub const UNCHOKE_INTERVAL: Duration = Duration::from_secs(10);

/// Standard block size (16 KiB).
pub const BLOCK_SIZE: u32 = 16384;

/// Largest message a peer may send before the connection is dropped.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Close a peer session after this long without a received byte.
pub const INCOMING_TIMEOUT: Duration = Duration::from_secs(120);

/// Send a keep-alive after this long without an outgoing message.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(1);

/// A UDP tracker connection id is valid this long after connect.
pub const UDP_CONNECTION_LIFETIME: Duration = Duration::from_secs(60);

/// Base for the UDP retransmission schedule (15 * 2^n seconds).
pub const UDP_TIMEOUT_BASE: Duration = Duration::from_secs(15);

/// Retransmission attempts before a UDP tracker call gives up.
pub const UDP_MAX_ATTEMPTS: u32 = 8;

/// Receive buffer for UDP tracker responses; must absorb a full peer list.
pub const UDP_RECV_BUFFER: usize = 2048;

/// HTTP tracker request timeout.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Ceiling for the tracker retry backoff after transport errors.
pub const TRACKER_BACKOFF_CAP: Duration = Duration::from_secs(30 * 60);

/// Deadline for the best-effort Stopped announce during shutdown.
pub const STOP_ANNOUNCE_DEADLINE: Duration = Duration::from_secs(5);

/// Deadline for peer tasks to wind down before sockets are dropped.
pub const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

/// Capacity of each peer's outbound message queue.
pub const OUTBOUND_QUEUE_DEPTH: usize = 64;

/// Capacity of the client event broadcast channel.
pub const EVENT_CHANNEL_DEPTH: usize = 128;
