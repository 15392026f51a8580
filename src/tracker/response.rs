use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use bytes::Bytes;

use super::error::TrackerError;
use crate::bencode::Value;
use crate::peer::PeerId;

/// A peer endpoint learned from a tracker or the discovery network.
///
/// The peer id is only present in dictionary-form announce responses;
/// the compact encodings ([BEP-23]) carry address and port alone.
///
/// [BEP-23]: http://bittorrent.org/beps/bep_0023.html
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerAddress {
    pub peer_id: Option<PeerId>,
    pub addr: SocketAddr,
}

impl PeerAddress {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            peer_id: None,
            addr,
        }
    }

    /// Decodes a 6-byte compact entry: IPv4 + port, network order.
    pub fn from_compact_v4(bytes: &[u8]) -> Option<Self> {
        let bytes: &[u8; 6] = bytes.get(..6)?.try_into().ok()?;
        let ip = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
        let port = u16::from_be_bytes([bytes[4], bytes[5]]);
        Some(Self::new(SocketAddr::new(IpAddr::V4(ip), port)))
    }

    /// Decodes an 18-byte compact entry: IPv6 + port, network order.
    pub fn from_compact_v6(bytes: &[u8]) -> Option<Self> {
        let bytes: &[u8; 18] = bytes.get(..18)?.try_into().ok()?;
        let mut ip = [0u8; 16];
        ip.copy_from_slice(&bytes[..16]);
        let port = u16::from_be_bytes([bytes[16], bytes[17]]);
        Some(Self::new(SocketAddr::new(
            IpAddr::V6(Ipv6Addr::from(ip)),
            port,
        )))
    }

    /// Encodes the compact form; 6 bytes for IPv4, 18 for IPv6.
    pub fn to_compact(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(18);
        match self.addr.ip() {
            IpAddr::V4(ip) => out.extend_from_slice(&ip.octets()),
            IpAddr::V6(ip) => out.extend_from_slice(&ip.octets()),
        }
        out.extend_from_slice(&self.addr.port().to_be_bytes());
        out
    }

    /// Decodes the dictionary form: `ip`, `port`, optional `peer id`.
    pub fn from_dict(value: &Value) -> Option<Self> {
        let ip: IpAddr = value.get(b"ip")?.as_str()?.parse().ok()?;
        let port = value.get(b"port")?.as_int()? as u16;
        let peer_id = value
            .get(b"peer id")
            .and_then(Value::as_bytes)
            .and_then(|b| PeerId::from_bytes(b));

        Some(Self {
            peer_id,
            addr: SocketAddr::new(ip, port),
        })
    }
}

/// Decodes a concatenation of 6-byte compact peer entries.
pub fn parse_compact_peers(data: &[u8]) -> Vec<PeerAddress> {
    data.chunks_exact(6)
        .filter_map(PeerAddress::from_compact_v4)
        .collect()
}

/// Decodes a concatenation of 18-byte compact peer entries.
pub fn parse_compact_peers6(data: &[u8]) -> Vec<PeerAddress> {
    data.chunks_exact(18)
        .filter_map(PeerAddress::from_compact_v6)
        .collect()
}

/// The client-state transitions reported to a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerEvent {
    /// Regular periodic announce.
    #[default]
    None,
    Started,
    Stopped,
    Completed,
}

impl TrackerEvent {
    /// The `event` query value; empty for a regular announce.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerEvent::None => "",
            TrackerEvent::Started => "started",
            TrackerEvent::Stopped => "stopped",
            TrackerEvent::Completed => "completed",
        }
    }

    /// The BEP-15 event field.
    pub fn as_udp_id(&self) -> u32 {
        match self {
            TrackerEvent::None => 0,
            TrackerEvent::Completed => 1,
            TrackerEvent::Started => 2,
            TrackerEvent::Stopped => 3,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "" => Some(TrackerEvent::None),
            "started" => Some(TrackerEvent::Started),
            "stopped" => Some(TrackerEvent::Stopped),
            "completed" => Some(TrackerEvent::Completed),
            _ => None,
        }
    }
}

/// What a tracker said back to an announce.
#[derive(Debug, Clone, Default)]
pub struct AnnounceInfo {
    /// Seconds until the next regular announce.
    pub interval: u32,
    /// Floor the tracker asks us to respect for early re-announces.
    pub min_interval: Option<u32>,
    /// Seeder count, if reported.
    pub complete: Option<u32>,
    /// Leecher count, if reported.
    pub incomplete: Option<u32>,
    /// Human-readable caution that does not fail the announce.
    pub warning: Option<String>,
    /// Opaque id to echo on later announces.
    pub tracker_id: Option<String>,
    /// Peers to try, v4 and v6 merged.
    pub peers: Vec<PeerAddress>,
}

impl AnnounceInfo {
    pub fn new(interval: u32) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }
}

/// Per-torrent aggregate statistics from a scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeInfo {
    /// Peers with the complete content set (seeders).
    pub complete: u32,
    /// Completed downloads ever reported.
    pub downloaded: u32,
    /// Peers still downloading (leechers).
    pub incomplete: u32,
    /// Torrent name, if the tracker shares it.
    pub name: Option<String>,
}

impl ScrapeInfo {
    /// Encodes to the bencode dictionary used in scrape responses.
    pub fn to_value(&self) -> Value {
        let mut dict = BTreeMap::new();
        dict.insert(
            Bytes::from_static(b"complete"),
            Value::Int(i64::from(self.complete)),
        );
        dict.insert(
            Bytes::from_static(b"downloaded"),
            Value::Int(i64::from(self.downloaded)),
        );
        dict.insert(
            Bytes::from_static(b"incomplete"),
            Value::Int(i64::from(self.incomplete)),
        );
        if let Some(ref name) = self.name {
            dict.insert(Bytes::from_static(b"name"), Value::text(name));
        }
        Value::Dict(dict)
    }

    /// Decodes one entry of a scrape response's `files` dictionary.
    pub fn from_value(value: &Value) -> Result<Self, TrackerError> {
        let field = |key: &'static [u8]| {
            value
                .get(key)
                .and_then(Value::as_int)
                .map(|n| n as u32)
                .ok_or_else(|| {
                    TrackerError::InvalidResponse(format!(
                        "scrape entry missing {}",
                        String::from_utf8_lossy(key)
                    ))
                })
        };

        Ok(Self {
            complete: field(b"complete")?,
            downloaded: field(b"downloaded")?,
            incomplete: field(b"incomplete")?,
            name: value.get(b"name").and_then(Value::as_str).map(String::from),
        })
    }
}
