use super::error::TrackerError;
use super::response::TrackerEvent;
use crate::metainfo::InfoHash;
use crate::peer::PeerId;

/// Everything a client reports in one announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnounceQuery {
    pub info_hash: InfoHash,
    pub peer_id: PeerId,
    /// The port we accept peer connections on.
    pub port: u16,
    pub uploaded: u64,
    pub downloaded: u64,
    /// Bytes still missing from the content set.
    pub left: u64,
    pub event: TrackerEvent,
}

impl AnnounceQuery {
    /// Renders the HTTP query string.
    ///
    /// `info_hash` and `peer_id` are percent-encoded raw bytes, never
    /// hex. A `None` event emits no `event` key.
    pub fn render(&self) -> String {
        let mut query = format!(
            "info_hash={}&peer_id={}&port={}&uploaded={}&downloaded={}&left={}&compact=1",
            percent_encode(self.info_hash.as_bytes()),
            percent_encode(self.peer_id.as_bytes()),
            self.port,
            self.uploaded,
            self.downloaded,
            self.left,
        );

        let event = self.event.as_str();
        if !event.is_empty() {
            query.push_str("&event=");
            query.push_str(event);
        }

        query
    }

    /// Parses a query string rendered by [`AnnounceQuery::render`].
    ///
    /// `parse(q.render()) == q` for every query.
    pub fn parse(query: &str) -> Result<Self, TrackerError> {
        let mut info_hash = None;
        let mut peer_id = None;
        let mut port = None;
        let mut uploaded = None;
        let mut downloaded = None;
        let mut left = None;
        let mut event = TrackerEvent::None;

        for pair in query.split('&') {
            let (key, raw) = pair
                .split_once('=')
                .ok_or_else(|| TrackerError::InvalidUrl(format!("bare key: {}", pair)))?;

            match key {
                "info_hash" => {
                    let bytes = percent_decode(raw)?;
                    let bytes: [u8; 20] = bytes.try_into().map_err(|_| {
                        TrackerError::InvalidUrl("info_hash is not 20 bytes".into())
                    })?;
                    info_hash = Some(InfoHash::from_bytes(bytes));
                }
                "peer_id" => {
                    let bytes = percent_decode(raw)?;
                    peer_id = Some(PeerId::from_bytes(&bytes).ok_or_else(|| {
                        TrackerError::InvalidUrl("peer_id is not 20 bytes".into())
                    })?);
                }
                "port" => port = Some(parse_int(raw)? as u16),
                "uploaded" => uploaded = Some(parse_int(raw)?),
                "downloaded" => downloaded = Some(parse_int(raw)?),
                "left" => left = Some(parse_int(raw)?),
                "event" => {
                    event = TrackerEvent::parse(raw).ok_or_else(|| {
                        TrackerError::InvalidUrl(format!("unknown event: {}", raw))
                    })?;
                }
                // compact and any extension keys are accepted silently
                _ => {}
            }
        }

        let missing = |name: &str| TrackerError::InvalidUrl(format!("missing {}", name));
        Ok(Self {
            info_hash: info_hash.ok_or_else(|| missing("info_hash"))?,
            peer_id: peer_id.ok_or_else(|| missing("peer_id"))?,
            port: port.ok_or_else(|| missing("port"))?,
            uploaded: uploaded.ok_or_else(|| missing("uploaded"))?,
            downloaded: downloaded.ok_or_else(|| missing("downloaded"))?,
            left: left.ok_or_else(|| missing("left"))?,
            event,
        })
    }
}

fn parse_int(raw: &str) -> Result<u64, TrackerError> {
    raw.parse()
        .map_err(|_| TrackerError::InvalidUrl(format!("bad integer: {}", raw)))
}

/// Percent-encodes raw bytes for a tracker query string.
///
/// Unreserved characters pass through; everything else becomes `%XX`.
pub fn percent_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for &b in bytes {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

/// Decodes a percent-encoded query value back to raw bytes.
pub fn percent_decode(s: &str) -> Result<Vec<u8>, TrackerError> {
    let raw = s.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        match raw[i] {
            b'%' => {
                let hex = raw
                    .get(i + 1..i + 3)
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| {
                        TrackerError::InvalidUrl(format!("bad escape in: {}", s))
                    })?;
                out.push(hex);
                i += 3;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    Ok(out)
}
