use reqwest::Client;
use tracing::debug;

use super::error::TrackerError;
use super::query::AnnounceQuery;
use super::response::{
    parse_compact_peers, parse_compact_peers6, AnnounceInfo, PeerAddress, ScrapeInfo,
};
use crate::bencode::{decode, Value};
use crate::constants::HTTP_TIMEOUT;
use crate::metainfo::InfoHash;

/// An HTTP(S) tracker client ([BEP-3]).
///
/// Announces are plain GET requests; the response is a bencoded
/// dictionary carrying the peer list in either dictionary or compact
/// form.
///
/// [BEP-3]: http://bittorrent.org/beps/bep_0003.html
pub struct HttpTracker {
    client: Client,
    url: String,
}

impl HttpTracker {
    pub fn new(url: &str) -> Result<Self, TrackerError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(TrackerError::InvalidUrl(url.to_string()));
        }

        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(TrackerError::Http)?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn announce(&self, query: &AnnounceQuery) -> Result<AnnounceInfo, TrackerError> {
        let joiner = if self.url.contains('?') { '&' } else { '?' };
        let url = format!("{}{}{}", self.url, joiner, query.render());
        debug!(url = %self.url, event = query.event.as_str(), "http announce");

        let response = self.client.get(&url).send().await?;
        let body = response.bytes().await?;

        decode_announce(&body)
    }

    /// Scrapes aggregate statistics for the given torrents.
    ///
    /// Fails with [`TrackerError::ScrapeUnsupported`] when the announce
    /// URL does not admit the scrape rewrite.
    pub async fn scrape(
        &self,
        info_hashes: &[InfoHash],
    ) -> Result<Vec<(InfoHash, ScrapeInfo)>, TrackerError> {
        let base = scrape_url(&self.url)
            .ok_or_else(|| TrackerError::ScrapeUnsupported(self.url.clone()))?;

        let mut url = base;
        let mut joiner = if url.contains('?') { '&' } else { '?' };
        for hash in info_hashes {
            url.push(joiner);
            url.push_str("info_hash=");
            url.push_str(&super::query::percent_encode(hash.as_bytes()));
            joiner = '&';
        }

        let response = self.client.get(&url).send().await?;
        let body = response.bytes().await?;

        decode_scrape(&body)
    }
}

/// Derives a tracker's scrape URL from its announce URL.
///
/// The last path segment must begin with the literal `announce`, which
/// is replaced by `scrape`; any suffix and the query string survive
/// untouched. The query string is opaque: slashes inside it are never
/// rewritten. Returns `None` when the rule does not apply.
///
/// ```
/// use remora::tracker::scrape_url;
///
/// assert_eq!(
///     scrape_url("http://example.com/announce").as_deref(),
///     Some("http://example.com/scrape")
/// );
/// assert_eq!(scrape_url("http://example.com/a"), None);
/// ```
pub fn scrape_url(announce_url: &str) -> Option<String> {
    let (base, query) = match announce_url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (announce_url, None),
    };

    let slash = base.rfind('/')?;
    let suffix = base[slash + 1..].strip_prefix("announce")?;

    let mut url = String::with_capacity(announce_url.len());
    url.push_str(&base[..slash + 1]);
    url.push_str("scrape");
    url.push_str(suffix);
    if let Some(query) = query {
        url.push('?');
        url.push_str(query);
    }
    Some(url)
}

pub(crate) fn decode_announce(body: &[u8]) -> Result<AnnounceInfo, TrackerError> {
    let value = decode(body)?;
    let dict = value
        .as_dict()
        .ok_or_else(|| TrackerError::InvalidResponse("expected dict".into()))?;

    if let Some(reason) = dict
        .get(b"failure reason".as_slice())
        .and_then(Value::as_str)
    {
        return Err(TrackerError::Failure(reason.to_string()));
    }

    let interval = dict
        .get(b"interval".as_slice())
        .and_then(Value::as_int)
        .ok_or_else(|| TrackerError::InvalidResponse("missing interval".into()))?
        as u32;

    let mut info = AnnounceInfo::new(interval);

    let int_field = |key: &[u8]| dict.get(key).and_then(Value::as_int).map(|v| v as u32);
    info.min_interval = int_field(b"min interval");
    info.complete = int_field(b"complete");
    info.incomplete = int_field(b"incomplete");

    info.warning = dict
        .get(b"warning message".as_slice())
        .and_then(Value::as_str)
        .map(String::from);
    info.tracker_id = dict
        .get(b"tracker id".as_slice())
        .and_then(Value::as_str)
        .map(String::from);

    match dict.get(b"peers".as_slice()) {
        Some(Value::Bytes(data)) => info.peers = parse_compact_peers(data),
        Some(Value::List(entries)) => {
            info.peers = entries.iter().filter_map(PeerAddress::from_dict).collect();
        }
        _ => {}
    }

    if let Some(data) = dict.get(b"peers6".as_slice()).and_then(Value::as_bytes) {
        info.peers.extend(parse_compact_peers6(data));
    }

    Ok(info)
}

pub(crate) fn decode_scrape(body: &[u8]) -> Result<Vec<(InfoHash, ScrapeInfo)>, TrackerError> {
    let value = decode(body)?;

    if let Some(reason) = value
        .get(b"failure reason")
        .and_then(Value::as_str)
    {
        return Err(TrackerError::Failure(reason.to_string()));
    }

    let files = value
        .get(b"files")
        .and_then(Value::as_dict)
        .ok_or_else(|| TrackerError::InvalidResponse("missing files".into()))?;

    let mut out = Vec::with_capacity(files.len());
    for (key, entry) in files {
        let hash: [u8; 20] = key.as_ref().try_into().map_err(|_| {
            TrackerError::InvalidResponse("scrape key is not an info hash".into())
        })?;
        out.push((InfoHash::from_bytes(hash), ScrapeInfo::from_value(entry)?));
    }

    Ok(out)
}
