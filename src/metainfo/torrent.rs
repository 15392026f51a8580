use bytes::Bytes;

use super::error::MetainfoError;
use super::info_hash::InfoHash;
use crate::bencode::{decode, encode, Value};

/// Parsed torrent metadata.
///
/// Only the fields the session coordinator consumes are retained; the
/// per-file layout is the storage engine's business.
#[derive(Debug, Clone)]
pub struct Metainfo {
    /// Identity of this torrent.
    pub info_hash: InfoHash,
    /// Suggested name of the content set.
    pub name: String,
    /// Bytes per piece.
    pub piece_length: u64,
    /// Number of pieces declared by the metadata.
    pub piece_count: u32,
    /// Total size of the content set in bytes.
    pub total_length: u64,
    /// If true, peers come only from trackers (no DHT).
    pub private: bool,
    /// Tracker URLs, primary announce first, announce-list tiers flattened.
    pub trackers: Vec<String>,
    raw_info: Bytes,
}

impl Metainfo {
    /// Parses a torrent file from raw bytes.
    ///
    /// # Errors
    ///
    /// Fails on invalid bencode, a missing `info`/`name`/`pieces`/
    /// `piece length`, or a `pieces` string that is not a multiple of 20.
    pub fn from_bytes(data: &[u8]) -> Result<Self, MetainfoError> {
        let root = decode(data)?;
        let dict = root.as_dict().ok_or(MetainfoError::InvalidField("root"))?;

        let info_value = dict
            .get(b"info".as_slice())
            .ok_or(MetainfoError::MissingField("info"))?;
        let raw_info = encode(info_value);
        let info_hash = InfoHash::from_info_dict(&raw_info);

        let info = info_value
            .as_dict()
            .ok_or(MetainfoError::InvalidField("info"))?;

        let name = info
            .get(b"name".as_slice())
            .and_then(Value::as_str)
            .ok_or(MetainfoError::MissingField("name"))?
            .to_string();

        let piece_length = info
            .get(b"piece length".as_slice())
            .and_then(Value::as_int)
            .filter(|&n| n > 0)
            .ok_or(MetainfoError::MissingField("piece length"))?
            as u64;

        let pieces = info
            .get(b"pieces".as_slice())
            .and_then(Value::as_bytes)
            .ok_or(MetainfoError::MissingField("pieces"))?;

        if pieces.is_empty() || pieces.len() % 20 != 0 {
            return Err(MetainfoError::InvalidField("pieces"));
        }
        let piece_count = (pieces.len() / 20) as u32;

        let private = info
            .get(b"private".as_slice())
            .and_then(Value::as_int)
            .is_some_and(|v| v == 1);

        let total_length = total_length(info)?;

        let mut trackers = Vec::new();
        if let Some(announce) = dict.get(b"announce".as_slice()).and_then(Value::as_str) {
            trackers.push(announce.to_string());
        }
        if let Some(tiers) = dict.get(b"announce-list".as_slice()).and_then(Value::as_list) {
            for tier in tiers {
                for url in tier.as_list().unwrap_or(&[]) {
                    if let Some(url) = url.as_str() {
                        if !trackers.iter().any(|t| t == url) {
                            trackers.push(url.to_string());
                        }
                    }
                }
            }
        }

        Ok(Self {
            info_hash,
            name,
            piece_length,
            piece_count,
            total_length,
            private,
            trackers,
            raw_info,
        })
    }

    /// The raw bencoded info dictionary.
    pub fn raw_info(&self) -> &Bytes {
        &self.raw_info
    }
}

fn total_length(
    info: &std::collections::BTreeMap<Bytes, Value>,
) -> Result<u64, MetainfoError> {
    if let Some(length) = info.get(b"length".as_slice()).and_then(Value::as_int) {
        return Ok(length as u64);
    }

    let files = info
        .get(b"files".as_slice())
        .and_then(Value::as_list)
        .ok_or(MetainfoError::MissingField("length or files"))?;

    let mut total = 0u64;
    for file in files {
        let length = file
            .get(b"length")
            .and_then(Value::as_int)
            .ok_or(MetainfoError::MissingField("file length"))?;
        total += length as u64;
    }
    Ok(total)
}
