use thiserror::Error;

/// Errors raised while parsing torrent metadata.
#[derive(Debug, Error)]
pub enum MetainfoError {
    /// The file is not valid bencode.
    #[error("bencode error: {0}")]
    Bencode(#[from] crate::bencode::BencodeError),

    /// A required dictionary key is absent.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A field is present but has the wrong type or shape.
    #[error("invalid field: {0}")]
    InvalidField(&'static str),

    /// An info hash string was not 40 hex characters.
    #[error("invalid info hash")]
    InvalidInfoHash,
}
