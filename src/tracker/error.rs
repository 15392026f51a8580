use thiserror::Error;

/// Errors from tracker exchanges.
///
/// None of these are fatal to a swarm: the tracker loop backs off and
/// retries, surfacing a warning event at most.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Bencode or query-string decoding failed.
    #[error("decode error: {0}")]
    Decode(#[from] crate::bencode::BencodeError),

    /// The tracker answered with a failure reason or an error action.
    #[error("tracker failure: {0}")]
    Failure(String),

    /// A response arrived but did not have the promised shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A UDP response whose transaction id or sender did not match the
    /// request; such packets are discarded and the wait continues.
    #[error("transaction mismatch")]
    TransactionMismatch,

    /// The retransmission schedule ran out without a response.
    #[error("timeout")]
    Timeout,

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The announce URL does not admit the scrape rewrite.
    #[error("scrape not supported: {0}")]
    ScrapeUnsupported(String),

    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),
}
