use thiserror::Error;

/// Errors that end a peer session.
///
/// None of these escape the session's own task; the swarm only observes
/// the session leaving the connected set.
#[derive(Debug, Error)]
pub enum PeerError {
    /// Network I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer violated the wire protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The peer closed the connection or went silent past the deadline.
    #[error("peer disconnected")]
    Disconnected,

    /// A send did not complete in time.
    #[error("timeout")]
    Timeout,
}
