use thiserror::Error;

/// Client-level failures.
///
/// Unlike peer and tracker errors, these are fatal to the operation
/// that raised them and propagate to the caller.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Every port in the configured listen range refused to bind.
    #[error("no listen port available in {0}..={1}")]
    NoListenPort(u16, u16),

    #[error("metainfo error: {0}")]
    Metainfo(#[from] crate::metainfo::MetainfoError),
}
