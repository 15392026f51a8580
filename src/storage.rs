//! Storage engine collaborator contract.
//!
//! Disk layout, memory mapping and hash bookkeeping live outside this
//! core; the session and exchange layers only see block reads, block
//! writes, and the verification verdict that comes back when a write
//! completes a piece.

use bytes::Bytes;

/// Result of writing a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// `Some(true)` when the write completed a piece and its SHA-1
    /// matched, `Some(false)` when it completed a piece that failed
    /// verification, `None` while the piece is still partial.
    pub verified: Option<bool>,
}

/// Block-level access to a torrent's content set.
///
/// Implementations are safe for concurrent readers; writes within one
/// piece are serialised by the implementation.
pub trait StorageEngine: Send + Sync {
    /// Reads `length` bytes at `offset` within `piece`.
    fn read_block(&self, piece: u32, offset: u32, length: u32) -> std::io::Result<Bytes>;

    /// Writes a block; verification runs when the piece becomes whole.
    fn write_block(&self, piece: u32, offset: u32, data: &[u8]) -> std::io::Result<WriteOutcome>;

    /// Number of pieces in the content set.
    fn piece_count(&self) -> u32;

    /// Nominal piece size in bytes (the final piece may be shorter).
    fn piece_length(&self) -> u32;

    /// Total content size in bytes.
    fn total_length(&self) -> u64;
}
