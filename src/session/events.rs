use crate::metainfo::InfoHash;

/// User-visible lifecycle state of a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorrentStatus {
    Stopped,
    Running,
    Paused,
}

/// Events published on the client's broadcast channel.
///
/// The channel is lossy for slow subscribers (the oldest events are
/// dropped), so events carry identities rather than references.
#[derive(Debug, Clone)]
pub enum Event {
    /// A handle was created for a new info hash.
    TorrentAdded(InfoHash),
    /// A handle transitioned between stopped, running and paused.
    ///
    /// Emitted only on actual transitions; repeating a `start` or
    /// `stop` is silent.
    StatusChanged(InfoHash, TorrentStatus),
    /// A non-fatal diagnostic, e.g. an unreachable tracker.
    Warning {
        info_hash: InfoHash,
        kind: &'static str,
        detail: String,
    },
}
