//! Torrent metadata ([BEP-3]).
//!
//! Parses the subset of a `.torrent` file the session layer needs: the
//! info hash, piece geometry, tracker list and the private flag. File
//! layout within the content set belongs to the storage engine.
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

mod error;
mod info_hash;
mod torrent;

pub use error::MetainfoError;
pub use info_hash::InfoHash;
pub use torrent::Metainfo;

#[cfg(test)]
mod tests;
