//! Bencode encoding and decoding ([BEP-3]).
//!
//! Bencode is the serialisation format used by torrent files and HTTP
//! tracker responses. It has four types: integers, byte strings, lists
//! and dictionaries with byte-string keys.
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

mod decode;
mod encode;
mod error;
mod value;

pub use decode::decode;
pub use encode::encode;
pub use error::BencodeError;
pub use value::Value;

#[cfg(test)]
mod tests;
