use std::fmt;
use std::ops::BitAnd;

/// The 8 reserved capability bytes exchanged in the handshake.
///
/// Bits advertise optional protocol features. Higher extension protocols
/// are out of scope here; only the capability bits themselves are
/// modelled, and a peer's effective set is the intersection of what both
/// sides advertise.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Extensions(pub [u8; 8]);

impl Extensions {
    /// No optional features.
    pub const NONE: Extensions = Extensions([0; 8]);

    /// Byte 7 bit 0: DHT ([BEP-5]).
    ///
    /// [BEP-5]: http://bittorrent.org/beps/bep_0005.html
    pub const DHT: Extensions = Extensions([0, 0, 0, 0, 0, 0, 0, 0x01]);

    /// Byte 7 bit 2: fast extension ([BEP-6]).
    ///
    /// [BEP-6]: http://bittorrent.org/beps/bep_0006.html
    pub const FAST: Extensions = Extensions([0, 0, 0, 0, 0, 0, 0, 0x04]);

    /// Byte 5 bit 4: extension protocol ([BEP-10]).
    ///
    /// [BEP-10]: http://bittorrent.org/beps/bep_0010.html
    pub const EXTENSION_PROTOCOL: Extensions = Extensions([0, 0, 0, 0, 0, 0x10, 0, 0]);

    /// Builds a set from raw reserved bytes.
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Returns the raw reserved bytes.
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// True if every bit of `other` is set in `self`.
    pub fn supports(&self, other: Extensions) -> bool {
        (*self & other) == other
    }

    /// Merges another capability set into this one.
    pub fn enable(&mut self, other: Extensions) {
        for (byte, add) in self.0.iter_mut().zip(other.0) {
            *byte |= add;
        }
    }
}

impl BitAnd for Extensions {
    type Output = Extensions;

    fn bitand(self, rhs: Extensions) -> Extensions {
        let mut out = [0u8; 8];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = self.0[i] & rhs.0[i];
        }
        Extensions(out)
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Extensions(")?;
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}
