use bytes::Bytes;

/// The set of pieces a peer (or we) currently possess.
///
/// Backed by a dense bitmap with an explicit capacity. Bits are numbered
/// from the high bit of the first byte, and every operation behaves as if
/// the field were exactly `total_count` bits wide; the spare high bits of
/// the last byte are kept zero so byte-wise set operations stay exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitfield {
    bits: Vec<u8>,
    total_count: u32,
}

impl Bitfield {
    /// Creates an empty bitfield with capacity for `total_count` pieces.
    pub fn new(total_count: u32) -> Self {
        Self {
            bits: vec![0; byte_len(total_count)],
            total_count,
        }
    }

    /// Creates a bitfield with every piece present.
    pub fn full(total_count: u32) -> Self {
        let mut field = Self {
            bits: vec![0xFF; byte_len(total_count)],
            total_count,
        };
        field.clear_spare_bits();
        field
    }

    /// Decodes a wire bitmap into a field of `total_count` pieces.
    ///
    /// Short input is padded with zeros; excess bytes and spare high bits
    /// are dropped, so peers that pad to a byte boundary decode cleanly.
    pub fn from_bytes(bytes: &[u8], total_count: u32) -> Self {
        let mut bits = bytes.to_vec();
        bits.resize(byte_len(total_count), 0);

        let mut field = Self { bits, total_count };
        field.clear_spare_bits();
        field
    }

    /// Piece capacity of this field.
    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    /// True if the piece at `index` is present.
    pub fn test(&self, index: u32) -> bool {
        if index >= self.total_count {
            return false;
        }
        let (byte, mask) = locate(index);
        self.bits[byte] & mask != 0
    }

    /// Adds the piece at `index`; out-of-range indices are ignored.
    pub fn insert(&mut self, index: u32) {
        if index < self.total_count {
            let (byte, mask) = locate(index);
            self.bits[byte] |= mask;
        }
    }

    /// Removes the piece at `index`.
    pub fn remove(&mut self, index: u32) {
        if index < self.total_count {
            let (byte, mask) = locate(index);
            self.bits[byte] &= !mask;
        }
    }

    /// Number of pieces present.
    pub fn count(&self) -> u32 {
        self.bits.iter().map(|b| b.count_ones()).sum()
    }

    /// True if every piece is present.
    pub fn have_all(&self) -> bool {
        self.count() == self.total_count
    }

    /// True if no piece is present.
    pub fn have_none(&self) -> bool {
        self.bits.iter().all(|&b| b == 0)
    }

    /// Fraction of pieces present, in `[0, 1]`.
    ///
    /// A zero-capacity field is vacuously complete.
    pub fn completeness(&self) -> f64 {
        if self.total_count == 0 {
            1.0
        } else {
            f64::from(self.count()) / f64::from(self.total_count)
        }
    }

    /// Smallest present index.
    pub fn find_min(&self) -> Option<u32> {
        for (i, &byte) in self.bits.iter().enumerate() {
            if byte != 0 {
                return Some(i as u32 * 8 + byte.leading_zeros());
            }
        }
        None
    }

    /// Largest present index.
    pub fn find_max(&self) -> Option<u32> {
        for (i, &byte) in self.bits.iter().enumerate().rev() {
            if byte != 0 {
                return Some(i as u32 * 8 + 7 - byte.trailing_zeros());
            }
        }
        None
    }

    /// Pieces present in either field; capacity grows to the larger input.
    pub fn union(&self, other: &Bitfield) -> Bitfield {
        self.zip(other, |a, b| a | b)
    }

    /// Pieces present in both fields.
    pub fn intersection(&self, other: &Bitfield) -> Bitfield {
        self.zip(other, |a, b| a & b)
    }

    /// Pieces present here but not in `other`.
    pub fn difference(&self, other: &Bitfield) -> Bitfield {
        self.zip(other, |a, b| a & !b)
    }

    /// Returns a copy resized to `total_count` pieces.
    ///
    /// Members beyond the new capacity are dropped; spare high bits are
    /// masked, so fields decoded from differing peers can be compared.
    pub fn adjust_size(&self, total_count: u32) -> Bitfield {
        let mut bits = self.bits.clone();
        bits.resize(byte_len(total_count), 0);

        let mut field = Bitfield { bits, total_count };
        field.clear_spare_bits();
        field
    }

    /// Selects the rarest piece across a list of fields.
    ///
    /// Returns the index with the smallest non-zero presence count that
    /// not every field has, lowest index on ties. `None` when the inputs
    /// are all empty or all full.
    pub fn rarest(fields: &[Bitfield]) -> Option<u32> {
        let total = fields.iter().map(Bitfield::total_count).max()?;
        let mut best: Option<(u32, usize)> = None;

        for index in 0..total {
            let count = fields.iter().filter(|f| f.test(index)).count();
            if count == 0 || count == fields.len() {
                continue;
            }
            if best.map_or(true, |(_, c)| count < c) {
                best = Some((index, count));
            }
        }

        best.map(|(index, _)| index)
    }

    /// Wire form: ceil(total_count / 8) bytes, spare high bits zero.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.bits)
    }

    /// Raw backing bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    fn zip(&self, other: &Bitfield, op: impl Fn(u8, u8) -> u8) -> Bitfield {
        let total_count = self.total_count.max(other.total_count);
        let bits = (0..byte_len(total_count))
            .map(|i| {
                let a = self.bits.get(i).copied().unwrap_or(0);
                let b = other.bits.get(i).copied().unwrap_or(0);
                op(a, b)
            })
            .collect();

        let mut field = Bitfield { bits, total_count };
        field.clear_spare_bits();
        field
    }

    fn clear_spare_bits(&mut self) {
        let spare = self.bits.len() * 8 - self.total_count as usize;
        if spare > 0 {
            if let Some(last) = self.bits.last_mut() {
                *last &= 0xFFu8 << spare;
            }
        }
    }
}

fn byte_len(total_count: u32) -> usize {
    (total_count as usize).div_ceil(8)
}

fn locate(index: u32) -> (usize, u8) {
    let byte = (index / 8) as usize;
    let mask = 0x80u8 >> (index % 8);
    (byte, mask)
}
