use bytes::Bytes;

/// Identifies a sub-range of a piece: the unit of request and cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRequest {
    /// The piece index.
    pub piece: u32,
    /// Byte offset within the piece.
    pub offset: u32,
    /// Length of the block in bytes.
    pub length: u32,
}

impl BlockRequest {
    pub fn new(piece: u32, offset: u32, length: u32) -> Self {
        Self {
            piece,
            offset,
            length,
        }
    }
}

/// A block of piece data travelling in a Piece message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// The piece index.
    pub piece: u32,
    /// Byte offset within the piece.
    pub offset: u32,
    /// The block payload.
    pub data: Bytes,
}

impl Block {
    pub fn new(piece: u32, offset: u32, data: Bytes) -> Self {
        Self {
            piece,
            offset,
            data,
        }
    }

    /// The request this block answers.
    pub fn request(&self) -> BlockRequest {
        BlockRequest::new(self.piece, self.offset, self.data.len() as u32)
    }
}
