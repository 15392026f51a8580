use thiserror::Error;

/// Errors produced while encoding or decoding bencode.
#[derive(Debug, Error)]
pub enum BencodeError {
    /// Input ended in the middle of a value.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// An integer was empty, had a leading zero, or did not fit in i64.
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// A byte-string length prefix was not a decimal number.
    #[error("invalid string length")]
    InvalidStringLength,

    /// A byte that cannot start or continue a value at this position.
    #[error("unexpected byte: 0x{0:02x}")]
    UnexpectedByte(u8),

    /// A dictionary key was not a byte string.
    #[error("dictionary key is not a string")]
    NonStringKey,

    /// Input continued after the first complete value.
    #[error("trailing data after value")]
    TrailingData,

    /// More than 64 nested lists/dictionaries.
    #[error("nesting too deep")]
    NestingTooDeep,
}
