use thiserror::Error;

/// Errors from decoding an RLP byte string (spec §4.2, §8 round-trip law).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RlpError {
    #[error("unexpected end of input while decoding RLP")]
    UnexpectedEof,

    #[error("{0} trailing byte(s) after a complete RLP item")]
    TrailingBytes(usize),

    #[error("non-canonical length prefix: a single-byte or short-form encoding was required")]
    NonCanonicalLength,

    #[error("expected an RLP list, found a byte string")]
    ExpectedList,

    #[error("expected an RLP byte string, found a list")]
    ExpectedBytes,

    #[error("list has {found} item(s), expected {expected}")]
    WrongListLength { expected: usize, found: usize },

    #[error("byte string of length {0} does not fit the target integer type")]
    IntegerOverflow(usize),

    #[error("{0}")]
    Custom(String),
}
