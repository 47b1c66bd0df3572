use thiserror::Error;

/// Errors that can occur while unpacking a little-endian wire buffer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// The buffer ended before the requested field
    #[error("Unexpected end of buffer: needed {needed} bytes at offset {offset}, {remaining} remaining")]
    UnexpectedEnd {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// A null-terminated string ran off the end of the buffer
    #[error("String starting at offset {offset} has no terminator")]
    MissingTerminator { offset: usize },

    /// A string field did not hold valid UTF-8
    #[error("String starting at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },

    /// A length prefix was negative
    #[error("Negative length prefix {length} at offset {offset}")]
    NegativeLength { offset: usize, length: i32 },

    /// A length prefix exceeded the block limit
    #[error("Block of {length} bytes exceeds limit of {max}")]
    BlockTooLarge { length: usize, max: usize },
}
