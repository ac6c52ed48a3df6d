//! Error types for the directory codec

use thiserror::Error;

/// Errors that can occur when parsing or encoding a directory
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// Input ended inside a varint
    #[error("Truncated varint at offset {0}")]
    TruncatedVarint(usize),

    /// Varint longer than 10 bytes or overflowing u64
    #[error("Varint overflow at offset {0}")]
    VarintOverflow(usize),

    /// Declared entry count cannot fit in the remaining bytes
    #[error("Entry count {count} exceeds what {remaining} remaining bytes can hold")]
    EntryCountTooLarge {
        /// Entry count from the directory prefix
        count: u64,
        /// Bytes left after the count
        remaining: usize,
    },

    /// A u32 field held a larger value
    #[error("{field} {value} of entry {index} does not fit in 32 bits")]
    FieldOverflow {
        /// Field name
        field: &'static str,
        /// Entry index
        index: usize,
        /// Decoded value
        value: u64,
    },

    /// Tile id deltas overflowed u64
    #[error("Tile id overflow at entry {0}")]
    TileIdOverflow(usize),

    /// First entry used the "continue from previous" offset encoding
    #[error("Entry 0 has no previous entry to continue its offset from")]
    ContiguousOffsetWithoutPredecessor,

    /// Entry tile id is lower than the one before it
    #[error("Entry {0} is out of tile id order")]
    UnsortedEntries(usize),

    /// Entry offset has no `offset + 1` encoding
    #[error("Offset of entry {0} is too large to encode")]
    OffsetOverflow(usize),
}

/// Result type alias for directory operations
pub type Result<T> = std::result::Result<T, DirectoryError>;
