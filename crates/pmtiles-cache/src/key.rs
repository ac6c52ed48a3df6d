//! Byte-range cache key

use std::fmt;

/// Absolute byte range within an archive
///
/// Used as the key of both reader caches: directories are keyed by where
/// they live in the archive, tile payloads by where their bytes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ByteRange {
    /// Absolute offset of the first byte
    pub offset: u64,
    /// Number of bytes
    pub length: u32,
}

impl ByteRange {
    /// Create a new byte range
    pub const fn new(offset: u64, length: u32) -> Self {
        Self { offset, length }
    }

    /// Offset one past the last byte, saturating at `u64::MAX`
    pub const fn end(&self) -> u64 {
        self.offset.saturating_add(self.length as u64)
    }

    /// Check if the range is empty
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.offset, self.length)
    }
}
