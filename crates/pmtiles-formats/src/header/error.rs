//! Error types for the archive header

use thiserror::Error;

/// Errors that can occur when parsing or building the header
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    /// Data is too short for the fixed header
    #[error("Truncated header: expected {expected} bytes, got {actual} bytes")]
    Truncated {
        /// Fixed header length
        expected: usize,
        /// Actual data size
        actual: usize,
    },

    /// Invalid magic bytes (expected "PMTiles")
    #[error("Invalid magic: expected 'PMTiles', got {0:?}")]
    InvalidMagic([u8; 7]),

    /// Unsupported format version (only 3 is readable)
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u8),

    /// Binary read error
    #[error("Binary parsing error: {0}")]
    BinRead(String),

    /// Binary write error
    #[error("Binary write error: {0}")]
    BinWrite(String),
}

/// Result type alias for header operations
pub type Result<T> = std::result::Result<T, HeaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HeaderError::InvalidMagic(*b"PMTilez");
        assert!(err.to_string().contains("'PMTiles'"));

        let err = HeaderError::UnsupportedVersion(2);
        assert!(err.to_string().contains('2'));

        let err = HeaderError::Truncated {
            expected: 127,
            actual: 12,
        };
        assert!(err.to_string().contains("127"));
        assert!(err.to_string().contains("12"));
    }
}
