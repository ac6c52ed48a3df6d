//! Internal compression for directories and the JSON metadata blob
//!
//! The header's `internal_compression` byte applies to the root directory,
//! every leaf directory and the metadata blob. Tile payloads carry their own
//! `tile_compression` flag, which this crate never unwraps.

use flate2::Compression as GzLevel;
use flate2::read::{GzDecoder, GzEncoder};
use std::io::Read;
use thiserror::Error;

/// Maximum allowed decompression size (1 GB)
///
/// Directories and metadata blobs are far smaller in practice; the limit
/// bounds the damage a corrupt or hostile gzip stream can do.
pub const MAX_DECOMPRESSION_SIZE: usize = 1024 * 1024 * 1024;

/// Compression applied to a section of the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    /// Compression byte not recognised by this reader
    #[default]
    Unknown,
    /// Stored as-is
    None,
    /// gzip (RFC 1952)
    Gzip,
}

impl Compression {
    /// Decode the header byte; unrecognised values map to [`Compression::Unknown`]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            1 => Self::None,
            2 => Self::Gzip,
            _ => Self::Unknown,
        }
    }

    /// Header byte for this compression
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::None => 1,
            Self::Gzip => 2,
        }
    }
}

impl From<u8> for Compression {
    fn from(byte: u8) -> Self {
        Self::from_byte(byte)
    }
}

impl From<Compression> for u8 {
    fn from(compression: Compression) -> Self {
        compression.as_byte()
    }
}

/// Errors from the internal compression codec
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompressionError {
    /// The gzip stream could not be decoded
    #[error("gzip decompression failed: {0}")]
    Gzip(String),

    /// The decompressed output exceeded [`MAX_DECOMPRESSION_SIZE`]
    #[error("decompressed size exceeds limit of {limit} bytes")]
    TooLarge {
        /// Configured limit
        limit: usize,
    },
}

/// Result type alias for compression operations
pub type CompressionResult<T> = Result<T, CompressionError>;

/// Undo the internal compression of a directory or metadata blob
///
/// `None` and `Unknown` pass the bytes through unchanged; an unknown codec
/// is read best-effort rather than rejected.
pub fn decompress(data: &[u8], compression: Compression) -> CompressionResult<Vec<u8>> {
    match compression {
        Compression::None | Compression::Unknown => Ok(data.to_vec()),
        Compression::Gzip => gunzip(data),
    }
}

/// Apply the internal compression, the inverse of [`decompress`]
pub fn compress(data: &[u8], compression: Compression) -> CompressionResult<Vec<u8>> {
    match compression {
        Compression::None | Compression::Unknown => Ok(data.to_vec()),
        Compression::Gzip => gzip(data),
    }
}

/// Decompress a gzip stream
pub fn gunzip(data: &[u8]) -> CompressionResult<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::with_capacity(data.len() * 4);

    // Read in chunks to enforce size limit
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = decoder
            .read(&mut buffer)
            .map_err(|e| CompressionError::Gzip(e.to_string()))?;

        if bytes_read == 0 {
            break;
        }

        if decompressed.len() + bytes_read > MAX_DECOMPRESSION_SIZE {
            return Err(CompressionError::TooLarge {
                limit: MAX_DECOMPRESSION_SIZE,
            });
        }

        decompressed.extend_from_slice(&buffer[..bytes_read]);
    }

    Ok(decompressed)
}

/// Compress data with gzip at the default level
pub fn gzip(data: &[u8]) -> CompressionResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(data, GzLevel::default());
    let mut compressed = Vec::new();
    encoder
        .read_to_end(&mut compressed)
        .map_err(|e| CompressionError::Gzip(e.to_string()))?;
    Ok(compressed)
}
