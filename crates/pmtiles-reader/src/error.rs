//! Error types for archive reading

use pmtiles_cache::CacheError;
use pmtiles_formats::{CompressionError, DirectoryError, HeaderError, MetadataError, TileIdError};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while reading an archive
///
/// Cloneable so one failed load can be handed to every task waiting on it.
/// A tile that is simply not in the archive is `Ok(None)`, never an error.
#[derive(Debug, Clone, Error)]
pub enum ReaderError {
    /// The byte source failed
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// Header could not be decoded
    #[error("Header error: {0}")]
    Header(#[from] HeaderError),

    /// A directory could not be decoded
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// A tile id could not be mapped back to a coordinate
    #[error("Tile id error: {0}")]
    TileId(#[from] TileIdError),

    /// Internal decompression failed
    #[error("Compression error: {0}")]
    Compression(#[from] CompressionError),

    /// Metadata blob could not be decoded
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// Cache could not be built
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Invalid reader or source configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<std::io::Error> for ReaderError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(Arc::new(e))
    }
}

impl ReaderError {
    /// Kind of the underlying I/O error, if this is one
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            Self::Io(e) => Some(e.kind()),
            _ => None,
        }
    }
}

/// Result type alias for reader operations
pub type Result<T> = std::result::Result<T, ReaderError>;
