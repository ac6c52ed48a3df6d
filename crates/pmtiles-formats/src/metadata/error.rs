//! Error types for the JSON metadata blob

use thiserror::Error;

/// Errors that can occur when decoding the metadata blob
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// Blob is not valid JSON or does not match the expected shape
    #[error("Invalid metadata JSON: {0}")]
    Json(String),

    /// Blob is valid JSON but not an object
    #[error("Metadata must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

impl From<serde_json::Error> for MetadataError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

/// Result type alias for metadata operations
pub type Result<T> = std::result::Result<T, MetadataError>;
