//! Error types for cache construction
//!
//! Load failures are not cache errors: they carry the loader's own error
//! type and are handed back to every caller that waited on the load.

use thiserror::Error;

/// Errors that can occur when building a cache
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Invalid cache configuration
    #[error("Invalid cache configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
