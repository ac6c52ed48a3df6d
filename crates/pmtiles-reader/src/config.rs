//! Reader configuration

use crate::error::{ReaderError, Result};
use pmtiles_cache::CacheConfig;
use serde::{Deserialize, Serialize};

/// Default maximum span of one coalesced bulk read
pub const DEFAULT_COALESCE_THRESHOLD: u64 = 8192;

/// Archive reader configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Tile payload cache, weighted by payload length
    pub tile_cache: CacheConfig,
    /// Directory cache, weighted by entry count
    pub directory_cache: CacheConfig,
    /// Bulk enumeration keeps extending a read while its span stays below this
    pub coalesce_threshold: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            tile_cache: CacheConfig::default(),
            directory_cache: CacheConfig::default(),
            coalesce_threshold: DEFAULT_COALESCE_THRESHOLD,
        }
    }
}

impl ReaderConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tile payload cache configuration
    pub fn with_tile_cache(mut self, config: CacheConfig) -> Self {
        self.tile_cache = config;
        self
    }

    /// Set the directory cache configuration
    pub fn with_directory_cache(mut self, config: CacheConfig) -> Self {
        self.directory_cache = config;
        self
    }

    /// Set the bulk read coalescing threshold in bytes
    pub fn with_coalesce_threshold(mut self, threshold: u64) -> Self {
        self.coalesce_threshold = threshold;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.tile_cache.validate()?;
        self.directory_cache.validate()?;

        // A coalesced read is one source request
        if self.coalesce_threshold > u64::from(u32::MAX) {
            return Err(ReaderError::InvalidConfiguration(format!(
                "coalesce_threshold must not exceed {}, got {}",
                u32::MAX,
                self.coalesce_threshold
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReaderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.coalesce_threshold, 8192);
        assert_eq!(config.tile_cache.max_weight, 1_000_000_000);
        assert_eq!(config.directory_cache.max_weight, 1_000_000_000);
    }

    #[test]
    fn test_validation() {
        let config = ReaderConfig::new().with_tile_cache(CacheConfig::new().with_max_weight(0));
        assert!(matches!(config.validate(), Err(ReaderError::Cache(_))));

        let config = ReaderConfig::new().with_coalesce_threshold(u64::from(u32::MAX) + 1);
        assert!(matches!(
            config.validate(),
            Err(ReaderError::InvalidConfiguration(_))
        ));

        // Zero disables coalescing
        assert!(ReaderConfig::new().with_coalesce_threshold(0).validate().is_ok());
    }
}
