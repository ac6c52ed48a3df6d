//! Cache configuration
//!
//! Both reader caches are bounded by total weight rather than entry count.
//! When an insertion pushes the resident weight over the ceiling, the
//! least recently used entries are dropped until the weight is at or below
//! `evict_to_percent` of the ceiling.

use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};

/// Default weight ceiling (1 GB worth of bytes or weight units)
pub const DEFAULT_MAX_WEIGHT: u64 = 1_000_000_000;

/// Weighted cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum total weight of resident entries
    pub max_weight: u64,
    /// Percentage of `max_weight` to shrink to once the ceiling is crossed
    pub evict_to_percent: u8,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_weight: DEFAULT_MAX_WEIGHT,
            evict_to_percent: 90,
        }
    }
}

impl CacheConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the weight ceiling
    pub fn with_max_weight(mut self, max_weight: u64) -> Self {
        self.max_weight = max_weight;
        self
    }

    /// Set the eviction target as a percentage of the ceiling
    pub fn with_evict_to_percent(mut self, percent: u8) -> Self {
        self.evict_to_percent = percent;
        self
    }

    /// Weight the cache shrinks to after crossing the ceiling
    pub fn eviction_target(&self) -> u64 {
        let percent = u128::from(self.evict_to_percent.min(100));
        // Fits in u64 because percent <= 100
        u64::try_from(u128::from(self.max_weight) * percent / 100).unwrap_or(self.max_weight)
    }

    /// Validate the configuration
    pub fn validate(&self) -> CacheResult<()> {
        if self.max_weight == 0 {
            return Err(CacheError::InvalidConfiguration(
                "max_weight must be greater than 0".to_string(),
            ));
        }

        if self.evict_to_percent == 0 || self.evict_to_percent > 100 {
            return Err(CacheError::InvalidConfiguration(format!(
                "evict_to_percent must be within 1..=100, got {}",
                self.evict_to_percent
            )));
        }

        Ok(())
    }
}
