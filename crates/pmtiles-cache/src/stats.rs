//! Cache statistics
//!
//! Counters are updated with relaxed atomics on the hot path and read as a
//! point-in-time [`CacheStats`] snapshot.

#![allow(clippy::cast_precision_loss)] // Ratios intentionally accept precision loss

use std::sync::atomic::{AtomicU64, Ordering};

// Cache-line aligned to keep hit/miss counters of concurrent readers apart
#[repr(align(64))]
#[derive(Debug, Default)]
struct CacheAlignedAtomicU64(AtomicU64);

impl CacheAlignedAtomicU64 {
    #[inline]
    fn load(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn add(&self, value: u64) {
        self.0.fetch_add(value, Ordering::Relaxed);
    }

    #[inline]
    fn store(&self, value: u64) {
        self.0.store(value, Ordering::Relaxed);
    }
}

/// Cache statistics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Lookups answered from resident entries
    pub hit_count: u64,
    /// Lookups that had to wait for a load
    pub miss_count: u64,
    /// Loader invocations started
    pub load_count: u64,
    /// Loader invocations that failed
    pub load_failure_count: u64,
    /// Entries removed to stay under the weight ceiling
    pub eviction_count: u64,
    /// Total weight of evicted entries
    pub evicted_weight: u64,
    /// Resident entries
    pub entry_count: u64,
    /// Resident weight
    pub weight: u64,
}

impl CacheStats {
    /// Calculate hit rate (hits / lookups)
    #[inline]
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hit_count + self.miss_count;
        if lookups == 0 {
            0.0
        } else {
            self.hit_count as f64 / lookups as f64
        }
    }
}

/// Atomic counters behind [`CacheStats`]
#[derive(Debug, Default)]
pub struct AtomicCacheMetrics {
    hit_count: CacheAlignedAtomicU64,
    miss_count: CacheAlignedAtomicU64,
    load_count: CacheAlignedAtomicU64,
    load_failure_count: CacheAlignedAtomicU64,
    eviction_count: CacheAlignedAtomicU64,
    evicted_weight: CacheAlignedAtomicU64,
}

impl AtomicCacheMetrics {
    /// Create zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a lookup
    #[inline]
    pub fn record_get(&self, hit: bool) {
        if hit {
            self.hit_count.increment();
        } else {
            self.miss_count.increment();
        }
    }

    /// Record the start of a loader invocation
    #[inline]
    pub fn record_load(&self) {
        self.load_count.increment();
    }

    /// Record a failed load
    #[inline]
    pub fn record_load_failure(&self) {
        self.load_failure_count.increment();
    }

    /// Record an eviction
    #[inline]
    pub fn record_eviction(&self, weight: u64) {
        self.eviction_count.increment();
        self.evicted_weight.add(weight);
    }

    /// Snapshot counters together with the current residency
    pub fn snapshot(&self, entry_count: u64, weight: u64) -> CacheStats {
        CacheStats {
            hit_count: self.hit_count.load(),
            miss_count: self.miss_count.load(),
            load_count: self.load_count.load(),
            load_failure_count: self.load_failure_count.load(),
            eviction_count: self.eviction_count.load(),
            evicted_weight: self.evicted_weight.load(),
            entry_count,
            weight,
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.hit_count.store(0);
        self.miss_count.store(0);
        self.load_count.store(0);
        self.load_failure_count.store(0);
        self.eviction_count.store(0);
        self.evicted_weight.store(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_reset() {
        let metrics = AtomicCacheMetrics::new();
        metrics.record_get(true);
        metrics.record_get(true);
        metrics.record_get(false);
        metrics.record_load();
        metrics.record_load_failure();
        metrics.record_eviction(40);
        metrics.record_eviction(2);

        let stats = metrics.snapshot(3, 99);
        assert_eq!(stats.hit_count, 2);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.load_count, 1);
        assert_eq!(stats.load_failure_count, 1);
        assert_eq!(stats.eviction_count, 2);
        assert_eq!(stats.evicted_weight, 42);
        assert_eq!((stats.entry_count, stats.weight), (3, 99));
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-12);

        metrics.reset();
        assert_eq!(metrics.snapshot(0, 0), CacheStats::default());
    }

    #[test]
    fn test_hit_rate_without_lookups() {
        assert!(CacheStats::default().hit_rate().abs() < f64::EPSILON);
    }
}
