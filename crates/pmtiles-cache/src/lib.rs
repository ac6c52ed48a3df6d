#![allow(clippy::cast_possible_truncation)] // Weights and counts fit comfortably in u64
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! Weight-bounded, single-flight caching for PMTiles readers
//!
//! A PMTiles reader keeps two caches keyed by byte range: decoded
//! directories and raw tile payloads. Both have the same needs:
//!
//! - **Bounded by weight**: the resident total stays under a configured
//!   ceiling, with least recently used entries evicted first
//! - **Single flight**: concurrent misses for one key share a single load
//! - **No poisoning**: a failed load is reported to all of its waiters and
//!   then forgotten, so the next request retries
//!
//! # Usage
//!
//! ```rust
//! use pmtiles_cache::{BoundedCache, ByteRange, CacheConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache: BoundedCache<ByteRange, Vec<u8>, String> = BoundedCache::new(
//!     CacheConfig::new().with_max_weight(1024 * 1024),
//!     |_: &ByteRange, value: &Vec<u8>| value.len() as u64,
//! )?;
//!
//! let range = ByteRange::new(127, 16);
//! let bytes = cache
//!     .get_or_load(range, || async { Ok(vec![0u8; 16]) })
//!     .await?;
//! assert_eq!(bytes.len(), 16);
//! assert!(cache.contains_key(&range));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod bounded;
pub mod config;
pub mod error;
pub mod key;
pub mod stats;

pub use bounded::{BoundedCache, Weigher};
pub use config::{CacheConfig, DEFAULT_MAX_WEIGHT};
pub use error::{CacheError, CacheResult};
pub use key::ByteRange;
pub use stats::{AtomicCacheMetrics, CacheStats};
