#![allow(clippy::cast_possible_truncation)] // Section lengths are bounded before casting
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! Async reader for PMTiles v3 tile archives
//!
//! A PMTiles archive is a single file that can be served from object
//! storage and read with range requests. This crate reads one from any
//! [`ByteSource`]: memory, a memory-mapped file or an HTTP URL.
//!
//! - **Random access**: [`PmtilesReader::get_tile`] walks at most four
//!   directory levels, with directories and payloads held in weight-bounded
//!   caches shared by all tasks using the reader
//! - **Bulk enumeration**: [`PmtilesReader::tile_coords`] and
//!   [`PmtilesReader::tiles`] stream the whole archive in tile id order;
//!   [`PmtilesReader::for_each_tile`] merges nearby payloads into larger reads
//! - **Metadata**: [`PmtilesReader::metadata`] combines the header with the
//!   JSON metadata blob
//!
//! Payloads are returned exactly as stored; tile compression is left to
//! the caller.
//!
//! # Usage
//!
//! ```rust,no_run
//! use pmtiles_reader::{PmtilesReader, ReaderConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = PmtilesReader::open_path("world.pmtiles", ReaderConfig::default()).await?;
//!
//! if let Some(tile) = reader.get_tile_zxy(3, 4, 2).await? {
//!     println!("tile 3/4/2 is {} bytes", tile.len());
//! }
//!
//! let metadata = reader.metadata().await?;
//! println!("{:?} at zoom {}..={}", metadata.name, metadata.min_zoom, metadata.max_zoom);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod archive;
pub mod config;
pub mod error;
pub mod lookup;
pub mod metadata;
pub mod scan;
pub mod source;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use archive::{DIRECTORY_ENTRY_WEIGHT, PmtilesReader};
pub use config::{DEFAULT_COALESCE_THRESHOLD, ReaderConfig};
pub use error::{ReaderError, Result};
pub use lookup::MAX_DIRECTORY_DEPTH;
pub use scan::Tile;
pub use source::{ByteSource, HttpSource, HttpSourceConfig, MemorySource, MmapSource};

pub use pmtiles_cache::{CacheConfig, CacheStats};
pub use pmtiles_formats::{
    ArchiveMetadata, Compression, Header, JsonMetadata, TileCoord, TileFormat, TileType,
    VectorLayer,
};
