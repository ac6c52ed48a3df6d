//! Codecs for the PMTiles v3 single-file tile archive format
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_possible_wrap)] // Intentional for binary operations
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::doc_markdown)] // Format terms don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::return_self_not_must_use)] // Builder patterns
#![allow(clippy::use_self)] // Type clarity
//! This crate provides the pure, I/O-free half of a PMTiles reader. Given
//! byte slices it decodes:
//!
//! - **Header**: the fixed 127-byte block at the start of every archive
//! - **Directory**: varint/delta encoded entry lists mapping tile ids to byte ranges
//! - **Tile ids**: the Hilbert-curve bijection between `(z, x, y)` and a linear `u64`
//! - **Compression**: the internal gzip codec used for directories and metadata
//! - **Metadata**: the JSON side-channel blob and the reconciled [`ArchiveMetadata`] record
//!
//! # Layout
//!
//! ```text
//! ┌──────────┬────────────────┬──────────────┬──────────────┬────────────┐
//! │ Header   │ Root directory │ JSON metadata│ Leaf         │ Tile data  │
//! │ 127 B    │ (≤ 16 KiB)     │              │ directories  │            │
//! └──────────┴────────────────┴──────────────┴──────────────┴────────────┘
//! ```
//!
//! Offsets of every section after the header are recorded in the header;
//! the sections may appear in any order.
//!
//! # Usage
//!
//! ```rust
//! use pmtiles_formats::directory::{Directory, Entry};
//! use pmtiles_formats::tile_id::TileCoord;
//!
//! let dir = Directory::new(vec![Entry::run(0, 0, 10, 1), Entry::run(1, 10, 20, 4)]);
//! let encoded = dir.to_bytes().expect("sorted entries");
//! let parsed = Directory::parse(&encoded).expect("valid directory");
//!
//! let coord = TileCoord::new(1, 1, 1).expect("valid coordinate");
//! let entry = parsed.find_tile(coord.tile_id()).expect("covered by the run");
//! assert_eq!(entry.offset, 10);
//! ```

#![warn(missing_docs)]

/// Internal (directory and metadata) compression codec
pub mod compression;
/// Directory entries and the directory codec
///
/// See the [`directory`] module for the binary layout and the lookup rules.
pub mod directory;
/// Fixed-size archive header
pub mod header;
/// JSON metadata blob and the reconciled archive metadata record
pub mod metadata;
/// Hilbert-curve tile identifiers
pub mod tile_id;

pub use compression::{Compression, CompressionError};
pub use directory::{Directory, DirectoryError, Entry};
pub use header::{Bounds, Center, HEADER_LEN, Header, HeaderError, TileType};
pub use metadata::{
    ArchiveMetadata, FieldType, JsonMetadata, MetadataError, TileFormat, VectorLayer,
};
pub use tile_id::{MAX_ZOOM, TileCoord, TileIdError};

