//! Fixed-size archive header
//!
//! Every archive starts with a 127-byte little-endian header:
//!
//! ```text
//! 0x00  magic "PMTiles" (7)      0x60  clustered (1)
//! 0x07  version = 3 (1)          0x61  internal compression (1)
//! 0x08  root dir offset (8)      0x62  tile compression (1)
//! 0x10  root dir length (8)      0x63  tile type (1)
//! 0x18  metadata offset (8)      0x64  min zoom (1)
//! 0x20  metadata length (8)      0x65  max zoom (1)
//! 0x28  leaf dirs offset (8)     0x66  min lon e7 (4)
//! 0x30  leaf dirs length (8)     0x6A  min lat e7 (4)
//! 0x38  tile data offset (8)     0x6E  max lon e7 (4)
//! 0x40  tile data length (8)     0x72  max lat e7 (4)
//! 0x48  addressed tiles (8)      0x76  center zoom (1)
//! 0x50  tile entries (8)         0x77  center lon e7 (4)
//! 0x58  tile contents (8)        0x7B  center lat e7 (4)
//! ```
//!
//! Enum bytes the reader does not recognise decode to an `Unknown` variant
//! so that archives written by newer tooling still open.

pub mod error;

pub use error::{HeaderError, Result};

use crate::compression::Compression;
use binrw::{BinRead, BinWrite};
use std::io::Cursor;
use std::ops::Range;

/// Length of the fixed header in bytes
pub const HEADER_LEN: usize = 127;

/// Magic bytes at offset 0
pub const MAGIC: [u8; 7] = *b"PMTiles";

/// The only format version this crate reads
pub const FORMAT_VERSION: u8 = 3;

/// Type of the tile payloads stored in the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TileType {
    /// Tile type byte not recognised
    #[default]
    Unknown,
    /// Mapbox Vector Tile
    Mvt,
    /// PNG image
    Png,
    /// JPEG image
    Jpeg,
    /// WebP image
    Webp,
    /// AVIF image
    Avif,
}

impl TileType {
    /// Decode the header byte; unrecognised values map to [`TileType::Unknown`]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            1 => Self::Mvt,
            2 => Self::Png,
            3 => Self::Jpeg,
            4 => Self::Webp,
            5 => Self::Avif,
            _ => Self::Unknown,
        }
    }

    /// Header byte for this tile type
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Mvt => 1,
            Self::Png => 2,
            Self::Jpeg => 3,
            Self::Webp => 4,
            Self::Avif => 5,
        }
    }
}

/// Geographic bounds in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    /// Western edge
    pub min_lon: f64,
    /// Southern edge
    pub min_lat: f64,
    /// Eastern edge
    pub max_lon: f64,
    /// Northern edge
    pub max_lat: f64,
}

/// Center point in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Center {
    /// Longitude
    pub lon: f64,
    /// Latitude
    pub lat: f64,
}

/// Archive header (127 bytes)
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little, magic = b"PMTiles")]
pub struct Header {
    /// Format version
    pub version: u8,
    /// Absolute offset of the root directory
    pub root_dir_offset: u64,
    /// Length of the root directory
    pub root_dir_length: u64,
    /// Absolute offset of the JSON metadata blob
    pub json_metadata_offset: u64,
    /// Length of the JSON metadata blob
    pub json_metadata_length: u64,
    /// Absolute offset of the leaf directories section
    pub leaf_dirs_offset: u64,
    /// Length of the leaf directories section
    pub leaf_dirs_length: u64,
    /// Absolute offset of the tile data section
    pub tile_data_offset: u64,
    /// Length of the tile data section
    pub tile_data_length: u64,
    /// Number of tile ids that resolve to a payload
    pub addressed_tiles_count: u64,
    /// Number of run entries across all directories
    pub tile_entries_count: u64,
    /// Number of distinct payloads in the tile data section
    pub tile_contents_count: u64,
    /// Whether tile data is ordered by tile id
    #[br(map = |b: u8| b != 0)]
    #[bw(map = |c: &bool| u8::from(*c))]
    pub clustered: bool,
    /// Compression of directories and metadata
    #[br(map = Compression::from_byte)]
    #[bw(map = |c: &Compression| c.as_byte())]
    pub internal_compression: Compression,
    /// Compression of tile payloads
    #[br(map = Compression::from_byte)]
    #[bw(map = |c: &Compression| c.as_byte())]
    pub tile_compression: Compression,
    /// Payload type
    #[br(map = TileType::from_byte)]
    #[bw(map = |t: &TileType| t.as_byte())]
    pub tile_type: TileType,
    /// Lowest zoom with tiles
    pub min_zoom: u8,
    /// Highest zoom with tiles
    pub max_zoom: u8,
    /// Western bound × 10^7
    pub min_lon_e7: i32,
    /// Southern bound × 10^7
    pub min_lat_e7: i32,
    /// Eastern bound × 10^7
    pub max_lon_e7: i32,
    /// Northern bound × 10^7
    pub max_lat_e7: i32,
    /// Suggested initial zoom
    pub center_zoom: u8,
    /// Center longitude × 10^7
    pub center_lon_e7: i32,
    /// Center latitude × 10^7
    pub center_lat_e7: i32,
}

impl Header {
    /// Parse the header from the first [`HEADER_LEN`] bytes of an archive
    ///
    /// Extra trailing bytes are ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(HeaderError::Truncated {
                expected: HEADER_LEN,
                actual: data.len(),
            });
        }

        let mut magic = [0u8; 7];
        magic.copy_from_slice(&data[..7]);
        if magic != MAGIC {
            return Err(HeaderError::InvalidMagic(magic));
        }

        if data[7] != FORMAT_VERSION {
            return Err(HeaderError::UnsupportedVersion(data[7]));
        }

        Self::read(&mut Cursor::new(&data[..HEADER_LEN]))
            .map_err(|e| HeaderError::BinRead(e.to_string()))
    }

    /// Serialize the header to its 127-byte form
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::with_capacity(HEADER_LEN));
        self.write(&mut cursor)
            .map_err(|e| HeaderError::BinWrite(e.to_string()))?;
        Ok(cursor.into_inner())
    }

    /// Geographic bounds in degrees
    pub fn bounds(&self) -> Bounds {
        Bounds {
            min_lon: from_e7(self.min_lon_e7),
            min_lat: from_e7(self.min_lat_e7),
            max_lon: from_e7(self.max_lon_e7),
            max_lat: from_e7(self.max_lat_e7),
        }
    }

    /// Center point in degrees
    pub fn center(&self) -> Center {
        Center {
            lon: from_e7(self.center_lon_e7),
            lat: from_e7(self.center_lat_e7),
        }
    }

    /// Absolute byte range of the root directory
    pub fn root_dir_range(&self) -> Range<u64> {
        section(self.root_dir_offset, self.root_dir_length)
    }

    /// Absolute byte range of the JSON metadata blob
    pub fn json_metadata_range(&self) -> Range<u64> {
        section(self.json_metadata_offset, self.json_metadata_length)
    }
}

fn section(offset: u64, length: u64) -> Range<u64> {
    offset..offset.saturating_add(length)
}

impl Default for Header {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            root_dir_offset: HEADER_LEN as u64,
            root_dir_length: 0,
            json_metadata_offset: 0,
            json_metadata_length: 0,
            leaf_dirs_offset: 0,
            leaf_dirs_length: 0,
            tile_data_offset: 0,
            tile_data_length: 0,
            addressed_tiles_count: 0,
            tile_entries_count: 0,
            tile_contents_count: 0,
            clustered: false,
            internal_compression: Compression::None,
            tile_compression: Compression::None,
            tile_type: TileType::Unknown,
            min_zoom: 0,
            max_zoom: 0,
            min_lon_e7: 0,
            min_lat_e7: 0,
            max_lon_e7: 0,
            max_lat_e7: 0,
            center_zoom: 0,
            center_lon_e7: 0,
            center_lat_e7: 0,
        }
    }
}

fn from_e7(value: i32) -> f64 {
    f64::from(value) / 10_000_000.0
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_header() -> Header {
        Header {
            root_dir_offset: 127,
            root_dir_length: 64,
            json_metadata_offset: 191,
            json_metadata_length: 30,
            leaf_dirs_offset: 221,
            leaf_dirs_length: 32,
            tile_data_offset: 253,
            tile_data_length: 150,
            addressed_tiles_count: 3,
            tile_entries_count: 1,
            tile_contents_count: 1,
            clustered: true,
            internal_compression: Compression::Gzip,
            tile_compression: Compression::Gzip,
            tile_type: TileType::Mvt,
            min_zoom: 0,
            max_zoom: 14,
            min_lon_e7: -1_800_000_000,
            min_lat_e7: -850_511_287,
            max_lon_e7: 1_800_000_000,
            max_lat_e7: 850_511_287,
            center_zoom: 3,
            center_lon_e7: 131_000_000,
            center_lat_e7: 525_000_000,
            ..Header::default()
        }
    }

    #[test]
    fn test_header_is_127_bytes() {
        let bytes = sample_header().to_bytes().expect("Operation should succeed");
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(&bytes[..7], b"PMTiles");
        assert_eq!(bytes[7], 3);
    }

    #[test]
    fn test_field_offsets_match_layout() {
        let bytes = sample_header().to_bytes().expect("Operation should succeed");

        assert_eq!(u64::from_le_bytes(bytes[8..16].try_into().unwrap()), 127);
        assert_eq!(u64::from_le_bytes(bytes[16..24].try_into().unwrap()), 64);
        assert_eq!(u64::from_le_bytes(bytes[40..48].try_into().unwrap()), 221);
        assert_eq!(u64::from_le_bytes(bytes[56..64].try_into().unwrap()), 253);
        assert_eq!(bytes[96], 1); // clustered
        assert_eq!(bytes[97], 2); // internal gzip
        assert_eq!(bytes[98], 2); // tile gzip
        assert_eq!(bytes[99], 1); // mvt
        assert_eq!(bytes[101], 14); // max zoom
        assert_eq!(
            i32::from_le_bytes(bytes[102..106].try_into().unwrap()),
            -1_800_000_000
        );
        assert_eq!(bytes[118], 3); // center zoom
        assert_eq!(
            i32::from_le_bytes(bytes[123..127].try_into().unwrap()),
            525_000_000
        );
    }

    #[test]
    fn test_parse_round_trip() {
        let header = sample_header();
        let bytes = header.to_bytes().expect("Operation should succeed");
        let parsed = Header::parse(&bytes).expect("Operation should succeed");
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_parse_ignores_trailing_bytes() {
        let mut bytes = sample_header().to_bytes().expect("Operation should succeed");
        bytes.extend_from_slice(&[0xAB; 64]);
        assert!(Header::parse(&bytes).is_ok());
    }

    #[test]
    fn test_truncated_header_rejected() {
        let bytes = sample_header().to_bytes().expect("Operation should succeed");
        let result = Header::parse(&bytes[..100]);
        assert_eq!(
            result,
            Err(HeaderError::Truncated {
                expected: 127,
                actual: 100
            })
        );
    }

    #[test]
    fn test_invalid_magic_rejected() {
        let mut bytes = sample_header().to_bytes().expect("Operation should succeed");
        bytes[0] = b'X';
        assert!(matches!(
            Header::parse(&bytes),
            Err(HeaderError::InvalidMagic(_))
        ));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut bytes = sample_header().to_bytes().expect("Operation should succeed");
        bytes[7] = 2;
        assert_eq!(
            Header::parse(&bytes),
            Err(HeaderError::UnsupportedVersion(2))
        );
    }

    #[test]
    fn test_unknown_enum_bytes_tolerated() {
        let mut bytes = sample_header().to_bytes().expect("Operation should succeed");
        bytes[97] = 9;
        bytes[98] = 4; // zstd
        bytes[99] = 42;

        let parsed = Header::parse(&bytes).expect("Operation should succeed");
        assert_eq!(parsed.internal_compression, Compression::Unknown);
        assert_eq!(parsed.tile_compression, Compression::Unknown);
        assert_eq!(parsed.tile_type, TileType::Unknown);
    }

    #[test]
    fn test_section_ranges() {
        let header = Header {
            root_dir_offset: 127,
            root_dir_length: 300,
            json_metadata_offset: 427,
            json_metadata_length: 0,
            ..Header::default()
        };
        assert_eq!(header.root_dir_range(), 127..427);
        assert!(header.json_metadata_range().is_empty());

        let header = Header {
            root_dir_offset: u64::MAX - 1,
            root_dir_length: 10,
            ..Header::default()
        };
        assert_eq!(header.root_dir_range(), u64::MAX - 1..u64::MAX);
    }

    #[test]
    fn test_bounds_and_center_in_degrees() {
        let header = sample_header();
        let bounds = header.bounds();
        assert!((bounds.min_lon + 180.0).abs() < 1e-9);
        assert!((bounds.max_lat - 85.051_128_7).abs() < 1e-9);

        let center = header.center();
        assert!((center.lon - 13.1).abs() < 1e-9);
        assert!((center.lat - 52.5).abs() < 1e-9);
    }
}
