//! Archive handle
//!
//! [`PmtilesReader`] owns the byte source, the parsed header and the two
//! caches. Tile lookup, bulk enumeration and metadata extraction are
//! implemented on it in their own modules.

use crate::config::ReaderConfig;
use crate::error::{ReaderError, Result};
use crate::source::{ByteSource, HttpSource, MmapSource};
use bytes::Bytes;
use pmtiles_cache::{BoundedCache, ByteRange, CacheStats};
use pmtiles_formats::compression::{self, Compression};
use pmtiles_formats::{Directory, Entry, HEADER_LEN, Header, JsonMetadata};
use std::io;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, trace};
use url::Url;

/// Weight of one directory entry in the directory cache
pub const DIRECTORY_ENTRY_WEIGHT: u64 = 40;

/// Reader over a single archive
///
/// Cheap to share behind an `Arc`; every operation takes `&self`.
pub struct PmtilesReader {
    pub(crate) source: Arc<dyn ByteSource>,
    pub(crate) header: Header,
    pub(crate) config: ReaderConfig,
    directories: BoundedCache<ByteRange, Arc<Directory>, ReaderError>,
    tiles: BoundedCache<ByteRange, Bytes, ReaderError>,
    pub(crate) json_metadata: OnceCell<JsonMetadata>,
}

impl std::fmt::Debug for PmtilesReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PmtilesReader")
            .field("header", &self.header)
            .field("config", &self.config)
            .field("directories", &self.directories)
            .field("tiles", &self.tiles)
            .finish_non_exhaustive()
    }
}

impl PmtilesReader {
    /// Open an archive from any byte source
    ///
    /// Reads and validates the header; directories and tiles are loaded
    /// lazily.
    pub async fn open<S>(source: S, config: ReaderConfig) -> Result<Self>
    where
        S: ByteSource + 'static,
    {
        Self::open_shared(Arc::new(source), config).await
    }

    /// Open an archive from a source that is shared with other owners
    pub async fn open_shared(source: Arc<dyn ByteSource>, config: ReaderConfig) -> Result<Self> {
        config.validate()?;

        let bytes = source.read(0, HEADER_LEN as u32).await?;
        let header = Header::parse(&bytes)?;

        debug!(
            root_dir_length = header.root_dir_length,
            leaf_dirs_length = header.leaf_dirs_length,
            tile_data_length = header.tile_data_length,
            addressed_tiles = header.addressed_tiles_count,
            internal_compression = ?header.internal_compression,
            tile_type = ?header.tile_type,
            "Opened archive"
        );

        let directories = BoundedCache::new(
            config.directory_cache.clone(),
            |_: &ByteRange, directory: &Arc<Directory>| {
                directory.len() as u64 * DIRECTORY_ENTRY_WEIGHT
            },
        )?;
        let tiles = BoundedCache::new(config.tile_cache.clone(), |_: &ByteRange, data: &Bytes| {
            data.len() as u64
        })?;

        Ok(Self {
            source,
            header,
            config,
            directories,
            tiles,
            json_metadata: OnceCell::new(),
        })
    }

    /// Open a local archive through a memory mapping
    pub async fn open_path(path: impl AsRef<Path>, config: ReaderConfig) -> Result<Self> {
        let source = MmapSource::open(path)?;
        Self::open(source, config).await
    }

    /// Open a remote archive through HTTP range requests
    pub async fn open_url(url: Url, config: ReaderConfig) -> Result<Self> {
        let source = HttpSource::new(url)?;
        Self::open(source, config).await
    }

    /// Parsed archive header
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Reader configuration
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Statistics of the tile payload cache
    pub fn tile_cache_stats(&self) -> CacheStats {
        self.tiles.stats()
    }

    /// Statistics of the directory cache
    pub fn directory_cache_stats(&self) -> CacheStats {
        self.directories.stats()
    }

    /// Zero the counters of both caches, keeping their contents
    pub fn reset_cache_stats(&self) {
        self.tiles.reset_stats();
        self.directories.reset_stats();
    }

    pub(crate) fn root_range(&self) -> Result<ByteRange> {
        section_range(self.header.root_dir_range(), "root directory")
    }

    pub(crate) fn leaf_range(&self, entry: &Entry) -> ByteRange {
        ByteRange::new(
            self.header.leaf_dirs_offset.saturating_add(entry.offset),
            entry.length,
        )
    }

    pub(crate) fn tile_range(&self, entry: &Entry) -> ByteRange {
        ByteRange::new(
            self.header.tile_data_offset.saturating_add(entry.offset),
            entry.length,
        )
    }

    /// Directory at `range`, through the directory cache
    pub(crate) async fn directory(&self, range: ByteRange) -> Result<Arc<Directory>> {
        let source = Arc::clone(&self.source);
        let compression = self.header.internal_compression;
        self.directories
            .get_or_load(range, move || async move {
                load_directory(&*source, range, compression)
                    .await
                    .map(Arc::new)
            })
            .await
    }

    /// Raw tile payload at `range`, through the tile cache
    pub(crate) async fn tile_data(&self, range: ByteRange) -> Result<Bytes> {
        let source = Arc::clone(&self.source);
        self.tiles
            .get_or_load(range, move || async move {
                trace!(%range, "Loading tile payload");
                source
                    .read(range.offset, range.length)
                    .await
                    .map_err(ReaderError::from)
            })
            .await
    }
}

/// Read, decompress and decode one directory
pub(crate) async fn load_directory(
    source: &dyn ByteSource,
    range: ByteRange,
    compression: Compression,
) -> Result<Directory> {
    trace!(%range, "Loading directory");
    if range.is_empty() {
        return Ok(Directory::default());
    }

    let raw = source.read(range.offset, range.length).await?;
    let data = compression::decompress(&raw, compression)?;
    Ok(Directory::parse(&data)?)
}

/// Range of a header-described section, which must fit in one read
pub(crate) fn section_range(range: Range<u64>, section: &str) -> Result<ByteRange> {
    let length = range.end.saturating_sub(range.start);
    let length = u32::try_from(length).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The {section} is too large to read: {length} bytes"),
        )
    })?;
    Ok(ByteRange::new(range.start, length))
}
