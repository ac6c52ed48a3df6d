//! Fixtures for tests: in-memory archive assembly and a read-counting source
//!
//! The builder lays an archive out as header, root directory, metadata,
//! leaf directories and tile data, in that order. It exists to produce
//! inputs for the reader, not as a general archive writer.

use crate::error::Result;
use crate::source::ByteSource;
use async_trait::async_trait;
use bytes::Bytes;
use pmtiles_formats::compression::{self, Compression};
use pmtiles_formats::{Directory, Entry, HEADER_LEN, Header, TileCoord, TileType};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Builds small archives in memory
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    tiles: BTreeMap<u64, Vec<u8>>,
    zooms: Option<(u8, u8)>,
    metadata: Vec<u8>,
    internal_compression: Compression,
    tile_compression: Compression,
    tile_type: TileType,
    leaf_size: Option<usize>,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self {
            tiles: BTreeMap::new(),
            zooms: None,
            metadata: Vec::new(),
            internal_compression: Compression::None,
            tile_compression: Compression::None,
            tile_type: TileType::Unknown,
            leaf_size: None,
        }
    }
}

impl ArchiveBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tile payload
    pub fn tile(mut self, coord: TileCoord, data: Vec<u8>) -> Self {
        let z = coord.z();
        self.zooms = Some(match self.zooms {
            Some((min, max)) => (min.min(z), max.max(z)),
            None => (z, z),
        });
        self.tiles.insert(coord.tile_id(), data);
        self
    }

    /// Set the raw (uncompressed) JSON metadata blob
    pub fn metadata(mut self, json: Vec<u8>) -> Self {
        self.metadata = json;
        self
    }

    /// Compression applied to directories and metadata
    pub fn internal_compression(mut self, compression: Compression) -> Self {
        self.internal_compression = compression;
        self
    }

    /// Compression recorded for tile payloads (payloads are stored as given)
    pub fn tile_compression(mut self, compression: Compression) -> Self {
        self.tile_compression = compression;
        self
    }

    /// Tile type recorded in the header
    pub fn tile_type(mut self, tile_type: TileType) -> Self {
        self.tile_type = tile_type;
        self
    }

    /// Split entries into leaf directories of at most `size` entries
    pub fn leaf_size(mut self, size: usize) -> Self {
        self.leaf_size = Some(size.max(1));
        self
    }

    /// Assemble the archive
    ///
    /// Consecutive tile ids with identical payloads become one run entry;
    /// identical payloads elsewhere share one copy in the tile data section.
    pub fn build(self) -> Result<Bytes> {
        let mut tile_data = Vec::new();
        let mut offsets: HashMap<&[u8], u64> = HashMap::new();
        let mut entries: Vec<Entry> = Vec::new();

        for (&tile_id, data) in &self.tiles {
            if let Some(last) = entries.last_mut()
                && last.tile_id + u64::from(last.run_length) == tile_id
                && self.tiles.get(&last.tile_id).is_some_and(|d| d == data)
            {
                last.run_length += 1;
                continue;
            }

            let offset = *offsets.entry(data.as_slice()).or_insert_with(|| {
                let offset = tile_data.len() as u64;
                tile_data.extend_from_slice(data);
                offset
            });
            entries.push(Entry::run(tile_id, offset, data.len() as u32, 1));
        }

        let mut leaves = Vec::new();
        let root = match self.leaf_size {
            Some(size) if entries.len() > size => {
                let mut pointers = Vec::new();
                for chunk in entries.chunks(size) {
                    let leaf = self.encode_directory(&Directory::new(chunk.to_vec()))?;
                    pointers.push(Entry::leaf(
                        chunk[0].tile_id,
                        leaves.len() as u64,
                        leaf.len() as u32,
                    ));
                    leaves.extend_from_slice(&leaf);
                }
                Directory::new(pointers)
            }
            _ => Directory::new(entries.clone()),
        };
        let root = self.encode_directory(&root)?;

        let metadata = if self.metadata.is_empty() {
            Vec::new()
        } else {
            compression::compress(&self.metadata, self.internal_compression)?
        };

        let (min_zoom, max_zoom) = self.zooms.unwrap_or((0, 0));
        let header = Header {
            addressed_tiles_count: entries.iter().map(|e| u64::from(e.run_length)).sum(),
            tile_entries_count: entries.len() as u64,
            tile_contents_count: offsets.len() as u64,
            clustered: true,
            internal_compression: self.internal_compression,
            tile_compression: self.tile_compression,
            tile_type: self.tile_type,
            min_zoom,
            max_zoom,
            center_zoom: min_zoom,
            ..Header::default()
        };

        assemble(header, &root, &metadata, &leaves, &tile_data)
    }

    fn encode_directory(&self, directory: &Directory) -> Result<Vec<u8>> {
        let raw = directory.to_bytes()?;
        Ok(compression::compress(&raw, self.internal_compression)?)
    }
}

/// Lay out pre-encoded sections behind `header`
///
/// Section offsets and lengths in `header` are overwritten; every other
/// field is kept as given. Sections are stored as given, so they must
/// already be compressed per the header.
pub fn assemble(
    mut header: Header,
    root: &[u8],
    metadata: &[u8],
    leaves: &[u8],
    tile_data: &[u8],
) -> Result<Bytes> {
    let mut offset = HEADER_LEN as u64;
    let mut place = |len: usize| {
        let start = offset;
        offset += len as u64;
        (start, len as u64)
    };

    (header.root_dir_offset, header.root_dir_length) = place(root.len());
    (header.json_metadata_offset, header.json_metadata_length) = place(metadata.len());
    (header.leaf_dirs_offset, header.leaf_dirs_length) = place(leaves.len());
    (header.tile_data_offset, header.tile_data_length) = place(tile_data.len());

    let mut archive = header.to_bytes()?;
    archive.extend_from_slice(root);
    archive.extend_from_slice(metadata);
    archive.extend_from_slice(leaves);
    archive.extend_from_slice(tile_data);
    Ok(Bytes::from(archive))
}

/// Source wrapper counting the reads that reach the inner source
#[derive(Debug, Clone)]
pub struct CountingSource<S> {
    inner: Arc<S>,
    reads: Arc<AtomicUsize>,
}

impl<S: ByteSource + 'static> CountingSource<S> {
    /// Wrap a source
    pub fn new(inner: S) -> Self {
        Self {
            inner: Arc::new(inner),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Reads issued so far
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Type-erased handle sharing this counter
    pub fn shared(self) -> Arc<dyn ByteSource> {
        Arc::new(self)
    }
}

#[async_trait]
impl<S: ByteSource + 'static> ByteSource for CountingSource<S> {
    async fn read(&self, offset: u64, length: u32) -> io::Result<Bytes> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(offset, length).await
    }
}
