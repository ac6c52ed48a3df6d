//! Bulk enumeration
//!
//! All three walks visit the directory tree depth first with an explicit
//! stack of directory frames. Directories read during a walk bypass the
//! directory cache, so a full scan does not flush the cache used by random
//! access, and dropping a stream part way leaves nothing behind.

use crate::archive::{PmtilesReader, load_directory};
use crate::error::{ReaderError, Result};
use crate::lookup::MAX_DIRECTORY_DEPTH;
use crate::source::ByteSource;
use bytes::Bytes;
use futures::stream::{self, Stream};
use pmtiles_cache::ByteRange;
use pmtiles_formats::{Compression, Directory, Entry, TileCoord};
use std::io;
use std::sync::Arc;
use tracing::{debug, trace};

/// One tile produced by bulk enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    /// Tile coordinate
    pub coord: TileCoord,
    /// Raw payload, still in the header's tile compression
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy)]
enum WalkEvent {
    /// A run entry
    Run(Entry),
    /// A leaf pointer; its directory is read on the next step
    Pointer,
    /// The end of a directory
    End,
}

struct Frame {
    directory: Directory,
    next: usize,
}

struct Walker {
    source: Arc<dyn ByteSource>,
    compression: Compression,
    leaf_dirs_offset: u64,
    stack: Vec<Frame>,
    pending: Option<ByteRange>,
}

impl Walker {
    fn new(reader: &PmtilesReader) -> Result<Self> {
        Ok(Self {
            source: Arc::clone(&reader.source),
            compression: reader.header.internal_compression,
            leaf_dirs_offset: reader.header.leaf_dirs_offset,
            stack: Vec::with_capacity(MAX_DIRECTORY_DEPTH),
            pending: Some(reader.root_range()?),
        })
    }

    async fn next(&mut self) -> Result<Option<WalkEvent>> {
        if let Some(range) = self.pending.take() {
            let directory = load_directory(&*self.source, range, self.compression).await?;
            trace!(%range, entries = directory.len(), depth = self.stack.len(), "Walking directory");
            self.stack.push(Frame { directory, next: 0 });
        }

        loop {
            let depth = self.stack.len();
            let Some(frame) = self.stack.last_mut() else {
                return Ok(None);
            };

            let Some(entry) = frame.directory.entries().get(frame.next).copied() else {
                self.stack.pop();
                return Ok(Some(WalkEvent::End));
            };
            frame.next += 1;

            if !entry.is_leaf_pointer() {
                return Ok(Some(WalkEvent::Run(entry)));
            }

            // Same bound as random access: deeper subtrees are unreachable
            if depth >= MAX_DIRECTORY_DEPTH {
                trace!(tile_id = entry.tile_id, "Skipping leaf beyond maximum depth");
                continue;
            }

            self.pending = Some(ByteRange::new(
                self.leaf_dirs_offset.saturating_add(entry.offset),
                entry.length,
            ));
            return Ok(Some(WalkEvent::Pointer));
        }
    }
}

/// Remaining ids of the run being expanded
#[derive(Debug, Clone, Copy, Default)]
struct Run {
    next_id: u64,
    remaining: u32,
}

impl Run {
    fn new(entry: &Entry) -> Self {
        Self {
            next_id: entry.tile_id,
            remaining: entry.run_length,
        }
    }

    fn next_coord(&mut self) -> Option<Result<TileCoord>> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.remaining -= 1;
        Some(TileCoord::from_tile_id(id).map_err(ReaderError::from))
    }
}

/// State of [`PmtilesReader::tile_coords`]
struct CoordWalk {
    walker: Result<Walker>,
    run: Run,
}

impl CoordWalk {
    async fn step(mut self) -> Result<Option<(TileCoord, Self)>> {
        loop {
            if let Some(coord) = self.run.next_coord() {
                return Ok(Some((coord?, self)));
            }

            let walker = self.walker.as_mut().map_err(|e| e.clone())?;
            match walker.next().await? {
                None => return Ok(None),
                Some(WalkEvent::Run(entry)) => self.run = Run::new(&entry),
                Some(WalkEvent::Pointer | WalkEvent::End) => {}
            }
        }
    }
}

/// State of [`PmtilesReader::tiles`]
struct TileWalk {
    walker: Result<Walker>,
    tile_data_offset: u64,
    run: Run,
    data: Bytes,
}

impl TileWalk {
    async fn step(mut self) -> Result<Option<(Tile, Self)>> {
        loop {
            if let Some(coord) = self.run.next_coord() {
                let tile = Tile {
                    coord: coord?,
                    data: self.data.clone(),
                };
                return Ok(Some((tile, self)));
            }

            let walker = self.walker.as_mut().map_err(|e| e.clone())?;
            match walker.next().await? {
                None => return Ok(None),
                Some(WalkEvent::Run(entry)) => {
                    let offset = self.tile_data_offset.saturating_add(entry.offset);
                    self.data = walker.source.read(offset, entry.length).await?;
                    self.run = Run::new(&entry);
                }
                Some(WalkEvent::Pointer | WalkEvent::End) => {}
            }
        }
    }
}

/// Pending coalesced read for `for_each_tile`
#[derive(Default)]
struct Chunk {
    entries: Vec<Entry>,
    start: u64,
    end: u64,
}

impl Chunk {
    /// Add `entry` if the combined span stays below `threshold`
    fn try_extend(&mut self, entry: Entry, start: u64, threshold: u64) -> bool {
        let end = start.saturating_add(u64::from(entry.length));
        let (new_start, new_end) = if self.entries.is_empty() {
            (start, end)
        } else {
            (self.start.min(start), self.end.max(end))
        };

        if new_end - new_start >= threshold {
            return false;
        }

        self.start = new_start;
        self.end = new_end;
        self.entries.push(entry);
        true
    }

    fn reset_to(&mut self, entry: Entry, start: u64) {
        self.entries.clear();
        self.start = start;
        self.end = start.saturating_add(u64::from(entry.length));
        self.entries.push(entry);
    }
}

impl PmtilesReader {
    /// Stream the coordinate of every addressed tile
    ///
    /// Coordinates arrive in tile id order. No tile data is read; each leaf
    /// directory is read once when the walk reaches it.
    pub fn tile_coords(&self) -> impl Stream<Item = Result<TileCoord>> + Send + 'static {
        let state = CoordWalk {
            walker: Walker::new(self),
            run: Run::default(),
        };
        stream::try_unfold(state, CoordWalk::step)
    }

    /// Stream every addressed tile with its payload
    ///
    /// Each run entry costs one uncached read; the tiles of a run share
    /// that payload.
    pub fn tiles(&self) -> impl Stream<Item = Result<Tile>> + Send + 'static {
        let state = TileWalk {
            walker: Walker::new(self),
            tile_data_offset: self.header.tile_data_offset,
            run: Run::default(),
            data: Bytes::new(),
        };
        stream::try_unfold(state, TileWalk::step)
    }

    /// Visit every addressed tile, coalescing nearby payloads into one read
    ///
    /// Consecutive run entries are read together while the span from the
    /// lowest start to the highest end stays below
    /// [`ReaderConfig::coalesce_threshold`](crate::ReaderConfig::coalesce_threshold).
    /// Pending reads are flushed before descending into a leaf and at the
    /// end of every directory. Returns the number of tiles visited; stops at
    /// the first error.
    pub async fn for_each_tile<F>(&self, mut visit: F) -> Result<u64>
    where
        F: FnMut(Tile),
    {
        let threshold = self.config.coalesce_threshold;
        let mut walker = Walker::new(self)?;
        let mut chunk = Chunk::default();
        let mut visited = 0u64;
        let mut reads = 0u64;

        while let Some(event) = walker.next().await? {
            match event {
                WalkEvent::Run(entry) => {
                    let start = self.header.tile_data_offset.saturating_add(entry.offset);
                    if !chunk.try_extend(entry, start, threshold) {
                        visited += self.flush_chunk(&mut chunk, &mut reads, &mut visit).await?;
                        chunk.reset_to(entry, start);
                    }
                }
                WalkEvent::Pointer | WalkEvent::End => {
                    visited += self.flush_chunk(&mut chunk, &mut reads, &mut visit).await?;
                }
            }
        }
        visited += self.flush_chunk(&mut chunk, &mut reads, &mut visit).await?;

        debug!(visited, reads, "Bulk scan complete");
        Ok(visited)
    }

    /// Read the span of `chunk` once and hand out every tile in it
    async fn flush_chunk<F>(&self, chunk: &mut Chunk, reads: &mut u64, visit: &mut F) -> Result<u64>
    where
        F: FnMut(Tile),
    {
        if chunk.entries.is_empty() {
            return Ok(0);
        }

        let span = u32::try_from(chunk.end - chunk.start).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Coalesced read of {} bytes is too large", chunk.end - chunk.start),
            )
        })?;
        trace!(
            offset = chunk.start,
            length = span,
            entries = chunk.entries.len(),
            "Flushing coalesced read"
        );
        let data = self.source.read(chunk.start, span).await?;
        *reads += 1;

        let mut visited = 0u64;
        for entry in chunk.entries.drain(..) {
            let start = self.header.tile_data_offset.saturating_add(entry.offset) - chunk.start;
            let payload = if start == 0 && entry.length == span {
                data.clone()
            } else {
                let from = start as usize;
                let to = from + entry.length as usize;
                let slice = data.get(from..to).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::UnexpectedEof, "Coalesced read was short")
                })?;
                Bytes::copy_from_slice(slice)
            };

            let mut run = Run::new(&entry);
            while let Some(coord) = run.next_coord() {
                visit(Tile {
                    coord: coord?,
                    data: payload.clone(),
                });
                visited += 1;
            }
        }

        Ok(visited)
    }
}
