//! Random tile access

use crate::archive::PmtilesReader;
use crate::error::Result;
use bytes::Bytes;
use pmtiles_formats::TileCoord;
use tracing::trace;

/// Maximum number of directories visited for one lookup, root included
pub const MAX_DIRECTORY_DEPTH: usize = 4;

impl PmtilesReader {
    /// Fetch the payload of one tile
    ///
    /// Returns `Ok(None)` when the archive has no tile at `coord`. The
    /// payload is returned as stored, still wrapped in the header's tile
    /// compression.
    pub async fn get_tile(&self, coord: TileCoord) -> Result<Option<Bytes>> {
        let tile_id = coord.tile_id();
        let mut range = self.root_range()?;

        for depth in 0..MAX_DIRECTORY_DEPTH {
            let directory = self.directory(range).await?;
            let Some(entry) = directory.find_tile(tile_id).copied() else {
                return Ok(None);
            };

            if entry.is_leaf_pointer() {
                trace!(%coord, depth, leaf = %self.leaf_range(&entry), "Descending into leaf directory");
                range = self.leaf_range(&entry);
                continue;
            }

            return self.tile_data(self.tile_range(&entry)).await.map(Some);
        }

        trace!(%coord, "Directory depth exhausted");
        Ok(None)
    }

    /// Fetch a tile by raw `z/x/y`
    ///
    /// A coordinate outside the tile grid is reported as absent.
    pub async fn get_tile_zxy(&self, z: u8, x: u32, y: u32) -> Result<Option<Bytes>> {
        match TileCoord::new(z, x, y) {
            Ok(coord) => self.get_tile(coord).await,
            Err(_) => Ok(None),
        }
    }
}
