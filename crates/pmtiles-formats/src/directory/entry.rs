//! Directory entry

/// One row of a directory
///
/// A run entry (`run_length > 0`) maps `run_length` consecutive tile ids,
/// starting at `tile_id`, to one payload at `offset` within the tile data
/// section. A pointer entry (`run_length == 0`) locates a leaf directory at
/// `offset` within the leaf directories section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entry {
    /// First tile id covered by this entry
    pub tile_id: u64,
    /// Offset relative to the tile data or leaf directories section
    pub offset: u64,
    /// Length of the payload or leaf directory
    pub length: u32,
    /// Number of ids sharing the payload, 0 for a leaf pointer
    pub run_length: u32,
}

impl Entry {
    /// Create a run entry
    pub const fn run(tile_id: u64, offset: u64, length: u32, run_length: u32) -> Self {
        Self {
            tile_id,
            offset,
            length,
            run_length,
        }
    }

    /// Create a pointer to a leaf directory
    pub const fn leaf(tile_id: u64, offset: u64, length: u32) -> Self {
        Self {
            tile_id,
            offset,
            length,
            run_length: 0,
        }
    }

    /// Whether this entry points to a leaf directory
    pub const fn is_leaf_pointer(&self) -> bool {
        self.run_length == 0
    }

    /// Whether `tile_id` falls inside this entry's run
    ///
    /// Always false for leaf pointers.
    pub const fn covers(&self, tile_id: u64) -> bool {
        tile_id >= self.tile_id && tile_id - self.tile_id < self.run_length as u64
    }
}
