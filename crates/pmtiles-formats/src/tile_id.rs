//! Hilbert-curve tile identifiers
//!
//! Tiles are numbered zoom level by zoom level: all `4^z` tiles of zoom `z`
//! come after the `(4^z - 1) / 3` tiles of the lower zooms, and within a
//! zoom they are ordered along a Hilbert curve. Nearby tiles therefore get
//! nearby ids, which keeps directory runs long and leaf directories local.

use thiserror::Error;

/// Highest zoom level whose ids fit in a `u64`
pub const MAX_ZOOM: u8 = 31;

/// Errors for tile coordinates and ids
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileIdError {
    /// Zoom above [`MAX_ZOOM`]
    #[error("Zoom {0} exceeds maximum of {MAX_ZOOM}")]
    ZoomTooLarge(u8),

    /// Column or row outside `[0, 2^z)`
    #[error("Tile {x}/{y} is outside the grid of zoom {z}")]
    OutOfRange {
        /// Zoom level
        z: u8,
        /// Column
        x: u32,
        /// Row
        y: u32,
    },

    /// Id beyond the last tile of [`MAX_ZOOM`]
    #[error("Tile id {0} is beyond the supported zoom range")]
    IdOutOfRange(u64),
}

/// A tile coordinate in the XYZ scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    z: u8,
    x: u32,
    y: u32,
}

/// Number of tiles on all zooms below `z`
const fn zoom_base(z: u8) -> u64 {
    // (4^z - 1) / 3, written without overflowing for z = 32
    ((1u128 << (2 * z as u32)) / 3) as u64
}

impl TileCoord {
    /// Create a validated coordinate
    pub fn new(z: u8, x: u32, y: u32) -> Result<Self, TileIdError> {
        if z > MAX_ZOOM {
            return Err(TileIdError::ZoomTooLarge(z));
        }
        let n = 1u64 << z;
        if u64::from(x) >= n || u64::from(y) >= n {
            return Err(TileIdError::OutOfRange { z, x, y });
        }
        Ok(Self { z, x, y })
    }

    /// Zoom level
    pub const fn z(&self) -> u8 {
        self.z
    }

    /// Column
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Row
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Linear Hilbert id of this tile
    pub fn tile_id(&self) -> u64 {
        let n = 1u64 << self.z;
        let mut x = u64::from(self.x);
        let mut y = u64::from(self.y);
        let mut d = 0u64;

        let mut s = n / 2;
        while s > 0 {
            let rx = u64::from(x & s > 0);
            let ry = u64::from(y & s > 0);
            d += s * s * ((3 * rx) ^ ry);
            rotate(n, &mut x, &mut y, rx, ry);
            s /= 2;
        }

        zoom_base(self.z) + d
    }

    /// Inverse of [`TileCoord::tile_id`]
    pub fn from_tile_id(tile_id: u64) -> Result<Self, TileIdError> {
        let mut z = 0u8;
        while z <= MAX_ZOOM {
            if tile_id < zoom_base(z + 1) {
                break;
            }
            z += 1;
        }
        if z > MAX_ZOOM {
            return Err(TileIdError::IdOutOfRange(tile_id));
        }

        let n = 1u64 << z;
        let mut t = tile_id - zoom_base(z);
        let mut x = 0u64;
        let mut y = 0u64;

        let mut s = 1u64;
        while s < n {
            let rx = 1 & (t / 2);
            let ry = 1 & (t ^ rx);
            rotate(s, &mut x, &mut y, rx, ry);
            x += s * rx;
            y += s * ry;
            t /= 4;
            s *= 2;
        }

        Ok(Self {
            z,
            x: x as u32,
            y: y as u32,
        })
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

fn rotate(n: u64, x: &mut u64, y: &mut u64, rx: u64, ry: u64) {
    if ry == 0 {
        if rx == 1 {
            *x = n - 1 - *x;
            *y = n - 1 - *y;
        }
        std::mem::swap(x, y);
    }
}
