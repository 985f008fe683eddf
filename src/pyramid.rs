//! Tile pyramid derivation.
//!
//! A pyramid is derived once from the manifest's source dimensions and is
//! read-only for the lifetime of the mount. Levels are generated finest
//! first by repeated halving, then reversed so slot 0 holds the coarsest
//! level; each level keeps the on-disk level number of its format in
//! `level_index`.
//!
//! The two layouts number their levels differently: DZI rounds
//! `log2(max(w,h) / tile)` to the nearest integer for the finest level,
//! Zoomify truncates it. Both conventions are preserved here because they
//! feed directly into the tile URLs.

use crate::error::PyramidError;
use crate::manifest::TileFormat;

// =============================================================================
// PyramidLevel
// =============================================================================

/// A single resolution tier of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyramidLevel {
    /// Format-specific on-disk level number.
    pub level_index: i32,

    /// Number of tile columns, `ceil(width / base_tile_size)`.
    pub tile_columns: u32,

    /// Number of tile rows, `ceil(height / base_tile_size)`.
    pub tile_rows: u32,

    /// Level width in pixels.
    pub width: u32,

    /// Level height in pixels.
    pub height: u32,
}

impl PyramidLevel {
    /// Total number of tiles at this level.
    pub fn tile_count(&self) -> u64 {
        self.tile_columns as u64 * self.tile_rows as u64
    }

    /// Pixel dimensions of one tile.
    ///
    /// Tiles in the last column/row carry the dimension remainder instead of
    /// the full base tile size. Returns `None` for out-of-range coordinates.
    pub fn tile_dimensions(
        &self,
        column: u32,
        row: u32,
        base_tile_size: u32,
    ) -> Option<(u32, u32)> {
        if column >= self.tile_columns || row >= self.tile_rows {
            return None;
        }

        let w = if column == self.tile_columns - 1 {
            let remainder = self.width % base_tile_size;
            if remainder == 0 {
                base_tile_size
            } else {
                remainder
            }
        } else {
            base_tile_size
        };

        let h = if row == self.tile_rows - 1 {
            let remainder = self.height % base_tile_size;
            if remainder == 0 {
                base_tile_size
            } else {
                remainder
            }
        } else {
            base_tile_size
        };

        Some((w, h))
    }
}

// =============================================================================
// Pyramid
// =============================================================================

/// The full multi-resolution tile pyramid for one source image.
///
/// Slot 0 is the coarsest level; the last slot is the finest (native
/// resolution).
#[derive(Debug, Clone)]
pub struct Pyramid {
    format: TileFormat,
    base_tile_size: u32,
    levels: Vec<PyramidLevel>,
}

impl Pyramid {
    /// Derive the pyramid for a source image.
    ///
    /// Starting from the native resolution, dimensions halve (rounded) per
    /// level until one more halving would drop the larger dimension below
    /// the base tile size. Every positive source yields at least one level.
    ///
    /// # Errors
    ///
    /// Fails only for non-positive dimensions; callers must guard against
    /// malformed manifests with this.
    pub fn build(
        width: i64,
        height: i64,
        format: TileFormat,
        base_tile_size: u32,
    ) -> Result<Self, PyramidError> {
        if width <= 0 || height <= 0 {
            return Err(PyramidError::InvalidDimensions { width, height });
        }

        let tile = base_tile_size.max(1);
        let ratio = width.max(height) as f64 / tile as f64;
        let mut index: i32 = match format {
            TileFormat::Dzi => ratio.log2().round() as i32,
            TileFormat::Zoomify => ratio.log2().floor() as i32,
        };

        let mut size = width.max(height) as f64;
        let mut w = width as u32;
        let mut h = height as u32;
        let mut levels = Vec::new();

        loop {
            levels.push(PyramidLevel {
                level_index: index,
                tile_columns: w.div_ceil(tile),
                tile_rows: h.div_ceil(tile),
                width: w,
                height: h,
            });

            size /= 2.0;
            if size < tile as f64 {
                break;
            }
            w = ((w as f64 / 2.0).round() as u32).max(1);
            h = ((h as f64 / 2.0).round() as u32).max(1);
            index -= 1;
        }

        levels.reverse();

        Ok(Self {
            format,
            base_tile_size: tile,
            levels,
        })
    }

    /// The on-disk tile layout this pyramid was built for.
    pub fn format(&self) -> TileFormat {
        self.format
    }

    /// Tile edge length at native resolution.
    pub fn base_tile_size(&self) -> u32 {
        self.base_tile_size
    }

    /// Number of levels.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// All levels, coarsest first.
    pub fn levels(&self) -> &[PyramidLevel] {
        &self.levels
    }

    /// Level at `slot` (0 = coarsest).
    pub fn get(&self, slot: usize) -> Option<&PyramidLevel> {
        self.levels.get(slot)
    }

    /// The coarsest level.
    pub fn coarsest(&self) -> &PyramidLevel {
        &self.levels[0]
    }

    /// The finest (native resolution) level.
    pub fn finest(&self) -> &PyramidLevel {
        &self.levels[self.levels.len() - 1]
    }

    /// Scale factor from a level's pixel space to the finest level's.
    ///
    /// 1.0 for the finest level, ~2.0 for the level below it, and so on.
    pub fn scale_to_finest(&self, slot: usize) -> f64 {
        match self.levels.get(slot) {
            Some(level) => self.finest().width as f64 / level.width as f64,
            None => 1.0,
        }
    }

    /// Running count of tiles in all levels coarser than `slot`.
    ///
    /// Feeds the Zoomify `TileGroup` numbering.
    pub fn tiles_in_coarser_levels(&self, slot: usize) -> u64 {
        self.levels
            .iter()
            .take(slot)
            .map(|level| level.tile_count())
            .sum()
    }
}

// =============================================================================
// Tests
// =============================================================================
