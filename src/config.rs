//! Viewer configuration.
//!
//! All tunables of the engine live here: tile geometry, zoom behavior, the
//! backing-surface memory cap, level-selection hysteresis, on-disk numbering
//! offsets for the two tile layouts, and the load-debounce delays.
//!
//! The defaults reproduce the behavior of the canonical viewer; hosts that
//! embed the engine can deserialize a `ViewerConfig` from their own config
//! file or build one in code and override individual fields.

use std::time::Duration;

use serde::Deserialize;

// =============================================================================
// Default Values
// =============================================================================

/// Default tile edge length in pixels at native resolution.
pub const DEFAULT_BASE_TILE_SIZE: u32 = 256;

/// Default wheel-zoom step, as a fraction of the current display size.
pub const DEFAULT_ZOOM_SPEED: f64 = 0.1;

/// Default backing-surface pixel-area cap (~3800x3800).
///
/// Bounds the persistent raster buffer for platform safety; sources larger
/// than this are composited at a reduced scale.
pub const DEFAULT_BACKING_CAP_AREA: u64 = 3800 * 3800;

/// Default level-selection hysteresis factor.
///
/// A level is eligible while `level_width * hysteresis >= display_width`;
/// the slack keeps small viewport jitter from oscillating between levels.
pub const DEFAULT_LEVEL_HYSTERESIS: f64 = 1.5;

/// Default on-disk folder number for level index 0 in the DZI layout.
pub const DEFAULT_DZI_BASE_LEVEL_OFFSET: i32 = 8;

/// Default on-disk level number for level index 0 in the Zoomify layout.
pub const DEFAULT_ZOOMIFY_BASE_LEVEL_OFFSET: i32 = 1;

/// Default number of tiles per `TileGroupN` folder in the Zoomify layout.
pub const DEFAULT_ZOOMIFY_GROUP_SIZE: u64 = 256;

/// Default debounce delay before the very first tile-load pass.
pub const DEFAULT_INITIAL_LOAD_DELAY: Duration = Duration::from_millis(100);

/// Default debounce delay after subsequent redraws.
///
/// Rapid consecutive viewport changes within this window coalesce into a
/// single load pass.
pub const DEFAULT_QUIET_LOAD_DELAY: Duration = Duration::from_secs(1);

/// Default maximum fetch attempts per tile within one generation.
pub const DEFAULT_TILE_RETRY_LIMIT: u32 = 3;

// =============================================================================
// ViewerConfig
// =============================================================================

/// Configuration for the tile-pyramid viewer engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Tile edge length in pixels at native resolution.
    pub base_tile_size: u32,

    /// Wheel-zoom step as a fraction of the current display size.
    pub zoom_speed: f64,

    /// Maximum backing-surface area in pixels.
    pub backing_cap_area: u64,

    /// Level-selection hysteresis factor.
    pub level_hysteresis: f64,

    /// On-disk folder number for level index 0 (DZI layout).
    pub dzi_base_level_offset: i32,

    /// On-disk level number for level index 0 (Zoomify layout).
    pub zoomify_base_level_offset: i32,

    /// Tiles per `TileGroupN` folder (Zoomify layout).
    pub zoomify_group_size: u64,

    /// Debounce delay before the first tile-load pass.
    pub initial_load_delay: Duration,

    /// Debounce delay applied after subsequent redraws.
    pub quiet_load_delay: Duration,

    /// Maximum fetch attempts per tile within one tile-set generation.
    pub tile_retry_limit: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            base_tile_size: DEFAULT_BASE_TILE_SIZE,
            zoom_speed: DEFAULT_ZOOM_SPEED,
            backing_cap_area: DEFAULT_BACKING_CAP_AREA,
            level_hysteresis: DEFAULT_LEVEL_HYSTERESIS,
            dzi_base_level_offset: DEFAULT_DZI_BASE_LEVEL_OFFSET,
            zoomify_base_level_offset: DEFAULT_ZOOMIFY_BASE_LEVEL_OFFSET,
            zoomify_group_size: DEFAULT_ZOOMIFY_GROUP_SIZE,
            initial_load_delay: DEFAULT_INITIAL_LOAD_DELAY,
            quiet_load_delay: DEFAULT_QUIET_LOAD_DELAY,
            tile_retry_limit: DEFAULT_TILE_RETRY_LIMIT,
        }
    }
}

impl ViewerConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_tile_size == 0 {
            return Err("base_tile_size must be greater than 0".to_string());
        }

        if !(self.zoom_speed > 0.0 && self.zoom_speed < 1.0) {
            return Err("zoom_speed must be in (0, 1)".to_string());
        }

        if self.backing_cap_area == 0 {
            return Err("backing_cap_area must be greater than 0".to_string());
        }

        // A factor above 4 would skip entire pyramid levels.
        if !(self.level_hysteresis > 0.0 && self.level_hysteresis <= 4.0) {
            return Err("level_hysteresis must be in (0, 4]".to_string());
        }

        if self.zoomify_group_size == 0 {
            return Err("zoomify_group_size must be greater than 0".to_string());
        }

        if self.tile_retry_limit == 0 {
            return Err("tile_retry_limit must be greater than 0".to_string());
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
