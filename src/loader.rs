//! Tile loading: URL construction, fetch, and decode.
//!
//! The loader turns a tile descriptor into an on-disk URL for the image's
//! layout, pulls the bytes through the host's [`TileFetcher`], and decodes
//! them into RGBA pixels ready for the compositor.
//!
//! The two layouts address tiles differently:
//!
//! * DZI: `{folder}/{level}/{col}_{row}.jpg`, where the level folder number
//!   is the on-disk level index plus a configurable base offset.
//! * Zoomify: `{folder}/TileGroup{N}/{level}-{col}-{row}.jpg`, where `N`
//!   buckets tiles into fixed-size groups counted across the whole pyramid,
//!   coarsest level first.
//!
//! Every loaded tile is stamped with the tile-set generation it was
//! dispatched under, so the viewer can discard completions that outlived
//! their tile set.

use async_trait::async_trait;
use bytes::Bytes;
use image::RgbaImage;

use crate::config::ViewerConfig;
use crate::error::{FetchError, TileError};
use crate::manifest::TileFormat;
use crate::pyramid::Pyramid;
use crate::resolver::TileDescriptor;
use crate::surface::Rect;

// =============================================================================
// TileFetcher Trait
// =============================================================================

/// Abstract transport for fetching tile images.
#[async_trait]
pub trait TileFetcher: Send + Sync {
    /// Fetch the raw encoded tile at `url`.
    async fn fetch_tile(&self, url: &str) -> Result<Bytes, FetchError>;
}

// =============================================================================
// LoadedTile
// =============================================================================

/// A decoded tile, ready to paint.
#[derive(Debug, Clone)]
pub struct LoadedTile {
    /// Decoded pixels.
    pub pixels: RgbaImage,

    /// Destination rectangle in backing-surface coordinates.
    pub placement: Rect,

    /// Tile-set generation this tile was dispatched under.
    pub generation: u64,
}

// =============================================================================
// TileLoader
// =============================================================================

/// Fetches and decodes tiles through a host-provided transport.
#[derive(Debug)]
pub struct TileLoader<F> {
    fetcher: F,
}

impl<F: TileFetcher> TileLoader<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// On-disk URL for a tile of the given pyramid slot.
    pub fn tile_url(
        &self,
        config: &ViewerConfig,
        folder: &str,
        pyramid: &Pyramid,
        slot: usize,
        desc: &TileDescriptor,
    ) -> String {
        match pyramid.format() {
            TileFormat::Dzi => {
                let level = config.dzi_base_level_offset + desc.level_index;
                format!("{}/{}/{}_{}.jpg", folder, level, desc.column, desc.row)
            }
            TileFormat::Zoomify => {
                let level = config.zoomify_base_level_offset + desc.level_index;
                let columns = pyramid
                    .get(slot)
                    .map(|l| l.tile_columns as u64)
                    .unwrap_or(1);
                let ordinal = pyramid.tiles_in_coarser_levels(slot)
                    + desc.row as u64 * columns
                    + desc.column as u64;
                let group = ordinal / config.zoomify_group_size;
                format!(
                    "{}/TileGroup{}/{}-{}-{}.jpg",
                    folder, group, level, desc.column, desc.row
                )
            }
        }
    }

    /// Destination rectangle of a tile on the backing surface.
    ///
    /// Level pixels scale up to finest-level pixels, then down by the
    /// backing surface's source scale.
    pub fn placement(
        &self,
        pyramid: &Pyramid,
        slot: usize,
        desc: &TileDescriptor,
        source_scale: f64,
    ) -> Rect {
        let scale = pyramid.scale_to_finest(slot) * source_scale;
        let tile = pyramid.base_tile_size() as f64;
        Rect::new(
            desc.column as f64 * tile * scale,
            desc.row as f64 * tile * scale,
            desc.width as f64 * scale,
            desc.height as f64 * scale,
        )
    }

    /// Fetch and decode one tile.
    ///
    /// # Errors
    ///
    /// [`TileError::Fetch`] for transport failures, [`TileError::Decode`]
    /// when the payload is not a decodable image.
    pub async fn load_tile(
        &self,
        url: &str,
        placement: Rect,
        generation: u64,
    ) -> Result<LoadedTile, TileError> {
        let bytes = self.fetcher.fetch_tile(url).await?;

        let decoded = image::load_from_memory(&bytes).map_err(|e| TileError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(LoadedTile {
            pixels: decoded.to_rgba8(),
            placement,
            generation,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
