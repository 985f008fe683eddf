//! Level selection and visible-tile resolution.
//!
//! The resolver decides which pyramid level the viewer should be showing
//! for the current display width, maintains the live [`TileSet`] for that
//! level, and answers "which tiles are visible and still need loading".
//!
//! Two rules temper level switching:
//!
//! * Hysteresis: a level is eligible while `level_width * hysteresis >=
//!   display_width`, so sub-pixel viewport jitter cannot oscillate between
//!   adjacent levels.
//! * The gesture latch: while input is active the selection only moves
//!   toward finer levels. Coarser levels become reachable again once
//!   [`TileSetResolver::end_gesture`] runs (pointer release or the quiet
//!   period elapsing), preventing a zoom-out mid-gesture from throwing away
//!   tiles the user is about to zoom back into.
//!
//! Every adopted level starts a new tile-set generation. Generations make
//! async tile completions self-invalidating: a completion stamped with an
//! old generation is dropped instead of painted.

use tracing::debug;

use crate::pyramid::Pyramid;
use crate::surface::Rect;
use crate::viewport::ViewportState;

// =============================================================================
// Tile State
// =============================================================================

/// Lifecycle of one tile within its tile-set generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    /// Not yet dispatched.
    Pending,

    /// A fetch is in flight.
    InFlight,

    /// Decoded and painted onto the backing surface.
    Loaded,

    /// The last fetch or decode failed.
    Failed,
}

/// One tile of the active level.
#[derive(Debug, Clone, Copy)]
pub struct TileDescriptor {
    pub column: u32,
    pub row: u32,

    /// Format-specific on-disk level number (from the pyramid level).
    pub level_index: i32,

    /// Tile width in level pixels (edge tiles carry the remainder).
    pub width: u32,

    /// Tile height in level pixels.
    pub height: u32,

    pub state: TileState,

    /// Fetches dispatched for this tile in this generation.
    pub attempts: u32,
}

// =============================================================================
// Tile Set
// =============================================================================

/// All tiles of the currently selected level, in row-major order.
#[derive(Debug, Clone)]
pub struct TileSet {
    slot: usize,
    generation: u64,
    columns: u32,
    tiles: Vec<TileDescriptor>,
}

impl TileSet {
    /// Pyramid slot this set was built for (0 = coarsest).
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Generation stamp; completions carrying an older stamp are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn tiles(&self) -> &[TileDescriptor] {
        &self.tiles
    }

    pub fn get(&self, index: usize) -> Option<&TileDescriptor> {
        self.tiles.get(index)
    }

    /// Row-major index of the tile at `(column, row)`.
    pub fn index_of(&self, column: u32, row: u32) -> usize {
        (row * self.columns + column) as usize
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut TileDescriptor> {
        self.tiles.get_mut(index)
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Owns level selection and the live tile set.
#[derive(Debug)]
pub struct TileSetResolver {
    hysteresis: f64,
    generation: u64,
    latched: bool,
    tile_set: Option<TileSet>,
}

impl TileSetResolver {
    pub fn new(hysteresis: f64) -> Self {
        Self {
            hysteresis,
            generation: 0,
            latched: false,
            tile_set: None,
        }
    }

    /// The live tile set, if a level has been adopted.
    pub fn tile_set(&self) -> Option<&TileSet> {
        self.tile_set.as_ref()
    }

    /// Current generation counter.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Pick the level for `display_width` and regenerate the tile set when
    /// the selection changes.
    ///
    /// Returns `true` when a new tile set was adopted. Engages the gesture
    /// latch: until [`end_gesture`](Self::end_gesture) runs, later calls
    /// only switch toward finer levels.
    pub fn resolve(&mut self, pyramid: &Pyramid, display_width: f64) -> bool {
        let computed = self.select_slot(pyramid, display_width);

        let adopt = match &self.tile_set {
            None => true,
            Some(set) if computed > set.slot => true,
            Some(set) if computed < set.slot && !self.latched => true,
            _ => false,
        };

        if adopt {
            self.regenerate(pyramid, computed);
        }
        self.latched = true;
        adopt
    }

    /// Release the gesture latch, making coarser levels selectable again.
    pub fn end_gesture(&mut self) {
        self.latched = false;
    }

    /// Drop the tile set and advance the generation.
    ///
    /// In-flight completions stamped with the old generation will be
    /// discarded on arrival.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.tile_set = None;
        self.latched = false;
    }

    /// Coarsest slot whose width, widened by the hysteresis factor, still
    /// covers the display width. Falls back to the finest level.
    fn select_slot(&self, pyramid: &Pyramid, display_width: f64) -> usize {
        pyramid
            .levels()
            .iter()
            .position(|level| level.width as f64 * self.hysteresis >= display_width)
            .unwrap_or(pyramid.level_count() - 1)
    }

    fn regenerate(&mut self, pyramid: &Pyramid, slot: usize) {
        let level = &pyramid.levels()[slot];
        let tile = pyramid.base_tile_size();

        let mut tiles = Vec::with_capacity(level.tile_count() as usize);
        for row in 0..level.tile_rows {
            for column in 0..level.tile_columns {
                // In-range by construction
                let (width, height) = level
                    .tile_dimensions(column, row, tile)
                    .unwrap_or((tile, tile));
                tiles.push(TileDescriptor {
                    column,
                    row,
                    level_index: level.level_index,
                    width,
                    height,
                    state: TileState::Pending,
                    attempts: 0,
                });
            }
        }

        self.generation += 1;
        debug!(
            slot,
            generation = self.generation,
            tiles = tiles.len(),
            "tile set regenerated"
        );
        self.tile_set = Some(TileSet {
            slot,
            generation: self.generation,
            columns: level.tile_columns,
            tiles,
        });
    }

    // -------------------------------------------------------------------------
    // Visibility
    // -------------------------------------------------------------------------

    /// Indices of tiles that intersect the viewport and can be dispatched.
    ///
    /// A tile is dispatchable while `Pending`, or `Failed` with attempts
    /// remaining under `retry_limit`. Loaded and in-flight tiles are never
    /// re-dispatched within a generation.
    pub fn visible_pending(
        &self,
        pyramid: &Pyramid,
        viewport: &ViewportState,
        retry_limit: u32,
    ) -> Vec<usize> {
        let Some(set) = self.tile_set.as_ref() else {
            return Vec::new();
        };
        let Some(level) = pyramid.get(set.slot) else {
            return Vec::new();
        };

        let scale = viewport.display_width / level.width as f64;
        let tile = pyramid.base_tile_size() as f64;
        let view = viewport.viewport_rect();

        set.tiles
            .iter()
            .enumerate()
            .filter(|(_, desc)| match desc.state {
                TileState::Pending => true,
                TileState::Failed => desc.attempts < retry_limit,
                TileState::InFlight | TileState::Loaded => false,
            })
            .filter(|(_, desc)| {
                let rect = Rect::new(
                    desc.column as f64 * tile * scale + viewport.translate_x,
                    desc.row as f64 * tile * scale + viewport.translate_y,
                    desc.width as f64 * scale,
                    desc.height as f64 * scale,
                );
                rect.intersects(&view)
            })
            .map(|(i, _)| i)
            .collect()
    }

    // -------------------------------------------------------------------------
    // State transitions
    // -------------------------------------------------------------------------

    /// Mark a tile dispatched, counting the attempt.
    pub fn mark_in_flight(&mut self, index: usize) {
        if let Some(desc) = self.tile_set.as_mut().and_then(|s| s.get_mut(index)) {
            desc.state = TileState::InFlight;
            desc.attempts += 1;
        }
    }

    pub fn mark_loaded(&mut self, index: usize) {
        if let Some(desc) = self.tile_set.as_mut().and_then(|s| s.get_mut(index)) {
            desc.state = TileState::Loaded;
        }
    }

    pub fn mark_failed(&mut self, index: usize) {
        if let Some(desc) = self.tile_set.as_mut().and_then(|s| s.get_mut(index)) {
            desc.state = TileState::Failed;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
