//! The viewer: one mounted image and its full event-to-pixels pipeline.
//!
//! [`Viewer`] wires the pieces together: manifest fetch and pyramid
//! derivation at mount, the gesture controller for input, the resolver for
//! level selection, the loader for tile I/O, and the compositor for
//! output. Hosts drive it with three kinds of calls:
//!
//! * Input events (`handle_wheel`, `handle_pointer_*`, `handle_resize`),
//!   each synchronous and redrawing immediately from already-loaded pixels.
//! * [`Viewer::pump`], called periodically with the current time. When the
//!   debounce deadline has passed it runs one load pass: ends the gesture
//!   latch, re-resolves the level, fetches every visible pending tile, and
//!   paints the results.
//! * [`Viewer::teardown`], which invalidates in-flight work and clears the
//!   display; the viewer ignores all further calls.
//!
//! Timing is explicit: nothing in here sleeps or reads the wall clock, so
//! tests drive the whole pipeline with synthetic `Instant`s.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::compositor::Compositor;
use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::loader::{LoadedTile, TileFetcher, TileLoader};
use crate::manifest::{self, Manifest, ManifestFetcher};
use crate::pyramid::Pyramid;
use crate::resolver::TileSetResolver;
use crate::surface::RenderSurface;
use crate::viewport::{PointerInput, ViewportChange, ViewportController, ViewportState};

// =============================================================================
// Viewer
// =============================================================================

/// A mounted tile-pyramid viewer for one source image.
pub struct Viewer<F, S> {
    config: ViewerConfig,
    manifest: Manifest,
    image_folder: String,
    pyramid: Pyramid,
    controller: ViewportController,
    resolver: TileSetResolver,
    loader: TileLoader<F>,
    compositor: Compositor<S>,
    torn_down: bool,
}

impl<F: TileFetcher, S: RenderSurface> Viewer<F, S> {
    /// Fetch the manifest at `manifest_url` and mount a viewer for it.
    ///
    /// Failure leaves no viewer behind; the caller may retry with the same
    /// or a corrected URL.
    ///
    /// # Errors
    ///
    /// [`ViewerError::Config`] for invalid configuration,
    /// [`ViewerError::Manifest`] for fetch/parse failures, and
    /// [`ViewerError::Pyramid`] when the manifest's dimensions cannot form
    /// a pyramid.
    pub async fn mount<M: ManifestFetcher>(
        manifest_fetcher: &M,
        manifest_url: &str,
        tile_fetcher: F,
        display: S,
        config: ViewerConfig,
    ) -> Result<Self, ViewerError> {
        config.validate().map_err(ViewerError::Config)?;

        let manifest = manifest::fetch_manifest(manifest_fetcher, manifest_url).await?;
        let pyramid = Pyramid::build(
            manifest.width,
            manifest.height,
            manifest.format,
            config.base_tile_size,
        )?;
        let image_folder = manifest.image_folder(manifest_url);

        let (source_width, source_height) = manifest.dimensions();
        let compositor = Compositor::new(source_width, source_height, display, &config);

        let mut controller = ViewportController::new(config.zoom_speed);
        controller.set_backing(
            compositor.backing_width(),
            compositor.backing_height(),
            compositor.source_scale(),
        );

        info!(
            format = %manifest.format,
            width = source_width,
            height = source_height,
            levels = pyramid.level_count(),
            folder = %image_folder,
            "viewer mounted"
        );

        Ok(Self {
            resolver: TileSetResolver::new(config.level_hysteresis),
            loader: TileLoader::new(tile_fetcher),
            config,
            manifest,
            image_folder,
            pyramid,
            controller,
            compositor,
            torn_down: false,
        })
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn pyramid(&self) -> &Pyramid {
        &self.pyramid
    }

    /// Current viewport state.
    pub fn viewport(&self) -> &ViewportState {
        self.controller.state()
    }

    /// The host display surface.
    pub fn display(&self) -> &S {
        self.compositor.display()
    }

    /// The live tile set, if a level has been adopted.
    pub fn tile_set(&self) -> Option<&crate::resolver::TileSet> {
        self.resolver.tile_set()
    }

    /// The attribution line to render next to the viewer.
    pub fn caption(&self) -> String {
        self.manifest.caption_text()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    // -------------------------------------------------------------------------
    // Input events
    // -------------------------------------------------------------------------

    /// Container resize: refit, re-center, and redraw.
    pub fn handle_resize(&mut self, width: f64, height: f64, now: Instant) {
        if self.torn_down {
            return;
        }
        self.compositor
            .resize_display(width.max(1.0) as u32, height.max(1.0) as u32);
        self.controller.on_resize(width, height);
        self.apply_zoom(now);
    }

    /// Wheel zoom at the given cursor position.
    pub fn handle_wheel(&mut self, delta_y: f64, cursor_x: f64, cursor_y: f64, now: Instant) {
        if self.torn_down {
            return;
        }
        self.controller.on_wheel(delta_y, cursor_x, cursor_y);
        self.apply_zoom(now);
    }

    pub fn handle_pointer_down(&mut self, pointer: PointerInput) {
        if self.torn_down {
            return;
        }
        self.controller.on_pointer_down(pointer);
    }

    pub fn handle_pointer_move(&mut self, pointer: PointerInput, now: Instant) {
        if self.torn_down {
            return;
        }
        match self.controller.on_pointer_move(pointer) {
            Some(ViewportChange::Zoom) => self.apply_zoom(now),
            Some(ViewportChange::Pan) => {
                self.compositor.redraw(self.controller.state(), now);
            }
            None => {}
        }
    }

    pub fn handle_pointer_up(&mut self, pointer: PointerInput, now: Instant) {
        if self.torn_down {
            return;
        }
        if self.controller.on_pointer_up(pointer) {
            self.resolver.end_gesture();
        }
        self.compositor.redraw(self.controller.state(), now);
    }

    /// Pointer cancellation behaves like a release at the last position.
    pub fn handle_pointer_cancel(&mut self, pointer: PointerInput, now: Instant) {
        self.handle_pointer_up(pointer, now);
    }

    fn apply_zoom(&mut self, now: Instant) {
        let display_width = self.controller.state().display_width;
        self.resolver.resolve(&self.pyramid, display_width);
        self.compositor.redraw(self.controller.state(), now);
    }

    // -------------------------------------------------------------------------
    // Load pump
    // -------------------------------------------------------------------------

    /// Run one tile-load pass if the debounce deadline has passed.
    ///
    /// Quiet time ends the gesture latch, so this pass may settle onto a
    /// coarser level than the gesture latched. Completions stamped with a
    /// generation older than the live tile set are dropped unpainted.
    pub async fn pump(&mut self, now: Instant) {
        if self.torn_down || !self.compositor.poll_due(now) {
            return;
        }

        self.resolver.end_gesture();
        let display_width = self.controller.state().display_width;
        self.resolver.resolve(&self.pyramid, display_width);

        let pending = self.resolver.visible_pending(
            &self.pyramid,
            self.controller.state(),
            self.config.tile_retry_limit,
        );
        if pending.is_empty() {
            return;
        }
        debug!(tiles = pending.len(), "load pass starting");

        for index in pending {
            let Some(set) = self.resolver.tile_set() else {
                return;
            };
            let Some(&desc) = set.get(index) else {
                continue;
            };
            let slot = set.slot();
            let generation = set.generation();

            let url = self
                .loader
                .tile_url(&self.config, &self.image_folder, &self.pyramid, slot, &desc);
            let placement =
                self.loader
                    .placement(&self.pyramid, slot, &desc, self.compositor.source_scale());

            self.resolver.mark_in_flight(index);
            match self.loader.load_tile(&url, placement, generation).await {
                Ok(tile) => {
                    self.apply_completed_tile(index, tile, now);
                }
                Err(error) => {
                    self.resolver.mark_failed(index);
                    let attempts = self
                        .resolver
                        .tile_set()
                        .and_then(|s| s.get(index))
                        .map(|d| d.attempts)
                        .unwrap_or(0);
                    if attempts >= self.config.tile_retry_limit {
                        warn!(%url, %error, attempts, "tile load failed, giving up");
                    } else {
                        warn!(%url, %error, attempts, "tile load failed, will retry");
                    }
                }
            }
        }
    }

    /// Validate a completed tile against the live tile set and paint it.
    ///
    /// Returns `false`, dropping the tile unpainted, when the completion
    /// is stale: the viewer was torn down or its generation no longer
    /// matches the live tile set because the level advanced after
    /// dispatch. `pump` routes its own completions through here; hosts
    /// that schedule fetches themselves (off [`Viewer::tile_set`] and the
    /// loader) deliver results the same way, and may do so long after the
    /// originating tile set is gone.
    pub fn apply_completed_tile(&mut self, index: usize, tile: LoadedTile, now: Instant) -> bool {
        if self.torn_down || tile.generation != self.resolver.generation() {
            debug!(
                generation = tile.generation,
                live = self.resolver.generation(),
                "stale tile dropped"
            );
            return false;
        }
        self.resolver.mark_loaded(index);
        self.compositor
            .paint_tile(&tile, self.controller.state(), now);
        true
    }

    // -------------------------------------------------------------------------
    // Teardown
    // -------------------------------------------------------------------------

    /// Unmount: invalidate in-flight work, clear the display, and ignore
    /// all further events.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.resolver.invalidate();
        self.compositor.cancel_loads();
        self.compositor.clear_display();
        self.torn_down = true;
        info!(folder = %self.image_folder, "viewer torn down");
    }
}

// =============================================================================
// Tests
// =============================================================================
