//! Compositing onto the capped backing surface.
//!
//! The compositor owns two raster targets. The backing surface is a
//! persistent RGBA buffer holding every tile painted so far at (scaled)
//! source resolution; the display surface is the host's [`RenderSurface`],
//! redrawn from the backing on every viewport change. Painting a tile never
//! erases previously painted coarser tiles outside its rectangle, so detail
//! accumulates as finer levels stream in.
//!
//! The backing surface is memory-capped: sources whose pixel area exceeds
//! the configured cap are composited at `sqrt(cap / area)` scale instead of
//! allocating an unbounded buffer.
//!
//! The compositor also hosts the [`LoadScheduler`], the debounce clock that
//! decides when a quiet viewport has earned a tile-load pass. The scheduler
//! never sleeps; the viewer polls it with explicit timestamps, which keeps
//! load timing deterministic under test.

use std::time::{Duration, Instant};

use image::RgbaImage;
use tracing::debug;

use crate::config::ViewerConfig;
use crate::loader::LoadedTile;
use crate::surface::{blit_scaled, Rect, RenderSurface};
use crate::viewport::ViewportState;

// =============================================================================
// Backing Geometry
// =============================================================================

/// Backing-surface dimensions and scale for a source under the area cap.
///
/// Returns `(width, height, source_scale)`. The scale is 1.0 when the
/// source already fits; otherwise `sqrt(cap / area)`, with the rounded
/// dimensions nudged down if rounding pushed the product back over the cap.
pub(crate) fn backing_dimensions(
    source_width: u32,
    source_height: u32,
    cap_area: u64,
) -> (u32, u32, f64) {
    let area = source_width as u64 * source_height as u64;
    if area <= cap_area {
        return (source_width.max(1), source_height.max(1), 1.0);
    }

    let scale = (cap_area as f64 / area as f64).sqrt();
    let mut w = ((source_width as f64 * scale).round() as u32).max(1);
    let mut h = ((source_height as f64 * scale).round() as u32).max(1);
    if w as u64 * h as u64 > cap_area {
        w = ((source_width as f64 * scale).floor() as u32).max(1);
        h = ((source_height as f64 * scale).floor() as u32).max(1);
    }
    (w, h, scale)
}

// =============================================================================
// Load Scheduler
// =============================================================================

/// Debounce clock for tile-load passes.
///
/// Every redraw re-arms the deadline, so a burst of viewport changes
/// coalesces into one load pass after the configured quiet delay. The very
/// first arm uses the shorter initial delay so a freshly mounted viewer
/// starts loading promptly.
#[derive(Debug)]
pub struct LoadScheduler {
    armed_once: bool,
    due: Option<Instant>,
    initial_delay: Duration,
    quiet_delay: Duration,
}

impl LoadScheduler {
    pub fn new(initial_delay: Duration, quiet_delay: Duration) -> Self {
        Self {
            armed_once: false,
            due: None,
            initial_delay,
            quiet_delay,
        }
    }

    /// Arm (or re-arm) the deadline relative to `now`.
    pub fn arm(&mut self, now: Instant) {
        let delay = if self.armed_once {
            self.quiet_delay
        } else {
            self.initial_delay
        };
        self.armed_once = true;
        self.due = Some(now + delay);
    }

    /// Consume the deadline if it has been reached.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }

    /// Drop any armed deadline.
    pub fn cancel(&mut self) {
        self.due = None;
    }
}

// =============================================================================
// Compositor
// =============================================================================

/// Paints tiles onto the backing surface and projects it to the display.
#[derive(Debug)]
pub struct Compositor<S> {
    backing: RgbaImage,
    display: S,
    source_scale: f64,
    scheduler: LoadScheduler,
}

impl<S: RenderSurface> Compositor<S> {
    /// Size the backing surface for a source image and wrap the display.
    pub fn new(source_width: u32, source_height: u32, display: S, config: &ViewerConfig) -> Self {
        let (w, h, source_scale) =
            backing_dimensions(source_width, source_height, config.backing_cap_area);
        debug!(
            backing_width = w,
            backing_height = h,
            source_scale,
            "backing surface sized"
        );
        Self {
            backing: RgbaImage::new(w, h),
            display,
            source_scale,
            scheduler: LoadScheduler::new(config.initial_load_delay, config.quiet_load_delay),
        }
    }

    /// Scale from source pixels to backing pixels (1.0 when uncapped).
    pub fn source_scale(&self) -> f64 {
        self.source_scale
    }

    pub fn backing_width(&self) -> u32 {
        self.backing.width()
    }

    pub fn backing_height(&self) -> u32 {
        self.backing.height()
    }

    /// The host display surface.
    pub fn display(&self) -> &S {
        &self.display
    }

    /// Paint one decoded tile onto the backing surface and refresh the
    /// display.
    pub fn paint_tile(&mut self, tile: &LoadedTile, viewport: &ViewportState, now: Instant) {
        let src = Rect::new(
            0.0,
            0.0,
            tile.pixels.width() as f64,
            tile.pixels.height() as f64,
        );
        blit_scaled(&mut self.backing, &tile.pixels, src, tile.placement);
        self.redraw(viewport, now);
    }

    /// Clear the display and redraw the backing surface at the viewport's
    /// current scale and translate, then re-arm the load debounce.
    pub fn redraw(&mut self, viewport: &ViewportState, now: Instant) {
        self.display.clear();
        let src = Rect::new(
            0.0,
            0.0,
            self.backing.width() as f64,
            self.backing.height() as f64,
        );
        self.display
            .draw_scaled_region(&self.backing, src, viewport.display_rect());
        self.scheduler.arm(now);
    }

    /// Wipe the display surface without touching the backing.
    pub fn clear_display(&mut self) {
        self.display.clear();
    }

    /// Resize the display surface to track its container.
    pub fn resize_display(&mut self, width: u32, height: u32) {
        self.display.resize(width, height);
    }

    /// Consume the load deadline if it has been reached.
    pub fn poll_due(&mut self, now: Instant) -> bool {
        self.scheduler.poll(now)
    }

    /// Cancel any pending load deadline.
    pub fn cancel_loads(&mut self) {
        self.scheduler.cancel();
    }
}

// =============================================================================
// Tests
// =============================================================================
