//! Rendering-surface abstraction.
//!
//! The engine never assumes a specific graphics API. It draws through the
//! [`RenderSurface`] trait, which exposes exactly the three capabilities the
//! compositor needs: resize, explicit clear, and a scaled region blit.
//! Hosts wrap their real target (an HTML canvas, a GPU texture upload path,
//! a window framebuffer) in this trait.
//!
//! [`SoftwareSurface`] is a reference implementation backed by an
//! `image::RgbaImage` with nearest-neighbor sampling. It is what the test
//! suite renders into, and it doubles as a headless target for hosts that
//! only need pixels.

use image::RgbaImage;

// =============================================================================
// Rect
// =============================================================================

/// An axis-aligned rectangle in f64 coordinates.
///
/// Used for viewport rectangles, projected tile rectangles, and blit
/// source/destination regions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (x + width).
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (y + height).
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Positive-area overlap test.
    ///
    /// Rectangles that merely share an edge (touching, not overlapping) do
    /// not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.x >= other.right()
            || other.x >= self.right()
            || self.y >= other.bottom()
            || other.y >= self.bottom())
    }
}

// =============================================================================
// RenderSurface Trait
// =============================================================================

/// A 2D raster target the compositor can draw into.
pub trait RenderSurface {
    /// Current width of the surface in pixels.
    fn width(&self) -> u32;

    /// Current height of the surface in pixels.
    fn height(&self) -> u32;

    /// Resize the surface. Contents after a resize are unspecified; the
    /// compositor always clears before drawing.
    fn resize(&mut self, width: u32, height: u32);

    /// Wipe the surface to fully transparent black.
    fn clear(&mut self);

    /// Draw `src_rect` of `source`, scaled and translated to `dst_rect`.
    ///
    /// Regions falling outside the surface bounds are clipped.
    fn draw_scaled_region(&mut self, source: &RgbaImage, src_rect: Rect, dst_rect: Rect);
}

// =============================================================================
// Software Implementation
// =============================================================================

/// Nearest-neighbor scaled blit between two pixel buffers.
///
/// Shared by [`SoftwareSurface`] and the compositor's backing-surface paint
/// path. Destination pixels outside `dst` are clipped; source sampling is
/// clamped to `src_rect`.
pub(crate) fn blit_scaled(dst: &mut RgbaImage, src: &RgbaImage, src_rect: Rect, dst_rect: Rect) {
    if dst_rect.width <= 0.0
        || dst_rect.height <= 0.0
        || src_rect.width <= 0.0
        || src_rect.height <= 0.0
    {
        return;
    }

    let x0 = dst_rect.x.floor().max(0.0) as u32;
    let y0 = dst_rect.y.floor().max(0.0) as u32;
    let x1 = (dst_rect.right().ceil().max(0.0) as u32).min(dst.width());
    let y1 = (dst_rect.bottom().ceil().max(0.0) as u32).min(dst.height());

    let sx = src_rect.width / dst_rect.width;
    let sy = src_rect.height / dst_rect.height;

    let src_max_x = src.width().saturating_sub(1) as f64;
    let src_max_y = src.height().saturating_sub(1) as f64;

    for dy in y0..y1 {
        let src_y = (src_rect.y + (dy as f64 + 0.5 - dst_rect.y) * sy - 0.5)
            .clamp(src_rect.y, src_rect.bottom() - 1.0)
            .clamp(0.0, src_max_y) as u32;
        for dx in x0..x1 {
            let src_x = (src_rect.x + (dx as f64 + 0.5 - dst_rect.x) * sx - 0.5)
                .clamp(src_rect.x, src_rect.right() - 1.0)
                .clamp(0.0, src_max_x) as u32;
            let pixel = *src.get_pixel(src_x, src_y);
            dst.put_pixel(dx, dy, pixel);
        }
    }
}

/// A `RenderSurface` backed by an in-memory RGBA buffer.
#[derive(Debug, Clone)]
pub struct SoftwareSurface {
    pixels: RgbaImage,
}

impl SoftwareSurface {
    /// Create a surface of the given size, cleared to transparent.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width.max(1), height.max(1)),
        }
    }

    /// Borrow the underlying pixel buffer.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

impl RenderSurface for SoftwareSurface {
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.pixels = RgbaImage::new(width.max(1), height.max(1));
    }

    fn clear(&mut self) {
        for pixel in self.pixels.pixels_mut() {
            *pixel = image::Rgba([0, 0, 0, 0]);
        }
    }

    fn draw_scaled_region(&mut self, source: &RgbaImage, src_rect: Rect, dst_rect: Rect) {
        blit_scaled(&mut self.pixels, source, src_rect, dst_rect);
    }
}

// =============================================================================
// Tests
// =============================================================================
