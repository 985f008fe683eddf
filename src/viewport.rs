//! Viewport state and the pan/zoom gesture state machine.
//!
//! The controller owns two pieces of continuously mutated state: the
//! [`ViewportState`] (displayed rectangle and translate) and the
//! [`GestureState`] (active pointers and pinch baseline). Input arrives as
//! wheel, pointer, and resize events already expressed in the viewer's
//! coordinate space; every handler is synchronous and completes within one
//! event-loop invocation.
//!
//! Gesture transitions: `Idle -> Panning` with one active pointer,
//! `Idle/Panning -> Pinching` when a second pointer touches down, back to
//! `Idle` as pointers lift. Wheel input is stateless.
//!
//! All zooming uses the same anchor formula: the content-space ratio of the
//! anchor point inside the displayed rectangle is captured before scaling
//! and the translate is recomputed afterwards so the anchored content pixel
//! stays put.

use tracing::debug;

use crate::surface::Rect;

// =============================================================================
// Input Events
// =============================================================================

/// One pointer sample in viewer coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    /// Host-assigned pointer id, stable for the pointer's lifetime.
    pub id: u64,
    pub x: f64,
    pub y: f64,
}

impl PointerInput {
    pub fn new(id: u64, x: f64, y: f64) -> Self {
        Self { id, x, y }
    }

    fn distance_to(&self, other: &PointerInput) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// What a handled input event did to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportChange {
    /// Only the translate moved; the displayed size is unchanged.
    Pan,

    /// The displayed size changed; level selection may need to re-run.
    Zoom,
}

/// Current gesture phase, derived from the active pointer count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Panning,
    Pinching,
}

// =============================================================================
// Gesture State
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct ActivePointer {
    start: PointerInput,
    latest: PointerInput,
}

/// The ordered set of active pointers plus the pinch baseline.
///
/// Cleared when the last pointer is released.
#[derive(Debug, Default)]
pub struct GestureState {
    pointers: Vec<ActivePointer>,
    pinch_baseline: f64,
    pinch_running: f64,
    touch_active: bool,
}

impl GestureState {
    fn clear(&mut self) {
        self.pointers.clear();
        self.pinch_baseline = 0.0;
        self.pinch_running = 0.0;
        self.touch_active = false;
    }
}

// =============================================================================
// Viewport State
// =============================================================================

/// The continuously mutated pan/zoom state.
///
/// `display_width`/`display_height` describe the rectangle the (scaled)
/// image currently occupies; `translate_x`/`translate_y` place it inside
/// the container. `prev_x`/`prev_y` hold the persisted offset that pointer
/// displacement is measured against during a pan.
///
/// Invariant: the displayed size never exceeds the backing-surface size
/// (re-clamped on every update).
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewportState {
    pub container_width: f64,
    pub container_height: f64,
    pub display_width: f64,
    pub display_height: f64,
    pub translate_x: f64,
    pub translate_y: f64,
    pub source_scale: f64,
    pub(crate) prev_x: f64,
    pub(crate) prev_y: f64,
    pub(crate) backing_width: f64,
    pub(crate) backing_height: f64,
}

impl ViewportState {
    /// The container rectangle at the origin.
    pub fn viewport_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.container_width, self.container_height)
    }

    /// The rectangle the displayed image occupies inside the container.
    pub fn display_rect(&self) -> Rect {
        Rect::new(
            self.translate_x,
            self.translate_y,
            self.display_width,
            self.display_height,
        )
    }

    /// Content-space ratio of an anchor point inside the displayed rect.
    fn anchor_ratio(&self, x: f64, y: f64) -> (f64, f64) {
        let rx = if self.display_width > 0.0 {
            (x - self.prev_x) / self.display_width
        } else {
            0.0
        };
        let ry = if self.display_height > 0.0 {
            (y - self.prev_y) / self.display_height
        } else {
            0.0
        };
        (rx, ry)
    }

    /// Clamp the displayed size to the backing surface ("protect size").
    ///
    /// Prevents upscaling past the backing surface's native resolution.
    fn protect_size(&mut self) {
        if self.display_width > self.backing_width {
            self.display_width = self.backing_width;
        }
        if self.display_height > self.backing_height {
            self.display_height = self.backing_height;
        }
    }

    /// Re-anchor the persisted offset so the anchor point keeps its ratio,
    /// then snap the translate to it.
    fn apply_anchor(&mut self, x: f64, y: f64, ratio_x: f64, ratio_y: f64) {
        self.prev_x = x - self.display_width * ratio_x;
        self.prev_y = y - self.display_height * ratio_y;
        self.translate_x = self.prev_x.floor();
        self.translate_y = self.prev_y.floor();
    }
}

// =============================================================================
// Viewport Controller
// =============================================================================

/// Owns the viewport and gesture state and consumes input events.
#[derive(Debug, Default)]
pub struct ViewportController {
    state: ViewportState,
    gesture: GestureState,
    zoom_speed: f64,
}

impl ViewportController {
    pub fn new(zoom_speed: f64) -> Self {
        Self {
            state: ViewportState::default(),
            gesture: GestureState::default(),
            zoom_speed,
        }
    }

    /// Read-only view of the current viewport state.
    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    /// Current gesture phase.
    pub fn phase(&self) -> GesturePhase {
        match self.gesture.pointers.len() {
            0 => GesturePhase::Idle,
            1 => GesturePhase::Panning,
            _ => GesturePhase::Pinching,
        }
    }

    /// Install the backing-surface geometry this viewport projects.
    ///
    /// Called once per mount, before the first resize.
    pub fn set_backing(&mut self, width: u32, height: u32, source_scale: f64) {
        self.state.backing_width = width as f64;
        self.state.backing_height = height as f64;
        self.state.source_scale = source_scale;
    }

    /// Handle a wheel event at the given cursor position.
    ///
    /// Negative `delta_y` zooms in. The content pixel under the cursor stays
    /// under the cursor.
    pub fn on_wheel(&mut self, delta_y: f64, cursor_x: f64, cursor_y: f64) -> ViewportChange {
        let (ratio_x, ratio_y) = self.state.anchor_ratio(cursor_x, cursor_y);

        let factor = if delta_y < 0.0 {
            1.0 + self.zoom_speed
        } else {
            1.0 - self.zoom_speed
        };
        self.state.display_width *= factor;
        self.state.display_height *= factor;
        self.state.protect_size();

        self.state.apply_anchor(cursor_x, cursor_y, ratio_x, ratio_y);

        ViewportChange::Zoom
    }

    /// Register a new active pointer.
    ///
    /// The second pointer down captures the pinch baseline distance and
    /// resets the running pinch scale.
    pub fn on_pointer_down(&mut self, pointer: PointerInput) {
        self.gesture.pointers.push(ActivePointer {
            start: pointer,
            latest: pointer,
        });

        if self.gesture.pointers.len() == 2 {
            self.gesture.pinch_running = 1.0;
            self.gesture.pinch_baseline = self.gesture.pointers[0]
                .start
                .distance_to(&self.gesture.pointers[1].start);
            debug!(baseline = self.gesture.pinch_baseline, "pinch started");
        }
    }

    /// Handle pointer movement: pan with one active pointer, pinch with two.
    ///
    /// Returns `None` when the event changed nothing (unknown pointer, or
    /// the first sample of a touch session).
    pub fn on_pointer_move(&mut self, pointer: PointerInput) -> Option<ViewportChange> {
        let known = self
            .gesture
            .pointers
            .iter_mut()
            .find(|p| p.start.id == pointer.id);
        match known {
            Some(active) => active.latest = pointer,
            None => return None,
        }

        let change = match self.gesture.pointers.len() {
            1 => {
                // Pan: translate tracks displacement since the pointer's
                // start sample, on top of the persisted offset.
                let start = self.gesture.pointers[0].start;
                self.state.translate_x = (self.state.prev_x + pointer.x - start.x).floor();
                self.state.translate_y = (self.state.prev_y + pointer.y - start.y).floor();
                Some(ViewportChange::Pan)
            }
            2 if self.gesture.touch_active => self.apply_pinch(),
            _ => None,
        };

        self.gesture.touch_active = true;
        change
    }

    fn apply_pinch(&mut self) -> Option<ViewportChange> {
        if self.gesture.pinch_baseline <= f64::EPSILON {
            return None;
        }

        let [a, b] = [self.gesture.pointers[0], self.gesture.pointers[1]];
        let distance = a.latest.distance_to(&b.latest);

        // Anchor at the midpoint of the gesture's start samples.
        let mid_x = (a.start.x + b.start.x) / 2.0;
        let mid_y = (a.start.y + b.start.y) / 2.0;
        let (ratio_x, ratio_y) = self.state.anchor_ratio(mid_x, mid_y);

        let running = distance / self.gesture.pinch_baseline;
        let delta = running / self.gesture.pinch_running;
        self.gesture.pinch_running = running;

        self.state.display_width *= delta;
        self.state.display_height *= delta;
        self.state.protect_size();

        self.state.apply_anchor(mid_x, mid_y, ratio_x, ratio_y);

        Some(ViewportChange::Zoom)
    }

    /// Handle pointer release (or cancel, which behaves identically).
    ///
    /// Folds the pan displacement into the persisted offset and removes the
    /// pointer from the active set. Returns `true` when the gesture ended
    /// (no pointers remain active).
    pub fn on_pointer_up(&mut self, pointer: PointerInput) -> bool {
        if self.gesture.pointers.len() == 1 && self.gesture.touch_active {
            if let Some(active) = self
                .gesture
                .pointers
                .iter()
                .find(|p| p.start.id == pointer.id)
            {
                self.state.prev_x = (self.state.prev_x + pointer.x - active.start.x).floor();
                self.state.prev_y = (self.state.prev_y + pointer.y - active.start.y).floor();
                self.state.translate_x = self.state.prev_x;
                self.state.translate_y = self.state.prev_y;
            }
        }

        self.gesture.touch_active = false;
        self.gesture
            .pointers
            .retain(|p| p.start.id != pointer.id);

        if self.gesture.pointers.is_empty() {
            self.gesture.clear();
            debug!("gesture ended");
            return true;
        }
        false
    }

    /// Handle a container resize: refit the displayed rectangle and
    /// re-center.
    ///
    /// Sources "more vertical" than the container fit by height, others by
    /// width. The horizontal translate always centers; the vertical
    /// translate is pinned to 0 for a height-fitted source that fills the
    /// container vertically (anti-jitter for tall narrow viewers).
    pub fn on_resize(&mut self, container_width: f64, container_height: f64) -> ViewportChange {
        let state = &mut self.state;
        state.container_width = container_width.max(1.0);
        state.container_height = container_height.max(1.0);

        let source_vertical = state.backing_height / state.backing_width.max(1.0)
            > state.container_height / state.container_width;

        if source_vertical {
            state.display_height = state.container_height;
            state.display_width =
                state.display_height * state.backing_width / state.backing_height.max(1.0);
        } else {
            state.display_width = state.container_width;
            state.display_height =
                state.display_width * state.backing_height / state.backing_width.max(1.0);
        }
        state.protect_size();

        state.prev_x = state.container_width * 0.5 - state.display_width * 0.5;
        state.prev_y = if source_vertical && state.container_height <= state.display_height {
            0.0
        } else {
            state.container_height * 0.5 - state.display_height * 0.5
        };
        state.translate_x = state.prev_x;
        state.translate_y = state.prev_y;

        ViewportChange::Zoom
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Controller with a large backing so clamping stays out of the way.
    fn controller(display_w: f64, display_h: f64) -> ViewportController {
        let mut c = ViewportController::new(0.1);
        c.set_backing(8192, 8192, 1.0);
        c.state.container_width = 1000.0;
        c.state.container_height = 800.0;
        c.state.display_width = display_w;
        c.state.display_height = display_h;
        c
    }

    // -------------------------------------------------------------------------
    // Wheel zoom
    // -------------------------------------------------------------------------

    #[test]
    fn test_wheel_zoom_in_at_center() {
        let mut c = controller(1000.0, 800.0);

        let change = c.on_wheel(-1.0, 500.0, 400.0);
        assert_eq!(change, ViewportChange::Zoom);

        // 0.1 zoom speed: 1000x800 -> 1100x880 (scaled dimensions carry
        // float noise, so compare with a tolerance)
        assert!((c.state().display_width - 1100.0).abs() < 1e-9);
        assert!((c.state().display_height - 880.0).abs() < 1e-9);

        // Cursor was at ratio (0.5, 0.5); translate re-anchors around it.
        // Flooring can land one pixel below the ideal anchor.
        assert!((c.state().translate_x + 50.0).abs() <= 1.0);
        assert!((c.state().translate_y + 40.0).abs() <= 1.0);
    }

    #[test]
    fn test_wheel_zoom_out_shrinks() {
        let mut c = controller(1000.0, 800.0);
        c.on_wheel(1.0, 0.0, 0.0);
        assert!((c.state().display_width - 900.0).abs() < 1e-9);
        assert!((c.state().display_height - 720.0).abs() < 1e-9);
    }

    #[test]
    fn test_wheel_zoom_anchors_content_under_cursor() {
        let mut c = controller(1000.0, 800.0);
        let (cursor_x, cursor_y) = (730.0, 220.0);

        let (ratio_before, ratio_y_before) = c.state.anchor_ratio(cursor_x, cursor_y);
        c.on_wheel(-1.0, cursor_x, cursor_y);
        let (ratio_after, ratio_y_after) = c.state.anchor_ratio(cursor_x, cursor_y);

        // Flooring the translate costs at most one pixel of display space
        assert!((ratio_before - ratio_after).abs() < 1.5 / c.state().display_width);
        assert!((ratio_y_before - ratio_y_after).abs() < 1.5 / c.state().display_height);
    }

    #[test]
    fn test_wheel_zoom_clamps_to_backing() {
        let mut c = controller(1000.0, 800.0);
        c.set_backing(1200, 960, 1.0);

        for _ in 0..10 {
            c.on_wheel(-1.0, 500.0, 400.0);
        }

        assert_eq!(c.state().display_width, 1200.0);
        assert_eq!(c.state().display_height, 960.0);
    }

    // -------------------------------------------------------------------------
    // Pan
    // -------------------------------------------------------------------------

    #[test]
    fn test_pan_tracks_pointer_displacement() {
        let mut c = controller(1000.0, 800.0);

        c.on_pointer_down(PointerInput::new(1, 100.0, 100.0));
        assert_eq!(c.phase(), GesturePhase::Panning);

        let change = c.on_pointer_move(PointerInput::new(1, 130.0, 75.0));
        assert_eq!(change, Some(ViewportChange::Pan));
        assert_eq!(c.state().translate_x, 30.0);
        assert_eq!(c.state().translate_y, -25.0);
    }

    #[test]
    fn test_pan_release_folds_displacement() {
        let mut c = controller(1000.0, 800.0);

        c.on_pointer_down(PointerInput::new(1, 100.0, 100.0));
        c.on_pointer_move(PointerInput::new(1, 150.0, 120.0));
        let ended = c.on_pointer_up(PointerInput::new(1, 150.0, 120.0));
        assert!(ended);
        assert_eq!(c.phase(), GesturePhase::Idle);

        // A second pan continues from the folded offset
        c.on_pointer_down(PointerInput::new(2, 0.0, 0.0));
        c.on_pointer_move(PointerInput::new(2, 10.0, 0.0));
        assert_eq!(c.state().translate_x, 60.0);
        assert_eq!(c.state().translate_y, 20.0);
    }

    #[test]
    fn test_move_of_unknown_pointer_is_ignored() {
        let mut c = controller(1000.0, 800.0);
        let change = c.on_pointer_move(PointerInput::new(9, 10.0, 10.0));
        assert_eq!(change, None);
        assert_eq!(c.state().translate_x, 0.0);
    }

    // -------------------------------------------------------------------------
    // Pinch
    // -------------------------------------------------------------------------

    #[test]
    fn test_pinch_apart_doubles_display() {
        let mut c = controller(500.0, 400.0);

        c.on_pointer_down(PointerInput::new(1, 100.0, 100.0));
        c.on_pointer_down(PointerInput::new(2, 200.0, 100.0));
        assert_eq!(c.phase(), GesturePhase::Pinching);

        // First move only opens the touch session
        assert_eq!(c.on_pointer_move(PointerInput::new(1, 50.0, 100.0)), None);

        // Fingers now 200px apart against a 100px baseline
        let change = c.on_pointer_move(PointerInput::new(2, 250.0, 100.0));
        assert_eq!(change, Some(ViewportChange::Zoom));
        assert_eq!(c.state().display_width, 1000.0);
        assert_eq!(c.state().display_height, 800.0);
    }

    #[test]
    fn test_pinch_scale_is_incremental_not_compounded() {
        let mut c = controller(500.0, 400.0);

        c.on_pointer_down(PointerInput::new(1, 100.0, 100.0));
        c.on_pointer_down(PointerInput::new(2, 200.0, 100.0));
        c.on_pointer_move(PointerInput::new(1, 100.0, 100.0));
        c.on_pointer_move(PointerInput::new(2, 300.0, 100.0));
        assert_eq!(c.state().display_width, 1000.0);

        // Holding the same distance must not keep scaling
        c.on_pointer_move(PointerInput::new(2, 300.0, 100.0));
        assert_eq!(c.state().display_width, 1000.0);
    }

    #[test]
    fn test_pinch_baseline_resets_per_session() {
        let mut c = controller(500.0, 400.0);

        c.on_pointer_down(PointerInput::new(1, 0.0, 0.0));
        c.on_pointer_down(PointerInput::new(2, 100.0, 0.0));
        c.on_pointer_move(PointerInput::new(1, 0.0, 0.0));
        c.on_pointer_move(PointerInput::new(2, 200.0, 0.0));
        assert_eq!(c.state().display_width, 1000.0);

        c.on_pointer_up(PointerInput::new(2, 200.0, 0.0));
        c.on_pointer_up(PointerInput::new(1, 0.0, 0.0));
        assert_eq!(c.phase(), GesturePhase::Idle);

        // New session: same finger spread, fresh baseline, no jump
        c.on_pointer_down(PointerInput::new(3, 0.0, 0.0));
        c.on_pointer_down(PointerInput::new(4, 200.0, 0.0));
        c.on_pointer_move(PointerInput::new(3, 0.0, 0.0));
        c.on_pointer_move(PointerInput::new(4, 200.0, 0.0));
        assert_eq!(c.state().display_width, 1000.0);
    }

    // -------------------------------------------------------------------------
    // Resize
    // -------------------------------------------------------------------------

    #[test]
    fn test_resize_fits_wide_source_by_width() {
        let mut c = ViewportController::new(0.1);
        c.set_backing(4096, 2048, 1.0);

        c.on_resize(1000.0, 800.0);

        assert_eq!(c.state().display_width, 1000.0);
        assert_eq!(c.state().display_height, 500.0);
        // Centered both ways
        assert_eq!(c.state().translate_x, 0.0);
        assert_eq!(c.state().translate_y, 150.0);
    }

    #[test]
    fn test_resize_fits_tall_source_by_height_and_pins_top() {
        let mut c = ViewportController::new(0.1);
        c.set_backing(2048, 4096, 1.0);

        c.on_resize(1000.0, 800.0);

        assert_eq!(c.state().display_height, 800.0);
        assert_eq!(c.state().display_width, 400.0);
        assert_eq!(c.state().translate_x, 300.0);
        // Vertical translate pinned to 0 for a full-height fit
        assert_eq!(c.state().translate_y, 0.0);
    }

    #[test]
    fn test_resize_clamps_to_backing_in_oversized_container() {
        let mut c = ViewportController::new(0.1);
        c.set_backing(600, 300, 1.0);

        c.on_resize(2000.0, 1500.0);

        // Fit would ask for 2000x1000; backing caps it at native size
        assert_eq!(c.state().display_width, 600.0);
        assert_eq!(c.state().display_height, 300.0);
    }

    // -------------------------------------------------------------------------
    // Gesture phases
    // -------------------------------------------------------------------------

    #[test]
    fn test_phase_transitions() {
        let mut c = controller(1000.0, 800.0);
        assert_eq!(c.phase(), GesturePhase::Idle);

        c.on_pointer_down(PointerInput::new(1, 0.0, 0.0));
        assert_eq!(c.phase(), GesturePhase::Panning);

        c.on_pointer_down(PointerInput::new(2, 50.0, 0.0));
        assert_eq!(c.phase(), GesturePhase::Pinching);

        assert!(!c.on_pointer_up(PointerInput::new(2, 50.0, 0.0)));
        assert_eq!(c.phase(), GesturePhase::Panning);

        assert!(c.on_pointer_up(PointerInput::new(1, 0.0, 0.0)));
        assert_eq!(c.phase(), GesturePhase::Idle);
    }
}
