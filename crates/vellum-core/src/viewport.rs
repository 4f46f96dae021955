//! Viewport controller: pan/zoom state, coordinate conversion, bounds clamping.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Configuration for snapping guidelines shown while dragging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnappingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Snap distance threshold in screen pixels.
    #[serde(default = "default_snap_threshold")]
    pub threshold: f64,
    #[serde(default = "default_true")]
    pub show_guidelines: bool,
}

fn default_true() -> bool {
    true
}

fn default_snap_threshold() -> f64 {
    8.0
}

impl Default for SnappingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: default_snap_threshold(),
            show_guidelines: true,
        }
    }
}

/// Camera state: single source of truth for the view transform.
///
/// `offset` is the world-space point at the top-left corner of the visible
/// rectangle. The visible world rect is therefore
/// `(offset.x, offset.y, offset.x + canvas_size.width / zoom, ..)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub zoom: f64,
    pub offset: Point,
    pub canvas_size: Size,
    /// Union of all element bounds, maintained by the host.
    pub content_bounds: Rect,
    #[serde(default)]
    pub snapping: SnappingConfig,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            offset: Point::ZERO,
            canvas_size: Size::new(800.0, 600.0),
            content_bounds: Rect::ZERO,
            snapping: SnappingConfig::default(),
        }
    }
}

impl ViewportState {
    /// World rectangle currently visible on screen.
    pub fn visible_rect(&self) -> Rect {
        Rect::new(
            self.offset.x,
            self.offset.y,
            self.offset.x + self.canvas_size.width / self.zoom,
            self.offset.y + self.canvas_size.height / self.zoom,
        )
    }

    /// World-to-screen transform.
    pub fn transform(&self) -> Affine {
        Affine::scale(self.zoom) * Affine::translate(-self.offset.to_vec2())
    }

    /// Screen-to-world transform.
    pub fn inverse_transform(&self) -> Affine {
        Affine::translate(self.offset.to_vec2()) * Affine::scale(1.0 / self.zoom)
    }

    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }
}

/// Zoom limits, bounds padding and easing settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Working-bounds padding as a fraction of the viewport's world size.
    pub bounds_padding: f64,
    /// Per-tick interpolation factor for animated bounds enforcement.
    pub ease_factor: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 10.0,
            bounds_padding: 0.5,
            ease_factor: 0.25,
        }
    }
}

type ViewportListener = Box<dyn FnMut(&ViewportState)>;

/// Owns the viewport state and applies camera operations with clamping.
///
/// All mutations go through the controller so zoom limits and working
/// bounds hold as invariants; every committed change notifies listeners.
pub struct ViewportController {
    state: ViewportState,
    config: ViewportConfig,
    /// Scrollable region, refreshed when content or canvas size change.
    working_bounds: Rect,
    /// Offset the camera is easing toward, if an animated clamp is active.
    ease_target: Option<Point>,
    listeners: Vec<ViewportListener>,
}

impl std::fmt::Debug for ViewportController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportController")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("ease_target", &self.ease_target)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

impl ViewportController {
    pub fn new(config: ViewportConfig) -> Self {
        let mut controller = Self {
            state: ViewportState::default(),
            config,
            working_bounds: Rect::ZERO,
            ease_target: None,
            listeners: Vec::new(),
        };
        controller.refresh_working_bounds();
        controller
    }

    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    /// Register a listener invoked after every committed change.
    pub fn subscribe(&mut self, listener: impl FnMut(&ViewportState) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&mut self) {
        // Listeners must not re-enter the controller; take the state by
        // value so the borrow ends before the callbacks run.
        let state = self.state.clone();
        for listener in &mut self.listeners {
            listener(&state);
        }
    }

    /// Replace the viewport wholesale, clamping zoom into range.
    pub fn set_viewport(&mut self, mut state: ViewportState) {
        state.zoom = state.zoom.clamp(self.config.min_zoom, self.config.max_zoom);
        if state == self.state {
            return;
        }
        self.state = state;
        self.ease_target = None;
        self.notify();
    }

    /// Zoom by `factor`, keeping the world point under `screen_point`
    /// fixed on screen.
    pub fn apply_zoom_around(&mut self, screen_point: Point, factor: f64) {
        let new_zoom = (self.state.zoom * factor).clamp(self.config.min_zoom, self.config.max_zoom);
        if (new_zoom - self.state.zoom).abs() < f64::EPSILON {
            return;
        }

        let anchor = self.state.screen_to_world(screen_point);
        self.state.zoom = new_zoom;

        // Re-solve offset so the anchor stays under the cursor.
        self.state.offset = Point::new(
            anchor.x - screen_point.x / new_zoom,
            anchor.y - screen_point.y / new_zoom,
        );
        self.ease_target = None;
        self.notify();
    }

    /// Pan by a screen-pixel delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        if dx.abs() < f64::EPSILON && dy.abs() < f64::EPSILON {
            return;
        }
        self.state.offset += Vec2::new(dx / self.state.zoom, dy / self.state.zoom);
        self.ease_target = None;
        self.notify();
    }

    pub fn set_canvas_size(&mut self, size: Size) {
        if size == self.state.canvas_size {
            return;
        }
        self.state.canvas_size = size;
        self.refresh_working_bounds();
        self.notify();
    }

    pub fn set_content_bounds(&mut self, bounds: Rect) {
        if bounds == self.state.content_bounds {
            return;
        }
        self.state.content_bounds = bounds;
        self.refresh_working_bounds();
        self.notify();
    }

    /// Working bounds: the padded union of content extent and the viewport
    /// rectangle at the last content/canvas change. The camera may never
    /// scroll outside this.
    pub fn working_bounds(&self) -> Rect {
        self.working_bounds
    }

    /// Recompute the scrollable region. Not called on pan/zoom: the camera
    /// clamps against where the content was, not wherever it scrolled to.
    fn refresh_working_bounds(&mut self) {
        let visible = self.state.visible_rect();
        let union = if self.state.content_bounds.is_zero_area() {
            visible
        } else {
            self.state.content_bounds.union(visible)
        };
        let pad_x = visible.width() * self.config.bounds_padding;
        let pad_y = visible.height() * self.config.bounds_padding;
        self.working_bounds = union.inflate(pad_x, pad_y);
    }

    fn clamped_offset(&self) -> Point {
        let bounds = self.working_bounds;
        let visible = self.state.visible_rect();

        let clamp_axis = |min: f64, max: f64, span: f64, value: f64| {
            if span >= max - min {
                // Viewport wider than the bounds: center on them.
                min + (max - min - span) / 2.0
            } else {
                value.clamp(min, max - span)
            }
        };

        Point::new(
            clamp_axis(bounds.x0, bounds.x1, visible.width(), self.state.offset.x),
            clamp_axis(bounds.y0, bounds.y1, visible.height(), self.state.offset.y),
        )
    }

    /// Clamp the offset into the working bounds.
    ///
    /// With `animated` the camera eases toward the clamped target over
    /// successive [`tick`](Self::tick) calls instead of snapping.
    pub fn enforce_bounds(&mut self, animated: bool) {
        let target = self.clamped_offset();
        let delta = target - self.state.offset;
        if delta.hypot() < 1e-6 {
            self.ease_target = None;
            return;
        }
        if animated {
            self.ease_target = Some(target);
        } else {
            self.state.offset = target;
            self.ease_target = None;
            self.notify();
        }
    }

    /// Advance any active easing animation by one frame.
    ///
    /// Returns true while the animation is still running.
    pub fn tick(&mut self) -> bool {
        let Some(target) = self.ease_target else {
            return false;
        };
        let delta = target - self.state.offset;
        if delta.hypot() < 0.5 / self.state.zoom {
            self.state.offset = target;
            self.ease_target = None;
            self.notify();
            return false;
        }
        self.state.offset += delta * self.config.ease_factor;
        self.notify();
        true
    }

    /// Center the content bounds in the viewport at the largest zoom that
    /// fits, with `padding` screen pixels on each side.
    pub fn fit_to_content(&mut self, padding: f64) {
        let bounds = self.state.content_bounds;
        if bounds.is_zero_area() {
            return;
        }

        let padded = Size::new(
            (self.state.canvas_size.width - padding * 2.0).max(1.0),
            (self.state.canvas_size.height - padding * 2.0).max(1.0),
        );
        let scale_x = padded.width / bounds.width();
        let scale_y = padded.height / bounds.height();
        self.state.zoom = scale_x
            .min(scale_y)
            .clamp(self.config.min_zoom, self.config.max_zoom);

        let center = bounds.center();
        self.state.offset = Point::new(
            center.x - self.state.canvas_size.width / (2.0 * self.state.zoom),
            center.y - self.state.canvas_size.height / (2.0 * self.state.zoom),
        );
        self.ease_target = None;
        self.refresh_working_bounds();
        self.notify();
    }

    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.state.screen_to_world(screen_point)
    }

    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.state.world_to_screen(world_point)
    }
}
