//! Render and overlay boundaries
//!
//! The writer hands these already-transformed, already-clipped geometry
//! plus a style and the effective opacity. Implementations report
//! success or failure and nothing else.

use crate::geometry::{Point, Rectangle, Size};
use crate::writer::style::{ShapeProperties, TextProperties};
use parking_lot::Mutex;
use std::sync::Arc;

pub trait RenderProvider: Send {
    /// Allocate or reallocate the drawing surface
    fn create_surface(&mut self, size: Size) -> bool;
    /// Wipe the surface
    fn clear(&mut self);
    fn text(&mut self, text: &str, bounds: Rectangle, props: &TextProperties, opacity: f32) -> bool;
    fn rectangle(&mut self, rect: Rectangle, style: &ShapeProperties, opacity: f32) -> bool;
    fn ellipse(&mut self, bounds: Rectangle, style: &ShapeProperties, opacity: f32) -> bool;
    fn line(&mut self, from: Point, to: Point, style: &ShapeProperties, opacity: f32) -> bool;
    /// Open polyline or closed polygon
    fn polygon(&mut self, points: &[Point], closed: bool, style: &ShapeProperties, opacity: f32) -> bool;
    /// Cubic bezier: start, two control points, end
    fn bezier(&mut self, points: [Point; 4], style: &ShapeProperties, opacity: f32) -> bool;
    fn image(&mut self, path: &str, dest: Rectangle, opacity: f32) -> bool;
}

/// A call recorded by `NullRenderer`
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Surface(Size),
    Clear,
    Text { text: String, bounds: Rectangle, opacity: f32 },
    Rectangle { rect: Rectangle, opacity: f32 },
    Ellipse { bounds: Rectangle, opacity: f32 },
    Line { from: Point, to: Point, opacity: f32 },
    Polygon { points: Vec<Point>, closed: bool, opacity: f32 },
    Bezier { points: [Point; 4], opacity: f32 },
    Image { path: String, dest: Rectangle, opacity: f32 },
}

#[derive(Debug, Default)]
struct RendererLog {
    calls: Vec<RenderCall>,
    fail_surface: bool,
    fail_draws: bool,
}

/// Renderer that draws nothing and logs every call.
///
/// Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct NullRenderer {
    log: Arc<Mutex<RendererLog>>,
}

impl NullRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.log.lock().calls.clone()
    }

    pub fn draw_count(&self) -> usize {
        self.log
            .lock()
            .calls
            .iter()
            .filter(|c| !matches!(c, RenderCall::Surface(_) | RenderCall::Clear))
            .count()
    }

    pub fn clear_calls(&self) {
        self.log.lock().calls.clear();
    }

    /// Make `create_surface` fail
    pub fn set_fail_surface(&self, fail: bool) {
        self.log.lock().fail_surface = fail;
    }

    /// Make every primitive fail
    pub fn set_fail_draws(&self, fail: bool) {
        self.log.lock().fail_draws = fail;
    }

    fn record(&mut self, call: RenderCall) -> bool {
        let mut log = self.log.lock();
        if log.fail_draws {
            return false;
        }
        log.calls.push(call);
        true
    }
}

impl RenderProvider for NullRenderer {
    fn create_surface(&mut self, size: Size) -> bool {
        let mut log = self.log.lock();
        if log.fail_surface {
            return false;
        }
        log.calls.push(RenderCall::Surface(size));
        true
    }

    fn clear(&mut self) {
        self.log.lock().calls.push(RenderCall::Clear);
    }

    fn text(&mut self, text: &str, bounds: Rectangle, _props: &TextProperties, opacity: f32) -> bool {
        self.record(RenderCall::Text {
            text: text.to_string(),
            bounds,
            opacity,
        })
    }

    fn rectangle(&mut self, rect: Rectangle, _style: &ShapeProperties, opacity: f32) -> bool {
        self.record(RenderCall::Rectangle { rect, opacity })
    }

    fn ellipse(&mut self, bounds: Rectangle, _style: &ShapeProperties, opacity: f32) -> bool {
        self.record(RenderCall::Ellipse { bounds, opacity })
    }

    fn line(&mut self, from: Point, to: Point, _style: &ShapeProperties, opacity: f32) -> bool {
        self.record(RenderCall::Line { from, to, opacity })
    }

    fn polygon(&mut self, points: &[Point], closed: bool, _style: &ShapeProperties, opacity: f32) -> bool {
        self.record(RenderCall::Polygon {
            points: points.to_vec(),
            closed,
            opacity,
        })
    }

    fn bezier(&mut self, points: [Point; 4], _style: &ShapeProperties, opacity: f32) -> bool {
        self.record(RenderCall::Bezier { points, opacity })
    }

    fn image(&mut self, path: &str, dest: Rectangle, opacity: f32) -> bool {
        self.record(RenderCall::Image {
            path: path.to_string(),
            dest,
            opacity,
        })
    }
}

/// Transparent top-level surface
pub trait OverlayProvider: Send {
    fn show(&mut self) -> bool;
    fn hide(&mut self) -> bool;
}

#[derive(Debug, Default)]
struct OverlayState {
    visible: bool,
    fail: bool,
    show_calls: usize,
}

/// Overlay that only tracks visibility; clones share state
#[derive(Debug, Clone, Default)]
pub struct NullOverlay {
    state: Arc<Mutex<OverlayState>>,
}

impl NullOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    pub fn show_calls(&self) -> usize {
        self.state.lock().show_calls
    }

    /// Make `show` fail, as when the platform denies a top-level surface
    pub fn set_fail(&self, fail: bool) {
        self.state.lock().fail = fail;
    }
}

impl OverlayProvider for NullOverlay {
    fn show(&mut self) -> bool {
        let mut state = self.state.lock();
        state.show_calls += 1;
        if state.fail {
            return false;
        }
        state.visible = true;
        true
    }

    fn hide(&mut self) -> bool {
        self.state.lock().visible = false;
        true
    }
}
