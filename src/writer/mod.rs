//! Canvas and annotation writer
//!
//! Owns the drawing surface abstraction, the layer stack, the drawing
//! context stack and the annotation store. Every primitive transforms its
//! geometry, checks it against the clip rectangle and forwards it to the
//! `RenderProvider` with the effective opacity (style x global x layer).

pub mod animation;
pub mod annotation;
pub mod context;
pub mod layer;
pub mod style;

pub use animation::{Animation, Keyframe};
pub use annotation::{Annotation, AnnotationId, AnnotationStore};
pub use context::{ContextStack, DrawingContext, Transform};
pub use layer::{Layer, LayerId, LayerStack, DEFAULT_LAYER};
pub use style::{Color, FontProperties, ShapeProperties, TextAlignment, TextProperties, TextStyle};

use crate::clock::SharedClock;
use crate::geometry::{bounding_rect, Point, Rectangle, Size};
use crate::providers::{ExportProvider, OverlayProvider, RenderProvider};
use crate::storage::{Storage, StorageError};
use log::{debug, info, trace, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Writer errors
#[derive(Debug)]
pub enum WriterError {
    NotInitialized,
    /// Drawing needs `create_canvas` first
    NoCanvas,
    InvalidSize(Size),
    LayerNotFound(LayerId),
    /// Geometry falls entirely outside the clip rectangle
    Clipped(Rectangle),
    /// The render provider rejected the call
    RenderFailed(DrawAction),
    /// The overlay provider could not show the surface
    OverlayFailed,
    AnnotationNotFound(AnnotationId),
    ExportFailed(String),
    Storage(StorageError),
}

impl fmt::Display for WriterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriterError::NotInitialized => write!(f, "Writer is not initialized"),
            WriterError::NoCanvas => write!(f, "No canvas has been created"),
            WriterError::InvalidSize(size) => write!(f, "Invalid canvas size {}", size),
            WriterError::LayerNotFound(id) => write!(f, "Layer {} not found", id),
            WriterError::Clipped(bounds) => write!(f, "Geometry {} is outside the clip rectangle", bounds),
            WriterError::RenderFailed(action) => write!(f, "Renderer rejected {:?}", action),
            WriterError::OverlayFailed => write!(f, "Overlay could not be shown"),
            WriterError::AnnotationNotFound(id) => write!(f, "Annotation {} not found", id),
            WriterError::ExportFailed(msg) => write!(f, "Export failed: {}", msg),
            WriterError::Storage(err) => write!(f, "Annotation storage error: {}", err),
        }
    }
}

impl std::error::Error for WriterError {}

impl From<StorageError> for WriterError {
    fn from(err: StorageError) -> Self {
        WriterError::Storage(err)
    }
}

pub type Result<T> = std::result::Result<T, WriterError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Ellipse,
    Line,
    Arrow,
    Polygon,
    Freehand,
    Bezier,
}

/// Tag passed to the drawing callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawAction {
    Text,
    Shape(ShapeKind),
    Image,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderStats {
    pub objects_rendered: u64,
    /// Time since the stats were last reset
    pub render_time: Duration,
    /// Rough bytes held by annotations
    pub memory_usage: usize,
    pub layer_count: usize,
}

pub type DrawingCallback = Box<dyn FnMut(Point, DrawAction) + Send>;
pub type AnnotationCallback = Box<dyn FnMut(&Annotation) + Send>;

struct RunningAnimation {
    animation: Animation,
    base_points: Vec<Point>,
    base_opacity: f32,
}

/// Default arrow head length in pixels
const ARROW_HEAD: f32 = 12.0;

/// Largest ellipse radius drawn; larger requests are clamped
const MAX_RADIUS: f32 = 1_048_576.0;

pub struct Writer {
    renderer: Box<dyn RenderProvider>,
    overlay: Box<dyn OverlayProvider>,
    exporter: Arc<dyn ExportProvider>,
    clock: SharedClock,
    epoch: Instant,
    initialized: bool,
    canvas_size: Option<Size>,
    layers: LayerStack,
    context: ContextStack,
    annotations: AnnotationStore,
    animations: BTreeMap<AnnotationId, RunningAnimation>,
    overlay_enabled: bool,
    overlay_visible: bool,
    real_time_drawing: bool,
    default_text: TextProperties,
    default_shape: ShapeProperties,
    drawing_callback: Option<DrawingCallback>,
    annotation_callback: Option<AnnotationCallback>,
    objects_rendered: u64,
    stats_reset_at: Instant,
}

impl Writer {
    pub fn new(
        renderer: Box<dyn RenderProvider>,
        overlay: Box<dyn OverlayProvider>,
        exporter: Arc<dyn ExportProvider>,
        clock: SharedClock,
    ) -> Self {
        let now = clock.now();
        Self {
            renderer,
            overlay,
            exporter,
            clock,
            epoch: now,
            initialized: false,
            canvas_size: None,
            layers: LayerStack::default(),
            context: ContextStack::default(),
            annotations: AnnotationStore::default(),
            animations: BTreeMap::new(),
            overlay_enabled: false,
            overlay_visible: false,
            real_time_drawing: false,
            default_text: TextProperties::default(),
            default_shape: ShapeProperties::default(),
            drawing_callback: None,
            annotation_callback: None,
            objects_rendered: 0,
            stats_reset_at: now,
        }
    }

    // ---- lifecycle ----

    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.initialized = true;
        self.stats_reset_at = self.clock.now();
        info!("Writer initialized");
        Ok(())
    }

    /// Stop real-time drawing, hide the overlay and drop all annotations
    pub fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }
        self.stop_real_time_drawing();
        self.disable_overlay();
        self.clear_annotations();
        self.animations.clear();
        self.context.reset();
        self.canvas_size = None;
        self.initialized = false;
        info!("Writer shut down");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(WriterError::NotInitialized)
        }
    }

    fn now_ms(&self) -> u64 {
        self.clock.now().saturating_duration_since(self.epoch).as_millis() as u64
    }

    // ---- canvas ----

    /// Allocate the surface; clears every layer's object list
    pub fn create_canvas(&mut self, size: Size) -> Result<()> {
        self.ensure_initialized()?;
        if size.is_empty() {
            warn!("Rejected canvas size {}", size);
            return Err(WriterError::InvalidSize(size));
        }
        if !self.renderer.create_surface(size) {
            warn!("Renderer could not allocate a {} surface", size);
            return Err(WriterError::RenderFailed(DrawAction::Image));
        }
        self.canvas_size = Some(size);
        self.layers.clear_objects();
        self.renderer.clear();
        debug!("Canvas created at {}", size);
        Ok(())
    }

    /// Resize, or create when there is no canvas yet
    pub fn resize_canvas(&mut self, size: Size) -> Result<()> {
        self.ensure_initialized()?;
        if size.is_empty() {
            return Err(WriterError::InvalidSize(size));
        }
        if self.canvas_size.is_none() {
            return self.create_canvas(size);
        }
        if !self.renderer.create_surface(size) {
            return Err(WriterError::RenderFailed(DrawAction::Image));
        }
        self.canvas_size = Some(size);
        Ok(())
    }

    /// Wipe the surface and the layer membership lists
    pub fn clear_canvas(&mut self) {
        if self.canvas_size.is_some() {
            self.renderer.clear();
        }
        self.layers.clear_objects();
    }

    pub fn canvas_size(&self) -> Option<Size> {
        self.canvas_size
    }

    pub fn has_canvas(&self) -> bool {
        self.canvas_size.is_some()
    }

    // ---- layers ----

    pub fn create_layer(&mut self, name: &str) -> LayerId {
        self.layers.create(name)
    }

    /// Remove a layer; its annotations move to the default layer
    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        if !self.layers.remove(id) {
            warn!("Layer {} cannot be removed", id);
            return false;
        }
        let moved = self.annotations.reassign_layer(id, DEFAULT_LAYER);
        if !moved.is_empty() {
            debug!("{} annotations moved from layer {} to the default layer", moved.len(), id);
        }
        for annotation in moved {
            self.layers.add_object(DEFAULT_LAYER, annotation);
        }
        true
    }

    pub fn set_active_layer(&mut self, id: LayerId) -> bool {
        self.layers.set_active(id)
    }

    pub fn active_layer(&self) -> LayerId {
        self.layers.active()
    }

    pub fn set_layer_opacity(&mut self, id: LayerId, opacity: f32) -> bool {
        self.layers.set_opacity(id, opacity)
    }

    pub fn set_layer_visible(&mut self, id: LayerId, visible: bool) -> bool {
        self.layers.set_visible(id, visible)
    }

    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.layers.ids()
    }

    pub fn layer(&self, id: LayerId) -> Option<Layer> {
        self.layers.get(id).cloned()
    }

    // ---- context ----

    pub fn push_context(&mut self) {
        self.context.push();
    }

    /// False when there is nothing to pop
    pub fn pop_context(&mut self) -> bool {
        let popped = self.context.pop();
        if !popped {
            warn!("pop_context on an empty context stack");
        }
        popped
    }

    pub fn context(&self) -> DrawingContext {
        *self.context.current()
    }

    pub fn set_clip_rect(&mut self, rect: Rectangle) {
        self.context.current_mut().clip_rect = Some(rect);
    }

    pub fn clear_clip_rect(&mut self) {
        self.context.current_mut().clip_rect = None;
    }

    pub fn set_global_opacity(&mut self, opacity: f32) {
        self.context.current_mut().global_opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.context.current_mut().transform = transform;
    }

    pub fn reset_transform(&mut self) {
        self.context.current_mut().transform = Transform::IDENTITY;
    }

    // ---- primitives ----

    /// Common tail of every primitive: clip test, hidden-layer skip,
    /// provider call, stats and callback
    fn render(
        &mut self,
        action: DrawAction,
        anchor: Point,
        bounds: Rectangle,
        style_opacity: f32,
        draw: impl FnOnce(&mut dyn RenderProvider, Option<Rectangle>, f32) -> bool,
    ) -> Result<()> {
        self.ensure_initialized()?;
        if self.canvas_size.is_none() {
            return Err(WriterError::NoCanvas);
        }

        let context = *self.context.current();
        if !context.admits(&bounds) {
            debug!("{:?} at {} clipped out", action, bounds);
            return Err(WriterError::Clipped(bounds));
        }
        if !self.layers.active_visible() {
            trace!("Active layer hidden, skipping {:?}", action);
            return Ok(());
        }

        let opacity = (style_opacity * context.global_opacity * self.layers.active_opacity()).clamp(0.0, 1.0);
        let clipped = context.clip_rect.map(|clip| clip.intersection(&bounds));
        if !draw(self.renderer.as_mut(), clipped, opacity) {
            warn!("Renderer rejected {:?}", action);
            return Err(WriterError::RenderFailed(action));
        }

        self.objects_rendered += 1;
        if let Some(callback) = self.drawing_callback.as_mut() {
            callback(anchor, action);
        }
        Ok(())
    }

    fn transform(&self) -> Transform {
        self.context.current().transform
    }

    fn shape_or_default(&self, style: Option<&ShapeProperties>) -> ShapeProperties {
        style.cloned().unwrap_or_else(|| self.default_shape.clone())
    }

    fn text_or_default(&self, props: Option<&TextProperties>) -> TextProperties {
        props.cloned().unwrap_or_else(|| self.default_text.clone())
    }

    /// Single-line text anchored at its top-left corner
    pub fn draw_text(&mut self, text: &str, position: Point, props: Option<&TextProperties>) -> Result<()> {
        let props = self.text_or_default(props);
        let chars = text.chars().count() as f32;
        let width = (chars * props.font.size * 0.6 + chars * props.font.letter_spacing).ceil() as i32;
        let height = (props.font.size * props.font.line_height).ceil() as i32;
        let rect = Rectangle::new(position.x, position.y, width.max(1), height.max(1));
        self.draw_text_in_rect(text, rect, Some(&props))
    }

    pub fn draw_text_in_rect(&mut self, text: &str, rect: Rectangle, props: Option<&TextProperties>) -> Result<()> {
        let props = self.text_or_default(props);
        let bounds = self.transform().apply_rect(rect);
        let anchor = bounds.top_left();
        let opacity = props.color.a as f32 / 255.0;
        self.render(DrawAction::Text, anchor, bounds, opacity, |r, clip, o| {
            r.text(text, clip.unwrap_or(bounds), &props, o)
        })
    }

    /// Dispatch on `kind`; point requirements follow the shape
    pub fn draw_shape(&mut self, kind: ShapeKind, points: &[Point], style: Option<&ShapeProperties>) -> Result<()> {
        match (kind, points) {
            (ShapeKind::Rectangle, [a, b, ..]) => self.draw_rectangle(Rectangle::from_corners(*a, *b), style),
            (ShapeKind::Circle, [center, edge, ..]) => {
                self.draw_circle(*center, center.distance_to(*edge), style)
            }
            (ShapeKind::Ellipse, [a, b, ..]) => {
                let rect = Rectangle::from_corners(*a, *b);
                self.draw_ellipse(rect.center(), rect.width as f32 / 2.0, rect.height as f32 / 2.0, style)
            }
            (ShapeKind::Line, [a, b, ..]) => self.draw_line(*a, *b, style),
            (ShapeKind::Arrow, [a, b, ..]) => self.draw_arrow(*a, *b, ARROW_HEAD, style),
            (ShapeKind::Polygon, pts) if pts.len() >= 3 => self.draw_polygon(pts, style),
            (ShapeKind::Freehand, pts) if pts.len() >= 2 => self.draw_polyline(pts, style),
            (ShapeKind::Bezier, [a, b, c, d, ..]) => self.draw_bezier(*a, *b, *c, *d, style),
            _ => {
                warn!("{:?} needs more than {} points", kind, points.len());
                Err(WriterError::RenderFailed(DrawAction::Shape(kind)))
            }
        }
    }

    pub fn draw_rectangle(&mut self, rect: Rectangle, style: Option<&ShapeProperties>) -> Result<()> {
        let style = self.shape_or_default(style);
        let bounds = self.transform().apply_rect(rect);
        self.render(
            DrawAction::Shape(ShapeKind::Rectangle),
            bounds.top_left(),
            bounds,
            style.opacity,
            |r, clip, o| r.rectangle(clip.unwrap_or(bounds), &style, o),
        )
    }

    pub fn draw_rounded_rectangle(&mut self, rect: Rectangle, radius: f32, style: Option<&ShapeProperties>) -> Result<()> {
        let mut style = self.shape_or_default(style);
        style.corner_radius = self.transform().apply_length(radius.max(0.0));
        self.draw_rectangle(rect, Some(&style))
    }

    pub fn draw_circle(&mut self, center: Point, radius: f32, style: Option<&ShapeProperties>) -> Result<()> {
        self.draw_ellipse_kind(ShapeKind::Circle, center, radius, radius, style)
    }

    pub fn draw_ellipse(&mut self, center: Point, radius_x: f32, radius_y: f32, style: Option<&ShapeProperties>) -> Result<()> {
        self.draw_ellipse_kind(ShapeKind::Ellipse, center, radius_x, radius_y, style)
    }

    fn draw_ellipse_kind(
        &mut self,
        kind: ShapeKind,
        center: Point,
        radius_x: f32,
        radius_y: f32,
        style: Option<&ShapeProperties>,
    ) -> Result<()> {
        let style = self.shape_or_default(style);
        // NaN collapses to zero
        let rx = radius_x.clamp(0.0, MAX_RADIUS).round() as i32;
        let ry = radius_y.clamp(0.0, MAX_RADIUS).round() as i32;
        let local = Rectangle::new(
            center.x.saturating_sub(rx),
            center.y.saturating_sub(ry),
            rx.saturating_mul(2),
            ry.saturating_mul(2),
        );
        let transform = self.transform();
        let bounds = transform.apply_rect(local);
        let anchor = transform.apply(center);
        self.render(DrawAction::Shape(kind), anchor, bounds, style.opacity, |r, _, o| {
            r.ellipse(bounds, &style, o)
        })
    }

    pub fn draw_line(&mut self, start: Point, end: Point, style: Option<&ShapeProperties>) -> Result<()> {
        let style = self.shape_or_default(style);
        let transform = self.transform();
        let (a, b) = (transform.apply(start), transform.apply(end));
        self.render(
            DrawAction::Shape(ShapeKind::Line),
            a,
            bounding_rect(&[a, b]),
            style.opacity,
            |r, _, o| r.line(a, b, &style, o),
        )
    }

    fn draw_path(&mut self, kind: ShapeKind, points: &[Point], closed: bool, style: Option<&ShapeProperties>) -> Result<()> {
        let style = self.shape_or_default(style);
        let transform = self.transform();
        let transformed: Vec<Point> = points.iter().map(|p| transform.apply(*p)).collect();
        let Some(anchor) = transformed.first().copied() else {
            return Err(WriterError::RenderFailed(DrawAction::Shape(kind)));
        };
        let bounds = bounding_rect(&transformed);
        self.render(DrawAction::Shape(kind), anchor, bounds, style.opacity, |r, _, o| {
            r.polygon(&transformed, closed, &style, o)
        })
    }

    pub fn draw_polyline(&mut self, points: &[Point], style: Option<&ShapeProperties>) -> Result<()> {
        self.draw_path(ShapeKind::Freehand, points, false, style)
    }

    pub fn draw_polygon(&mut self, points: &[Point], style: Option<&ShapeProperties>) -> Result<()> {
        self.draw_path(ShapeKind::Polygon, points, true, style)
    }

    /// Shaft plus a two-segment head at `end`
    pub fn draw_arrow(&mut self, start: Point, end: Point, head_size: f32, style: Option<&ShapeProperties>) -> Result<()> {
        let style = self.shape_or_default(style);
        let transform = self.transform();
        let (a, b) = (transform.apply(start), transform.apply(end));
        let head = transform.apply_length(head_size);
        let angle = crate::geometry::angle(b, a);
        let spread = std::f32::consts::FRAC_PI_6;
        let wing = |offset: f32| {
            Point::new(
                b.x + ((angle + offset).cos() * head).round() as i32,
                b.y + ((angle + offset).sin() * head).round() as i32,
            )
        };
        let path = [a, b, wing(spread), b, wing(-spread)];
        self.render(
            DrawAction::Shape(ShapeKind::Arrow),
            a,
            bounding_rect(&path),
            style.opacity,
            |r, _, o| r.polygon(&path, false, &style, o),
        )
    }

    pub fn draw_bezier(
        &mut self,
        start: Point,
        control1: Point,
        control2: Point,
        end: Point,
        style: Option<&ShapeProperties>,
    ) -> Result<()> {
        let style = self.shape_or_default(style);
        let transform = self.transform();
        let points = [start, control1, control2, end].map(|p| transform.apply(p));
        self.render(
            DrawAction::Shape(ShapeKind::Bezier),
            points[0],
            bounding_rect(&points),
            style.opacity,
            |r, _, o| r.bezier(points, &style, o),
        )
    }

    /// Image at `position`; `size` defaults to 100x100 when the host does
    /// not report one
    pub fn draw_image(&mut self, path: &str, position: Point, size: Option<Size>) -> Result<()> {
        let size = size.filter(|s| !s.is_empty()).unwrap_or(Size::new(100, 100));
        let bounds = self.transform().apply_rect(Rectangle::from_origin_size(position, size));
        self.render(DrawAction::Image, bounds.top_left(), bounds, 1.0, |r, clip, o| {
            r.image(path, clip.unwrap_or(bounds), o)
        })
    }

    // ---- annotations ----

    /// Store `annotation` on the active layer; returns its new id
    pub fn add_annotation(&mut self, annotation: Annotation) -> Result<AnnotationId> {
        let layer = self.layers.active();
        self.add_annotation_to(annotation, layer)
    }

    fn add_annotation_to(&mut self, annotation: Annotation, layer: LayerId) -> Result<AnnotationId> {
        self.ensure_initialized()?;
        let layer = if self.layers.contains(layer) { layer } else { self.layers.active() };
        let timestamp = self.now_ms();
        let id = self.annotations.add(annotation, layer, timestamp);
        self.layers.add_object(layer, id);
        debug!("Annotation {} added to layer {}", id, layer);
        self.notify_annotation(id);
        Ok(id)
    }

    fn notify_annotation(&mut self, id: AnnotationId) {
        if let (Some(callback), Some(annotation)) = (self.annotation_callback.as_mut(), self.annotations.get(id)) {
            callback(annotation);
        }
    }

    pub fn remove_annotation(&mut self, id: AnnotationId) -> bool {
        match self.annotations.remove(id) {
            Some(_) => {
                self.layers.remove_object(id);
                self.animations.remove(&id);
                true
            }
            None => {
                debug!("Annotation {} not found for removal", id);
                false
            }
        }
    }

    pub fn update_annotation(&mut self, id: AnnotationId, annotation: Annotation) -> bool {
        if !self.annotations.update(id, annotation) {
            return false;
        }
        self.notify_annotation(id);
        true
    }

    pub fn annotation(&self, id: AnnotationId) -> Option<Annotation> {
        self.annotations.get(id).cloned()
    }

    pub fn annotations(&self) -> Vec<Annotation> {
        self.annotations.all().to_vec()
    }

    pub fn annotation_count(&self) -> usize {
        self.annotations.len()
    }

    pub fn clear_annotations(&mut self) {
        self.annotations.clear();
        self.layers.clear_objects();
        self.animations.clear();
    }

    /// Remove the most recent annotation; false when history is empty
    pub fn undo_last_annotation(&mut self) -> bool {
        match self.annotations.undo() {
            Some(annotation) => {
                self.layers.remove_object(annotation.id);
                self.animations.remove(&annotation.id);
                debug!("Undid annotation {}", annotation.id);
                true
            }
            None => false,
        }
    }

    /// Re-add the last undone annotation under a fresh id
    pub fn redo_annotation(&mut self) -> Option<AnnotationId> {
        let layer = self
            .annotations
            .peek_redo_layer()
            .filter(|l| self.layers.contains(*l))
            .unwrap_or_else(|| self.layers.active());
        let timestamp = self.now_ms();
        let redone = self.annotations.redo(layer, timestamp)?;
        self.layers.add_object(layer, redone.id);
        debug!("Redid annotation as {}", redone.id);
        self.notify_annotation(redone.id);
        Some(redone.id)
    }

    pub fn can_undo(&self) -> bool {
        self.annotations.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.annotations.can_redo()
    }

    /// Draw every visible annotation on a visible layer; returns the count
    /// drawn
    pub fn render_annotations(&mut self) -> usize {
        let visible: Vec<Annotation> = self
            .annotations
            .all()
            .iter()
            .filter(|a| a.visible)
            .filter(|a| self.layers.get(a.layer).map(|l| l.visible).unwrap_or(false))
            .cloned()
            .collect();

        let previous_layer = self.layers.active();
        let mut drawn = 0;
        for annotation in visible {
            self.layers.set_active(annotation.layer);
            if self.render_annotation(&annotation).is_ok() {
                drawn += 1;
            }
        }
        self.layers.set_active(previous_layer);
        drawn
    }

    fn render_annotation(&mut self, annotation: &Annotation) -> Result<()> {
        let style = annotation.shape_props.clone();
        match (annotation.kind.as_str(), annotation.points.as_slice()) {
            (_, [anchor, ..]) if !annotation.text.is_empty() => {
                let props = annotation.text_props.clone();
                self.draw_text(&annotation.text, *anchor, Some(&props))
            }
            (_, [point]) => self.draw_circle(*point, 10.0, Some(&style)),
            ("rectangle", points) => self.draw_shape(ShapeKind::Rectangle, points, Some(&style)),
            ("circle", points) => self.draw_shape(ShapeKind::Circle, points, Some(&style)),
            ("ellipse", points) => self.draw_shape(ShapeKind::Ellipse, points, Some(&style)),
            ("arrow", points) => self.draw_shape(ShapeKind::Arrow, points, Some(&style)),
            ("polygon", points) => self.draw_shape(ShapeKind::Polygon, points, Some(&style)),
            ("bezier", points) => self.draw_shape(ShapeKind::Bezier, points, Some(&style)),
            (_, [a, b]) => self.draw_line(*a, *b, Some(&style)),
            (_, points) if points.len() > 2 => self.draw_polyline(points, Some(&style)),
            _ => Err(WriterError::AnnotationNotFound(annotation.id)),
        }
    }

    pub fn set_annotation_callback(&mut self, callback: impl FnMut(&Annotation) + Send + 'static) {
        self.annotation_callback = Some(Box::new(callback));
    }

    pub fn set_drawing_callback(&mut self, callback: impl FnMut(Point, DrawAction) + Send + 'static) {
        self.drawing_callback = Some(Box::new(callback));
    }

    // ---- animations ----

    /// Animate an existing annotation; replaces any running animation
    pub fn start_animation(&mut self, object_id: AnnotationId, animation: Animation) -> Result<()> {
        let annotation = self
            .annotations
            .get(object_id)
            .ok_or(WriterError::AnnotationNotFound(object_id))?;
        self.animations.insert(
            object_id,
            RunningAnimation {
                animation,
                base_points: annotation.points.clone(),
                base_opacity: annotation.shape_props.opacity,
            },
        );
        Ok(())
    }

    pub fn stop_animation(&mut self, object_id: AnnotationId) -> bool {
        self.animations.remove(&object_id).is_some()
    }

    pub fn is_animating(&self, object_id: AnnotationId) -> bool {
        self.animations.contains_key(&object_id)
    }

    /// Advance all animations by `delta` seconds, applying position, scale
    /// and opacity; finished ones are dropped. Returns the count still
    /// running.
    pub fn update_animations(&mut self, delta: f32) -> usize {
        let mut finished = Vec::new();
        for (id, running) in self.animations.iter_mut() {
            let state = running.animation.advance(delta);
            let Some(annotation) = self.annotations.get_mut(*id) else {
                finished.push(*id);
                continue;
            };

            let origin = running.base_points.first().copied().unwrap_or_default();
            annotation.points = running
                .base_points
                .iter()
                .map(|p| (*p - origin).scaled(state.scale) + state.position)
                .collect();
            annotation.shape_props.opacity = (running.base_opacity * state.opacity).clamp(0.0, 1.0);

            if running.animation.is_finished() {
                finished.push(*id);
            }
        }
        for id in finished {
            self.animations.remove(&id);
        }
        self.animations.len()
    }

    // ---- overlay ----

    /// Show the overlay surface; no-op when already enabled
    pub fn enable_overlay(&mut self) -> Result<()> {
        if self.overlay_enabled {
            return Ok(());
        }
        if !self.overlay.show() {
            warn!("Overlay provider refused to show");
            return Err(WriterError::OverlayFailed);
        }
        self.overlay_enabled = true;
        self.overlay_visible = true;
        debug!("Overlay enabled");
        Ok(())
    }

    /// Hide the overlay and stop real-time drawing; no-op when disabled
    pub fn disable_overlay(&mut self) {
        if !self.overlay_enabled {
            return;
        }
        self.real_time_drawing = false;
        self.overlay.hide();
        self.overlay_enabled = false;
        self.overlay_visible = false;
        debug!("Overlay disabled");
    }

    pub fn is_overlay_enabled(&self) -> bool {
        self.overlay_enabled
    }

    pub fn show_overlay(&mut self) -> Result<()> {
        if !self.overlay_enabled {
            return self.enable_overlay();
        }
        if !self.overlay.show() {
            return Err(WriterError::OverlayFailed);
        }
        self.overlay_visible = true;
        Ok(())
    }

    pub fn hide_overlay(&mut self) {
        if self.overlay_enabled {
            self.overlay.hide();
        }
        self.overlay_visible = false;
    }

    pub fn is_overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    /// Enables the overlay first when needed
    pub fn start_real_time_drawing(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.enable_overlay()?;
        self.real_time_drawing = true;
        Ok(())
    }

    pub fn stop_real_time_drawing(&mut self) {
        self.real_time_drawing = false;
    }

    pub fn is_real_time_drawing(&self) -> bool {
        self.real_time_drawing
    }

    // ---- defaults ----

    pub fn set_default_text_properties(&mut self, props: TextProperties) {
        self.default_text = props;
    }

    pub fn set_default_shape_properties(&mut self, props: ShapeProperties) {
        self.default_shape = props;
    }

    pub fn default_text_properties(&self) -> &TextProperties {
        &self.default_text
    }

    pub fn default_shape_properties(&self) -> &ShapeProperties {
        &self.default_shape
    }

    // ---- export ----

    pub fn export_to_image(&self, path: &str) -> Result<()> {
        let size = self.canvas_size.ok_or(WriterError::NoCanvas)?;
        if !self.exporter.export_image(path, size) {
            return Err(WriterError::ExportFailed(format!("image export to {} failed", path)));
        }
        info!("Exported canvas image to {}", path);
        Ok(())
    }

    pub fn export_to_video(&self, path: &str, duration_secs: f32, fps: f32) -> Result<()> {
        self.canvas_size.ok_or(WriterError::NoCanvas)?;
        if !self.exporter.export_frames(path, fps, duration_secs) {
            return Err(WriterError::ExportFailed(format!("video export to {} failed", path)));
        }
        info!("Exported {}s at {} fps to {}", duration_secs, fps, path);
        Ok(())
    }

    /// Write all annotations as JSON; returns the count written
    pub fn export_annotations(&self, storage: &dyn Storage, key: &str) -> Result<usize> {
        let data = serde_json::to_vec_pretty(self.annotations.all()).map_err(StorageError::from)?;
        storage.save(key, &data)?;
        Ok(self.annotations.len())
    }

    /// Re-add annotations from JSON under fresh ids; returns the count
    /// imported
    pub fn import_annotations(&mut self, storage: &dyn Storage, key: &str) -> Result<usize> {
        self.ensure_initialized()?;
        let data = storage.load(key)?;
        let imported: Vec<Annotation> = serde_json::from_slice(&data).map_err(StorageError::from)?;
        let count = imported.len();
        for annotation in imported {
            let layer = annotation.layer;
            self.add_annotation_to(annotation, layer)?;
        }
        info!("Imported {} annotations from {}", count, key);
        Ok(count)
    }

    // ---- stats ----

    pub fn render_stats(&self) -> RenderStats {
        let memory_usage = self
            .annotations
            .all()
            .iter()
            .map(|a| {
                std::mem::size_of::<Annotation>()
                    + a.points.len() * std::mem::size_of::<Point>()
                    + a.text.len()
            })
            .sum();
        RenderStats {
            objects_rendered: self.objects_rendered,
            render_time: self.clock.now().saturating_duration_since(self.stats_reset_at),
            memory_usage,
            layer_count: self.layers.len(),
        }
    }

    pub fn reset_render_stats(&mut self) {
        self.objects_rendered = 0;
        self.stats_reset_at = self.clock.now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::providers::{NullExporter, NullOverlay, NullRenderer, RenderCall};
    use crate::storage::MemoryStorage;
    use parking_lot::Mutex;

    struct Harness {
        writer: Writer,
        renderer: NullRenderer,
        overlay: NullOverlay,
        clock: ManualClock,
    }

    fn harness() -> Harness {
        let renderer = NullRenderer::new();
        let overlay = NullOverlay::new();
        let clock = ManualClock::new();
        let mut writer = Writer::new(
            Box::new(renderer.clone()),
            Box::new(overlay.clone()),
            Arc::new(NullExporter::new()),
            Arc::new(clock.clone()),
        );
        writer.initialize().unwrap();
        writer.create_canvas(Size::new(800, 600)).unwrap();
        renderer.clear_calls();
        Harness { writer, renderer, overlay, clock }
    }

    fn dot(x: i32, y: i32) -> Annotation {
        Annotation::new("click").with_points(vec![Point::new(x, y)])
    }

    #[test]
    fn canvas_rejects_empty_sizes() {
        let mut h = harness();
        assert!(matches!(
            h.writer.create_canvas(Size::new(0, 10)),
            Err(WriterError::InvalidSize(_))
        ));
        assert!(h.writer.resize_canvas(Size::new(-1, 10)).is_err());
        h.writer.resize_canvas(Size::new(1024, 768)).unwrap();
        assert_eq!(h.writer.canvas_size(), Some(Size::new(1024, 768)));
    }

    #[test]
    fn create_canvas_clears_layer_objects_not_layers() {
        let mut h = harness();
        let notes = h.writer.create_layer("Notes");
        h.writer.set_active_layer(notes);
        h.writer.add_annotation(dot(1, 1)).unwrap();
        assert_eq!(h.writer.layer(notes).unwrap().objects.len(), 1);

        h.writer.create_canvas(Size::new(640, 480)).unwrap();
        assert!(h.writer.layer(notes).unwrap().objects.is_empty());
        assert_eq!(h.writer.layer_ids(), vec![DEFAULT_LAYER, notes]);
        assert_eq!(h.writer.annotation_count(), 1);
    }

    #[test]
    fn drawing_without_canvas_fails() {
        let mut writer = Writer::new(
            Box::new(NullRenderer::new()),
            Box::new(NullOverlay::new()),
            Arc::new(NullExporter::new()),
            Arc::new(ManualClock::new()),
        );
        assert!(matches!(
            writer.draw_line(Point::new(0, 0), Point::new(1, 1), None),
            Err(WriterError::NotInitialized)
        ));
        writer.initialize().unwrap();
        assert!(matches!(
            writer.draw_line(Point::new(0, 0), Point::new(1, 1), None),
            Err(WriterError::NoCanvas)
        ));
    }

    #[test]
    fn primitives_apply_transform_and_notify() {
        let mut h = harness();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        h.writer.set_drawing_callback(move |p, action| sink.lock().push((p, action)));

        h.writer.set_transform(Transform::translate(10, 20));
        h.writer.draw_rectangle(Rectangle::new(0, 0, 50, 50), None).unwrap();
        h.writer.draw_line(Point::new(0, 0), Point::new(5, 0), None).unwrap();

        assert_eq!(
            h.renderer.calls()[0],
            RenderCall::Rectangle { rect: Rectangle::new(10, 20, 50, 50), opacity: 1.0 }
        );
        assert_eq!(
            seen.lock().clone(),
            vec![
                (Point::new(10, 20), DrawAction::Shape(ShapeKind::Rectangle)),
                (Point::new(10, 20), DrawAction::Shape(ShapeKind::Line)),
            ]
        );
        assert_eq!(h.writer.render_stats().objects_rendered, 2);
    }

    #[test]
    fn clip_rect_rejects_outside_and_clips_inside() {
        let mut h = harness();
        h.writer.set_clip_rect(Rectangle::new(0, 0, 100, 100));
        assert!(matches!(
            h.writer.draw_rectangle(Rectangle::new(200, 200, 10, 10), None),
            Err(WriterError::Clipped(_))
        ));
        h.writer.draw_rectangle(Rectangle::new(50, 50, 100, 100), None).unwrap();
        assert_eq!(
            h.renderer.calls(),
            vec![RenderCall::Rectangle { rect: Rectangle::new(50, 50, 50, 50), opacity: 1.0 }]
        );
    }

    #[test]
    fn effective_opacity_multiplies_style_global_and_layer() {
        let mut h = harness();
        let layer = h.writer.create_layer("Faded");
        h.writer.set_active_layer(layer);
        h.writer.set_layer_opacity(layer, 0.5);
        h.writer.set_global_opacity(0.5);
        let style = ShapeProperties { opacity: 0.8, ..ShapeProperties::default() };
        h.writer.draw_line(Point::new(0, 0), Point::new(10, 10), Some(&style)).unwrap();

        match &h.renderer.calls()[0] {
            RenderCall::Line { opacity, .. } => assert!((opacity - 0.2).abs() < 1e-6),
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn hidden_layer_skips_provider_but_succeeds() {
        let mut h = harness();
        let layer = h.writer.create_layer("Hidden");
        h.writer.set_active_layer(layer);
        h.writer.set_layer_visible(layer, false);
        h.writer.draw_circle(Point::new(50, 50), 10.0, None).unwrap();
        assert_eq!(h.renderer.draw_count(), 0);
        assert_eq!(h.writer.render_stats().objects_rendered, 0);
    }

    #[test]
    fn context_push_pop() {
        let mut h = harness();
        h.writer.set_global_opacity(0.4);
        h.writer.push_context();
        h.writer.set_global_opacity(2.0);
        assert_eq!(h.writer.context().global_opacity, 1.0);
        assert!(h.writer.pop_context());
        assert_eq!(h.writer.context().global_opacity, 0.4);
        assert!(!h.writer.pop_context());
    }

    #[test]
    fn shape_dispatch_checks_point_count() {
        let mut h = harness();
        assert!(h.writer.draw_shape(ShapeKind::Polygon, &[Point::new(0, 0)], None).is_err());
        h.writer
            .draw_shape(
                ShapeKind::Polygon,
                &[Point::new(0, 0), Point::new(10, 0), Point::new(5, 5)],
                None,
            )
            .unwrap();
        h.writer
            .draw_shape(ShapeKind::Arrow, &[Point::new(0, 0), Point::new(100, 0)], None)
            .unwrap();
        assert_eq!(h.renderer.draw_count(), 2);
    }

    #[test]
    fn annotation_ids_increase_and_count_tracks_adds_minus_removes() {
        let mut h = harness();
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(h.writer.add_annotation(dot(i, i)).unwrap());
        }
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert!(h.writer.remove_annotation(ids[1]));
        assert!(h.writer.remove_annotation(ids[3]));
        assert!(!h.writer.remove_annotation(ids[3]));
        assert_eq!(h.writer.annotation_count(), 3);
    }

    #[test]
    fn undo_redo_semantics() {
        let mut h = harness();
        h.writer.add_annotation(dot(0, 0)).unwrap();
        let last = h.writer.add_annotation(dot(5, 5)).unwrap();

        assert!(h.writer.undo_last_annotation());
        assert!(h.writer.annotation(last).is_none());
        let redone = h.writer.redo_annotation().unwrap();
        assert!(redone > last);
        assert_eq!(h.writer.annotation(redone).unwrap().points, vec![Point::new(5, 5)]);
        assert!(h.writer.redo_annotation().is_none());

        // undo, add new, redo fails
        assert!(h.writer.undo_last_annotation());
        h.writer.add_annotation(dot(9, 9)).unwrap();
        assert!(h.writer.redo_annotation().is_none());
    }

    #[test]
    fn removing_layer_keeps_its_annotations() {
        let mut h = harness();
        let draft = h.writer.create_layer("Draft");
        h.writer.set_active_layer(draft);
        for i in 0..3 {
            h.writer.add_annotation(dot(i, i)).unwrap();
        }
        assert!(h.writer.remove_layer(draft));
        assert_eq!(h.writer.annotation_count(), 3);
        assert_eq!(h.writer.active_layer(), DEFAULT_LAYER);
        assert!(!h.writer.remove_layer(DEFAULT_LAYER));
    }

    #[test]
    fn annotations_of_a_removed_layer_are_still_drawn() {
        let mut h = harness();
        let draft = h.writer.create_layer("Draft");
        h.writer.set_active_layer(draft);
        h.writer.add_annotation(dot(40, 40)).unwrap();
        h.writer.add_annotation(dot(50, 50)).unwrap();
        assert!(h.writer.remove_layer(draft));

        let moved = h.writer.annotations();
        assert!(moved.iter().all(|a| a.layer == DEFAULT_LAYER));
        let members = h.writer.layer(DEFAULT_LAYER).unwrap().objects;
        assert!(moved.iter().all(|a| members.contains(&a.id)));

        h.renderer.clear_calls();
        assert_eq!(h.writer.render_annotations(), 2);
        assert_eq!(h.renderer.calls().len(), 2);

        // history follows the move too
        assert!(h.writer.undo_last_annotation());
        assert!(h.writer.redo_annotation().is_some());
        assert!(h.writer.annotations().iter().all(|a| a.layer == DEFAULT_LAYER));
    }

    #[test]
    fn oversized_radius_is_clamped() {
        let mut h = harness();
        h.writer.draw_circle(Point::new(10, 10), f32::MAX, None).unwrap();
        h.writer.draw_ellipse(Point::new(i32::MAX, 0), f32::INFINITY, 4.0, None).unwrap();

        let calls = h.renderer.calls();
        let diameter = 2 * MAX_RADIUS as i32;
        assert_eq!(
            calls[0],
            RenderCall::Ellipse {
                bounds: Rectangle::new(10 - diameter / 2, 10 - diameter / 2, diameter, diameter),
                opacity: 1.0
            }
        );
        assert_eq!(calls.len(), 2);
    }

    #[test]
    fn annotation_callback_fires_on_add() {
        let mut h = harness();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        h.writer.set_annotation_callback(move |a| sink.lock().push(a.kind.clone()));
        h.writer.add_annotation(dot(1, 1)).unwrap();
        assert_eq!(seen.lock().clone(), vec!["click".to_string()]);
    }

    #[test]
    fn overlay_and_real_time_drawing() {
        let mut h = harness();
        h.writer.start_real_time_drawing().unwrap();
        assert!(h.writer.is_overlay_enabled());
        assert!(h.overlay.is_visible());

        h.writer.enable_overlay().unwrap();
        assert_eq!(h.overlay.show_calls(), 1);

        h.writer.disable_overlay();
        assert!(!h.writer.is_real_time_drawing());
        assert!(!h.overlay.is_visible());

        h.overlay.set_fail(true);
        assert!(matches!(
            h.writer.start_real_time_drawing(),
            Err(WriterError::OverlayFailed)
        ));
        assert!(!h.writer.is_real_time_drawing());
    }

    #[test]
    fn animation_moves_annotation_and_finishes() {
        let mut h = harness();
        let id = h
            .writer
            .add_annotation(Annotation::new("drag").with_points(vec![Point::new(0, 0), Point::new(10, 0)]))
            .unwrap();
        let animation = Animation::new(1.0)
            .with_keyframe(Keyframe::at(0.0, Point::new(0, 0)))
            .with_keyframe(Keyframe::at(1.0, Point::new(100, 100)).with_opacity(0.0));
        h.writer.start_animation(id, animation).unwrap();

        assert_eq!(h.writer.update_animations(0.5), 1);
        assert_eq!(
            h.writer.annotation(id).unwrap().points,
            vec![Point::new(50, 50), Point::new(60, 50)]
        );
        assert_eq!(h.writer.update_animations(0.5), 0);
        assert!(!h.writer.is_animating(id));
        assert_eq!(h.writer.annotation(id).unwrap().shape_props.opacity, 0.0);
        assert!(h.writer.start_animation(999, Animation::new(1.0)).is_err());
    }

    #[test]
    fn annotations_export_and_import_with_fresh_ids() {
        let mut h = harness();
        let storage = MemoryStorage::new();
        let first = h.writer.add_annotation(dot(1, 2)).unwrap();
        h.writer.add_annotation(Annotation::new("text").with_text("note").with_points(vec![Point::new(3, 4)])).unwrap();
        assert_eq!(h.writer.export_annotations(&storage, "annotations.json").unwrap(), 2);

        assert_eq!(h.writer.import_annotations(&storage, "annotations.json").unwrap(), 2);
        let all = h.writer.annotations();
        assert_eq!(all.len(), 4);
        assert!(all[2].id > first && all[3].id > all[2].id);
        assert_eq!(all[3].text, "note");
    }

    #[test]
    fn render_annotations_draws_visible_ones() {
        let mut h = harness();
        h.writer.add_annotation(dot(10, 10)).unwrap();
        let hidden = h.writer.add_annotation(dot(20, 20)).unwrap();
        let mut annotation = h.writer.annotation(hidden).unwrap();
        annotation.visible = false;
        h.writer.update_annotation(hidden, annotation);

        assert_eq!(h.writer.render_annotations(), 1);
    }

    #[test]
    fn render_stats_track_time_since_reset() {
        let mut h = harness();
        h.clock.advance_ms(250);
        assert_eq!(h.writer.render_stats().render_time, Duration::from_millis(250));
        h.writer.reset_render_stats();
        assert_eq!(h.writer.render_stats().render_time, Duration::ZERO);
        assert_eq!(h.writer.render_stats().layer_count, 1);
    }

    #[test]
    fn shutdown_clears_state() {
        let mut h = harness();
        h.writer.add_annotation(dot(1, 1)).unwrap();
        h.writer.start_real_time_drawing().unwrap();
        h.writer.shutdown();
        assert!(!h.overlay.is_visible());
        assert_eq!(h.writer.annotation_count(), 0);
        assert!(!h.writer.is_initialized());
    }
}
