//! Drawing context: clip rectangle, global opacity and affine transform,
//! saved and restored as one record.

use crate::geometry::{bounding_rect, Point, Rectangle};
use serde::{Deserialize, Serialize};

/// Scale, then rotate about the origin, then translate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub scale_x: f32,
    pub scale_y: f32,
    /// Radians
    pub rotation: f32,
    pub translation: Point,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        scale_x: 1.0,
        scale_y: 1.0,
        rotation: 0.0,
        translation: Point::new(0, 0),
    };

    pub fn translate(x: i32, y: i32) -> Self {
        Self {
            translation: Point::new(x, y),
            ..Self::IDENTITY
        }
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            scale_x: sx,
            scale_y: sy,
            ..Self::IDENTITY
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn apply(&self, point: Point) -> Point {
        let mut x = point.x as f32 * self.scale_x;
        let mut y = point.y as f32 * self.scale_y;

        if self.rotation != 0.0 {
            let (sin, cos) = self.rotation.sin_cos();
            let rx = x * cos - y * sin;
            let ry = x * sin + y * cos;
            x = rx;
            y = ry;
        }

        Point::new(
            (x + self.translation.x as f32).round() as i32,
            (y + self.translation.y as f32).round() as i32,
        )
    }

    /// Axis-aligned bounds of the transformed corners
    pub fn apply_rect(&self, rect: Rectangle) -> Rectangle {
        if self.rotation == 0.0 {
            let top_left = self.apply(rect.top_left());
            let bottom_right = self.apply(Point::new(rect.right(), rect.bottom()));
            return Rectangle::from_corners(top_left, bottom_right);
        }
        let corners = [
            self.apply(rect.top_left()),
            self.apply(Point::new(rect.right(), rect.y)),
            self.apply(Point::new(rect.x, rect.bottom())),
            self.apply(Point::new(rect.right(), rect.bottom())),
        ];
        bounding_rect(&corners)
    }

    /// Scale a length by the mean axis scale
    pub fn apply_length(&self, length: f32) -> f32 {
        length * (self.scale_x.abs() + self.scale_y.abs()) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawingContext {
    /// `None` draws everywhere
    pub clip_rect: Option<Rectangle>,
    pub global_opacity: f32,
    pub transform: Transform,
}

impl Default for DrawingContext {
    fn default() -> Self {
        Self {
            clip_rect: None,
            global_opacity: 1.0,
            transform: Transform::IDENTITY,
        }
    }
}

impl DrawingContext {
    /// True when `bounds` can be drawn under the clip rectangle
    pub fn admits(&self, bounds: &Rectangle) -> bool {
        match &self.clip_rect {
            None => true,
            // degenerate shapes (lines, points) have zero-area bounds
            Some(clip) if bounds.is_empty() => clip.contains(bounds.top_left()) || clip.intersects(&bounds.expanded(1)),
            Some(clip) => clip.intersects(bounds),
        }
    }
}

/// Current context plus saved ones
#[derive(Debug, Clone, Default)]
pub struct ContextStack {
    current: DrawingContext,
    saved: Vec<DrawingContext>,
}

impl ContextStack {
    pub fn current(&self) -> &DrawingContext {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut DrawingContext {
        &mut self.current
    }

    pub fn push(&mut self) {
        self.saved.push(self.current);
    }

    /// Restore the last pushed context; false when nothing was pushed
    pub fn pop(&mut self) -> bool {
        match self.saved.pop() {
            Some(context) => {
                self.current = context;
                true
            }
            None => false,
        }
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
