//! Geometry primitives
//!
//! Integer points, sizes and rectangles shared by the reader, the writer
//! and the session orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A point in screen coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Scale both coordinates, truncating toward zero
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new((self.x as f32 * factor) as i32, (self.y as f32 * factor) as i32)
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: Point) -> f32 {
        distance_squared(*self, other).sqrt()
    }

    pub fn midpoint(&self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2, (self.y + other.y) / 2)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// A width/height pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// A size with no drawable area
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Non-negative in both dimensions
    pub fn is_valid(&self) -> bool {
        self.width >= 0 && self.height >= 0
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(
            (self.width as f32 * factor) as i32,
            (self.height as f32 * factor) as i32,
        )
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height != 0 {
            self.width as f32 / self.height as f32
        } else {
            0.0
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An axis-aligned rectangle; the right and bottom edges are exclusive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    /// Rectangle spanning two corners (top-left, bottom-right)
    pub fn from_corners(top_left: Point, bottom_right: Point) -> Self {
        Self::new(
            top_left.x,
            top_left.y,
            bottom_right.x.saturating_sub(top_left.x),
            bottom_right.y.saturating_sub(top_left.y),
        )
    }

    /// Rectangle of `size` whose center is `center`
    pub fn centered_on(center: Point, size: Size) -> Self {
        Self::new(
            center.x - size.width / 2,
            center.y - size.height / 2,
            size.width,
            size.height,
        )
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn top_right(&self) -> Point {
        Point::new(self.right(), self.y)
    }

    pub fn bottom_left(&self) -> Point {
        Point::new(self.x, self.bottom())
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.right(), self.bottom())
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn is_valid(&self) -> bool {
        self.width >= 0 && self.height >= 0
    }

    pub fn area(&self) -> i64 {
        self.size().area()
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    pub fn contains_rect(&self, other: &Rectangle) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn intersects(&self, other: &Rectangle) -> bool {
        !(self.x >= other.right()
            || other.x >= self.right()
            || self.y >= other.bottom()
            || other.y >= self.bottom())
    }

    /// Overlapping area, or an empty rectangle when disjoint
    pub fn intersection(&self, other: &Rectangle) -> Rectangle {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if left < right && top < bottom {
            Rectangle::new(left, top, right - left, bottom - top)
        } else {
            Rectangle::default()
        }
    }

    /// Smallest rectangle covering both; empty operands are ignored
    pub fn united(&self, other: &Rectangle) -> Rectangle {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }

        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rectangle::new(left, top, right - left, bottom - top)
    }

    pub fn translated(&self, offset: Point) -> Rectangle {
        Rectangle::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }

    pub fn scaled(&self, factor: f32) -> Rectangle {
        Rectangle::new(
            (self.x as f32 * factor) as i32,
            (self.y as f32 * factor) as i32,
            (self.width as f32 * factor) as i32,
            (self.height as f32 * factor) as i32,
        )
    }

    pub fn expanded(&self, margin: i32) -> Rectangle {
        Rectangle::new(
            self.x - margin,
            self.y - margin,
            self.width + 2 * margin,
            self.height + 2 * margin,
        )
    }

    pub fn adjusted(&self, dx1: i32, dy1: i32, dx2: i32, dy2: i32) -> Rectangle {
        Rectangle::new(
            self.x + dx1,
            self.y + dy1,
            self.width + dx2 - dx1,
            self.height + dy2 - dy1,
        )
    }

    /// Distance from the rectangle's edge to `point`; zero inside
    pub fn distance_to_point(&self, point: Point) -> f32 {
        if self.contains(point) {
            return 0.0;
        }
        let dx = (self.x - point.x).max(0).max(point.x - self.right()) as f32;
        let dy = (self.y - point.y).max(0).max(point.y - self.bottom()) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn closest_point_to(&self, point: Point) -> Point {
        Point::new(
            point.x.clamp(self.x, self.right().max(self.x)),
            point.y.clamp(self.y, self.bottom().max(self.y)),
        )
    }

    /// Scale this rectangle into `container`, centered, keeping the aspect ratio
    pub fn fit_inside(&self, container: &Rectangle, keep_aspect: bool) -> Rectangle {
        if !keep_aspect || self.is_empty() {
            return *container;
        }

        let scale_x = container.width as f32 / self.width as f32;
        let scale_y = container.height as f32 / self.height as f32;
        let scale = scale_x.min(scale_y);

        let width = (self.width as f32 * scale) as i32;
        let height = (self.height as f32 * scale) as i32;
        Rectangle::new(
            container.x + (container.width - width) / 2,
            container.y + (container.height - height) / 2,
            width,
            height,
        )
    }

    /// Split into a `rows` x `cols` grid; the last row/column absorbs rounding
    pub fn subdivide(&self, rows: i32, cols: i32) -> Vec<Rectangle> {
        if rows <= 0 || cols <= 0 {
            return Vec::new();
        }

        let cell_width = self.width / cols;
        let cell_height = self.height / rows;
        let mut cells = Vec::with_capacity((rows * cols) as usize);

        for row in 0..rows {
            for col in 0..cols {
                let width = if col == cols - 1 {
                    self.width - col * cell_width
                } else {
                    cell_width
                };
                let height = if row == rows - 1 {
                    self.height - row * cell_height
                } else {
                    cell_height
                };
                cells.push(Rectangle::new(
                    self.x + col * cell_width,
                    self.y + row * cell_height,
                    width,
                    height,
                ));
            }
        }

        cells
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{},{},{}]", self.x, self.y, self.width, self.height)
    }
}

pub fn distance(a: Point, b: Point) -> f32 {
    a.distance_to(b)
}

pub fn distance_squared(a: Point, b: Point) -> f32 {
    let dx = (a.x - b.x) as f32;
    let dy = (a.y - b.y) as f32;
    dx * dx + dy * dy
}

/// Angle of the vector `from -> to` in radians
pub fn angle(from: Point, to: Point) -> f32 {
    ((to.y - from.y) as f32).atan2((to.x - from.x) as f32)
}

pub fn angle_degrees(from: Point, to: Point) -> f32 {
    angle(from, to).to_degrees()
}

/// Intersection of the infinite lines through (p1,p2) and (p3,p4).
/// Returns `None` for parallel lines.
pub fn line_intersection(p1: Point, p2: Point, p3: Point, p4: Point) -> Option<Point> {
    let denom = ((p1.x - p2.x) * (p3.y - p4.y) - (p1.y - p2.y) * (p3.x - p4.x)) as f32;
    if denom.abs() < 1e-6 {
        return None;
    }

    let t = ((p1.x - p3.x) * (p3.y - p4.y) - (p1.y - p3.y) * (p3.x - p4.x)) as f32 / denom;
    Some(Point::new(
        (p1.x as f32 + t * (p2.x - p1.x) as f32) as i32,
        (p1.y as f32 + t * (p2.y - p1.y) as f32) as i32,
    ))
}

/// Shortest distance from `point` to the segment `start..end`
pub fn distance_to_line(point: Point, start: Point, end: Point) -> f32 {
    let a = (point.x - start.x) as f32;
    let b = (point.y - start.y) as f32;
    let c = (end.x - start.x) as f32;
    let d = (end.y - start.y) as f32;

    let len_sq = c * c + d * d;
    if len_sq < 1e-6 {
        return distance(point, start);
    }

    let param = (a * c + b * d) / len_sq;
    let (cx, cy) = if param < 0.0 {
        (start.x as f32, start.y as f32)
    } else if param > 1.0 {
        (end.x as f32, end.y as f32)
    } else {
        (start.x as f32 + param * c, start.y as f32 + param * d)
    };

    let dx = point.x as f32 - cx;
    let dy = point.y as f32 - cy;
    (dx * dx + dy * dy).sqrt()
}

/// Even-odd rule; polygons with fewer than three vertices contain nothing
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        if (pi.y > point.y) != (pj.y > point.y) {
            let cross_x = (pj.x - pi.x) as f32 * (point.y - pi.y) as f32 / (pj.y - pi.y) as f32
                + pi.x as f32;
            if (point.x as f32) < cross_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Bounding box of a point set; empty input yields an empty rectangle
pub fn bounding_rect(points: &[Point]) -> Rectangle {
    let Some(first) = points.first() else {
        return Rectangle::default();
    };

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Rectangle::new(min_x, min_y, max_x - min_x, max_y - min_y)
}
