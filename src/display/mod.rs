//! Display, window and cursor snapshots
//!
//! Value types describing the desktop as reported by the platform query
//! layer. The reader hands out copies of these; nothing here holds a live
//! handle to the OS.

use crate::geometry::{Point, Rectangle, Size};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One attached display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayInfo {
    pub display_id: u32,
    pub device_name: String,
    pub manufacturer_name: String,
    /// Physical bounds in virtual-desktop coordinates
    pub bounds: Rectangle,
    /// Bounds minus taskbars and docks
    pub work_area: Rectangle,
    pub bits_per_pixel: u32,
    pub refresh_rate: u32,
    pub dpi_x: f32,
    pub dpi_y: f32,
    pub scaling_factor: f32,
    pub is_primary: bool,
    pub is_enabled: bool,
    pub supports_hdr: bool,
    /// Rotation in degrees
    pub orientation: u32,
    pub gamma: f32,
}

impl Default for DisplayInfo {
    fn default() -> Self {
        Self {
            display_id: 0,
            device_name: String::new(),
            manufacturer_name: String::new(),
            bounds: Rectangle::default(),
            work_area: Rectangle::default(),
            bits_per_pixel: 32,
            refresh_rate: 60,
            dpi_x: 96.0,
            dpi_y: 96.0,
            scaling_factor: 1.0,
            is_primary: false,
            is_enabled: true,
            supports_hdr: false,
            orientation: 0,
            gamma: 2.2,
        }
    }
}

impl fmt::Display for DisplayInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Display {} ({}) {}{}",
            self.display_id,
            self.device_name,
            self.bounds,
            if self.is_primary { " primary" } else { "" }
        )
    }
}

/// Desktop-wide metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub primary_screen_size: Size,
    pub virtual_screen_size: Size,
    pub display_count: u32,
    pub system_dpi_x: f32,
    pub system_dpi_y: f32,
    pub default_scaling_factor: f32,
    pub is_dpi_aware: bool,
    pub cursor_size: Size,
    /// Maximum gap between clicks of a double click, in milliseconds
    pub double_click_time_ms: u64,
    /// Maximum pointer travel between clicks of a double click
    pub double_click_size: Size,
    pub has_multi_touch: bool,
    pub max_touch_points: u32,
}

impl Default for SystemMetrics {
    fn default() -> Self {
        Self {
            primary_screen_size: Size::default(),
            virtual_screen_size: Size::default(),
            display_count: 0,
            system_dpi_x: 96.0,
            system_dpi_y: 96.0,
            default_scaling_factor: 1.0,
            is_dpi_aware: false,
            cursor_size: Size::new(32, 32),
            double_click_time_ms: 500,
            double_click_size: Size::new(4, 4),
            has_multi_touch: false,
            max_touch_points: 0,
        }
    }
}

/// One top-level window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowInfo {
    /// Zero means "no window"
    pub handle: u64,
    pub title: String,
    pub class_name: String,
    pub process_name: String,
    pub process_id: u32,
    pub bounds: Rectangle,
    pub client_bounds: Rectangle,
    pub is_visible: bool,
    pub is_minimized: bool,
    pub is_maximized: bool,
    pub is_topmost: bool,
    pub is_focused: bool,
    pub parent: u64,
}

impl WindowInfo {
    pub fn is_valid(&self) -> bool {
        self.handle != 0
    }

    pub fn contains_point(&self, point: Point) -> bool {
        self.bounds.contains(point)
    }

    pub fn intersects(&self, other: &WindowInfo) -> bool {
        self.bounds.intersects(&other.bounds)
    }
}

/// Cursor shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CursorKind {
    #[default]
    Arrow,
    Hand,
    Text,
    Cross,
    Wait,
    Help,
    ResizeNs,
    ResizeEw,
    ResizeNwse,
    ResizeNesw,
    Move,
    NoDrop,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorInfo {
    pub position: Point,
    pub hotspot: Point,
    pub size: Size,
    pub kind: CursorKind,
    pub is_visible: bool,
    pub is_system_cursor: bool,
    pub frame_index: u32,
    pub frame_count: u32,
}

impl Default for CursorInfo {
    fn default() -> Self {
        Self {
            position: Point::default(),
            hotspot: Point::default(),
            size: Size::new(32, 32),
            kind: CursorKind::Arrow,
            is_visible: true,
            is_system_cursor: true,
            frame_index: 0,
            frame_count: 1,
        }
    }
}

/// Primary display of a set, or the first one when none is flagged
pub fn primary_display(displays: &[DisplayInfo]) -> Option<&DisplayInfo> {
    displays
        .iter()
        .find(|d| d.is_primary)
        .or_else(|| displays.first())
}

/// Union of all display bounds
pub fn virtual_bounds(displays: &[DisplayInfo]) -> Rectangle {
    let mut iter = displays.iter();
    let Some(first) = iter.next() else {
        return Rectangle::default();
    };
    iter.fold(first.bounds, |acc, d| acc.united(&d.bounds))
}

/// True when exactly one display is flagged primary
pub fn has_single_primary(displays: &[DisplayInfo]) -> bool {
    displays.iter().filter(|d| d.is_primary).count() == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(id: u32, x: i32, primary: bool) -> DisplayInfo {
        DisplayInfo {
            display_id: id,
            bounds: Rectangle::new(x, 0, 1920, 1080),
            is_primary: primary,
            ..DisplayInfo::default()
        }
    }

    #[test]
    fn virtual_bounds_spans_all_displays() {
        let displays = vec![display(0, 0, true), display(1, 1920, false)];
        assert_eq!(virtual_bounds(&displays), Rectangle::new(0, 0, 3840, 1080));
        assert!(has_single_primary(&displays));
        assert_eq!(primary_display(&displays).map(|d| d.display_id), Some(0));
    }

    #[test]
    fn empty_display_set() {
        assert_eq!(virtual_bounds(&[]), Rectangle::default());
        assert!(primary_display(&[]).is_none());
    }
}
