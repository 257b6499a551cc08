//! Colors, fonts and shape styles for drawing primitives and annotations.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Parse `#rrggbb` or `rrggbb`; anything else is `None`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 {
            return None;
        }
        let value = u32::from_str_radix(digits, 16).ok()?;
        Some(Color::rgb(
            ((value >> 16) & 0xFF) as u8,
            ((value >> 8) & 0xFF) as u8,
            (value & 0xFF) as u8,
        ))
    }

    /// Hue in degrees, saturation/value/alpha in [0,1]
    pub fn from_hsv(h: f32, s: f32, v: f32, a: f32) -> Self {
        let h = h.rem_euclid(360.0);
        let c = v * s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = v - c;

        let (r, g, b) = match h {
            h if h < 60.0 => (c, x, 0.0),
            h if h < 120.0 => (x, c, 0.0),
            h if h < 180.0 => (0.0, c, x),
            h if h < 240.0 => (0.0, x, c),
            h if h < 300.0 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        Color::rgba(
            ((r + m) * 255.0).round() as u8,
            ((g + m) * 255.0).round() as u8,
            ((b + m) * 255.0).round() as u8,
            (a.clamp(0.0, 1.0) * 255.0).round() as u8,
        )
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Same color with alpha scaled by `opacity`
    pub fn with_opacity(&self, opacity: f32) -> Color {
        let alpha = (self.a as f32 * opacity.clamp(0.0, 1.0)).round() as u8;
        Color::rgba(self.r, self.g, self.b, alpha)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// Bit flags for font decoration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextStyle(pub u8);

impl TextStyle {
    pub const NORMAL: TextStyle = TextStyle(0x00);
    pub const BOLD: TextStyle = TextStyle(0x01);
    pub const ITALIC: TextStyle = TextStyle(0x02);
    pub const UNDERLINE: TextStyle = TextStyle(0x04);
    pub const STRIKETHROUGH: TextStyle = TextStyle(0x08);

    pub fn contains(&self, other: TextStyle) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn with(self, other: TextStyle) -> TextStyle {
        TextStyle(self.0 | other.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontProperties {
    pub family: String,
    pub size: f32,
    pub style: TextStyle,
    pub letter_spacing: f32,
    pub line_height: f32,
    pub anti_aliasing: bool,
}

impl FontProperties {
    pub fn is_bold(&self) -> bool {
        self.style.contains(TextStyle::BOLD)
    }

    pub fn is_italic(&self) -> bool {
        self.style.contains(TextStyle::ITALIC)
    }

    pub fn is_underlined(&self) -> bool {
        self.style.contains(TextStyle::UNDERLINE)
    }
}

impl Default for FontProperties {
    fn default() -> Self {
        Self {
            family: "Arial".to_string(),
            size: 12.0,
            style: TextStyle::NORMAL,
            letter_spacing: 0.0,
            line_height: 1.2,
            anti_aliasing: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextProperties {
    pub font: FontProperties,
    pub color: Color,
    pub alignment: TextAlignment,
    pub word_wrap: bool,
    /// Wrap width in pixels; `None` means unbounded
    pub max_width: Option<i32>,
    pub shadow_color: Color,
    pub shadow_offset: Point,
    pub shadow_blur: f32,
    pub outline_color: Color,
    pub outline_width: f32,
}

impl Default for TextProperties {
    fn default() -> Self {
        Self {
            font: FontProperties::default(),
            color: Color::BLACK,
            alignment: TextAlignment::Left,
            word_wrap: true,
            max_width: None,
            shadow_color: Color::TRANSPARENT,
            shadow_offset: Point::default(),
            shadow_blur: 0.0,
            outline_color: Color::TRANSPARENT,
            outline_width: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientKind {
    #[default]
    Linear,
    Radial,
    Conic,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Gradient {
    pub kind: GradientKind,
    /// (position in [0,1], color)
    pub stops: Vec<(f32, Color)>,
    pub start: Point,
    pub end: Point,
    pub angle: f32,
}

/// Fill, stroke and effect settings for shapes.
///
/// Plain value type: annotations and the undo/redo stacks hold independent
/// copies, including the optional gradient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeProperties {
    pub fill_color: Color,
    pub fill_gradient: Option<Gradient>,
    pub filled: bool,
    pub stroke_color: Color,
    pub stroke_width: f32,
    /// Empty for a solid line
    pub dash_pattern: Vec<f32>,
    pub dash_offset: f32,
    pub shadow_color: Color,
    pub shadow_offset: Point,
    pub shadow_blur: f32,
    pub opacity: f32,
    pub corner_radius: f32,
}

impl Default for ShapeProperties {
    fn default() -> Self {
        Self {
            fill_color: Color::WHITE,
            fill_gradient: None,
            filled: true,
            stroke_color: Color::BLACK,
            stroke_width: 1.0,
            dash_pattern: Vec::new(),
            dash_offset: 0.0,
            shadow_color: Color::TRANSPARENT,
            shadow_offset: Point::default(),
            shadow_blur: 0.0,
            opacity: 1.0,
            corner_radius: 0.0,
        }
    }
}
