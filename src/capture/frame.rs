//! Captured frame data structure
//!
//! Represents a captured screen area with metadata and cheap content
//! analysis (color statistics, motion, changed regions).

use crate::capture::capturer::PixelBuffer;
use crate::capture::hasher::Hasher;
use crate::geometry::Rectangle;
use crate::writer::style::Color;
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

/// Per-channel difference above which a byte counts as changed
const MOTION_BYTE_THRESHOLD: i32 = 10;

/// Palette size reported by `analyze_colors`
const PALETTE_SIZE: usize = 8;

/// Color analysis of a frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorStats {
    pub dominant_color: Color,
    pub average_color: Color,
    /// Most frequent quantized colors, most frequent first
    pub palette: Vec<Color>,
    /// Mean luma in [0,1]
    pub brightness: f32,
    /// Luma standard deviation in [0,1]
    pub contrast: f32,
    /// Mean HSV saturation in [0,1]
    pub saturation: f32,
}

/// One captured frame (BGRA when 32 bpp)
#[derive(Debug, Clone)]
pub struct ScreenCapture {
    /// Captured area in desktop coordinates
    pub area: Rectangle,

    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    pub bits_per_pixel: u32,

    /// Raw pixel data, `width * height * bits_per_pixel / 8` bytes
    pub data: Vec<u8>,

    /// Capture timestamp
    pub timestamp: Instant,

    /// Frame sequence number
    pub sequence: u64,
}

impl ScreenCapture {
    /// Wrap a provider buffer; `None` when the buffer is empty or inconsistent
    pub fn from_pixels(area: Rectangle, pixels: PixelBuffer, timestamp: Instant, sequence: u64) -> Option<Self> {
        if pixels.is_empty() || !pixels.is_consistent() {
            return None;
        }
        Some(Self {
            area,
            width: pixels.width,
            height: pixels.height,
            bits_per_pixel: pixels.bits_per_pixel,
            data: pixels.data,
            timestamp,
            sequence,
        })
    }

    pub fn bytes_per_pixel(&self) -> usize {
        (self.bits_per_pixel / 8) as usize
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    fn pixels(&self) -> impl Iterator<Item = (u8, u8, u8)> + '_ {
        let bpp = self.bytes_per_pixel().max(3);
        self.data
            .chunks_exact(bpp)
            .map(|px| (px[2], px[1], px[0]))
    }

    pub fn analyze_colors(&self) -> ColorStats {
        let count = (self.width as usize) * (self.height as usize);
        if self.data.is_empty() || count == 0 || self.bytes_per_pixel() < 3 {
            return ColorStats::default();
        }

        let (mut total_r, mut total_g, mut total_b) = (0u64, 0u64, 0u64);
        let mut luma_sum = 0f64;
        let mut luma_sq_sum = 0f64;
        let mut saturation_sum = 0f64;
        let mut buckets: HashMap<(u8, u8, u8), usize> = HashMap::new();
        let mut seen = 0usize;

        for (r, g, b) in self.pixels() {
            total_r += r as u64;
            total_g += g as u64;
            total_b += b as u64;

            let luma = (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64) / 255.0;
            luma_sum += luma;
            luma_sq_sum += luma * luma;

            let max = r.max(g).max(b) as f64;
            let min = r.min(g).min(b) as f64;
            if max > 0.0 {
                saturation_sum += (max - min) / max;
            }

            *buckets.entry((r & 0xE0, g & 0xE0, b & 0xE0)).or_insert(0) += 1;
            seen += 1;
        }

        if seen == 0 {
            return ColorStats::default();
        }

        let n = seen as f64;
        let mean_luma = luma_sum / n;
        let variance = (luma_sq_sum / n - mean_luma * mean_luma).max(0.0);

        let mut ranked: Vec<_> = buckets.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let palette: Vec<Color> = ranked
            .iter()
            .take(PALETTE_SIZE)
            .map(|((r, g, b), _)| Color::rgb(*r, *g, *b))
            .collect();

        ColorStats {
            dominant_color: palette.first().copied().unwrap_or_default(),
            average_color: Color::rgb(
                (total_r / seen as u64) as u8,
                (total_g / seen as u64) as u8,
                (total_b / seen as u64) as u8,
            ),
            palette,
            brightness: mean_luma as f32,
            contrast: variance.sqrt() as f32,
            saturation: (saturation_sum / n) as f32,
        }
    }

    /// Fraction of bytes that moved by more than a small epsilon exceeds
    /// `threshold`; differently sized frames always count as motion
    pub fn has_motion(&self, previous: &ScreenCapture, threshold: f32) -> bool {
        if self.data.len() != previous.data.len() {
            return true;
        }
        if self.data.is_empty() {
            return false;
        }

        let differences = self
            .data
            .iter()
            .zip(previous.data.iter())
            .filter(|(a, b)| (**a as i32 - **b as i32).abs() > MOTION_BYTE_THRESHOLD)
            .count();
        differences as f32 / self.data.len() as f32 > threshold
    }

    /// Changed tiles relative to `previous`, in desktop coordinates
    pub fn find_changed_regions(&self, previous: &ScreenCapture, hasher: &Hasher) -> Vec<Rectangle> {
        if self.width != previous.width || self.height != previous.height {
            return vec![self.area];
        }

        let bpp = self.bytes_per_pixel();
        let before = hasher.hash_tiles(&previous.data, previous.width, previous.height, bpp);
        let after = hasher.hash_tiles(&self.data, self.width, self.height, bpp);
        hasher
            .changed_tiles(&before, &after, self.width, self.height)
            .into_iter()
            .map(|r| r.translated(self.area.top_left()))
            .collect()
    }
}

impl fmt::Display for ScreenCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame({}x{}, {} bytes, seq={})",
            self.width,
            self.height,
            self.data.len(),
            self.sequence
        )
    }
}

/// Frame statistics for monitoring
#[derive(Debug, Default, Clone)]
pub struct FrameStats {
    /// Total frames captured
    pub total_frames: u64,

    /// Total bytes captured
    pub total_bytes: u64,

    /// Total capture time in microseconds
    pub total_capture_time_us: u64,

    /// Last capture time in microseconds
    pub last_capture_time_us: u64,

    /// Frames whose change detection found no difference
    pub unchanged_frames: u64,
}

impl FrameStats {
    /// Record a frame capture
    pub fn record_capture(&mut self, bytes: usize, time_us: u64, changed: bool) {
        self.total_frames += 1;
        self.total_bytes += bytes as u64;
        self.last_capture_time_us = time_us;
        self.total_capture_time_us += time_us;
        if !changed {
            self.unchanged_frames += 1;
        }
    }

    pub fn average_capture_ms(&self) -> f32 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.total_capture_time_us as f32 / self.total_frames as f32 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::hasher::HasherConfig;

    fn solid(width: u32, height: u32, bgra: [u8; 4]) -> ScreenCapture {
        let data = bgra.repeat((width * height) as usize);
        ScreenCapture {
            area: Rectangle::new(100, 50, width as i32, height as i32),
            width,
            height,
            bits_per_pixel: 32,
            data,
            timestamp: Instant::now(),
            sequence: 0,
        }
    }

    #[test]
    fn from_pixels_rejects_empty_and_inconsistent() {
        let area = Rectangle::new(0, 0, 2, 2);
        assert!(ScreenCapture::from_pixels(area, PixelBuffer::default(), Instant::now(), 0).is_none());

        let short = PixelBuffer { width: 2, height: 2, bits_per_pixel: 32, data: vec![0; 8] };
        assert!(ScreenCapture::from_pixels(area, short, Instant::now(), 0).is_none());

        let ok = PixelBuffer { width: 2, height: 2, bits_per_pixel: 32, data: vec![0; 16] };
        let capture = ScreenCapture::from_pixels(area, ok, Instant::now(), 3).unwrap();
        assert_eq!(capture.byte_len(), 2 * 2 * 4);
    }

    #[test]
    fn solid_red_color_stats() {
        // BGRA red
        let capture = solid(4, 4, [0, 0, 255, 255]);
        let stats = capture.analyze_colors();
        assert_eq!(stats.average_color, Color::RED);
        assert_eq!(stats.dominant_color, Color::rgb(0xE0, 0, 0));
        assert_eq!(stats.palette.len(), 1);
        assert!(stats.contrast < 1e-6);
        assert!((stats.saturation - 1.0).abs() < 1e-6);
    }

    #[test]
    fn motion_threshold() {
        let a = solid(4, 4, [0, 0, 0, 255]);
        let b = solid(4, 4, [100, 100, 100, 255]);
        assert!(b.has_motion(&a, 0.1));
        assert!(!a.has_motion(&a.clone(), 0.1));
        assert!(solid(2, 2, [0; 4]).has_motion(&a, 0.1));
    }

    #[test]
    fn changed_regions_are_in_desktop_coordinates() {
        let hasher = Hasher::new(HasherConfig { tile_size: 4, ..HasherConfig::default() });
        let before = solid(8, 8, [0, 0, 0, 255]);
        let mut after = before.clone();
        after.data[0] = 0xFF;

        let regions = after.find_changed_regions(&before, &hasher);
        assert_eq!(regions, vec![Rectangle::new(100, 50, 4, 4)]);
    }

    #[test]
    fn frame_stats_average() {
        let mut stats = FrameStats::default();
        stats.record_capture(100, 2000, true);
        stats.record_capture(100, 4000, false);
        assert_eq!(stats.total_frames, 2);
        assert_eq!(stats.unchanged_frames, 1);
        assert!((stats.average_capture_ms() - 3.0).abs() < 1e-6);
    }
}
