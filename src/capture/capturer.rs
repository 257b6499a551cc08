//! Pixel capture provider
//!
//! The core never grabs pixels itself. A `CaptureProvider` turns a screen
//! area into a raw buffer; an empty buffer signals failure.

use crate::geometry::Rectangle;
use log::trace;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Raw pixels returned by a capture provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u32,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes_per_pixel(&self) -> usize {
        (self.bits_per_pixel / 8) as usize
    }

    /// `data.len()` matches the declared dimensions
    pub fn is_consistent(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize * self.bytes_per_pixel()
    }
}

/// Trait for screen capture implementations
pub trait CaptureProvider: Send + Sync {
    /// Grab `area`; an empty buffer means the capture failed
    fn capture_pixels(&self, area: Rectangle) -> PixelBuffer;
}

/// Deterministic BGRA generator.
///
/// Paints a diagonal gradient that shifts by one step per capture, so
/// consecutive frames differ and change detection has something to find.
#[derive(Debug, Default)]
pub struct SyntheticCapture {
    sequence: AtomicU64,
    failing: AtomicBool,
    frozen: AtomicBool,
}

impl SyntheticCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent captures return an empty buffer
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Stop advancing the gradient between captures
    pub fn set_frozen(&self, frozen: bool) {
        self.frozen.store(frozen, Ordering::SeqCst);
    }

    pub fn captures(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl CaptureProvider for SyntheticCapture {
    fn capture_pixels(&self, area: Rectangle) -> PixelBuffer {
        if self.failing.load(Ordering::SeqCst) || area.is_empty() {
            return PixelBuffer::default();
        }

        let step = if self.frozen.load(Ordering::SeqCst) {
            self.sequence.load(Ordering::SeqCst)
        } else {
            self.sequence.fetch_add(1, Ordering::SeqCst)
        };

        let width = area.width as u32;
        let height = area.height as u32;
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                let shade = ((x + y) as u64 + step) as u8;
                data.extend_from_slice(&[shade, shade.wrapping_mul(2), 255 - shade, 255]);
            }
        }

        trace!("Synthetic capture {} step={}", area, step);
        PixelBuffer {
            width,
            height,
            bits_per_pixel: 32,
            data,
        }
    }
}
