//! OCR and export boundaries
//!
//! Both are best-effort: OCR yields empty results on failure, exports
//! report a bool.

use crate::capture::ScreenCapture;
use crate::geometry::{Rectangle, Size};
use parking_lot::Mutex;
use std::sync::Arc;

pub trait OcrProvider: Send + Sync {
    fn extract_text(&self, area: Rectangle) -> String;
    fn find_text_regions(&self, capture: &ScreenCapture) -> Vec<Rectangle>;
}

/// OCR stand-in returning canned results
#[derive(Debug, Clone, Default)]
pub struct NullOcr {
    text: String,
    regions: Vec<Rectangle>,
}

impl NullOcr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            regions: Vec::new(),
        }
    }

    /// Regions relative to the capture origin
    pub fn with_regions(mut self, regions: Vec<Rectangle>) -> Self {
        self.regions = regions;
        self
    }
}

impl OcrProvider for NullOcr {
    fn extract_text(&self, area: Rectangle) -> String {
        if area.is_empty() {
            return String::new();
        }
        self.text.clone()
    }

    fn find_text_regions(&self, capture: &ScreenCapture) -> Vec<Rectangle> {
        self.regions
            .iter()
            .map(|r| r.translated(capture.area.top_left()))
            .filter(|r| capture.area.contains_rect(r))
            .collect()
    }
}

/// Image and video export
pub trait ExportProvider: Send + Sync {
    fn export_frames(&self, path: &str, fps: f32, duration_secs: f32) -> bool;
    fn export_image(&self, path: &str, size: Size) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportRecord {
    Video { path: String, fps: f32, duration_secs: f32 },
    Image { path: String, size: Size },
}

/// Exporter that records requests; clones share the record
#[derive(Debug, Clone, Default)]
pub struct NullExporter {
    records: Arc<Mutex<Vec<ExportRecord>>>,
}

impl NullExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ExportRecord> {
        self.records.lock().clone()
    }
}

impl ExportProvider for NullExporter {
    fn export_frames(&self, path: &str, fps: f32, duration_secs: f32) -> bool {
        if path.is_empty() || fps <= 0.0 || duration_secs <= 0.0 {
            return false;
        }
        self.records.lock().push(ExportRecord::Video {
            path: path.to_string(),
            fps,
            duration_secs,
        });
        true
    }

    fn export_image(&self, path: &str, size: Size) -> bool {
        if path.is_empty() || size.is_empty() {
            return false;
        }
        self.records.lock().push(ExportRecord::Image {
            path: path.to_string(),
            size,
        });
        true
    }
}
