//! Recording session parameters

use crate::geometry::{Rectangle, Size};
use serde::{Deserialize, Serialize};

/// How the capture area is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// A whole display, primary unless `target_display` is set
    #[default]
    Fullscreen,
    /// Bounds of `target_window`
    Window,
    /// Explicit `capture_area`
    Region,
    /// Union of all displays
    MultiDisplay,
    /// `follow_size` area centered on the pointer, moved every update
    FollowCursor,
}

impl CaptureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMode::Fullscreen => "fullscreen",
            CaptureMode::Window => "window",
            CaptureMode::Region => "region",
            CaptureMode::MultiDisplay => "multi_display",
            CaptureMode::FollowCursor => "follow_cursor",
        }
    }
}

impl std::str::FromStr for CaptureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "fullscreen" => Ok(CaptureMode::Fullscreen),
            "window" => Ok(CaptureMode::Window),
            "region" => Ok(CaptureMode::Region),
            "multi_display" => Ok(CaptureMode::MultiDisplay),
            "follow_cursor" => Ok(CaptureMode::FollowCursor),
            other => Err(format!("unknown capture mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptureQuality {
    Low,
    #[default]
    Medium,
    High,
    Ultra,
}

impl CaptureQuality {
    /// Expected raw-to-encoded size ratio for bitrate estimates
    pub fn compression_ratio(&self) -> f32 {
        match self {
            CaptureQuality::Low => 50.0,
            CaptureQuality::Medium => 30.0,
            CaptureQuality::High => 15.0,
            CaptureQuality::Ultra => 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp4,
    Avi,
    Gif,
    Png,
}

/// Parameters of one recording session; replaced wholesale on reconfigure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingConfig {
    #[serde(default)]
    pub mode: CaptureMode,

    #[serde(default)]
    pub quality: CaptureQuality,

    /// Required for `Region`; recomputed for the other modes
    #[serde(default)]
    pub capture_area: Rectangle,

    /// Window handle for `Window` mode, 0 for none
    #[serde(default)]
    pub target_window: u64,

    /// Display for `Fullscreen` mode; primary when unset
    #[serde(default)]
    pub target_display: Option<u32>,

    /// Frames per second, in (0,120]
    #[serde(default = "default_fps")]
    pub fps: f32,

    /// Seconds; 0 records until stopped
    #[serde(default)]
    pub duration: f32,

    #[serde(default = "default_true")]
    pub include_cursor: bool,

    #[serde(default)]
    pub highlight_cursor: bool,

    #[serde(default = "default_true")]
    pub highlight_clicks: bool,

    #[serde(default = "default_true")]
    pub enable_annotations: bool,

    #[serde(default = "default_true")]
    pub real_time_annotations: bool,

    #[serde(default = "default_true")]
    pub persist_annotations: bool,

    /// Frames kept by the worker pool
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Area size in `FollowCursor` mode
    #[serde(default = "default_follow_size")]
    pub follow_size: Size,

    #[serde(default)]
    pub output_format: OutputFormat,

    #[serde(default)]
    pub output_path: String,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            mode: CaptureMode::Fullscreen,
            quality: CaptureQuality::Medium,
            capture_area: Rectangle::default(),
            target_window: 0,
            target_display: None,
            fps: default_fps(),
            duration: 0.0,
            include_cursor: true,
            highlight_cursor: false,
            highlight_clicks: true,
            enable_annotations: true,
            real_time_annotations: true,
            persist_annotations: true,
            buffer_size: default_buffer_size(),
            follow_size: default_follow_size(),
            output_format: OutputFormat::Mp4,
            output_path: String::new(),
        }
    }
}

/// Upper bound on the configured frame rate
pub const MAX_FPS: f32 = 120.0;

impl RecordingConfig {
    pub fn with_mode(mut self, mode: CaptureMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_fps(mut self, fps: f32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_area(mut self, area: Rectangle) -> Self {
        self.capture_area = area;
        self
    }

    pub fn with_window(mut self, handle: u64) -> Self {
        self.target_window = handle;
        self
    }

    /// Seconds between frames
    pub fn frame_interval(&self) -> f32 {
        1.0 / self.fps
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.fps.is_finite() || self.fps <= 0.0 || self.fps > MAX_FPS {
            return Err(format!("fps must be in (0, {}], got {}", MAX_FPS, self.fps));
        }

        if self.mode == CaptureMode::Region && self.capture_area.is_empty() {
            return Err("Region mode requires a non-empty capture area".into());
        }

        if self.mode == CaptureMode::Window && self.target_window == 0 {
            return Err("Window mode requires a window handle".into());
        }

        if self.mode == CaptureMode::FollowCursor && self.follow_size.is_empty() {
            return Err("Follow-cursor mode requires a non-empty follow size".into());
        }

        if self.buffer_size == 0 {
            return Err("Buffer size must be at least one frame".into());
        }

        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err("Duration must be zero or positive".into());
        }

        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_fps() -> f32 {
    30.0
}

fn default_buffer_size() -> usize {
    30
}

fn default_follow_size() -> Size {
    Size::new(800, 600)
}
