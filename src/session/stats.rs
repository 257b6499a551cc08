//! Running capture statistics

use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Metrics for one `start_capture`..`stop_capture` session.
///
/// Frame counters only grow until an explicit reset or a new session.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureStats {
    pub session_id: Uuid,
    pub total_frames: u64,
    pub dropped_frames: u64,
    pub actual_fps: f32,
    pub target_fps: f32,
    /// Mean worker capture time per frame
    pub capture_time_ms: f32,
    /// Time spent in the last `process_frame`
    pub process_time_ms: f32,
    /// Filled in by an export pass; zero while recording
    pub encode_time_ms: f32,
    /// Frames held in the worker buffer
    pub memory_usage_mb: f32,
    /// Buffer fill in percent
    pub buffer_usage: u32,
    pub compression_ratio: f32,
    pub bitrate_kbps: u32,
    pub start_time: Option<Instant>,
    pub last_update: Option<Instant>,
    /// Time spent paused, excluded from `actual_fps`
    pub paused_time: Duration,
    pub paused_since: Option<Instant>,
}

impl Default for CaptureStats {
    fn default() -> Self {
        Self {
            session_id: Uuid::nil(),
            total_frames: 0,
            dropped_frames: 0,
            actual_fps: 0.0,
            target_fps: 30.0,
            capture_time_ms: 0.0,
            process_time_ms: 0.0,
            encode_time_ms: 0.0,
            memory_usage_mb: 0.0,
            buffer_usage: 0,
            compression_ratio: 0.0,
            bitrate_kbps: 0,
            start_time: None,
            last_update: None,
            paused_time: Duration::ZERO,
            paused_since: None,
        }
    }
}

impl CaptureStats {
    /// Fresh stats for a new session starting at `now`
    pub fn started(now: Instant, target_fps: f32) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            target_fps,
            start_time: Some(now),
            ..Self::default()
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        self.start_time
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default()
    }

    /// Wall time since start minus time spent paused
    pub fn active_time(&self, now: Instant) -> Duration {
        let open_pause = self
            .paused_since
            .map(|since| now.saturating_duration_since(since))
            .unwrap_or_default();
        self.elapsed(now)
            .saturating_sub(self.paused_time)
            .saturating_sub(open_pause)
    }

    pub fn pause(&mut self, now: Instant) {
        self.paused_since.get_or_insert(now);
    }

    pub fn resume(&mut self, now: Instant) {
        if let Some(since) = self.paused_since.take() {
            self.paused_time += now.saturating_duration_since(since);
        }
    }

    /// Count one processed frame and recompute the achieved rate
    pub fn record_frame(&mut self, now: Instant) {
        self.total_frames += 1;
        self.last_update = Some(now);
        let active = self.active_time(now).as_secs_f32();
        if active > 0.0 {
            self.actual_fps = self.total_frames as f32 / active;
        }
    }

    /// Bitrate estimate from an average raw frame size
    pub fn estimate_bitrate(&mut self, average_frame_bytes: f32) {
        if self.compression_ratio <= 0.0 {
            self.bitrate_kbps = 0;
            return;
        }
        let bits_per_second = average_frame_bytes * 8.0 * self.actual_fps / self.compression_ratio;
        self.bitrate_kbps = (bits_per_second / 1000.0).round() as u32;
    }
}

impl fmt::Display for CaptureStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session {}: {} frames ({} dropped), {:.1}/{:.1} fps, capture {:.2} ms, buffer {}%, {} kbps",
            self.session_id,
            self.total_frames,
            self.dropped_frames,
            self.actual_fps,
            self.target_fps,
            self.capture_time_ms,
            self.buffer_usage,
            self.bitrate_kbps
        )
    }
}
