//! Frame worker pool
//!
//! A fixed set of threads drains frame requests queued by the session.
//! Each tick captures the requested area, composites the cursor marker,
//! runs tile change detection against the newest buffered frame and pushes
//! the result into a bounded ring buffer. All of that happens under the one
//! mutex the workers also wait on, and the stop flag is only read or
//! written while holding it.

use super::error::{Result, SessionError};
use crate::capture::{CaptureProvider, FrameStats, Hasher, ScreenCapture};
use crate::clock::SharedClock;
use crate::cursor_overlay::draw_cursor_on_frame;
use crate::geometry::{Point, Rectangle};
use log::{debug, info, trace, warn};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Worker wake-up period (about 60 Hz)
pub const TICK: Duration = Duration::from_millis(16);

/// Half the available hardware threads, at least one
pub fn default_thread_count() -> usize {
    let available = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    (available / 2).max(1)
}

/// Capture work for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRequest {
    pub area: Rectangle,
    /// Cursor to composite, in desktop coordinates
    pub cursor: Option<Point>,
}

/// Ring buffer of the most recent frames
#[derive(Debug)]
pub struct FrameBuffer {
    frames: VecDeque<ScreenCapture>,
    capacity: usize,
}

impl FrameBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append; returns true when the oldest frame was evicted to make room
    pub fn push(&mut self, frame: ScreenCapture) -> bool {
        let evicted = if self.frames.len() >= self.capacity {
            self.frames.pop_front();
            true
        } else {
            false
        };
        self.frames.push_back(frame);
        evicted
    }

    /// Returns how many frames were evicted by shrinking
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        self.capacity = capacity.max(1);
        let excess = self.frames.len().saturating_sub(self.capacity);
        self.frames.drain(..excess);
        excess
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn latest(&self) -> Option<&ScreenCapture> {
        self.frames.back()
    }

    /// Up to `count` newest frames, oldest first
    pub fn recent(&self, count: usize) -> Vec<ScreenCapture> {
        let skip = self.frames.len().saturating_sub(count);
        self.frames.iter().skip(skip).cloned().collect()
    }

    pub fn byte_len(&self) -> usize {
        self.frames.iter().map(|f| f.data.len()).sum()
    }

    pub fn usage_percent(&self) -> u32 {
        (self.frames.len() * 100 / self.capacity) as u32
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Point-in-time view of pool counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolStats {
    pub frames_captured: u64,
    /// Evicted from the buffer or the request queue
    pub dropped_frames: u64,
    pub failed_captures: u64,
    pub unchanged_frames: u64,
    pub buffered_frames: usize,
    pub buffer_capacity: usize,
    pub buffered_bytes: usize,
    pub buffer_usage: u32,
    pub average_capture_ms: f32,
    pub average_frame_bytes: f32,
    /// Changed tiles found in the newest frame
    pub last_changed_regions: usize,
}

struct PoolState {
    queue: VecDeque<FrameRequest>,
    buffer: FrameBuffer,
    frame_stats: FrameStats,
    dropped: u64,
    failed: u64,
    last_changed_regions: usize,
    sequence: u64,
}

struct Shared {
    state: Mutex<PoolState>,
    wake: Condvar,
    idle: Condvar,
    stop: AtomicBool,
    capture: Arc<dyn CaptureProvider>,
    clock: SharedClock,
    hasher: Hasher,
}

impl Shared {
    fn run(&self, index: usize) {
        debug!("Frame worker {} started", index);
        let mut state = self.state.lock();
        loop {
            if self.stop.load(Ordering::Acquire) {
                break;
            }
            match state.queue.pop_front() {
                Some(request) => {
                    self.tick(&mut state, request);
                    if state.queue.is_empty() {
                        self.idle.notify_all();
                    }
                }
                None => {
                    self.wake.wait_for(&mut state, TICK);
                }
            }
        }
        drop(state);
        debug!("Frame worker {} stopped", index);
    }

    fn tick(&self, state: &mut PoolState, request: FrameRequest) {
        let started = Instant::now();
        let pixels = self.capture.capture_pixels(request.area);
        state.sequence += 1;

        let Some(mut frame) = ScreenCapture::from_pixels(request.area, pixels, self.clock.now(), state.sequence) else {
            state.failed += 1;
            warn!("Capture provider returned no pixels for {}", request.area);
            return;
        };
        if let Some(cursor) = request.cursor {
            draw_cursor_on_frame(&mut frame, cursor);
        }

        let changed = match state.buffer.latest() {
            Some(previous) if previous.area == frame.area => {
                let regions = frame.find_changed_regions(previous, &self.hasher);
                state.last_changed_regions = regions.len();
                !regions.is_empty()
            }
            _ => {
                state.last_changed_regions = 1;
                true
            }
        };

        let elapsed_us = started.elapsed().as_micros() as u64;
        state.frame_stats.record_capture(frame.byte_len(), elapsed_us, changed);
        trace!("Worker captured {} changed={}", frame, changed);
        if state.buffer.push(frame) {
            state.dropped += 1;
        }
    }
}

pub struct WorkerPool {
    shared: Arc<Shared>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(capture: Arc<dyn CaptureProvider>, clock: SharedClock, buffer_size: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PoolState {
                    queue: VecDeque::new(),
                    buffer: FrameBuffer::new(buffer_size),
                    frame_stats: FrameStats::default(),
                    dropped: 0,
                    failed: 0,
                    last_changed_regions: 0,
                    sequence: 0,
                }),
                wake: Condvar::new(),
                idle: Condvar::new(),
                stop: AtomicBool::new(false),
                capture,
                clock,
                hasher: Hasher::default(),
            }),
            handles: Vec::new(),
        }
    }

    /// Spawn `threads` workers (at least one); no-op when running
    pub fn start(&mut self, threads: usize) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        {
            let _state = self.shared.state.lock();
            self.shared.stop.store(false, Ordering::Release);
        }

        for index in 0..threads.max(1) {
            let shared = self.shared.clone();
            let spawned = thread::Builder::new()
                .name(format!("frame-worker-{}", index))
                .spawn(move || shared.run(index));
            match spawned {
                Ok(handle) => self.handles.push(handle),
                Err(e) => {
                    self.stop();
                    return Err(SessionError::Resources(format!("failed to spawn frame worker: {}", e)));
                }
            }
        }
        info!("Started {} frame workers", self.handles.len());
        Ok(())
    }

    /// Raise the stop flag, wake everyone and join unconditionally
    pub fn stop(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        {
            let _state = self.shared.state.lock();
            self.shared.stop.store(true, Ordering::Release);
        }
        self.shared.wake.notify_all();

        let count = self.handles.len();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("Frame worker panicked");
            }
        }
        self.shared.state.lock().queue.clear();
        info!("Stopped {} frame workers", count);
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }

    pub fn thread_count(&self) -> usize {
        self.handles.len()
    }

    /// Queue one frame; false when the pool is not running. A backlog
    /// longer than the buffer drops its oldest request.
    pub fn request_frame(&self, request: FrameRequest) -> bool {
        if !self.is_running() {
            return false;
        }
        let mut state = self.shared.state.lock();
        state.queue.push_back(request);
        if state.queue.len() > state.buffer.capacity() {
            state.queue.pop_front();
            state.dropped += 1;
            debug!("Frame request backlog full, dropped oldest request");
        }
        drop(state);
        self.shared.wake.notify_one();
        true
    }

    /// Block until the request queue drains or `timeout` passes
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while !state.queue.is_empty() {
            if self.shared.idle.wait_until(&mut state, deadline).timed_out() {
                return state.queue.is_empty();
            }
        }
        true
    }

    pub fn set_buffer_size(&self, frames: usize) {
        let mut state = self.shared.state.lock();
        let evicted = state.buffer.set_capacity(frames);
        state.dropped += evicted as u64;
    }

    pub fn recent_frames(&self, count: usize) -> Vec<ScreenCapture> {
        self.shared.state.lock().buffer.recent(count)
    }

    pub fn latest_frame(&self) -> Option<ScreenCapture> {
        self.shared.state.lock().buffer.latest().cloned()
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.shared.state.lock();
        let frames = state.frame_stats.total_frames;
        PoolStats {
            frames_captured: frames,
            dropped_frames: state.dropped,
            failed_captures: state.failed,
            unchanged_frames: state.frame_stats.unchanged_frames,
            buffered_frames: state.buffer.len(),
            buffer_capacity: state.buffer.capacity(),
            buffered_bytes: state.buffer.byte_len(),
            buffer_usage: state.buffer.usage_percent(),
            average_capture_ms: state.frame_stats.average_capture_ms(),
            average_frame_bytes: if frames > 0 {
                state.frame_stats.total_bytes as f32 / frames as f32
            } else {
                0.0
            },
            last_changed_regions: state.last_changed_regions,
        }
    }

    /// Drop buffered frames, pending requests and counters
    pub fn reset(&self) {
        let mut state = self.shared.state.lock();
        state.queue.clear();
        state.buffer.clear();
        state.frame_stats = FrameStats::default();
        state.dropped = 0;
        state.failed = 0;
        state.last_changed_regions = 0;
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::SyntheticCapture;
    use crate::clock::ManualClock;

    const AREA: Rectangle = Rectangle::new(0, 0, 32, 16);

    fn pool(capture: Arc<SyntheticCapture>, buffer: usize) -> WorkerPool {
        WorkerPool::new(capture, Arc::new(ManualClock::new()), buffer)
    }

    fn request() -> FrameRequest {
        FrameRequest { area: AREA, cursor: None }
    }

    #[test]
    fn captures_every_request() {
        let capture = Arc::new(SyntheticCapture::new());
        let mut pool = pool(capture.clone(), 10);
        pool.start(2).unwrap();
        assert_eq!(pool.thread_count(), 2);

        for _ in 0..5 {
            assert!(pool.request_frame(request()));
        }
        assert!(pool.wait_idle(Duration::from_secs(5)));
        pool.stop();

        let stats = pool.stats();
        assert_eq!(stats.frames_captured, 5);
        assert_eq!(stats.buffered_frames, 5);
        assert_eq!(stats.dropped_frames, 0);
        assert_eq!(stats.buffered_bytes, 5 * 32 * 16 * 4);
        assert_eq!(capture.captures(), 5);
    }

    #[test]
    fn overflow_evicts_oldest_and_counts_drops() {
        let mut pool = pool(Arc::new(SyntheticCapture::new()), 2);
        pool.start(1).unwrap();
        for _ in 0..5 {
            pool.request_frame(request());
        }
        assert!(pool.wait_idle(Duration::from_secs(5)));
        pool.stop();

        let stats = pool.stats();
        assert_eq!(stats.buffered_frames, 2);
        assert_eq!(stats.dropped_frames, 3);
        assert_eq!(stats.buffer_usage, 100);

        let recent = pool.recent_frames(5);
        assert_eq!(recent.len(), 2);
        assert!(recent[0].sequence < recent[1].sequence);
    }

    #[test]
    fn failed_captures_are_counted_not_buffered() {
        let capture = Arc::new(SyntheticCapture::new());
        capture.set_failing(true);
        let mut pool = pool(capture, 4);
        pool.start(1).unwrap();
        pool.request_frame(request());
        assert!(pool.wait_idle(Duration::from_secs(5)));
        pool.stop();

        let stats = pool.stats();
        assert_eq!(stats.failed_captures, 1);
        assert_eq!(stats.buffered_frames, 0);
    }

    #[test]
    fn identical_frames_are_unchanged() {
        let capture = Arc::new(SyntheticCapture::new());
        capture.set_frozen(true);
        let mut pool = pool(capture, 4);
        pool.start(1).unwrap();
        pool.request_frame(request());
        pool.request_frame(request());
        assert!(pool.wait_idle(Duration::from_secs(5)));
        pool.stop();

        let stats = pool.stats();
        assert_eq!(stats.unchanged_frames, 1);
        assert_eq!(stats.last_changed_regions, 0);
    }

    #[test]
    fn cursor_is_composited() {
        let capture = Arc::new(SyntheticCapture::new());
        let mut pool = pool(capture, 4);
        pool.start(1).unwrap();
        pool.request_frame(FrameRequest {
            area: AREA,
            cursor: Some(Point::new(2, 2)),
        });
        assert!(pool.wait_idle(Duration::from_secs(5)));
        pool.stop();

        let frame = pool.latest_frame().unwrap();
        // outline pixel at the arrow tip is white
        let offset = (2 * 32 + 2) * 4;
        assert_eq!(&frame.data[offset..offset + 4], &[255, 255, 255, 255]);
    }

    #[test]
    fn stop_joins_and_rejects_new_work() {
        let mut pool = pool(Arc::new(SyntheticCapture::new()), 4);
        pool.start(3).unwrap();
        pool.stop();
        assert!(!pool.is_running());
        assert!(!pool.request_frame(request()));
        pool.stop();
    }

    #[test]
    fn shrinking_buffer_drops_frames() {
        let mut buffer = FrameBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.set_capacity(3);
        let frame = ScreenCapture {
            area: AREA,
            width: 1,
            height: 1,
            bits_per_pixel: 32,
            data: vec![0; 4],
            timestamp: Instant::now(),
            sequence: 0,
        };
        for _ in 0..3 {
            assert!(!buffer.push(frame.clone()));
        }
        assert!(buffer.push(frame));
        assert_eq!(buffer.set_capacity(1), 2);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn thread_count_is_at_least_one() {
        assert!(default_thread_count() >= 1);
    }
}
