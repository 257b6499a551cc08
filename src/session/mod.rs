//! Session orchestration
//!
//! `SessionOrchestrator` owns a `Reader`, a `Writer` and a frame worker
//! pool. It drives the capture state machine, turns reader events into
//! annotations, overlay drawing and recorded actions, and keeps the
//! running capture statistics.
//!
//! Reader events arrive over a subscription channel and are dispatched
//! from `update()`, so the reader never calls back into the session.

pub mod actions;
pub mod error;
pub mod events;
pub mod state;
pub mod stats;
pub mod worker;

pub use actions::{ActionKind, ActionRecorder, Playback, RecordedAction};
pub use error::{ErrorCode, Result, SessionError};
pub use events::{EventCallback, SessionEvent};
pub use state::{CaptureState, InteractionMode};
pub use stats::CaptureStats;
pub use worker::{default_thread_count, FrameRequest, PoolStats, WorkerPool};

use crate::capture::{CaptureProvider, Hasher, ScreenCapture};
use crate::clock::SharedClock;
use crate::config::recording::{CaptureMode, RecordingConfig};
use crate::display::{DisplayInfo, WindowInfo};
use crate::geometry::{Point, Rectangle, Size};
use crate::input::{KeyboardState, MouseButton, MouseState};
use crate::providers::{
    ExportProvider, NullExporter, NullOcr, NullOverlay, NullRenderer, OcrProvider, OverlayProvider,
    PlatformQuery, RenderProvider, SimulatedPlatform, Storage, SyntheticCapture,
};
use crate::reader::{DisplayChange, Reader, ReaderEvent, ReaderSettings, WindowChange};
use crate::storage::StorageError;
use crate::writer::{Annotation, AnnotationId, Color, ShapeProperties, TextProperties, Writer};
use crossbeam::channel::Receiver;
use events::EventBus;
use log::{debug, error, info, trace, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Storage prefix for recording presets
pub const PRESET_PREFIX: &str = "presets";

/// Storage prefix for annotations persisted when a session stops
pub const ANNOTATION_PREFIX: &str = "annotations";

/// Pointer travel in pixels before a held left button counts as a drag
const DRAG_THRESHOLD: f32 = 5.0;

/// Radius of the synthesized click marker
const CLICK_RADIUS: f32 = 10.0;

/// Radius of the cursor highlight ring
const CURSOR_HIGHLIGHT_RADIUS: f32 = 20.0;

/// Pointer history drawn by the cursor trail
const TRAIL_POINTS: usize = 20;

/// Keyboard overlay text position relative to the pointer
const KEY_OVERLAY_OFFSET: Point = Point::new(20, -30);

/// Host-supplied collaborators for one session
pub struct Collaborators {
    pub platform: Box<dyn PlatformQuery>,
    pub capture: Arc<dyn CaptureProvider>,
    pub renderer: Box<dyn RenderProvider>,
    pub overlay: Box<dyn OverlayProvider>,
    pub ocr: Arc<dyn OcrProvider>,
    pub exporter: Arc<dyn ExportProvider>,
    pub storage: Arc<dyn Storage>,
    pub clock: SharedClock,
}

impl Collaborators {
    /// Simulated desktop with synthetic capture and no-op rendering
    pub fn simulated(platform: SimulatedPlatform, storage: Arc<dyn Storage>, clock: SharedClock) -> Self {
        Self {
            platform: Box::new(platform),
            capture: Arc::new(SyntheticCapture::new()),
            renderer: Box::new(NullRenderer::new()),
            overlay: Box::new(NullOverlay::new()),
            ocr: Arc::new(NullOcr::new()),
            exporter: Arc::new(NullExporter::new()),
            storage,
            clock,
        }
    }
}

/// Result of comparing two frames tile by tile
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenComparison {
    /// Share of unchanged tiles, 1.0 for identical frames
    pub similarity: f32,
    /// Changed tiles in desktop coordinates
    pub differences: Vec<Rectangle>,
}

/// Optional mediation features toggled at runtime
#[derive(Debug, Clone, Copy, Default)]
struct Features {
    quick_annotation: bool,
    keyboard_overlay: bool,
    cursor_trail: bool,
}

pub struct SessionOrchestrator {
    reader: Reader,
    writer: Writer,
    reader_events: Option<Receiver<ReaderEvent>>,
    pool: WorkerPool,
    storage: Arc<dyn Storage>,
    clock: SharedClock,
    hasher: Hasher,

    initialized: bool,
    state: CaptureState,
    config: RecordingConfig,
    interaction_mode: InteractionMode,
    drawing_mode: bool,
    features: Features,
    thread_count: usize,

    stats: CaptureStats,
    current_frame: u64,
    last_update: Option<Instant>,

    recorder: ActionRecorder,
    playback: Option<Playback>,
    preset_prefix: String,
    annotation_prefix: String,

    last_error: ErrorCode,
    last_error_message: String,
    events: EventBus,
}

impl SessionOrchestrator {
    pub fn new(collaborators: Collaborators) -> Self {
        Self::with_settings(collaborators, ReaderSettings::default())
    }

    pub fn with_settings(collaborators: Collaborators, reader_settings: ReaderSettings) -> Self {
        let Collaborators {
            platform,
            capture,
            renderer,
            overlay,
            ocr,
            exporter,
            storage,
            clock,
        } = collaborators;

        let config = RecordingConfig::default();
        let reader = Reader::new(platform, capture.clone(), ocr, clock.clone()).with_settings(reader_settings);
        let writer = Writer::new(renderer, overlay, exporter, clock.clone());
        let pool = WorkerPool::new(capture, clock.clone(), config.buffer_size);

        Self {
            reader,
            writer,
            reader_events: None,
            pool,
            storage,
            clock,
            hasher: Hasher::default(),
            initialized: false,
            state: CaptureState::Idle,
            config,
            interaction_mode: InteractionMode::Passive,
            drawing_mode: false,
            features: Features::default(),
            thread_count: default_thread_count(),
            stats: CaptureStats::default(),
            current_frame: 0,
            last_update: None,
            recorder: ActionRecorder::default(),
            playback: None,
            preset_prefix: PRESET_PREFIX.to_string(),
            annotation_prefix: ANNOTATION_PREFIX.to_string(),
            last_error: ErrorCode::Success,
            last_error_message: String::new(),
            events: EventBus::default(),
        }
    }

    // ---- lifecycle ----

    /// Initialize the reader and writer; a second call is a no-op
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        if let Err(e) = self.reader.initialize() {
            self.set_error(ErrorCode::InitializationFailed, format!("Reader initialization failed: {}", e));
            return Err(e.into());
        }
        if let Err(e) = self.writer.initialize() {
            self.reader.shutdown();
            self.set_error(ErrorCode::InitializationFailed, format!("Writer initialization failed: {}", e));
            return Err(e.into());
        }

        self.reader_events = Some(self.reader.subscribe());
        self.initialized = true;
        self.clear_error();
        info!("Session initialized with {} worker threads", self.thread_count);
        Ok(())
    }

    /// Stop any capture and release the reader and writer
    pub fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }

        if self.state.is_active() {
            if let Err(e) = self.stop_capture() {
                warn!("Stopping capture during shutdown failed: {}", e);
            }
        }
        self.stop_drawing_mode();
        self.playback = None;
        self.recorder.stop();
        self.pool.stop();
        self.writer.shutdown();
        self.reader.shutdown();
        self.reader_events = None;
        self.initialized = false;
        info!("Session shut down");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Pump the reader and dispatch what it saw.
    ///
    /// Frames are taken on the configured cadence whether or not input
    /// changed. Also advances playback and animations and ends a capture whose
    /// configured duration has elapsed. Returns whether the reader sampled.
    pub fn update(&mut self) -> bool {
        if !self.initialized {
            return false;
        }

        let now = self.clock.now();
        let delta = self
            .last_update
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or_default();
        self.last_update = Some(now);

        let sampled = self.reader.update();
        self.dispatch_reader_events();
        if self.state == CaptureState::Capturing {
            self.process_frame_if_due();
        }

        if self.state == CaptureState::Capturing && self.config.mode == CaptureMode::FollowCursor {
            self.refresh_capture_area();
        }

        self.advance_playback(now);
        if !delta.is_zero() {
            self.writer.update_animations(delta.as_secs_f32());
        }
        self.check_duration(now);
        sampled
    }

    // ---- capture control ----

    /// Validate `config`, then start monitoring and frame capture
    pub fn start_capture(&mut self, config: RecordingConfig) -> Result<()> {
        if !self.initialized {
            return Err(self.fail(SessionError::NotInitialized));
        }
        if !self.state.can_transition_to(CaptureState::Capturing) {
            warn!("Capture start ignored while {}", self.state);
            return Err(SessionError::InvalidTransition {
                operation: "start capture",
                state: self.state,
            });
        }
        if let Err(msg) = config.validate() {
            return Err(self.fail(SessionError::InvalidConfig(msg)));
        }

        let previous = std::mem::replace(&mut self.config, config);
        match self.capture_area_for_mode() {
            Ok(area) => self.config.capture_area = area,
            Err(e) => {
                self.config = previous;
                return Err(self.fail(e));
            }
        }

        self.reader.start_monitoring();

        if self.config.enable_annotations {
            if let Err(e) = self.prepare_canvas() {
                self.reader.stop_monitoring();
                self.config = previous;
                return Err(self.fail(e.into()));
            }
            if self.config.real_time_annotations {
                if let Err(e) = self.writer.enable_overlay() {
                    warn!("Overlay unavailable for real-time annotations: {}", e);
                }
            }
        }

        self.pool.reset();
        self.pool.set_buffer_size(self.config.buffer_size);
        if let Err(e) = self.pool.start(self.thread_count) {
            self.reader.stop_monitoring();
            self.config = previous;
            return Err(self.fail(e));
        }

        let now = self.clock.now();
        self.stats = CaptureStats::started(now, self.config.fps);
        self.stats.compression_ratio = self.config.quality.compression_ratio();
        self.current_frame = 0;
        self.state = CaptureState::Capturing;
        self.clear_error();

        info!(
            "Capture started: session {}, {} mode, area {}, {} fps",
            self.stats.session_id,
            self.config.mode.as_str(),
            self.config.capture_area,
            self.config.fps
        );
        self.events.emit(SessionEvent::CaptureStarted);
        Ok(())
    }

    pub fn stop_capture(&mut self) -> Result<()> {
        self.transition(CaptureState::Idle, "stop capture")?;

        self.pool.stop();
        self.reader.stop_monitoring();
        if self.drawing_mode {
            self.stop_drawing_mode();
        }
        self.writer.stop_real_time_drawing();
        self.writer.disable_overlay();
        self.sync_pool_stats();

        if self.config.enable_annotations && self.config.persist_annotations {
            self.persist_annotations();
        }

        info!("Capture stopped: {}", self.stats);
        self.events.emit(SessionEvent::CaptureStopped);
        Ok(())
    }

    pub fn pause_capture(&mut self) -> Result<()> {
        self.transition(CaptureState::Paused, "pause capture")?;
        self.stats.pause(self.clock.now());
        info!("Capture paused at frame {}", self.current_frame);
        self.events.emit(SessionEvent::CapturePaused);
        Ok(())
    }

    pub fn resume_capture(&mut self) -> Result<()> {
        if self.state != CaptureState::Paused {
            warn!("Cannot resume capture while {}", self.state);
            return Err(SessionError::InvalidTransition {
                operation: "resume capture",
                state: self.state,
            });
        }
        self.transition(CaptureState::Capturing, "resume capture")?;
        self.stats.resume(self.clock.now());
        info!("Capture resumed");
        self.events.emit(SessionEvent::CaptureResumed);
        Ok(())
    }

    fn transition(&mut self, next: CaptureState, operation: &'static str) -> Result<()> {
        if !self.state.can_transition_to(next) {
            warn!("Cannot {} while {}", operation, self.state);
            return Err(SessionError::InvalidTransition {
                operation,
                state: self.state,
            });
        }
        debug!("Capture state {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_capturing(&self) -> bool {
        self.state.is_active()
    }

    pub fn is_paused(&self) -> bool {
        self.state == CaptureState::Paused
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    fn check_duration(&mut self, now: Instant) {
        if !self.state.is_active() || self.config.duration <= 0.0 {
            return;
        }
        if self.stats.active_time(now).as_secs_f32() >= self.config.duration {
            info!("Recording duration of {}s reached", self.config.duration);
            if let Err(e) = self.stop_capture() {
                warn!("Automatic stop failed: {}", e);
            }
        }
    }

    fn prepare_canvas(&mut self) -> crate::writer::Result<()> {
        let mut size = self.config.capture_area.size();
        if size.is_empty() {
            size = self.reader.primary_display().bounds.size();
        }
        if self.writer.canvas_size() == Some(size) {
            return Ok(());
        }
        self.writer.create_canvas(size)
    }

    fn persist_annotations(&mut self) {
        if self.writer.annotation_count() == 0 {
            return;
        }
        let key = format!("{}/{}.json", self.annotation_prefix, self.stats.session_id);
        match self.writer.export_annotations(self.storage.as_ref(), &key) {
            Ok(count) => info!("Persisted {} annotations to {}", count, key),
            Err(e) => warn!("Failed to persist annotations to {}: {}", key, e),
        }
    }

    // ---- configuration ----

    /// Replace the recording config; an invalid one leaves the previous
    /// config in place
    pub fn set_recording_config(&mut self, config: RecordingConfig) -> Result<()> {
        if let Err(msg) = config.validate() {
            return Err(self.fail(SessionError::InvalidConfig(msg)));
        }

        self.config = config;
        self.pool.set_buffer_size(self.config.buffer_size);
        self.stats.target_fps = self.config.fps;
        self.stats.compression_ratio = self.config.quality.compression_ratio();
        if self.state.is_active() {
            self.refresh_capture_area();
        }
        debug!("Recording config updated: {} mode at {} fps", self.config.mode.as_str(), self.config.fps);
        Ok(())
    }

    pub fn recording_config(&self) -> &RecordingConfig {
        &self.config
    }

    /// Switch to region capture of `area`
    pub fn set_capture_area(&mut self, area: Rectangle) -> Result<()> {
        if area.is_empty() {
            warn!("Rejected empty capture area {}", area);
            return Err(SessionError::InvalidConfig(format!("empty capture area {}", area)));
        }
        self.config.mode = CaptureMode::Region;
        self.config.capture_area = area;
        debug!("Capture area set to {}", area);
        Ok(())
    }

    /// Switch to capturing the bounds of window `handle`
    pub fn set_capture_window(&mut self, handle: u64) -> Result<()> {
        if handle == 0 {
            warn!("Rejected null capture window");
            return Err(SessionError::InvalidConfig("window handle must be non-zero".into()));
        }
        self.config.mode = CaptureMode::Window;
        self.config.target_window = handle;
        if self.state.is_active() {
            self.refresh_capture_area();
        }
        Ok(())
    }

    /// Switch to fullscreen capture of display `display_id`
    pub fn set_capture_display(&mut self, display_id: u32) -> Result<()> {
        if !self.reader.displays().iter().any(|d| d.display_id == display_id) {
            warn!("Rejected unknown display {}", display_id);
            return Err(SessionError::InvalidConfig(format!("unknown display {}", display_id)));
        }
        self.config.mode = CaptureMode::Fullscreen;
        self.config.target_display = Some(display_id);
        if self.state.is_active() {
            self.refresh_capture_area();
        }
        Ok(())
    }

    /// Follow the pointer with a `size` area, or fall back to fullscreen
    pub fn set_follow_cursor(&mut self, enabled: bool, size: Size) -> Result<()> {
        if enabled {
            if size.is_empty() {
                return Err(SessionError::InvalidConfig("follow size must be non-empty".into()));
            }
            self.config.mode = CaptureMode::FollowCursor;
            self.config.follow_size = size;
        } else if self.config.mode == CaptureMode::FollowCursor {
            self.config.mode = CaptureMode::Fullscreen;
        }
        if self.state.is_active() {
            self.refresh_capture_area();
        }
        Ok(())
    }

    pub fn current_capture_area(&self) -> Rectangle {
        self.config.capture_area
    }

    fn capture_area_for_mode(&self) -> Result<Rectangle> {
        let area = match self.config.mode {
            CaptureMode::Fullscreen => match self.config.target_display {
                Some(id) => self
                    .reader
                    .displays()
                    .into_iter()
                    .find(|d| d.display_id == id)
                    .map(|d| d.bounds)
                    .unwrap_or_else(|| {
                        warn!("Display {} not found, using primary", id);
                        self.reader.primary_display().bounds
                    }),
                None => self.reader.primary_display().bounds,
            },
            CaptureMode::Window => {
                let window = self
                    .reader
                    .window_by_handle(self.config.target_window)
                    .ok_or(crate::reader::ReaderError::WindowNotFound(self.config.target_window))?;
                window.bounds
            }
            CaptureMode::Region => self.config.capture_area,
            CaptureMode::MultiDisplay => self.reader.virtual_screen_bounds(),
            CaptureMode::FollowCursor => {
                Rectangle::centered_on(self.reader.mouse_position(), self.config.follow_size)
            }
        };
        Ok(area)
    }

    fn refresh_capture_area(&mut self) {
        match self.capture_area_for_mode() {
            Ok(area) => {
                if area != self.config.capture_area {
                    trace!("Capture area moved to {}", area);
                    self.config.capture_area = area;
                }
            }
            Err(e) => warn!("Capture area not updated: {}", e),
        }
    }

    // ---- interaction ----

    /// Modes above passive keep the overlay up
    pub fn set_interaction_mode(&mut self, mode: InteractionMode) {
        self.interaction_mode = mode;
        if mode.wants_overlay() {
            if let Err(e) = self.writer.enable_overlay() {
                warn!("Overlay unavailable for {:?} mode: {}", mode, e);
            }
        } else {
            self.writer.disable_overlay();
            self.drawing_mode = false;
        }
        debug!("Interaction mode set to {:?}", mode);
    }

    pub fn interaction_mode(&self) -> InteractionMode {
        self.interaction_mode
    }

    /// Start real-time drawing on the overlay, creating a canvas if needed
    pub fn start_drawing_mode(&mut self) -> Result<()> {
        if !self.initialized {
            return Err(SessionError::NotInitialized);
        }
        if self.drawing_mode {
            return Ok(());
        }

        if !self.writer.has_canvas() {
            if let Err(e) = self.prepare_canvas() {
                return Err(self.fail(e.into()));
            }
        }
        if let Err(e) = self.writer.start_real_time_drawing() {
            return Err(self.fail(e.into()));
        }

        self.drawing_mode = true;
        debug!("Drawing mode started");
        self.events.emit(SessionEvent::DrawingStarted);
        Ok(())
    }

    pub fn stop_drawing_mode(&mut self) {
        if !self.drawing_mode {
            return;
        }
        self.writer.stop_real_time_drawing();
        self.drawing_mode = false;
        debug!("Drawing mode stopped");
        self.events.emit(SessionEvent::DrawingFinished);
    }

    pub fn is_drawing_mode(&self) -> bool {
        self.drawing_mode
    }

    /// Left-button drags become annotations; replaces click highlighting
    pub fn enable_quick_annotation(&mut self, enabled: bool) {
        self.features.quick_annotation = enabled;
    }

    /// Mark clicks with a red dot annotation
    pub fn enable_click_highlight(&mut self, enabled: bool) {
        self.config.highlight_clicks = enabled;
    }

    /// Draw typed text next to the pointer
    pub fn enable_keyboard_overlay(&mut self, enabled: bool) {
        self.features.keyboard_overlay = enabled;
    }

    /// Draw the recent pointer path
    pub fn enable_cursor_trail(&mut self, enabled: bool) {
        self.features.cursor_trail = enabled;
    }

    // ---- reader event mediation ----

    fn dispatch_reader_events(&mut self) {
        let Some(receiver) = self.reader_events.as_ref() else {
            return;
        };
        let pending: Vec<ReaderEvent> = receiver.try_iter().collect();
        for event in pending {
            self.handle_reader_event(event);
        }
    }

    fn handle_reader_event(&mut self, event: ReaderEvent) {
        if self.state != CaptureState::Capturing {
            trace!("Ignoring {} event while {}", event.category(), self.state);
            return;
        }

        match event {
            ReaderEvent::Mouse(mouse) => self.handle_mouse(&mouse),
            ReaderEvent::Keyboard(keyboard) => self.handle_keyboard(&keyboard),
            ReaderEvent::Window { window, change } => self.handle_window(&window, change),
            ReaderEvent::Display { display, change } => self.handle_display(&display, change),
            ReaderEvent::Cursor(_) => {}
        }
    }

    fn handle_mouse(&mut self, mouse: &MouseState) {
        let now = self.clock.now();
        for button in mouse.just_pressed().collect::<Vec<_>>() {
            self.recorder
                .record(now, |offset| RecordedAction::click(offset, mouse.position, button));
        }

        if self.features.quick_annotation {
            if self.interaction_mode >= InteractionMode::Annotation
                && self.writer.is_real_time_drawing()
                && mouse.is_pressed(MouseButton::Left)
                && mouse.movement() > DRAG_THRESHOLD
            {
                let start = mouse.button(MouseButton::Left).press_position;
                let annotation = drag_annotation(start, mouse.position);
                self.recorder
                    .record(now, |offset| RecordedAction::annotation(offset, annotation.clone()));
                self.add_annotation(annotation);
            }
        } else if self.config.highlight_clicks && mouse.is_any_button_pressed() {
            self.add_annotation(click_annotation(mouse.position));
        }

        if !self.writer.is_real_time_drawing() {
            return;
        }
        if self.config.highlight_cursor {
            let style = cursor_highlight_style();
            if let Err(e) = self.writer.draw_circle(mouse.position, CURSOR_HIGHLIGHT_RADIUS, Some(&style)) {
                trace!("Cursor highlight skipped: {}", e);
            }
        }
        if self.features.cursor_trail {
            let trail = self.reader.mouse_trail(TRAIL_POINTS);
            if trail.len() >= 2 {
                let style = trail_style();
                if let Err(e) = self.writer.draw_polyline(&trail, Some(&style)) {
                    trace!("Cursor trail skipped: {}", e);
                }
            }
        }
    }

    fn handle_keyboard(&mut self, keyboard: &KeyboardState) {
        let text = &keyboard.new_text;
        if text.is_empty() {
            return;
        }

        let now = self.clock.now();
        self.recorder
            .record(now, |offset| RecordedAction::key_press(offset, text.clone()));

        if self.features.keyboard_overlay && self.writer.is_real_time_drawing() {
            let position = self.reader.mouse_position() + KEY_OVERLAY_OFFSET;
            self.draw_key_overlay(text, position);
        }
    }

    fn draw_key_overlay(&mut self, text: &str, position: Point) {
        let props = key_overlay_props();
        if let Err(e) = self.writer.draw_text(text, position, Some(&props)) {
            trace!("Keyboard overlay skipped: {}", e);
        }
    }

    fn handle_window(&mut self, window: &WindowInfo, change: WindowChange) {
        if self.config.mode != CaptureMode::Window || window.handle != self.config.target_window {
            return;
        }
        match change {
            WindowChange::Moved => self.refresh_capture_area(),
            WindowChange::Closed => self.set_error(
                ErrorCode::CaptureFailed,
                format!("Captured window {} was closed", window.handle),
            ),
            WindowChange::Opened | WindowChange::Focused => {}
        }
    }

    fn handle_display(&mut self, display: &DisplayInfo, change: DisplayChange) {
        debug!("Display {} {:?} during capture", display.display_id, change);
        if matches!(self.config.mode, CaptureMode::Fullscreen | CaptureMode::MultiDisplay) {
            self.refresh_capture_area();
        }
    }

    fn add_annotation(&mut self, annotation: Annotation) -> Option<AnnotationId> {
        match self.writer.add_annotation(annotation) {
            Ok(id) => {
                self.events.emit(SessionEvent::AnnotationAdded(id));
                Some(id)
            }
            Err(e) => {
                warn!("Annotation dropped: {}", e);
                None
            }
        }
    }

    /// Add a caller-built annotation; recorded when action recording is on
    pub fn annotate(&mut self, annotation: Annotation) -> Result<AnnotationId> {
        let recorded = annotation.clone();
        let id = self.writer.add_annotation(annotation)?;
        self.recorder
            .record(self.clock.now(), |offset| RecordedAction::annotation(offset, recorded));
        self.events.emit(SessionEvent::AnnotationAdded(id));
        Ok(id)
    }

    pub fn remove_annotation(&mut self, id: AnnotationId) -> bool {
        let removed = self.writer.remove_annotation(id);
        if removed {
            self.events.emit(SessionEvent::AnnotationRemoved(id));
        }
        removed
    }

    // ---- frames ----

    fn process_frame_if_due(&mut self) {
        let now = self.clock.now();
        let interval = Duration::from_secs_f32(self.config.frame_interval());
        let due = self
            .stats
            .last_update
            .map_or(true, |last| now.saturating_duration_since(last) >= interval);
        if due {
            self.process_frame();
        }
    }

    /// Count a frame, hand a capture request to the workers and refresh
    /// stats; false unless capturing.
    ///
    /// Restarts the cadence interval, so a manual call delays the next
    /// scheduled frame.
    pub fn process_frame(&mut self) -> bool {
        if self.state != CaptureState::Capturing {
            return false;
        }

        let started = Instant::now();
        let now = self.clock.now();
        self.current_frame += 1;
        self.stats.record_frame(now);

        let request = FrameRequest {
            area: self.config.capture_area,
            cursor: self.config.include_cursor.then(|| self.reader.mouse_position()),
        };
        if !self.pool.request_frame(request) {
            trace!("Frame {} not queued: workers stopped", self.current_frame);
        }

        if self.config.enable_annotations && self.writer.is_real_time_drawing() {
            self.writer.render_annotations();
        }

        self.sync_pool_stats();
        self.stats.process_time_ms = started.elapsed().as_secs_f32() * 1000.0;
        self.events.emit(SessionEvent::FrameCaptured(self.current_frame));
        true
    }

    fn sync_pool_stats(&mut self) {
        let pool = self.pool.stats();
        apply_pool_stats(&mut self.stats, &pool);
    }

    /// Up to `count` buffered frames, oldest first
    pub fn recent_frames(&self, count: usize) -> Vec<ScreenCapture> {
        self.pool.recent_frames(count)
    }

    // ---- content analysis ----

    /// OCR over `area`; an empty area means the current capture area
    pub fn extract_text_from_screen(&self, area: Rectangle) -> String {
        let area = if area.is_empty() { self.config.capture_area } else { area };
        self.reader.extract_text_from_region(area)
    }

    /// Text regions inside the current capture area
    pub fn find_text_regions(&mut self) -> Vec<Rectangle> {
        self.reader.detect_text_regions(self.config.capture_area)
    }

    /// Tile comparison of two frames; differing sizes share nothing
    pub fn compare_screens(&self, first: &ScreenCapture, second: &ScreenCapture) -> ScreenComparison {
        if first.width != second.width || first.height != second.height {
            return ScreenComparison {
                similarity: 0.0,
                differences: vec![second.area],
            };
        }

        let differences = second.find_changed_regions(first, &self.hasher);
        let tile = self.hasher.tile_size();
        let tiles = first.width.div_ceil(tile) as usize * first.height.div_ceil(tile) as usize;
        let similarity = if tiles == 0 {
            1.0
        } else {
            1.0 - differences.len() as f32 / tiles as f32
        };
        ScreenComparison {
            similarity,
            differences,
        }
    }

    // ---- action recording and playback ----

    pub fn start_action_recording(&mut self) {
        self.recorder.start(self.clock.now());
        info!("Action recording started");
    }

    pub fn stop_action_recording(&mut self) {
        self.recorder.stop();
        info!("Action recording stopped with {} actions", self.recorder.actions().len());
    }

    pub fn is_recording_actions(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn recorded_actions(&self) -> Vec<RecordedAction> {
        self.recorder.actions().to_vec()
    }

    /// Write the recorded actions as JSON under `key`
    pub fn save_actions(&self, key: &str) -> Result<usize> {
        let actions = self.recorder.actions();
        let data = serde_json::to_vec_pretty(actions).map_err(StorageError::from)?;
        self.storage.save(key, &data)?;
        info!("Saved {} actions to {}", actions.len(), key);
        Ok(actions.len())
    }

    /// Replace the recorded actions with the script under `key`
    pub fn load_actions(&mut self, key: &str) -> Result<usize> {
        let data = self.storage.load(key)?;
        let actions: Vec<RecordedAction> = serde_json::from_slice(&data).map_err(StorageError::from)?;
        let count = actions.len();
        self.recorder.replace(actions);
        info!("Loaded {} actions from {}", count, key);
        Ok(count)
    }

    /// Replay `actions` from `update()`, `speed` times faster than recorded
    pub fn playback_actions(&mut self, actions: Vec<RecordedAction>, speed: f32) -> Result<()> {
        if !self.initialized {
            return Err(SessionError::NotInitialized);
        }
        if actions.is_empty() {
            return Err(SessionError::InvalidConfig("no actions to play back".into()));
        }
        info!("Playing back {} actions at {}x", actions.len(), speed);
        self.playback = Some(Playback::new(actions, speed, self.clock.now()));
        Ok(())
    }

    pub fn is_playing_back(&self) -> bool {
        self.playback.is_some()
    }

    fn advance_playback(&mut self, now: Instant) {
        let Some(playback) = self.playback.as_mut() else {
            return;
        };
        let due = playback.due(now);
        let finished = playback.is_finished();

        for action in due {
            self.replay(&action);
            self.events.emit(SessionEvent::ActionReplayed(action));
        }
        if finished {
            self.playback = None;
            info!("Playback finished");
            self.events.emit(SessionEvent::PlaybackFinished);
        }
    }

    fn replay(&mut self, action: &RecordedAction) {
        match action.kind {
            ActionKind::MouseClick if self.config.highlight_clicks => {
                self.add_annotation(click_annotation(action.position));
            }
            ActionKind::KeyPress if self.features.keyboard_overlay && self.writer.is_real_time_drawing() => {
                self.draw_key_overlay(&action.text, action.position + KEY_OVERLAY_OFFSET);
            }
            ActionKind::Annotation => {
                if let Some(annotation) = action.annotation.clone() {
                    self.add_annotation(annotation);
                }
            }
            _ => trace!("Replayed {:?} at {} ms", action.kind, action.offset_ms),
        }
    }

    // ---- presets ----

    /// Storage prefixes for presets and persisted annotations
    pub fn set_storage_prefixes(&mut self, presets: &str, annotations: &str) {
        self.preset_prefix = presets.trim_end_matches('/').to_string();
        self.annotation_prefix = annotations.trim_end_matches('/').to_string();
    }

    /// Store `config` as TOML under `presets/<name>.toml`
    pub fn save_preset(&self, name: &str, config: &RecordingConfig) -> Result<()> {
        let key = self.preset_key(name)?;
        config.validate().map_err(SessionError::InvalidConfig)?;
        let text = toml::to_string_pretty(config).map_err(StorageError::from)?;
        self.storage.save(&key, text.as_bytes())?;
        info!("Saved preset '{}'", name);
        Ok(())
    }

    pub fn load_preset(&self, name: &str) -> Result<RecordingConfig> {
        let key = self.preset_key(name)?;
        let data = self.storage.load(&key)?;
        let text = String::from_utf8(data)
            .map_err(|e| StorageError::Format(format!("preset '{}' is not UTF-8: {}", name, e)))?;
        let config: RecordingConfig = toml::from_str(&text).map_err(StorageError::from)?;
        config.validate().map_err(SessionError::InvalidConfig)?;
        Ok(config)
    }

    /// Sorted preset names; empty when storage cannot be listed
    pub fn available_presets(&self) -> Vec<String> {
        let prefix = format!("{}/", self.preset_prefix);
        match self.storage.list(&prefix) {
            Ok(keys) => {
                let mut names: Vec<String> = keys
                    .iter()
                    .filter_map(|key| key.strip_prefix(&prefix)?.strip_suffix(".toml"))
                    .map(str::to_string)
                    .collect();
                names.sort();
                names
            }
            Err(e) => {
                warn!("Failed to list presets: {}", e);
                Vec::new()
            }
        }
    }

    pub fn delete_preset(&self, name: &str) -> Result<()> {
        let key = self.preset_key(name)?;
        self.storage.delete(&key)?;
        info!("Deleted preset '{}'", name);
        Ok(())
    }

    fn preset_key(&self, name: &str) -> Result<String> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(SessionError::InvalidConfig(format!("invalid preset name '{}'", name)));
        }
        Ok(format!("{}/{}.toml", self.preset_prefix, name))
    }

    // ---- stats and tuning ----

    pub fn capture_stats(&self) -> CaptureStats {
        let mut stats = self.stats.clone();
        apply_pool_stats(&mut stats, &self.pool.stats());
        stats
    }

    /// Zero the counters; an active session keeps its id and restarts
    /// its clock
    pub fn reset_capture_stats(&mut self) {
        if self.state.is_active() {
            let session_id = self.stats.session_id;
            self.stats = CaptureStats::started(self.clock.now(), self.config.fps);
            self.stats.session_id = session_id;
            self.stats.compression_ratio = self.config.quality.compression_ratio();
            if self.state == CaptureState::Paused {
                self.stats.pause(self.clock.now());
            }
        } else {
            self.stats = CaptureStats::default();
        }
        self.pool.reset();
        self.current_frame = 0;
    }

    pub fn set_buffer_size(&mut self, frames: usize) -> Result<()> {
        if frames == 0 {
            return Err(SessionError::InvalidConfig("buffer size must be at least one frame".into()));
        }
        self.config.buffer_size = frames;
        self.pool.set_buffer_size(frames);
        Ok(())
    }

    /// Worker count for the next start; restarts running workers
    pub fn set_thread_count(&mut self, threads: usize) -> Result<()> {
        self.thread_count = threads.max(1);
        if self.pool.is_running() {
            self.pool.stop();
            if let Err(e) = self.pool.start(self.thread_count) {
                return Err(self.fail(e));
            }
        }
        Ok(())
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    // ---- errors ----

    pub fn last_error(&self) -> ErrorCode {
        self.last_error
    }

    pub fn last_error_message(&self) -> &str {
        &self.last_error_message
    }

    pub fn has_error(&self) -> bool {
        self.last_error != ErrorCode::Success
    }

    pub fn clear_error(&mut self) {
        self.last_error = ErrorCode::Success;
        self.last_error_message.clear();
    }

    /// Record a failure and notify listeners
    pub fn set_error(&mut self, code: ErrorCode, message: impl Into<String>) {
        let message = message.into();
        error!("Session error [{}]: {}", code, message);
        self.last_error = code;
        self.last_error_message = message.clone();
        self.events.emit(SessionEvent::ErrorOccurred { code, message });
    }

    fn fail(&mut self, err: SessionError) -> SessionError {
        self.set_error(err.code(), err.to_string());
        err
    }

    // ---- events and access ----

    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn set_event_callback(&mut self, callback: impl FnMut(&SessionEvent) + Send + 'static) {
        self.events.set_callback(Box::new(callback));
    }

    pub fn clear_event_callback(&mut self) {
        self.events.clear_callback();
    }

    pub fn reader(&self) -> &Reader {
        &self.reader
    }

    pub fn reader_mut(&mut self) -> &mut Reader {
        &mut self.reader
    }

    pub fn writer(&self) -> &Writer {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut Writer {
        &mut self.writer
    }
}

impl Drop for SessionOrchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn apply_pool_stats(stats: &mut CaptureStats, pool: &PoolStats) {
    stats.dropped_frames = pool.dropped_frames;
    stats.capture_time_ms = pool.average_capture_ms;
    stats.memory_usage_mb = pool.buffered_bytes as f32 / (1024.0 * 1024.0);
    stats.buffer_usage = pool.buffer_usage;
    stats.estimate_bitrate(pool.average_frame_bytes);
}

fn click_annotation(position: Point) -> Annotation {
    Annotation::new("click")
        .with_points(vec![position])
        .with_shape(ShapeProperties {
            fill_color: Color::RED,
            stroke_color: Color::RED,
            filled: true,
            corner_radius: CLICK_RADIUS,
            ..ShapeProperties::default()
        })
}

fn drag_annotation(start: Point, end: Point) -> Annotation {
    Annotation::new("drag")
        .with_points(vec![start, end])
        .with_shape(ShapeProperties {
            stroke_color: Color::BLUE,
            stroke_width: 2.0,
            filled: false,
            ..ShapeProperties::default()
        })
}

fn cursor_highlight_style() -> ShapeProperties {
    ShapeProperties {
        fill_color: Color::rgba(255, 255, 0, 96),
        stroke_color: Color::rgba(255, 200, 0, 160),
        stroke_width: 2.0,
        ..ShapeProperties::default()
    }
}

fn trail_style() -> ShapeProperties {
    ShapeProperties {
        stroke_color: Color::rgba(255, 255, 255, 160),
        stroke_width: 2.0,
        filled: false,
        ..ShapeProperties::default()
    }
}

fn key_overlay_props() -> TextProperties {
    let mut props = TextProperties {
        color: Color::WHITE,
        ..TextProperties::default()
    };
    props.font.size = 16.0;
    props
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::providers::{MemoryStorage, RenderCall};

    struct Harness {
        session: SessionOrchestrator,
        platform: SimulatedPlatform,
        clock: ManualClock,
        capture: Arc<SyntheticCapture>,
        renderer: NullRenderer,
        storage: MemoryStorage,
        events: Receiver<SessionEvent>,
    }

    impl Harness {
        fn tick(&mut self) {
            self.clock.advance_ms(16);
            self.session.update();
        }

        fn drain(&self) -> Vec<SessionEvent> {
            self.events.try_iter().collect()
        }
    }

    fn small_display() -> DisplayInfo {
        DisplayInfo {
            display_id: 0,
            bounds: Rectangle::new(0, 0, 320, 240),
            work_area: Rectangle::new(0, 0, 320, 240),
            is_primary: true,
            ..DisplayInfo::default()
        }
    }

    fn build() -> Harness {
        let platform = SimulatedPlatform::new();
        platform.set_displays(vec![small_display()]);
        let clock = ManualClock::new();
        let capture = Arc::new(SyntheticCapture::new());
        let renderer = NullRenderer::new();
        let storage = MemoryStorage::new();

        let collaborators = Collaborators {
            platform: Box::new(platform.clone()),
            capture: capture.clone(),
            renderer: Box::new(renderer.clone()),
            overlay: Box::new(NullOverlay::new()),
            ocr: Arc::new(NullOcr::with_text("hello world")),
            exporter: Arc::new(NullExporter::new()),
            storage: Arc::new(storage.clone()),
            clock: Arc::new(clock.clone()),
        };
        let mut session = SessionOrchestrator::new(collaborators);
        session.set_thread_count(1).unwrap();
        let events = session.subscribe();

        Harness {
            session,
            platform,
            clock,
            capture,
            renderer,
            storage,
            events,
        }
    }

    fn harness() -> Harness {
        let mut h = build();
        h.session.initialize().unwrap();
        h
    }

    fn kinds(session: &SessionOrchestrator, kind: &str) -> Vec<Annotation> {
        session
            .writer()
            .annotations()
            .into_iter()
            .filter(|a| a.kind == kind)
            .collect()
    }

    #[test]
    fn start_requires_initialization() {
        let mut h = build();
        let err = h.session.start_capture(RecordingConfig::default()).unwrap_err();
        assert!(matches!(err, SessionError::NotInitialized));
        assert_eq!(h.session.last_error(), ErrorCode::InitializationFailed);
    }

    #[test]
    fn unavailable_platform_fails_initialization() {
        let mut h = build();
        h.platform.set_available(false);
        assert!(h.session.initialize().is_err());
        assert!(!h.session.is_initialized());
        assert_eq!(h.session.last_error(), ErrorCode::InitializationFailed);
        assert!(h
            .drain()
            .iter()
            .any(|e| matches!(e, SessionEvent::ErrorOccurred { code: ErrorCode::InitializationFailed, .. })));
    }

    #[test]
    fn out_of_range_fps_is_rejected() {
        let mut h = harness();
        for fps in [0.0, 150.0] {
            let err = h
                .session
                .start_capture(RecordingConfig::default().with_fps(fps))
                .unwrap_err();
            assert!(matches!(err, SessionError::InvalidConfig(_)));
            assert_eq!(h.session.state(), CaptureState::Idle);
            assert_eq!(h.session.last_error(), ErrorCode::InvalidConfig);
        }
        assert!(!h.session.reader().is_monitoring());
    }

    #[test]
    fn state_machine_transitions() {
        let mut h = harness();
        assert!(h.session.pause_capture().is_err());
        assert!(h.session.resume_capture().is_err());
        assert!(h.session.stop_capture().is_err());

        h.session.start_capture(RecordingConfig::default()).unwrap();
        assert!(matches!(
            h.session.start_capture(RecordingConfig::default()),
            Err(SessionError::InvalidTransition { state: CaptureState::Capturing, .. })
        ));
        assert!(h.session.resume_capture().is_err());

        h.session.pause_capture().unwrap();
        assert!(h.session.is_paused());
        assert!(h.session.pause_capture().is_err());
        h.session.resume_capture().unwrap();
        h.session.stop_capture().unwrap();
        assert_eq!(h.session.state(), CaptureState::Idle);
        assert!(!h.session.has_error());

        let events = h.drain();
        assert_eq!(
            events,
            vec![
                SessionEvent::CaptureStarted,
                SessionEvent::CapturePaused,
                SessionEvent::CaptureResumed,
                SessionEvent::CaptureStopped,
            ]
        );
    }

    #[test]
    fn start_sets_up_monitoring_canvas_and_overlay() {
        let mut h = harness();
        h.session.start_capture(RecordingConfig::default()).unwrap();

        assert!(h.session.reader().is_monitoring());
        assert_eq!(h.session.current_capture_area(), Rectangle::new(0, 0, 320, 240));
        assert_eq!(h.session.writer().canvas_size(), Some(Size::new(320, 240)));
        assert!(h.session.writer().is_overlay_enabled());
        assert!(!h.session.capture_stats().session_id.is_nil());

        h.session.stop_capture().unwrap();
        assert!(!h.session.reader().is_monitoring());
        assert!(!h.session.writer().is_overlay_enabled());
    }

    #[test]
    fn window_mode_uses_window_bounds() {
        let mut h = harness();
        let config = RecordingConfig::default()
            .with_mode(CaptureMode::Window)
            .with_window(2);
        h.session.start_capture(config).unwrap();
        assert_eq!(h.session.current_capture_area(), Rectangle::new(100, 100, 800, 600));
        h.session.stop_capture().unwrap();

        let missing = RecordingConfig::default()
            .with_mode(CaptureMode::Window)
            .with_window(99);
        assert!(h.session.start_capture(missing).is_err());
        assert_eq!(h.session.state(), CaptureState::Idle);
        assert_eq!(h.session.last_error(), ErrorCode::ReaderError);
    }

    #[test]
    fn invalid_reconfiguration_keeps_previous_config() {
        let mut h = harness();
        let good = RecordingConfig::default().with_fps(24.0);
        h.session.set_recording_config(good.clone()).unwrap();

        let empty_region = RecordingConfig::default().with_mode(CaptureMode::Region);
        assert!(h.session.set_recording_config(empty_region).is_err());
        let null_window = RecordingConfig::default().with_mode(CaptureMode::Window);
        assert!(h.session.set_recording_config(null_window).is_err());

        assert_eq!(h.session.recording_config(), &good);
        assert_eq!(h.session.last_error(), ErrorCode::InvalidConfig);
    }

    #[test]
    fn capture_target_setters() {
        let mut h = harness();
        assert!(h.session.set_capture_area(Rectangle::new(0, 0, 0, 10)).is_err());
        h.session.set_capture_area(Rectangle::new(10, 10, 50, 50)).unwrap();
        assert_eq!(h.session.recording_config().mode, CaptureMode::Region);

        assert!(h.session.set_capture_window(0).is_err());
        h.session.set_capture_window(2).unwrap();
        assert_eq!(h.session.recording_config().mode, CaptureMode::Window);

        assert!(h.session.set_capture_display(7).is_err());
        h.session.set_capture_display(0).unwrap();
        assert_eq!(h.session.recording_config().mode, CaptureMode::Fullscreen);
        assert_eq!(h.session.recording_config().target_display, Some(0));
    }

    #[test]
    fn thirty_frames_over_one_second() {
        let mut h = harness();
        h.session.start_capture(RecordingConfig::default().with_fps(30.0)).unwrap();

        for _ in 0..30 {
            h.clock.advance(Duration::from_secs_f64(1.0 / 30.0));
            assert!(h.session.process_frame());
        }

        let stats = h.session.capture_stats();
        assert_eq!(stats.total_frames, 30);
        assert!((stats.actual_fps - 30.0).abs() < 0.1, "fps {}", stats.actual_fps);
        assert_eq!(h.session.current_frame(), 30);

        let frames: Vec<u64> = h
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::FrameCaptured(n) => Some(n),
                _ => None,
            })
            .collect();
        assert_eq!(frames, (1..=30).collect::<Vec<_>>());
    }

    #[test]
    fn static_desktop_still_records_on_cadence() {
        let mut h = harness();
        h.session.start_capture(RecordingConfig::default().with_fps(10.0)).unwrap();

        // no input at all; 16 ms ticks give a frame every seventh tick
        for _ in 0..62 {
            h.tick();
        }

        assert_eq!(h.session.capture_stats().total_frames, 9);
        assert_eq!(h.session.current_frame(), 9);
    }

    #[test]
    fn held_button_keeps_frames_and_highlights_coming() {
        let mut h = harness();
        h.session.start_capture(RecordingConfig::default().with_fps(30.0)).unwrap();

        h.platform.set_button(MouseButton::Left, true);
        for _ in 0..5 {
            h.tick();
        }

        assert_eq!(kinds(&h.session, "click").len(), 5);
        // 16 ms ticks against a 33 ms interval: ticks 1 and 4
        assert_eq!(h.session.capture_stats().total_frames, 2);
    }

    #[test]
    fn manual_frames_restart_the_interval() {
        let mut h = harness();
        h.session.start_capture(RecordingConfig::default().with_fps(10.0)).unwrap();
        h.tick();
        assert_eq!(h.session.capture_stats().total_frames, 1);

        h.clock.advance_ms(90);
        assert!(h.session.process_frame());
        h.tick();
        assert_eq!(h.session.capture_stats().total_frames, 2);
    }

    #[test]
    fn paused_time_is_left_out_of_the_frame_rate() {
        let mut h = harness();
        h.session.start_capture(RecordingConfig::default().with_fps(10.0)).unwrap();
        for _ in 0..62 {
            h.tick();
        }
        h.session.pause_capture().unwrap();
        h.clock.advance(Duration::from_secs(10));
        for _ in 0..3 {
            h.tick();
        }
        assert_eq!(h.session.capture_stats().total_frames, 9);
        h.session.resume_capture().unwrap();
        h.tick();

        let stats = h.session.capture_stats();
        assert_eq!(stats.total_frames, 10);
        assert!(stats.actual_fps > 9.0, "fps {}", stats.actual_fps);
    }

    #[test]
    fn workers_fill_the_frame_buffer() {
        let mut h = harness();
        h.session.start_capture(RecordingConfig::default()).unwrap();
        for _ in 0..3 {
            h.clock.advance_ms(40);
            h.session.process_frame();
        }
        assert!(h.session.pool.wait_idle(Duration::from_secs(5)));

        let frames = h.session.recent_frames(10);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].area, Rectangle::new(0, 0, 320, 240));
        assert!(h.capture.captures() >= 3);
        assert!(h.session.capture_stats().buffer_usage > 0);
    }

    #[test]
    fn process_frame_is_a_no_op_unless_capturing() {
        let mut h = harness();
        assert!(!h.session.process_frame());
        h.session.start_capture(RecordingConfig::default()).unwrap();
        h.session.pause_capture().unwrap();
        assert!(!h.session.process_frame());
        assert_eq!(h.session.capture_stats().total_frames, 0);
    }

    #[test]
    fn clicks_become_red_annotations() {
        let mut h = harness();
        h.session.start_capture(RecordingConfig::default()).unwrap();
        h.drain();

        h.platform.set_button(MouseButton::Left, true);
        h.tick();

        let clicks = kinds(&h.session, "click");
        assert_eq!(clicks.len(), 1);
        assert_eq!(clicks[0].points, vec![Point::new(960, 540)]);
        assert_eq!(clicks[0].shape_props.fill_color, Color::RED);
        assert!(h
            .drain()
            .iter()
            .any(|e| matches!(e, SessionEvent::AnnotationAdded(_))));
    }

    #[test]
    fn click_highlight_can_be_disabled() {
        let mut h = harness();
        h.session.start_capture(RecordingConfig::default()).unwrap();
        h.session.enable_click_highlight(false);
        h.platform.set_button(MouseButton::Right, true);
        h.tick();
        assert_eq!(h.session.writer().annotation_count(), 0);
    }

    #[test]
    fn paused_sessions_ignore_input() {
        let mut h = harness();
        h.session.start_capture(RecordingConfig::default()).unwrap();
        h.session.pause_capture().unwrap();

        h.platform.set_button(MouseButton::Left, true);
        h.tick();

        assert_eq!(h.session.writer().annotation_count(), 0);
        assert_eq!(h.session.capture_stats().total_frames, 0);
    }

    #[test]
    fn quick_annotation_turns_drags_into_annotations() {
        let mut h = harness();
        h.session.enable_quick_annotation(true);
        h.session.set_interaction_mode(InteractionMode::Annotation);
        h.session.start_capture(RecordingConfig::default()).unwrap();
        h.session.start_drawing_mode().unwrap();

        h.platform.move_mouse(100, 100);
        h.tick();
        h.platform.set_button(MouseButton::Left, true);
        h.tick();
        h.platform.move_mouse(150, 150);
        h.tick();

        let drags = kinds(&h.session, "drag");
        assert_eq!(drags.len(), 1);
        assert_eq!(drags[0].points, vec![Point::new(100, 100), Point::new(150, 150)]);
        assert_eq!(drags[0].shape_props.stroke_color, Color::BLUE);
        assert_eq!(drags[0].shape_props.stroke_width, 2.0);
        assert!(kinds(&h.session, "click").is_empty());
    }

    #[test]
    fn quick_annotation_needs_annotation_mode() {
        let mut h = harness();
        h.session.enable_quick_annotation(true);
        h.session.start_capture(RecordingConfig::default()).unwrap();
        h.session.start_drawing_mode().unwrap();

        h.platform.set_button(MouseButton::Left, true);
        h.tick();
        h.platform.move_mouse(400, 400);
        h.tick();
        assert_eq!(h.session.writer().annotation_count(), 0);
    }

    #[test]
    fn keyboard_overlay_draws_typed_text() {
        let mut h = harness();
        h.session.enable_keyboard_overlay(true);
        h.session.start_capture(RecordingConfig::default()).unwrap();
        h.session.start_drawing_mode().unwrap();
        h.platform.move_mouse(100, 100);
        h.tick();
        h.renderer.clear_calls();

        h.platform.type_text("hi");
        h.tick();

        let texts: Vec<String> = h
            .renderer
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                RenderCall::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["hi".to_string()]);
    }

    #[test]
    fn typed_text_and_clicks_are_recorded() {
        let mut h = harness();
        h.session.start_capture(RecordingConfig::default()).unwrap();
        h.session.start_action_recording();

        h.platform.type_text("abc");
        h.tick();
        h.platform.set_button(MouseButton::Left, true);
        h.tick();
        h.session.stop_action_recording();
        h.platform.type_text("ignored");
        h.tick();

        let actions = h.session.recorded_actions();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].kind, ActionKind::KeyPress);
        assert_eq!(actions[0].text, "abc");
        assert_eq!(actions[1].kind, ActionKind::MouseClick);
        assert_eq!(actions[1].button, Some(MouseButton::Left));
        assert!(actions[1].offset_ms >= actions[0].offset_ms);
    }

    #[test]
    fn actions_round_trip_through_storage_and_play_back() {
        let mut h = harness();
        h.session.start_action_recording();
        h.clock.advance_ms(100);
        h.session
            .annotate(Annotation::new("note").with_text("look").with_points(vec![Point::new(5, 5)]))
            .unwrap();
        h.session.stop_action_recording();

        assert_eq!(h.session.save_actions("scripts/demo.json").unwrap(), 1);
        assert!(h.storage.len() >= 1);
        assert_eq!(h.session.load_actions("scripts/demo.json").unwrap(), 1);

        let actions = h.session.recorded_actions();
        h.session.writer_mut().clear_annotations();
        h.session.playback_actions(actions, 2.0).unwrap();
        h.drain();

        h.clock.advance_ms(30);
        h.session.update();
        assert!(h.session.is_playing_back());
        assert_eq!(h.session.writer().annotation_count(), 0);

        h.clock.advance_ms(30);
        h.session.update();
        assert!(!h.session.is_playing_back());
        assert_eq!(kinds(&h.session, "note").len(), 1);

        let events = h.drain();
        assert!(events.iter().any(|e| matches!(e, SessionEvent::ActionReplayed(_))));
        assert_eq!(events.last(), Some(&SessionEvent::PlaybackFinished));
    }

    #[test]
    fn empty_playback_is_rejected() {
        let mut h = harness();
        assert!(h.session.playback_actions(Vec::new(), 1.0).is_err());
        assert!(!h.session.is_playing_back());
    }

    #[test]
    fn presets_round_trip() {
        let h = harness();
        let config = RecordingConfig::default()
            .with_mode(CaptureMode::Region)
            .with_area(Rectangle::new(10, 20, 300, 200))
            .with_fps(24.0);

        h.session.save_preset("tutorial", &config).unwrap();
        h.session.save_preset("demo", &RecordingConfig::default()).unwrap();
        assert_eq!(h.session.available_presets(), vec!["demo", "tutorial"]);
        assert_eq!(h.session.load_preset("tutorial").unwrap(), config);

        h.session.delete_preset("demo").unwrap();
        assert_eq!(h.session.available_presets(), vec!["tutorial"]);
        assert!(h.session.load_preset("demo").is_err());
        assert!(h.session.save_preset("../escape", &config).is_err());
        assert!(h
            .session
            .save_preset("bad", &RecordingConfig::default().with_fps(0.0))
            .is_err());
    }

    #[test]
    fn interaction_mode_controls_overlay() {
        let mut h = harness();
        h.session.set_interaction_mode(InteractionMode::Presentation);
        assert!(h.session.writer().is_overlay_enabled());
        h.session.set_interaction_mode(InteractionMode::Passive);
        assert!(!h.session.writer().is_overlay_enabled());
        assert_eq!(h.session.interaction_mode(), InteractionMode::Passive);
    }

    #[test]
    fn drawing_mode_emits_events() {
        let mut h = harness();
        h.session.start_drawing_mode().unwrap();
        assert!(h.session.is_drawing_mode());
        assert!(h.session.writer().is_real_time_drawing());
        h.session.stop_drawing_mode();
        h.session.stop_drawing_mode();
        assert_eq!(
            h.drain(),
            vec![SessionEvent::DrawingStarted, SessionEvent::DrawingFinished]
        );
    }

    #[test]
    fn follow_cursor_tracks_the_pointer() {
        let mut h = harness();
        h.session.set_follow_cursor(true, Size::new(100, 100)).unwrap();
        h.session.start_capture(h.session.recording_config().clone()).unwrap();

        h.platform.move_mouse(50, 60);
        h.tick();
        assert_eq!(h.session.current_capture_area(), Rectangle::new(0, 10, 100, 100));

        h.session.set_follow_cursor(false, Size::default()).unwrap();
        assert_eq!(h.session.recording_config().mode, CaptureMode::Fullscreen);
    }

    #[test]
    fn duration_stops_the_capture() {
        let mut h = harness();
        let mut config = RecordingConfig::default();
        config.duration = 0.1;
        h.session.start_capture(config).unwrap();

        for _ in 0..8 {
            h.tick();
        }
        assert_eq!(h.session.state(), CaptureState::Idle);
        assert!(h.drain().contains(&SessionEvent::CaptureStopped));
    }

    #[test]
    fn annotations_persist_on_stop() {
        let mut h = harness();
        h.session.start_capture(RecordingConfig::default()).unwrap();
        h.session.annotate(Annotation::new("note").with_text("kept")).unwrap();
        let session_id = h.session.capture_stats().session_id;
        h.session.stop_capture().unwrap();

        let key = format!("{}/{}.json", ANNOTATION_PREFIX, session_id);
        assert!(h.storage.load(&key).is_ok());
    }

    #[test]
    fn closing_the_captured_window_reports_an_error() {
        let mut h = harness();
        let config = RecordingConfig::default()
            .with_mode(CaptureMode::Window)
            .with_window(2);
        h.session.start_capture(config).unwrap();

        h.platform.close_window(2);
        h.tick();
        assert_eq!(h.session.last_error(), ErrorCode::CaptureFailed);
    }

    #[test]
    fn compare_screens_counts_changed_tiles() {
        let h = harness();
        let capture = SyntheticCapture::new();
        capture.set_frozen(true);
        let area = Rectangle::new(0, 0, 128, 128);
        let now = h.clock.now();
        let first = ScreenCapture::from_pixels(area, capture.capture_pixels(area), now, 1).unwrap();
        let mut second = ScreenCapture::from_pixels(area, capture.capture_pixels(area), now, 2).unwrap();

        let same = h.session.compare_screens(&first, &second);
        assert_eq!(same.similarity, 1.0);
        assert!(same.differences.is_empty());

        second.data[0] = second.data[0].wrapping_add(1);
        let changed = h.session.compare_screens(&first, &second);
        assert_eq!(changed.differences, vec![Rectangle::new(0, 0, 64, 64)]);
        assert!((changed.similarity - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn ocr_goes_through_the_reader() {
        let mut h = harness();
        assert_eq!(h.session.extract_text_from_screen(Rectangle::new(0, 0, 10, 10)), "hello world");
        assert!(h.session.find_text_regions().is_empty());
    }

    #[test]
    fn shutdown_stops_an_active_capture() {
        let mut h = harness();
        h.session.start_capture(RecordingConfig::default()).unwrap();
        h.session.shutdown();
        assert_eq!(h.session.state(), CaptureState::Idle);
        assert!(!h.session.is_initialized());
        assert!(!h.session.update());
    }

    #[test]
    fn reset_keeps_the_session_id() {
        let mut h = harness();
        h.session.start_capture(RecordingConfig::default()).unwrap();
        h.clock.advance_ms(50);
        h.session.process_frame();
        let id = h.session.capture_stats().session_id;

        h.session.reset_capture_stats();
        let stats = h.session.capture_stats();
        assert_eq!(stats.total_frames, 0);
        assert_eq!(stats.session_id, id);
        assert!(h.session.set_buffer_size(0).is_err());
    }
}
