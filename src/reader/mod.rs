//! Input/display reader
//!
//! Samples mouse, keyboard, window, display and cursor state through a
//! `PlatformQuery`, keeps the latest snapshot of each, and reports changes
//! through per-category callbacks and a typed event subscription. Every
//! query returns a copy; before `initialize` they return defaults.

pub mod events;

pub use events::{DisplayChange, ReaderEvent, WindowChange};

use crate::capture::{CaptureProvider, ScreenCapture};
use crate::clock::SharedClock;
use crate::display::{self, CursorInfo, DisplayInfo, SystemMetrics, WindowInfo};
use crate::geometry::{bounding_rect, Point, Rectangle, Size};
use crate::input::{keys, KeyState, KeyboardState, MouseButton, MouseState};
use crate::providers::{OcrProvider, PlatformQuery};
use crate::storage::{Storage, StorageError};
use crossbeam::channel::Receiver;
use events::EventFanout;
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Hard cap on stored trail points
pub const MAX_TRAIL_POINTS: usize = 100;

/// Reader errors
#[derive(Debug)]
pub enum ReaderError {
    /// Operation requires `initialize`
    NotInitialized,
    /// The platform query layer reported itself unavailable
    PlatformUnavailable,
    /// Capture provider returned no pixels
    CaptureFailed(String),
    /// Empty or negative capture area
    InvalidArea(Rectangle),
    /// No window with this handle
    WindowNotFound(u64),
    /// Settings persistence failed
    Storage(StorageError),
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderError::NotInitialized => write!(f, "Reader is not initialized"),
            ReaderError::PlatformUnavailable => write!(f, "Platform query layer is unavailable"),
            ReaderError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            ReaderError::InvalidArea(area) => write!(f, "Invalid capture area {}", area),
            ReaderError::WindowNotFound(handle) => write!(f, "No window with handle {}", handle),
            ReaderError::Storage(err) => write!(f, "Settings storage error: {}", err),
        }
    }
}

impl std::error::Error for ReaderError {}

impl From<StorageError> for ReaderError {
    fn from(err: StorageError) -> Self {
        ReaderError::Storage(err)
    }
}

pub type Result<T> = std::result::Result<T, ReaderError>;

fn default_poll_interval_ms() -> u64 {
    16
}

fn default_true() -> bool {
    true
}

fn default_trail_capacity() -> usize {
    MAX_TRAIL_POINTS
}

fn default_key_sequence_capacity() -> usize {
    64
}

/// Reader tuning; also the `[reader]` config section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderSettings {
    /// Minimum time between accepted `update` ticks
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_true")]
    pub mouse_tracking: bool,

    #[serde(default = "default_true")]
    pub keyboard_tracking: bool,

    #[serde(default = "default_true")]
    pub window_tracking: bool,

    /// Displays are refreshed each tick only when set; otherwise on demand
    #[serde(default)]
    pub display_tracking: bool,

    #[serde(default = "default_true")]
    pub cursor_tracking: bool,

    /// Clamped to `MAX_TRAIL_POINTS`
    #[serde(default = "default_trail_capacity")]
    pub trail_capacity: usize,

    #[serde(default = "default_key_sequence_capacity")]
    pub key_sequence_capacity: usize,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            mouse_tracking: true,
            keyboard_tracking: true,
            window_tracking: true,
            display_tracking: false,
            cursor_tracking: true,
            trail_capacity: default_trail_capacity(),
            key_sequence_capacity: default_key_sequence_capacity(),
        }
    }
}

impl ReaderSettings {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.poll_interval_ms < default_poll_interval_ms() {
            return Err(format!(
                "reader.poll_interval_ms must be at least {} (60 Hz cap)",
                default_poll_interval_ms()
            ));
        }
        if self.trail_capacity == 0 {
            return Err("reader.trail_capacity must be at least 1".to_string());
        }
        Ok(())
    }

    fn trail_cap(&self) -> usize {
        self.trail_capacity.clamp(1, MAX_TRAIL_POINTS)
    }
}

/// Diagnostics counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReaderStats {
    /// Accepted `update` ticks
    pub updates: u64,
    pub events_processed: u64,
    /// Mean wall time spent inside an accepted tick
    pub average_update_ms: f32,
    /// Rough bytes held by trails and snapshots
    pub memory_usage: usize,
    pub mouse_events: u64,
    pub keyboard_events: u64,
    pub window_events: u64,
    pub display_events: u64,
    pub cursor_events: u64,
    pub capture_events: u64,
}

pub type MouseCallback = Box<dyn FnMut(&MouseState) + Send>;
pub type KeyboardCallback = Box<dyn FnMut(&KeyboardState) + Send>;
pub type WindowCallback = Box<dyn FnMut(&WindowInfo, WindowChange) + Send>;
pub type DisplayCallback = Box<dyn FnMut(&DisplayInfo, DisplayChange) + Send>;
pub type CursorCallback = Box<dyn FnMut(&CursorInfo) + Send>;

#[derive(Default)]
struct Callbacks {
    mouse: Option<MouseCallback>,
    keyboard: Option<KeyboardCallback>,
    window: Option<WindowCallback>,
    display: Option<DisplayCallback>,
    cursor: Option<CursorCallback>,
}

#[derive(Debug, Default)]
struct Snapshot {
    mouse: MouseState,
    keyboard: KeyboardState,
    displays: Vec<DisplayInfo>,
    metrics: SystemMetrics,
    windows: Vec<WindowInfo>,
    cursor: CursorInfo,
    mouse_trail: VecDeque<Point>,
    cursor_path: VecDeque<Point>,
    key_sequence: VecDeque<u32>,
    last_update: Option<Instant>,
    last_mouse_move: Option<Instant>,
    /// Last press per button, for click counting
    last_press: [Option<(Instant, Point)>; 5],
    typing_started: Option<Instant>,
    chars_typed: usize,
    capture_sequence: u64,
    stats: ReaderStats,
    update_time_total: Duration,
}

fn push_capped<T>(queue: &mut VecDeque<T>, value: T, cap: usize) {
    queue.push_back(value);
    while queue.len() > cap {
        queue.pop_front();
    }
}

fn tail<T: Copy>(queue: &VecDeque<T>, max: usize) -> Vec<T> {
    let skip = queue.len().saturating_sub(max);
    queue.iter().skip(skip).copied().collect()
}

/// Samples the desktop through its collaborators
pub struct Reader {
    platform: Box<dyn PlatformQuery>,
    capture: Arc<dyn CaptureProvider>,
    ocr: Arc<dyn OcrProvider>,
    clock: SharedClock,
    settings: ReaderSettings,
    snapshot: Snapshot,
    callbacks: Callbacks,
    subscribers: EventFanout,
    initialized: bool,
    monitoring: bool,
}

impl Reader {
    pub fn new(
        platform: Box<dyn PlatformQuery>,
        capture: Arc<dyn CaptureProvider>,
        ocr: Arc<dyn OcrProvider>,
        clock: SharedClock,
    ) -> Self {
        Self {
            platform,
            capture,
            ocr,
            clock,
            settings: ReaderSettings::default(),
            snapshot: Snapshot::default(),
            callbacks: Callbacks::default(),
            subscribers: EventFanout::default(),
            initialized: false,
            monitoring: false,
        }
    }

    pub fn with_settings(mut self, settings: ReaderSettings) -> Self {
        self.settings = settings;
        self
    }

    // ---- lifecycle ----

    /// Populate the initial display, window and metrics snapshot.
    ///
    /// Calling it again is a no-op.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            debug!("Reader already initialized");
            return Ok(());
        }
        if !self.platform.is_available() {
            warn!("Reader initialization failed: platform unavailable");
            return Err(ReaderError::PlatformUnavailable);
        }

        let now = self.clock.now();
        self.snapshot = Snapshot::default();
        self.snapshot.displays = self.platform.displays();
        self.snapshot.metrics = self.platform.system_metrics();
        self.snapshot.windows = self.platform.windows();
        self.snapshot.cursor = self.platform.cursor();
        self.snapshot.mouse.position = self.snapshot.cursor.position;
        self.snapshot.mouse.previous_position = self.snapshot.cursor.position;
        self.snapshot.last_mouse_move = Some(now);

        if !display::has_single_primary(&self.snapshot.displays) {
            warn!(
                "Platform reported {} displays without exactly one primary",
                self.snapshot.displays.len()
            );
        }

        self.initialized = true;
        info!(
            "Reader initialized: {} displays, {} windows",
            self.snapshot.displays.len(),
            self.snapshot.windows.len()
        );
        Ok(())
    }

    pub fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }
        self.monitoring = false;
        self.snapshot = Snapshot::default();
        self.initialized = false;
        info!("Reader shut down");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn start_monitoring(&mut self) {
        if !self.monitoring {
            debug!("Reader monitoring started");
        }
        self.monitoring = true;
    }

    pub fn stop_monitoring(&mut self) {
        if self.monitoring {
            debug!("Reader monitoring stopped");
        }
        self.monitoring = false;
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring
    }

    /// Sets the tick floor; values under 16 ms are raised to 16 ms
    pub fn set_update_interval(&mut self, ms: u64) {
        self.settings.poll_interval_ms = ms.max(default_poll_interval_ms());
    }

    pub fn set_update_rate(&mut self, hz: f32) {
        if hz > 0.0 {
            self.set_update_interval((1000.0 / hz) as u64);
        }
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.settings.poll_interval_ms.max(default_poll_interval_ms()))
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    // ---- tracking toggles ----

    pub fn set_mouse_tracking_enabled(&mut self, enabled: bool) {
        self.settings.mouse_tracking = enabled;
    }

    pub fn set_keyboard_tracking_enabled(&mut self, enabled: bool) {
        self.settings.keyboard_tracking = enabled;
    }

    pub fn set_window_tracking_enabled(&mut self, enabled: bool) {
        self.settings.window_tracking = enabled;
    }

    pub fn set_display_tracking_enabled(&mut self, enabled: bool) {
        self.settings.display_tracking = enabled;
    }

    pub fn set_cursor_tracking_enabled(&mut self, enabled: bool) {
        self.settings.cursor_tracking = enabled;
    }

    // ---- callbacks and subscription ----

    pub fn set_mouse_callback(&mut self, callback: impl FnMut(&MouseState) + Send + 'static) {
        self.callbacks.mouse = Some(Box::new(callback));
    }

    pub fn set_keyboard_callback(&mut self, callback: impl FnMut(&KeyboardState) + Send + 'static) {
        self.callbacks.keyboard = Some(Box::new(callback));
    }

    pub fn set_window_callback(&mut self, callback: impl FnMut(&WindowInfo, WindowChange) + Send + 'static) {
        self.callbacks.window = Some(Box::new(callback));
    }

    pub fn set_display_callback(&mut self, callback: impl FnMut(&DisplayInfo, DisplayChange) + Send + 'static) {
        self.callbacks.display = Some(Box::new(callback));
    }

    pub fn set_cursor_callback(&mut self, callback: impl FnMut(&CursorInfo) + Send + 'static) {
        self.callbacks.cursor = Some(Box::new(callback));
    }

    pub fn clear_callbacks(&mut self) {
        self.callbacks = Callbacks::default();
    }

    /// Receive every change event produced from now on
    pub fn subscribe(&mut self) -> Receiver<ReaderEvent> {
        self.subscribers.subscribe()
    }

    // ---- sampling ----

    /// Run one sampling tick.
    ///
    /// Returns false without touching any state when not initialized, not
    /// monitoring, or called again before the poll floor has elapsed.
    pub fn update(&mut self) -> bool {
        if !self.initialized || !self.monitoring {
            return false;
        }

        let now = self.clock.now();
        if let Some(last) = self.snapshot.last_update {
            if now.saturating_duration_since(last) < self.update_interval() {
                return false;
            }
        }
        self.snapshot.last_update = Some(now);

        let started = Instant::now();
        if self.settings.mouse_tracking {
            self.process_mouse(now);
        }
        if self.settings.keyboard_tracking {
            self.process_keyboard(now);
        }
        if self.settings.window_tracking {
            self.process_windows();
        }
        if self.settings.display_tracking {
            self.refresh_system_metrics();
        }
        if self.settings.cursor_tracking {
            self.process_cursor();
        }
        self.update_stats(started.elapsed());
        true
    }

    fn process_mouse(&mut self, now: Instant) {
        let sample = self.platform.poll_mouse();
        let previous = &self.snapshot.mouse;
        let metrics = &self.snapshot.metrics;

        let mut state = MouseState {
            position: sample.position,
            previous_position: previous.position,
            velocity: 0.0,
            buttons: previous.buttons,
            wheel_delta: sample.wheel_delta,
            horizontal_wheel_delta: sample.horizontal_wheel_delta,
            timestamp: Some(now),
        };

        if let Some(last) = previous.timestamp {
            let dt = now.saturating_duration_since(last).as_secs_f32();
            if dt > 0.0 {
                state.velocity = sample.position.distance_to(previous.position) / dt;
            }
        }

        let mut buttons_changed = false;
        for button in MouseButton::ALL {
            let i = button.index();
            let slot = &mut state.buttons[i];
            slot.was_pressed = slot.pressed;
            slot.pressed = sample.buttons[i];

            if slot.pressed != slot.was_pressed {
                buttons_changed = true;
            }
            if slot.is_just_pressed() {
                let within_time = self.snapshot.last_press[i]
                    .map(|(at, pos)| {
                        now.saturating_duration_since(at)
                            <= Duration::from_millis(metrics.double_click_time_ms)
                            && (pos.x - sample.position.x).abs() <= metrics.double_click_size.width
                            && (pos.y - sample.position.y).abs() <= metrics.double_click_size.height
                    })
                    .unwrap_or(false);
                slot.click_count = if within_time { slot.click_count + 1 } else { 1 };
                slot.press_time = Some(now);
                slot.press_position = sample.position;
                self.snapshot.last_press[i] = Some((now, sample.position));
            }
        }

        let moved = state.position != state.previous_position;
        if moved {
            let cap = self.settings.trail_cap();
            push_capped(&mut self.snapshot.mouse_trail, state.position, cap);
            self.snapshot.last_mouse_move = Some(now);
        }

        let changed = moved || buttons_changed || sample.wheel_delta != 0 || sample.horizontal_wheel_delta != 0;
        self.snapshot.mouse = state;
        if changed {
            trace!("Mouse at {}", self.snapshot.mouse.position);
        }

        // published every tick so held buttons and idle pointers stay visible
        self.snapshot.stats.mouse_events += 1;
        self.snapshot.stats.events_processed += 1;
        if let Some(callback) = self.callbacks.mouse.as_mut() {
            callback(&self.snapshot.mouse);
        }
        self.subscribers
            .publish(&ReaderEvent::Mouse(self.snapshot.mouse.clone()));
    }

    fn process_keyboard(&mut self, now: Instant) {
        let sample = self.platform.poll_keyboard();
        let keyboard = &mut self.snapshot.keyboard;

        for key in keyboard.keys.values_mut() {
            key.was_pressed = key.pressed;
        }

        for event in &sample.events {
            let key = keyboard.keys.entry(event.key_code).or_insert_with(|| KeyState {
                key_code: event.key_code,
                ..KeyState::default()
            });
            if event.pressed {
                if !key.pressed {
                    key.press_time = Some(now);
                    push_capped(
                        &mut self.snapshot.key_sequence,
                        event.key_code,
                        self.settings.key_sequence_capacity.max(1),
                    );
                }
                key.pressed = true;
            } else {
                key.pressed = false;
                key.release_time = Some(now);
            }
        }

        keyboard.new_text = sample.typed_text.clone();
        if !sample.typed_text.is_empty() {
            keyboard.last_typed_text = sample.typed_text.clone();
            self.snapshot.chars_typed += sample.typed_text.chars().count();
            self.snapshot.typing_started.get_or_insert(now);
        }

        let ime_changed = keyboard.current_input_text != sample.ime_text;
        keyboard.current_input_text = sample.ime_text.clone();
        keyboard.modifier_keys = keyboard
            .keys
            .values()
            .filter(|k| k.pressed && keys::is_modifier(k.key_code))
            .map(|k| k.key_code)
            .collect();
        keyboard.timestamp = Some(now);

        if !sample.is_empty() || ime_changed {
            trace!("Keyboard: {} key events, {} chars", sample.events.len(), sample.typed_text.len());
        }

        self.snapshot.stats.keyboard_events += 1;
        self.snapshot.stats.events_processed += 1;
        if let Some(callback) = self.callbacks.keyboard.as_mut() {
            callback(&self.snapshot.keyboard);
        }
        self.subscribers
            .publish(&ReaderEvent::Keyboard(self.snapshot.keyboard.clone()));
    }

    fn process_windows(&mut self) {
        let current = self.platform.windows();
        let previous = std::mem::take(&mut self.snapshot.windows);
        let mut changes = Vec::new();

        for window in &current {
            match previous.iter().find(|w| w.handle == window.handle) {
                None => changes.push((window.clone(), WindowChange::Opened)),
                Some(old) => {
                    if window.is_focused && !old.is_focused {
                        changes.push((window.clone(), WindowChange::Focused));
                    }
                    if window.bounds != old.bounds {
                        changes.push((window.clone(), WindowChange::Moved));
                    }
                }
            }
        }
        for old in &previous {
            if !current.iter().any(|w| w.handle == old.handle) {
                changes.push((old.clone(), WindowChange::Closed));
            }
        }

        self.snapshot.windows = current;
        for (window, change) in changes {
            debug!("Window {:?}: {} ({})", change, window.title, window.handle);
            self.snapshot.stats.window_events += 1;
            self.snapshot.stats.events_processed += 1;
            if let Some(callback) = self.callbacks.window.as_mut() {
                callback(&window, change);
            }
            self.subscribers.publish(&ReaderEvent::Window { window, change });
        }
    }

    fn process_cursor(&mut self) {
        let cursor = self.platform.cursor();
        if cursor == self.snapshot.cursor {
            return;
        }

        if cursor.position != self.snapshot.cursor.position {
            let cap = self.settings.trail_cap();
            push_capped(&mut self.snapshot.cursor_path, cursor.position, cap);
        }
        self.snapshot.cursor = cursor;
        self.snapshot.stats.cursor_events += 1;
        self.snapshot.stats.events_processed += 1;
        if let Some(callback) = self.callbacks.cursor.as_mut() {
            callback(&self.snapshot.cursor);
        }
        self.subscribers
            .publish(&ReaderEvent::Cursor(self.snapshot.cursor.clone()));
    }

    /// Re-read displays and metrics, reporting display changes
    pub fn refresh_system_metrics(&mut self) {
        if !self.initialized {
            return;
        }

        let current = self.platform.displays();
        let previous = std::mem::take(&mut self.snapshot.displays);
        let mut changes = Vec::new();

        for display in &current {
            match previous.iter().find(|d| d.display_id == display.display_id) {
                None => changes.push((display.clone(), DisplayChange::Added)),
                Some(old) if old != display => changes.push((display.clone(), DisplayChange::Changed)),
                Some(_) => {}
            }
        }
        for old in &previous {
            if !current.iter().any(|d| d.display_id == old.display_id) {
                changes.push((old.clone(), DisplayChange::Removed));
            }
        }

        self.snapshot.displays = current;
        self.snapshot.metrics = self.platform.system_metrics();

        for (display, change) in changes {
            info!("Display {:?}: {}", change, display);
            self.snapshot.stats.display_events += 1;
            self.snapshot.stats.events_processed += 1;
            if let Some(callback) = self.callbacks.display.as_mut() {
                callback(&display, change);
            }
            self.subscribers.publish(&ReaderEvent::Display { display, change });
        }
    }

    fn update_stats(&mut self, elapsed: Duration) {
        let stats = &mut self.snapshot.stats;
        stats.updates += 1;
        self.snapshot.update_time_total += elapsed;
        stats.average_update_ms =
            self.snapshot.update_time_total.as_secs_f32() * 1000.0 / stats.updates as f32;
        stats.memory_usage = (self.snapshot.mouse_trail.len() + self.snapshot.cursor_path.len())
            * std::mem::size_of::<Point>()
            + self.snapshot.key_sequence.len() * std::mem::size_of::<u32>()
            + self.snapshot.windows.len() * std::mem::size_of::<WindowInfo>()
            + self.snapshot.displays.len() * std::mem::size_of::<DisplayInfo>();
    }

    pub fn reader_stats(&self) -> ReaderStats {
        self.snapshot.stats.clone()
    }

    pub fn reset_reader_stats(&mut self) {
        self.snapshot.stats = ReaderStats::default();
        self.snapshot.update_time_total = Duration::ZERO;
    }

    // ---- mouse queries ----

    pub fn current_mouse_state(&self) -> MouseState {
        self.snapshot.mouse.clone()
    }

    pub fn mouse_position(&self) -> Point {
        self.snapshot.mouse.position
    }

    /// Per-axis pixels per second from the last two samples
    pub fn mouse_velocity(&self) -> Point {
        let mouse = &self.snapshot.mouse;
        let delta = mouse.position - mouse.previous_position;
        let length = mouse.movement();
        if length == 0.0 {
            return Point::default();
        }
        Point::new(
            (delta.x as f32 / length * mouse.velocity) as i32,
            (delta.y as f32 / length * mouse.velocity) as i32,
        )
    }

    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.snapshot.mouse.is_pressed(button)
    }

    pub fn was_mouse_button_just_pressed(&self, button: MouseButton) -> bool {
        self.snapshot.mouse.button(button).is_just_pressed()
    }

    pub fn was_mouse_button_just_released(&self, button: MouseButton) -> bool {
        self.snapshot.mouse.button(button).is_just_released()
    }

    /// How long the button has been held; zero when released
    pub fn mouse_button_press_duration(&self, button: MouseButton) -> Duration {
        let state = self.snapshot.mouse.button(button);
        match (state.pressed, state.press_time) {
            (true, Some(at)) => self.clock.now().saturating_duration_since(at),
            _ => Duration::ZERO,
        }
    }

    /// Up to `max_points` most recent trail points, oldest first
    pub fn mouse_trail(&self, max_points: usize) -> Vec<Point> {
        tail(&self.snapshot.mouse_trail, max_points)
    }

    pub fn mouse_trail_len(&self) -> usize {
        self.snapshot.mouse_trail.len()
    }

    pub fn clear_mouse_trail(&mut self) {
        self.snapshot.mouse_trail.clear();
    }

    /// No pointer movement for longer than `idle_for`
    pub fn is_mouse_idle(&self, idle_for: Duration) -> bool {
        match self.snapshot.last_mouse_move {
            Some(at) => self.clock.now().saturating_duration_since(at) > idle_for,
            None => true,
        }
    }

    /// Bounding box of the trail
    pub fn mouse_movement_bounds(&self) -> Rectangle {
        let points: Vec<Point> = self.snapshot.mouse_trail.iter().copied().collect();
        bounding_rect(&points)
    }

    // ---- keyboard queries ----

    pub fn current_keyboard_state(&self) -> KeyboardState {
        self.snapshot.keyboard.clone()
    }

    pub fn is_key_pressed(&self, key_code: u32) -> bool {
        self.snapshot.keyboard.is_key_pressed(key_code)
    }

    pub fn was_key_just_pressed(&self, key_code: u32) -> bool {
        self.snapshot.keyboard.is_key_just_pressed(key_code)
    }

    pub fn was_key_just_released(&self, key_code: u32) -> bool {
        self.snapshot.keyboard.is_key_just_released(key_code)
    }

    pub fn last_typed_text(&self) -> String {
        self.snapshot.keyboard.last_typed_text.clone()
    }

    /// Uncommitted IME composition
    pub fn current_input_text(&self) -> String {
        self.snapshot.keyboard.current_input_text.clone()
    }

    /// Up to `max_keys` most recent key presses, oldest first
    pub fn key_sequence(&self, max_keys: usize) -> Vec<u32> {
        tail(&self.snapshot.key_sequence, max_keys)
    }

    /// Words per minute since the first typed character (5 chars per word)
    pub fn typing_speed(&self) -> f32 {
        let Some(started) = self.snapshot.typing_started else {
            return 0.0;
        };
        let minutes = self.clock.now().saturating_duration_since(started).as_secs_f32() / 60.0;
        if minutes <= 0.0 {
            return 0.0;
        }
        (self.snapshot.chars_typed as f32 / 5.0) / minutes
    }

    /// Every key in `combo` is currently held
    pub fn detect_keyboard_shortcut(&self, combo: &[u32]) -> bool {
        !combo.is_empty() && combo.iter().all(|k| self.is_key_pressed(*k))
    }

    // ---- displays ----

    pub fn displays(&self) -> Vec<DisplayInfo> {
        self.snapshot.displays.clone()
    }

    pub fn primary_display(&self) -> DisplayInfo {
        display::primary_display(&self.snapshot.displays)
            .cloned()
            .unwrap_or_default()
    }

    /// Display under `point`, falling back to the primary
    pub fn display_at(&self, point: Point) -> DisplayInfo {
        self.snapshot
            .displays
            .iter()
            .find(|d| d.bounds.contains(point))
            .cloned()
            .unwrap_or_else(|| self.primary_display())
    }

    /// Display with the largest overlap with `rect`, falling back to the primary
    pub fn display_containing(&self, rect: Rectangle) -> DisplayInfo {
        self.snapshot
            .displays
            .iter()
            .map(|d| (d, d.bounds.intersection(&rect).area()))
            .filter(|(_, area)| *area > 0)
            .max_by_key(|(_, area)| *area)
            .map(|(d, _)| d.clone())
            .unwrap_or_else(|| self.primary_display())
    }

    pub fn virtual_screen_size(&self) -> Size {
        self.virtual_screen_bounds().size()
    }

    pub fn virtual_screen_bounds(&self) -> Rectangle {
        display::virtual_bounds(&self.snapshot.displays)
    }

    pub fn system_metrics(&self) -> SystemMetrics {
        self.snapshot.metrics.clone()
    }

    fn display_or_primary(&self, display_id: Option<u32>) -> DisplayInfo {
        display_id
            .and_then(|id| self.snapshot.displays.iter().find(|d| d.display_id == id).cloned())
            .unwrap_or_else(|| self.primary_display())
    }

    /// Scaling factor of a display; `None` means the primary
    pub fn display_scaling(&self, display_id: Option<u32>) -> f32 {
        self.display_or_primary(display_id).scaling_factor
    }

    pub fn dpi(&self, display_id: Option<u32>) -> Size {
        let display = self.display_or_primary(display_id);
        Size::new(display.dpi_x as i32, display.dpi_y as i32)
    }

    // ---- windows ----

    pub fn visible_windows(&self) -> Vec<WindowInfo> {
        self.snapshot
            .windows
            .iter()
            .filter(|w| w.is_visible && !w.is_minimized)
            .cloned()
            .collect()
    }

    pub fn all_windows(&self) -> Vec<WindowInfo> {
        self.snapshot.windows.clone()
    }

    /// Focused window, or a default (handle 0) when none
    pub fn active_window(&self) -> WindowInfo {
        self.snapshot
            .windows
            .iter()
            .find(|w| w.is_focused)
            .cloned()
            .unwrap_or_default()
    }

    /// Topmost visible window under `point`; the list is back-to-front
    pub fn window_at(&self, point: Point) -> WindowInfo {
        self.snapshot
            .windows
            .iter()
            .rev()
            .find(|w| w.is_visible && !w.is_minimized && w.contains_point(point))
            .cloned()
            .unwrap_or_default()
    }

    pub fn window_by_title(&self, title: &str) -> WindowInfo {
        self.find_window(|w| w.title == title)
    }

    pub fn window_by_class_name(&self, class_name: &str) -> WindowInfo {
        self.find_window(|w| w.class_name == class_name)
    }

    pub fn window_by_process_id(&self, process_id: u32) -> WindowInfo {
        self.find_window(|w| w.process_id == process_id)
    }

    pub fn window_by_handle(&self, handle: u64) -> Option<WindowInfo> {
        self.snapshot.windows.iter().find(|w| w.handle == handle).cloned()
    }

    fn find_window(&self, predicate: impl Fn(&WindowInfo) -> bool) -> WindowInfo {
        self.snapshot
            .windows
            .iter()
            .find(|w| predicate(w))
            .cloned()
            .unwrap_or_default()
    }

    // ---- cursor ----

    pub fn current_cursor(&self) -> CursorInfo {
        self.snapshot.cursor.clone()
    }

    pub fn is_cursor_visible(&self) -> bool {
        self.initialized && self.snapshot.cursor.is_visible
    }

    pub fn cursor_hotspot(&self) -> Point {
        self.snapshot.cursor.hotspot
    }

    pub fn cursor_path(&self, max_points: usize) -> Vec<Point> {
        tail(&self.snapshot.cursor_path, max_points)
    }

    pub fn is_cursor_over_window(&self, handle: u64) -> bool {
        self.window_by_handle(handle)
            .map(|w| w.contains_point(self.snapshot.cursor.position))
            .unwrap_or(false)
    }

    // ---- capture ----

    /// Capture `area`; an empty area means the primary display
    pub fn capture_screen(&mut self, area: Rectangle) -> Result<ScreenCapture> {
        if !self.initialized {
            return Err(ReaderError::NotInitialized);
        }

        let area = if area.is_empty() {
            self.primary_display().bounds
        } else {
            area
        };
        if area.is_empty() {
            return Err(ReaderError::InvalidArea(area));
        }

        let timestamp = self.clock.now();
        let pixels = self.capture.capture_pixels(area);
        self.snapshot.capture_sequence += 1;
        let capture = ScreenCapture::from_pixels(area, pixels, timestamp, self.snapshot.capture_sequence)
            .ok_or_else(|| ReaderError::CaptureFailed(format!("provider returned no pixels for {}", area)))?;

        self.snapshot.stats.capture_events += 1;
        trace!("Captured {}", capture);
        Ok(capture)
    }

    pub fn capture_window(&mut self, handle: u64) -> Result<ScreenCapture> {
        let window = self
            .window_by_handle(handle)
            .ok_or(ReaderError::WindowNotFound(handle))?;
        self.capture_region(window.bounds)
    }

    /// Like `capture_screen` but an empty region is an error
    pub fn capture_region(&mut self, region: Rectangle) -> Result<ScreenCapture> {
        if region.is_empty() {
            return Err(ReaderError::InvalidArea(region));
        }
        self.capture_screen(region)
    }

    // ---- content analysis ----

    /// Text regions inside `area`; empty on any failure
    pub fn detect_text_regions(&mut self, area: Rectangle) -> Vec<Rectangle> {
        match self.capture_screen(area) {
            Ok(capture) => self.ocr.find_text_regions(&capture),
            Err(e) => {
                warn!("Text region detection skipped: {}", e);
                Vec::new()
            }
        }
    }

    pub fn extract_text_from_region(&self, region: Rectangle) -> String {
        if !self.initialized {
            return String::new();
        }
        self.ocr.extract_text(region)
    }

    // ---- settings ----

    pub fn save_settings(&self, storage: &dyn Storage, key: &str) -> Result<()> {
        let data = serde_json::to_vec_pretty(&self.settings).map_err(StorageError::from)?;
        storage.save(key, &data)?;
        debug!("Reader settings saved to {}", key);
        Ok(())
    }

    pub fn load_settings(&mut self, storage: &dyn Storage, key: &str) -> Result<()> {
        let data = storage.load(key)?;
        let settings: ReaderSettings = serde_json::from_slice(&data).map_err(StorageError::from)?;
        settings
            .validate()
            .map_err(|msg| ReaderError::Storage(StorageError::Format(msg)))?;
        self.settings = settings;
        debug!("Reader settings loaded from {}", key);
        Ok(())
    }
}
