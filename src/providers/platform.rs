//! Platform query boundary and a scriptable simulated desktop

use crate::display::{CursorInfo, DisplayInfo, SystemMetrics, WindowInfo};
use crate::geometry::{Point, Rectangle, Size};
use crate::input::MouseButton;
use log::debug;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Raw pointer sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseSample {
    pub position: Point,
    /// Indexed by `MouseButton::index`
    pub buttons: [bool; 5],
    pub wheel_delta: i32,
    pub horizontal_wheel_delta: i32,
}

impl MouseSample {
    pub fn at(x: i32, y: i32) -> Self {
        Self {
            position: Point::new(x, y),
            ..Self::default()
        }
    }

    pub fn with_button(mut self, button: MouseButton, pressed: bool) -> Self {
        self.buttons[button.index()] = pressed;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key_code: u32,
    pub pressed: bool,
}

/// Keyboard activity since the previous poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyboardSample {
    pub events: Vec<KeyEvent>,
    /// Committed text typed since the previous poll
    pub typed_text: String,
    /// Current IME composition
    pub ime_text: String,
}

impl KeyboardSample {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.typed_text.is_empty()
    }
}

/// Queries the host desktop.
///
/// `poll_*` return the current state; repeated polls without input return
/// the same pointer sample and an empty keyboard sample.
pub trait PlatformQuery: Send {
    fn is_available(&self) -> bool;
    fn displays(&self) -> Vec<DisplayInfo>;
    fn system_metrics(&self) -> SystemMetrics;
    fn windows(&self) -> Vec<WindowInfo>;
    fn poll_mouse(&mut self) -> MouseSample;
    fn poll_keyboard(&mut self) -> KeyboardSample;
    fn cursor(&self) -> CursorInfo;
}

#[derive(Debug)]
struct SimulatedState {
    available: bool,
    displays: Vec<DisplayInfo>,
    windows: Vec<WindowInfo>,
    mouse_queue: VecDeque<MouseSample>,
    mouse: MouseSample,
    key_events: Vec<KeyEvent>,
    typed_text: String,
    ime_text: String,
    cursor: CursorInfo,
}

/// In-memory desktop: one 1920x1080 primary display, a desktop window and
/// a focused editor window. Clones share state, so a test keeps one handle
/// to script input while the reader owns another.
#[derive(Debug, Clone)]
pub struct SimulatedPlatform {
    state: Arc<Mutex<SimulatedState>>,
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPlatform {
    pub fn new() -> Self {
        let primary = DisplayInfo {
            display_id: 0,
            device_name: "SIM-0".to_string(),
            manufacturer_name: "Simulated".to_string(),
            bounds: Rectangle::new(0, 0, 1920, 1080),
            work_area: Rectangle::new(0, 0, 1920, 1040),
            is_primary: true,
            ..DisplayInfo::default()
        };
        let windows = vec![
            WindowInfo {
                handle: 1,
                title: "Desktop".to_string(),
                class_name: "Desktop".to_string(),
                process_name: "shell".to_string(),
                process_id: 100,
                bounds: Rectangle::new(0, 0, 1920, 1080),
                client_bounds: Rectangle::new(0, 0, 1920, 1080),
                is_visible: true,
                ..WindowInfo::default()
            },
            WindowInfo {
                handle: 2,
                title: "Untitled - Notepad".to_string(),
                class_name: "Notepad".to_string(),
                process_name: "notepad".to_string(),
                process_id: 200,
                bounds: Rectangle::new(100, 100, 800, 600),
                client_bounds: Rectangle::new(108, 131, 784, 561),
                is_visible: true,
                is_focused: true,
                ..WindowInfo::default()
            },
        ];

        Self {
            state: Arc::new(Mutex::new(SimulatedState {
                available: true,
                displays: vec![primary],
                windows,
                mouse_queue: VecDeque::new(),
                mouse: MouseSample::at(960, 540),
                key_events: Vec::new(),
                typed_text: String::new(),
                ime_text: String::new(),
                cursor: CursorInfo {
                    position: Point::new(960, 540),
                    ..CursorInfo::default()
                },
            })),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.state.lock().available = available;
    }

    pub fn set_displays(&self, displays: Vec<DisplayInfo>) {
        self.state.lock().displays = displays;
    }

    /// Add a second display to the right of the existing ones
    pub fn add_display(&self, size: Size) -> u32 {
        let mut state = self.state.lock();
        let right = state.displays.iter().map(|d| d.bounds.right()).max().unwrap_or(0);
        let id = state.displays.len() as u32;
        let bounds = Rectangle::new(right, 0, size.width, size.height);
        state.displays.push(DisplayInfo {
            display_id: id,
            device_name: format!("SIM-{}", id),
            bounds,
            work_area: bounds,
            ..DisplayInfo::default()
        });
        id
    }

    /// Queue a pointer sample; each poll consumes one
    pub fn push_mouse(&self, sample: MouseSample) {
        self.state.lock().mouse_queue.push_back(sample);
    }

    /// Queue a move keeping current button state
    pub fn move_mouse(&self, x: i32, y: i32) {
        let mut state = self.state.lock();
        let mut sample = state.mouse_queue.back().copied().unwrap_or(state.mouse);
        sample.position = Point::new(x, y);
        state.mouse_queue.push_back(sample);
    }

    /// Queue a button change at the current position
    pub fn set_button(&self, button: MouseButton, pressed: bool) {
        let mut state = self.state.lock();
        let sample = state
            .mouse_queue
            .back()
            .copied()
            .unwrap_or(state.mouse)
            .with_button(button, pressed);
        state.mouse_queue.push_back(sample);
    }

    pub fn press_key(&self, key_code: u32) {
        self.state.lock().key_events.push(KeyEvent { key_code, pressed: true });
    }

    pub fn release_key(&self, key_code: u32) {
        self.state.lock().key_events.push(KeyEvent { key_code, pressed: false });
    }

    pub fn type_text(&self, text: &str) {
        self.state.lock().typed_text.push_str(text);
    }

    pub fn set_ime_text(&self, text: &str) {
        self.state.lock().ime_text = text.to_string();
    }

    pub fn set_windows(&self, windows: Vec<WindowInfo>) {
        self.state.lock().windows = windows;
    }

    pub fn open_window(&self, window: WindowInfo) {
        debug!("Simulated window opened: {}", window.title);
        self.state.lock().windows.push(window);
    }

    pub fn close_window(&self, handle: u64) {
        self.state.lock().windows.retain(|w| w.handle != handle);
    }

    pub fn focus_window(&self, handle: u64) {
        for window in self.state.lock().windows.iter_mut() {
            window.is_focused = window.handle == handle;
        }
    }

    pub fn set_cursor(&self, cursor: CursorInfo) {
        self.state.lock().cursor = cursor;
    }

    pub fn pending_mouse_samples(&self) -> usize {
        self.state.lock().mouse_queue.len()
    }
}

impl PlatformQuery for SimulatedPlatform {
    fn is_available(&self) -> bool {
        self.state.lock().available
    }

    fn displays(&self) -> Vec<DisplayInfo> {
        self.state.lock().displays.clone()
    }

    fn system_metrics(&self) -> SystemMetrics {
        let state = self.state.lock();
        let primary = crate::display::primary_display(&state.displays)
            .map(|d| d.bounds.size())
            .unwrap_or_default();
        SystemMetrics {
            primary_screen_size: primary,
            virtual_screen_size: crate::display::virtual_bounds(&state.displays).size(),
            display_count: state.displays.len() as u32,
            ..SystemMetrics::default()
        }
    }

    fn windows(&self) -> Vec<WindowInfo> {
        self.state.lock().windows.clone()
    }

    fn poll_mouse(&mut self) -> MouseSample {
        let mut state = self.state.lock();
        let Some(next) = state.mouse_queue.pop_front() else {
            return state.mouse;
        };
        // wheel deltas are one-shot; the resting sample keeps position and buttons
        state.mouse = MouseSample {
            wheel_delta: 0,
            horizontal_wheel_delta: 0,
            ..next
        };
        state.cursor.position = next.position;
        next
    }

    fn poll_keyboard(&mut self) -> KeyboardSample {
        let mut state = self.state.lock();
        KeyboardSample {
            events: std::mem::take(&mut state.key_events),
            typed_text: std::mem::take(&mut state.typed_text),
            ime_text: state.ime_text.clone(),
        }
    }

    fn cursor(&self) -> CursorInfo {
        self.state.lock().cursor.clone()
    }
}
