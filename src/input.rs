//! Mouse and keyboard snapshots
//!
//! Produced by the reader each poll cycle and handed to callbacks and
//! subscribers by value. "Just pressed" and "just released" are derived
//! from the current and previous sample.

use crate::geometry::Point;
use std::collections::BTreeMap;
use std::time::Instant;

/// Virtual key codes understood by the shortcut and modifier helpers
pub mod keys {
    pub const BACKSPACE: u32 = 0x08;
    pub const TAB: u32 = 0x09;
    pub const ENTER: u32 = 0x0D;
    pub const SHIFT: u32 = 0x10;
    pub const CONTROL: u32 = 0x11;
    pub const ALT: u32 = 0x12;
    pub const ESCAPE: u32 = 0x1B;
    pub const SPACE: u32 = 0x20;
    pub const KEY_A: u32 = 0x41;
    pub const KEY_C: u32 = 0x43;
    pub const KEY_S: u32 = 0x53;
    pub const KEY_V: u32 = 0x56;
    pub const KEY_Z: u32 = 0x5A;
    pub const META: u32 = 0x5B;
    pub const F1: u32 = 0x70;

    /// Codes that count as modifiers
    pub const MODIFIERS: [u32; 4] = [SHIFT, CONTROL, ALT, META];

    pub fn is_modifier(code: u32) -> bool {
        MODIFIERS.contains(&code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

impl MouseButton {
    pub const ALL: [MouseButton; 5] = [
        MouseButton::Left,
        MouseButton::Right,
        MouseButton::Middle,
        MouseButton::X1,
        MouseButton::X2,
    ];

    pub fn index(self) -> usize {
        match self {
            MouseButton::Left => 0,
            MouseButton::Right => 1,
            MouseButton::Middle => 2,
            MouseButton::X1 => 3,
            MouseButton::X2 => 4,
        }
    }
}

/// Press state of one mouse button
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ButtonState {
    pub pressed: bool,
    /// Pressed in the previous sample
    pub was_pressed: bool,
    pub press_time: Option<Instant>,
    pub press_position: Point,
    /// 1 for a single click, 2 for a double click, and so on
    pub click_count: u32,
}

impl ButtonState {
    pub fn is_just_pressed(&self) -> bool {
        self.pressed && !self.was_pressed
    }

    pub fn is_just_released(&self) -> bool {
        !self.pressed && self.was_pressed
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MouseState {
    pub position: Point,
    pub previous_position: Point,
    /// Pixels per second
    pub velocity: f32,
    pub buttons: [ButtonState; 5],
    pub wheel_delta: i32,
    pub horizontal_wheel_delta: i32,
    pub timestamp: Option<Instant>,
}

impl MouseState {
    pub fn button(&self, button: MouseButton) -> &ButtonState {
        &self.buttons[button.index()]
    }

    pub fn is_pressed(&self, button: MouseButton) -> bool {
        self.button(button).pressed
    }

    pub fn is_any_button_pressed(&self) -> bool {
        self.buttons.iter().any(|b| b.pressed)
    }

    /// Buttons that went down in this sample
    pub fn just_pressed(&self) -> impl Iterator<Item = MouseButton> + '_ {
        MouseButton::ALL
            .into_iter()
            .filter(move |b| self.button(*b).is_just_pressed())
    }

    /// Movement since the previous sample
    pub fn movement(&self) -> f32 {
        self.position.distance_to(self.previous_position)
    }

    /// A button is held and the pointer moved
    pub fn is_dragging(&self) -> bool {
        self.is_any_button_pressed() && self.position != self.previous_position
    }

    pub fn distance_to(&self, point: Point) -> f32 {
        self.position.distance_to(point)
    }

    pub fn distance_from_press(&self, button: MouseButton) -> f32 {
        let state = self.button(button);
        if state.pressed {
            self.position.distance_to(state.press_position)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyState {
    pub key_code: u32,
    pub pressed: bool,
    pub was_pressed: bool,
    pub press_time: Option<Instant>,
    pub release_time: Option<Instant>,
}

impl KeyState {
    pub fn is_just_pressed(&self) -> bool {
        self.pressed && !self.was_pressed
    }

    pub fn is_just_released(&self) -> bool {
        !self.pressed && self.was_pressed
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyboardState {
    pub keys: BTreeMap<u32, KeyState>,
    /// Most recent committed text; survives samples without typing
    pub last_typed_text: String,
    /// Text committed in this sample only
    pub new_text: String,
    /// Uncommitted IME composition text
    pub current_input_text: String,
    pub modifier_keys: Vec<u32>,
    pub timestamp: Option<Instant>,
}

impl KeyboardState {
    pub fn is_key_pressed(&self, key_code: u32) -> bool {
        self.keys.get(&key_code).map(|k| k.pressed).unwrap_or(false)
    }

    pub fn is_key_just_pressed(&self, key_code: u32) -> bool {
        self.keys
            .get(&key_code)
            .map(KeyState::is_just_pressed)
            .unwrap_or(false)
    }

    pub fn is_key_just_released(&self, key_code: u32) -> bool {
        self.keys
            .get(&key_code)
            .map(KeyState::is_just_released)
            .unwrap_or(false)
    }

    pub fn is_modifier_pressed(&self, modifier: u32) -> bool {
        self.modifier_keys.contains(&modifier)
    }

    pub fn pressed_keys(&self) -> Vec<u32> {
        self.keys
            .values()
            .filter(|k| k.pressed)
            .map(|k| k.key_code)
            .collect()
    }
}
