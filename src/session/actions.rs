//! User action recording and timed playback

use crate::geometry::Point;
use crate::input::MouseButton;
use crate::writer::Annotation;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    MouseMove,
    MouseClick,
    KeyPress,
    Annotation,
    Wait,
}

/// One logged action; `offset_ms` counts from the start of recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedAction {
    pub kind: ActionKind,
    pub offset_ms: u64,
    #[serde(default)]
    pub position: Point,
    #[serde(default)]
    pub button: Option<MouseButton>,
    #[serde(default)]
    pub key_code: u32,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub annotation: Option<Annotation>,
    #[serde(default)]
    pub wait_ms: u64,
}

impl RecordedAction {
    fn new(kind: ActionKind, offset_ms: u64) -> Self {
        Self {
            kind,
            offset_ms,
            position: Point::default(),
            button: None,
            key_code: 0,
            text: String::new(),
            annotation: None,
            wait_ms: 0,
        }
    }

    pub fn mouse_move(offset_ms: u64, position: Point) -> Self {
        Self {
            position,
            ..Self::new(ActionKind::MouseMove, offset_ms)
        }
    }

    pub fn click(offset_ms: u64, position: Point, button: MouseButton) -> Self {
        Self {
            position,
            button: Some(button),
            ..Self::new(ActionKind::MouseClick, offset_ms)
        }
    }

    pub fn key_press(offset_ms: u64, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::new(ActionKind::KeyPress, offset_ms)
        }
    }

    pub fn annotation(offset_ms: u64, annotation: Annotation) -> Self {
        Self {
            position: annotation.points.first().copied().unwrap_or_default(),
            annotation: Some(annotation),
            ..Self::new(ActionKind::Annotation, offset_ms)
        }
    }

    pub fn wait(offset_ms: u64, wait_ms: u64) -> Self {
        Self {
            wait_ms,
            ..Self::new(ActionKind::Wait, offset_ms)
        }
    }
}

/// Appends actions while recording is on
#[derive(Debug, Default)]
pub struct ActionRecorder {
    started: Option<Instant>,
    actions: Vec<RecordedAction>,
}

impl ActionRecorder {
    /// Start a fresh recording; no-op when already recording
    pub fn start(&mut self, now: Instant) {
        if self.started.is_none() {
            self.started = Some(now);
            self.actions.clear();
        }
    }

    pub fn stop(&mut self) {
        self.started = None;
    }

    pub fn is_recording(&self) -> bool {
        self.started.is_some()
    }

    /// Build and append an action stamped with the current offset
    pub fn record(&mut self, now: Instant, build: impl FnOnce(u64) -> RecordedAction) -> bool {
        let Some(started) = self.started else {
            return false;
        };
        let offset = now.saturating_duration_since(started).as_millis() as u64;
        self.actions.push(build(offset));
        true
    }

    pub fn actions(&self) -> &[RecordedAction] {
        &self.actions
    }

    /// Replace the log, as after loading a script
    pub fn replace(&mut self, mut actions: Vec<RecordedAction>) {
        actions.sort_by_key(|a| a.offset_ms);
        self.actions = actions;
    }
}

/// Non-blocking replay: `due` hands out actions whose scaled offset has
/// passed
#[derive(Debug, Clone)]
pub struct Playback {
    actions: Vec<RecordedAction>,
    speed: f32,
    started: Instant,
    next: usize,
}

impl Playback {
    /// Speeds at or below zero fall back to real time
    pub fn new(mut actions: Vec<RecordedAction>, speed: f32, now: Instant) -> Self {
        actions.sort_by_key(|a| a.offset_ms);
        let speed = if speed.is_finite() && speed > 0.0 { speed } else { 1.0 };
        Self {
            actions,
            speed,
            started: now,
            next: 0,
        }
    }

    pub fn due(&mut self, now: Instant) -> Vec<RecordedAction> {
        let elapsed = now.saturating_duration_since(self.started);
        let mut due = Vec::new();
        while let Some(action) = self.actions.get(self.next) {
            let at = Duration::from_millis(action.offset_ms).div_f32(self.speed);
            if at > elapsed {
                break;
            }
            due.push(action.clone());
            self.next += 1;
        }
        due
    }

    pub fn remaining(&self) -> usize {
        self.actions.len() - self.next
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.actions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_stamps_offsets_only_while_recording() {
        let start = Instant::now();
        let mut recorder = ActionRecorder::default();
        assert!(!recorder.record(start, |t| RecordedAction::key_press(t, "a")));

        recorder.start(start);
        recorder.record(start + Duration::from_millis(250), |t| RecordedAction::key_press(t, "hi"));
        recorder.stop();
        assert!(!recorder.record(start, |t| RecordedAction::wait(t, 5)));

        assert_eq!(recorder.actions().len(), 1);
        assert_eq!(recorder.actions()[0].offset_ms, 250);
        assert_eq!(recorder.actions()[0].text, "hi");
    }

    #[test]
    fn playback_respects_speed_and_order() {
        let start = Instant::now();
        let actions = vec![
            RecordedAction::mouse_move(1000, Point::new(5, 5)),
            RecordedAction::click(0, Point::new(1, 1), MouseButton::Left),
            RecordedAction::wait(2000, 100),
        ];
        let mut playback = Playback::new(actions, 2.0, start);

        let first = playback.due(start);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].kind, ActionKind::MouseClick);

        assert_eq!(playback.due(start + Duration::from_millis(499)).len(), 0);
        assert_eq!(playback.due(start + Duration::from_millis(500)).len(), 1);
        assert_eq!(playback.remaining(), 1);
        assert_eq!(playback.due(start + Duration::from_secs(1)).len(), 1);
        assert!(playback.is_finished());
    }

    #[test]
    fn actions_serialize_as_json() {
        let action = RecordedAction::annotation(
            10,
            Annotation::new("click").with_points(vec![Point::new(3, 4)]),
        );
        let json = serde_json::to_string(&action).unwrap();
        let back: RecordedAction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, action);
        assert_eq!(back.position, Point::new(3, 4));
    }
}
