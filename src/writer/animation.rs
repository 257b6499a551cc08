//! Keyframe animations applied to annotations

use crate::geometry::Point;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Normalized time in [0,1]
    pub time: f32,
    pub position: Point,
    pub opacity: f32,
    pub scale: f32,
    /// Radians
    pub rotation: f32,
}

impl Default for Keyframe {
    fn default() -> Self {
        Self {
            time: 0.0,
            position: Point::default(),
            opacity: 1.0,
            scale: 1.0,
            rotation: 0.0,
        }
    }
}

impl Keyframe {
    pub fn at(time: f32, position: Point) -> Self {
        Self {
            time,
            position,
            ..Self::default()
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    /// Seconds
    duration: f32,
    /// Sorted by `time`
    keyframes: Vec<Keyframe>,
    #[serde(default)]
    elapsed: f32,
}

impl Animation {
    pub fn new(duration: f32) -> Self {
        Self {
            duration: duration.max(0.0),
            keyframes: Vec::new(),
            elapsed: 0.0,
        }
    }

    pub fn with_keyframe(mut self, keyframe: Keyframe) -> Self {
        self.add_keyframe(keyframe);
        self
    }

    pub fn add_keyframe(&mut self, keyframe: Keyframe) {
        self.keyframes.push(keyframe);
        self.keyframes
            .sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(std::cmp::Ordering::Equal));
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// State at normalized `time`, clamped to the first and last keyframes
    pub fn interpolate(&self, time: f32) -> Keyframe {
        let (Some(first), Some(last)) = (self.keyframes.first(), self.keyframes.last()) else {
            return Keyframe::default();
        };
        if self.keyframes.len() == 1 || time <= first.time {
            return *first;
        }
        if time >= last.time {
            return *last;
        }

        for pair in self.keyframes.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if time >= a.time && time <= b.time {
                let span = b.time - a.time;
                let t = if span > 0.0 { (time - a.time) / span } else { 1.0 };
                return Keyframe {
                    time,
                    position: Point::new(
                        lerp(a.position.x as f32, b.position.x as f32, t).round() as i32,
                        lerp(a.position.y as f32, b.position.y as f32, t).round() as i32,
                    ),
                    opacity: lerp(a.opacity, b.opacity, t),
                    scale: lerp(a.scale, b.scale, t),
                    rotation: lerp(a.rotation, b.rotation, t),
                };
            }
        }
        *last
    }

    /// Advance by `delta` seconds and return the current state
    pub fn advance(&mut self, delta: f32) -> Keyframe {
        self.elapsed += delta.max(0.0);
        self.interpolate(self.progress())
    }

    /// Elapsed fraction in [0,1]
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide() -> Animation {
        Animation::new(2.0)
            .with_keyframe(Keyframe::at(1.0, Point::new(100, 0)).with_opacity(0.0))
            .with_keyframe(Keyframe::at(0.0, Point::new(0, 0)))
    }

    #[test]
    fn keyframes_are_sorted_and_interpolated() {
        let animation = slide();
        let mid = animation.interpolate(0.5);
        assert_eq!(mid.position, Point::new(50, 0));
        assert!((mid.opacity - 0.5).abs() < 1e-6);
        assert_eq!(animation.interpolate(-1.0).position, Point::new(0, 0));
        assert_eq!(animation.interpolate(2.0).position, Point::new(100, 0));
    }

    #[test]
    fn advance_until_finished() {
        let mut animation = slide();
        let state = animation.advance(0.5);
        assert_eq!(state.position, Point::new(25, 0));
        assert!(!animation.is_finished());

        animation.advance(1.5);
        assert!(animation.is_finished());
        assert_eq!(animation.interpolate(animation.progress()).position, Point::new(100, 0));
    }

    #[test]
    fn empty_animation_yields_default() {
        assert_eq!(Animation::new(1.0).interpolate(0.5), Keyframe::default());
    }
}
