//! Capture state machine and interaction modes

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaptureState {
    #[default]
    Idle,
    Capturing,
    Paused,
}

impl CaptureState {
    /// Idle -> Capturing -> Paused -> Capturing, and back to Idle from
    /// either active state
    pub fn can_transition_to(self, next: CaptureState) -> bool {
        matches!(
            (self, next),
            (CaptureState::Idle, CaptureState::Capturing)
                | (CaptureState::Capturing, CaptureState::Paused)
                | (CaptureState::Paused, CaptureState::Capturing)
                | (CaptureState::Capturing, CaptureState::Idle)
                | (CaptureState::Paused, CaptureState::Idle)
        )
    }

    /// Capturing or paused
    pub fn is_active(self) -> bool {
        self != CaptureState::Idle
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureState::Idle => "idle",
            CaptureState::Capturing => "capturing",
            CaptureState::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// How much the session lets the user draw; ordered by capability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    /// Read-only monitoring
    #[default]
    Passive,
    Annotation,
    Interactive,
    Presentation,
}

impl InteractionMode {
    pub fn wants_overlay(self) -> bool {
        self != InteractionMode::Passive
    }
}

impl std::str::FromStr for InteractionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "passive" => Ok(InteractionMode::Passive),
            "annotation" => Ok(InteractionMode::Annotation),
            "interactive" => Ok(InteractionMode::Interactive),
            "presentation" => Ok(InteractionMode::Presentation),
            other => Err(format!("unknown interaction mode '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions() {
        use CaptureState::*;
        assert!(Idle.can_transition_to(Capturing));
        assert!(!Idle.can_transition_to(Paused));
        assert!(!Idle.can_transition_to(Idle));
        assert!(!Capturing.can_transition_to(Capturing));
        assert!(Capturing.can_transition_to(Paused));
        assert!(!Paused.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Idle));
    }

    #[test]
    fn modes_are_ordered() {
        assert!(InteractionMode::Passive < InteractionMode::Annotation);
        assert!(InteractionMode::Interactive >= InteractionMode::Annotation);
        assert!(!InteractionMode::Passive.wants_overlay());
        assert_eq!("Presentation".parse::<InteractionMode>(), Ok(InteractionMode::Presentation));
        assert!("loud".parse::<InteractionMode>().is_err());
    }
}
