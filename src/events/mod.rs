//! Events module for mode machine notifications
//!
//! Every mode transition and every hook pause/resume is broadcast as a
//! [`ModeEvent`] so presentation layers (tray icon, logs) can follow along.

use serde::Serialize;

use crate::state::AppMode;

/// Events emitted by the mode machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModeEvent {
    /// The operating mode changed
    ModeChanged { from: AppMode, to: AppMode },

    /// The dispatcher now passes every key through untouched
    HookPaused,

    /// The dispatcher is intercepting keys again
    HookResumed,
}

impl std::fmt::Display for ModeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModeEvent::ModeChanged { from, to } => write!(f, "MODE_CHANGED ({} -> {})", from, to),
            ModeEvent::HookPaused => write!(f, "HOOK_PAUSED"),
            ModeEvent::HookResumed => write!(f, "HOOK_RESUMED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = ModeEvent::ModeChanged {
            from: AppMode::Normal,
            to: AppMode::MouseControl,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"type":"mode_changed","from":"normal","to":"mouse_control"}"#
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ModeEvent::HookPaused.to_string(), "HOOK_PAUSED");
        assert_eq!(
            ModeEvent::ModeChanged {
                from: AppMode::MouseControl,
                to: AppMode::RegionSelect,
            }
            .to_string(),
            "MODE_CHANGED (MouseControl -> RegionSelect)"
        );
    }
}
