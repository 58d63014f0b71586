use std::time::Duration;

use super::error::CaptureError;
use super::recording_result::SessionResult;

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle → capturing → stopping → stopped
///   ↓        ↓           ↓
///   └──────→ failed ←────┘
/// ```
///
/// Transitions only move forward; a session never returns to `Idle`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Capturing { elapsed: Duration },
    Stopping,
    Stopped(Box<SessionResult>),
    Failed(CaptureError),
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped(_) | Self::Failed(_))
    }

    /// Whether moving from `self` to `next` keeps the lifecycle one-directional.
    ///
    /// `Capturing → Capturing` is allowed so the elapsed time can be refreshed.
    pub fn can_transition_to(&self, next: &SessionState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Capturing { .. })
                | (Self::Idle, Self::Failed(_))
                | (Self::Capturing { .. }, Self::Capturing { .. })
                | (Self::Capturing { .. }, Self::Stopping)
                | (Self::Capturing { .. }, Self::Failed(_))
                | (Self::Stopping, Self::Stopped(_))
                | (Self::Stopping, Self::Failed(_))
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Capturing { .. } => "capturing",
            Self::Stopping => "stopping",
            Self::Stopped(_) => "stopped",
            Self::Failed(_) => "failed",
        }
    }
}
