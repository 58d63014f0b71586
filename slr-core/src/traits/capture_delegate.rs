use crate::models::audio_models::CaptureProgress;
use crate::models::error::CaptureError;
use crate::models::state::SessionState;

/// Event delegate for capture session notifications.
///
/// All methods are called from the thread running [`crate::LoopbackSession::run`],
/// never from the capture or sink-writer threads.
pub trait SessionDelegate: Send + Sync {
    /// Called when the session state changes. Elapsed-time refreshes of
    /// `Capturing` are reported through `on_progress` instead.
    fn on_state_changed(&self, state: &SessionState);

    /// Called on every control tick while the session is live.
    fn on_progress(&self, progress: &CaptureProgress);

    /// Called when the session fails.
    fn on_error(&self, error: &CaptureError);
}
