use crate::models::audio_models::AudioFormat;
use crate::models::error::CaptureError;

/// Plays a silent signal on the captured endpoint for the whole session.
///
/// Loopback streams on an idle endpoint stop producing packets; rendering
/// silence keeps frames flowing so quiet stretches are recorded at wall-clock length.
pub trait SilenceRenderer: Send {
    /// Begin playback. `format` is the capture's negotiated format and is read-only.
    fn start(&mut self, format: &AudioFormat) -> Result<(), CaptureError>;

    /// Stop playback and release the output stream.
    fn stop(&mut self) -> Result<(), CaptureError>;
}
