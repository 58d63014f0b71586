use std::path::PathBuf;
use std::time::Duration;

use super::audio_models::AudioFormat;

/// Result returned when a capture session completes successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    pub file_path: PathBuf,
    pub format: AudioFormat,
    /// Wall-clock time from capture start until the stream completed.
    pub duration: Duration,
    /// Audio data bytes written, header excluded.
    pub bytes_written: u64,
    /// SHA-256 hex digest of the finalized file, if it could be computed.
    pub checksum: Option<String>,
}

impl SessionResult {
    /// Playback length of the recorded audio.
    pub fn audio_duration(&self) -> Duration {
        self.format.duration_of(self.bytes_written)
    }
}
