use std::path::PathBuf;
use std::time::Duration;

use super::audio_models::AudioDevice;

/// When a capture session stops on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopPolicy {
    /// Only an external stop request ends the session.
    #[default]
    Manual,
    /// Stop once the wall-clock time since capture start reaches the limit.
    AfterDuration(Duration),
    /// Stop once this many audio data bytes have been written.
    AfterBytes(u64),
}

impl StopPolicy {
    pub fn is_satisfied(&self, elapsed: Duration, bytes_written: u64) -> bool {
        match *self {
            Self::Manual => false,
            Self::AfterDuration(limit) => elapsed >= limit,
            Self::AfterBytes(limit) => bytes_written >= limit,
        }
    }
}

/// Fully resolved capture request produced by the argument parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Absolute path of the WAV file to write.
    pub output_path: PathBuf,

    /// Rendering endpoint whose output is captured.
    pub device: AudioDevice,

    pub stop_policy: StopPolicy,
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.output_path.as_os_str().is_empty() {
            return Err("output path is empty".into());
        }
        if !self.output_path.is_absolute() {
            return Err(format!("output path is not absolute: {}", self.output_path.display()));
        }
        match self.stop_policy {
            StopPolicy::AfterDuration(limit) if limit.is_zero() => {
                Err("duration limit must be positive".into())
            }
            StopPolicy::AfterBytes(0) => Err("size limit must be positive".into()),
            _ => Ok(()),
        }
    }
}

/// Tuning knobs for [`crate::LoopbackSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Capacity of the frame queue between the capture thread and the sink
    /// writer, in buffers. The producer blocks when it is full.
    pub channel_capacity: usize,

    /// How often the control path refreshes progress and checks for stop requests.
    pub poll_interval: Duration,
}

impl SessionOptions {
    pub fn validate(&self) -> Result<(), String> {
        if self.channel_capacity == 0 {
            return Err("channel capacity must be at least 1".into());
        }
        if self.poll_interval.is_zero() {
            return Err("poll interval must be positive".into());
        }
        Ok(())
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            poll_interval: Duration::from_millis(50),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> AudioDevice {
        AudioDevice {
            id: "dev".into(),
            name: "Speakers".into(),
            is_default: true,
        }
    }

    #[test]
    fn policy_thresholds_are_inclusive() {
        let by_time = StopPolicy::AfterDuration(Duration::from_secs(5));
        assert!(!by_time.is_satisfied(Duration::from_millis(4999), u64::MAX));
        assert!(by_time.is_satisfied(Duration::from_secs(5), 0));

        let by_size = StopPolicy::AfterBytes(1024);
        assert!(!by_size.is_satisfied(Duration::MAX, 1023));
        assert!(by_size.is_satisfied(Duration::ZERO, 1024));

        assert!(!StopPolicy::Manual.is_satisfied(Duration::MAX, u64::MAX));
    }

    #[test]
    fn config_requires_absolute_path() {
        let mut config = CaptureConfig {
            output_path: PathBuf::from("relative.wav"),
            device: device(),
            stop_policy: StopPolicy::Manual,
        };
        assert!(config.validate().is_err());

        config.output_path = std::env::temp_dir().join("slr-config.wav");
        assert!(config.validate().is_ok());

        config.output_path = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_rejects_zero_limits() {
        let mut config = CaptureConfig {
            output_path: std::env::temp_dir().join("slr-config.wav"),
            device: device(),
            stop_policy: StopPolicy::AfterDuration(Duration::ZERO),
        };
        assert!(config.validate().is_err());
        config.stop_policy = StopPolicy::AfterBytes(0);
        assert!(config.validate().is_err());
        config.stop_policy = StopPolicy::AfterBytes(1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_options_are_valid() {
        assert!(SessionOptions::default().validate().is_ok());
        let options = SessionOptions {
            channel_capacity: 0,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }
}
