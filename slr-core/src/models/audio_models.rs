use std::fmt;
use std::time::Duration;

/// A rendering endpoint as reported by one enumeration call.
///
/// Identity is `id`. Snapshots are never refreshed during a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AudioDevice {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

impl fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" : {}", self.name, self.id)
    }
}

/// Sample encoding of the negotiated stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    Int,
    Float,
}

/// Format negotiated with the capture device. The sink writes exactly this
/// format; nothing is converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    /// Container size of one sample.
    pub bits_per_sample: u16,
    /// Bits of each container that carry signal, e.g. 24 in a 32-bit container.
    pub valid_bits_per_sample: u16,
    /// Speaker positions (`SPEAKER_*` bits), 0 when unspecified.
    pub channel_mask: u32,
    pub sample_type: SampleType,
}

/// Largest channel count a `WAVE_FORMAT_EXTENSIBLE` channel mask can describe.
pub const MAX_CHANNELS: u16 = 32;

/// Default speaker positions for common channel counts, as Windows assigns them.
pub fn default_channel_mask(channels: u16) -> u32 {
    match channels {
        1 => 0x4,   // front center
        2 => 0x3,   // front left | front right
        4 => 0x33,  // quad
        6 => 0x3F,  // 5.1
        8 => 0x63F, // 7.1
        _ => 0,
    }
}

impl AudioFormat {
    /// 32-bit float at the given layout, the usual shared-mode mix format.
    pub fn float32(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample: 32,
            valid_bits_per_sample: 32,
            channel_mask: default_channel_mask(channels),
            sample_type: SampleType::Float,
        }
    }

    /// Integer PCM at the given layout.
    pub fn pcm(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
            valid_bits_per_sample: bits_per_sample,
            channel_mask: default_channel_mask(channels),
            sample_type: SampleType::Int,
        }
    }

    /// Bytes per frame (all channels of one sample instant).
    ///
    /// Saturates for layouts [`AudioFormat::validate`] rejects.
    pub fn block_align(&self) -> u16 {
        u16::try_from(self.frame_bytes()).unwrap_or(u16::MAX)
    }

    /// Saturates for layouts [`AudioFormat::validate`] rejects.
    pub fn byte_rate(&self) -> u32 {
        u32::try_from(self.sample_rate as u64 * self.frame_bytes() as u64).unwrap_or(u32::MAX)
    }

    fn frame_bytes(&self) -> u32 {
        self.channels as u32 * self.bits_per_sample as u32 / 8
    }

    /// Whether the WAV header needs a `WAVE_FORMAT_EXTENSIBLE` fmt chunk to
    /// describe this layout without loss.
    pub fn uses_extensible(&self) -> bool {
        self.channels > 2
            || self.valid_bits_per_sample != self.bits_per_sample
            || (self.channel_mask != 0 && self.channel_mask != default_channel_mask(self.channels))
    }

    /// WAV `wFormatTag`: 1 for integer PCM, 3 for IEEE float.
    pub fn wav_format_tag(&self) -> u16 {
        match self.sample_type {
            SampleType::Int => 1,
            SampleType::Float => 3,
        }
    }

    /// Playback duration of `bytes` of audio data in this format.
    pub fn duration_of(&self, bytes: u64) -> Duration {
        let rate = self.byte_rate();
        if rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(bytes as f64 / rate as f64)
    }

    /// Byte length of `duration` of audio, rounded down to whole frames.
    pub fn bytes_for(&self, duration: Duration) -> u64 {
        let frames = (duration.as_secs_f64() * self.sample_rate as f64) as u64;
        frames * self.block_align() as u64
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        if self.bits_per_sample == 0 || self.bits_per_sample % 8 != 0 || self.bits_per_sample > 64 {
            return Err(format!("unsupported bit depth: {}", self.bits_per_sample));
        }
        if self.valid_bits_per_sample == 0 || self.valid_bits_per_sample > self.bits_per_sample {
            return Err(format!(
                "{} valid bits do not fit a {}-bit sample",
                self.valid_bits_per_sample, self.bits_per_sample
            ));
        }
        if self.channel_mask.count_ones() > self.channels as u32 {
            return Err(format!(
                "channel mask {:#x} names more speakers than {} channels",
                self.channel_mask, self.channels
            ));
        }
        if self.sample_rate as u64 * self.frame_bytes() as u64 > u32::MAX as u64 {
            return Err(format!("byte rate of {} overflows a WAV header", self));
        }
        if self.sample_type == SampleType::Float && ![32, 64].contains(&self.bits_per_sample) {
            return Err(format!("unsupported float bit depth: {}", self.bits_per_sample));
        }
        Ok(())
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.sample_type {
            SampleType::Int => "int",
            SampleType::Float => "float",
        };
        write!(
            f,
            "{} Hz, {}-bit {}, {} ch",
            self.sample_rate, self.bits_per_sample, kind, self.channels
        )
    }
}

/// Snapshot reported to the delegate on every control tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureProgress {
    pub elapsed: Duration,
    pub bytes_written: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn float_stereo_derived_fields() {
        let format = AudioFormat::float32(48000, 2);
        assert_eq!(format.block_align(), 8);
        assert_eq!(format.byte_rate(), 384_000);
        assert_eq!(format.wav_format_tag(), 3);
    }

    #[test]
    fn duration_and_bytes_agree() {
        let format = AudioFormat::pcm(44100, 2, 16);
        let one_second = format.bytes_for(Duration::from_secs(1));
        assert_eq!(one_second, 176_400);
        assert_eq!(format.duration_of(one_second), Duration::from_secs(1));
    }

    #[test]
    fn partial_frame_durations() {
        let format = AudioFormat::float32(48000, 2);
        assert_abs_diff_eq!(format.duration_of(1000).as_secs_f64(), 1000.0 / 384_000.0, epsilon = 1e-8);
        assert_eq!(AudioFormat { sample_rate: 0, ..format }.duration_of(1000), Duration::ZERO);
    }

    #[test]
    fn bytes_for_rounds_to_whole_frames() {
        let format = AudioFormat::float32(48000, 2);
        let bytes = format.bytes_for(Duration::from_micros(10_010));
        assert_eq!(bytes % format.block_align() as u64, 0);
    }

    #[test]
    fn validate_rejects_odd_layouts() {
        assert!(AudioFormat::float32(48000, 2).validate().is_ok());
        assert!(AudioFormat::float32(0, 2).validate().is_err());
        assert!(AudioFormat::pcm(48000, 0, 16).validate().is_err());
        assert!(AudioFormat::pcm(48000, 2, 12).validate().is_err());
        assert!(AudioFormat { bits_per_sample: 16, ..AudioFormat::float32(48000, 2) }
            .validate()
            .is_err());
    }

    #[test]
    fn absurd_layouts_do_not_overflow() {
        let huge = AudioFormat::pcm(u32::MAX, u16::MAX, 64);
        assert_eq!(huge.block_align(), u16::MAX);
        assert_eq!(huge.byte_rate(), u32::MAX);
        assert!(huge.validate().is_err());

        let fast = AudioFormat::float32(u32::MAX, 2);
        assert_eq!(fast.block_align(), 8);
        assert!(fast.validate().is_err());
        assert!(AudioFormat::pcm(48000, MAX_CHANNELS + 1, 16).validate().is_err());
    }

    #[test]
    fn extensible_needed_for_surround_and_padded_samples() {
        assert!(!AudioFormat::float32(48000, 2).uses_extensible());
        assert!(!AudioFormat::pcm(44100, 1, 16).uses_extensible());

        let surround = AudioFormat::float32(48000, 6);
        assert_eq!(surround.channel_mask, 0x3F);
        assert!(surround.uses_extensible());

        let padded = AudioFormat {
            valid_bits_per_sample: 24,
            ..AudioFormat::pcm(48000, 2, 32)
        };
        assert!(padded.uses_extensible());
        assert!(padded.validate().is_ok());

        let swapped = AudioFormat {
            channel_mask: 0x30, // back left | back right
            ..AudioFormat::float32(48000, 2)
        };
        assert!(swapped.uses_extensible());
    }

    #[test]
    fn validate_rejects_inconsistent_extensible_fields() {
        let too_many_bits = AudioFormat {
            valid_bits_per_sample: 40,
            ..AudioFormat::pcm(48000, 2, 32)
        };
        assert!(too_many_bits.validate().is_err());

        let too_many_speakers = AudioFormat {
            channel_mask: 0x3F,
            ..AudioFormat::float32(48000, 2)
        };
        assert!(too_many_speakers.validate().is_err());
    }

    #[test]
    fn device_display_matches_list_line() {
        let device = AudioDevice {
            id: "{0.0.0.00000000}.{abc}".into(),
            name: "Speakers (Realtek)".into(),
            is_default: true,
        };
        assert_eq!(device.to_string(), "\"Speakers (Realtek)\" : {0.0.0.00000000}.{abc}");
    }
}
