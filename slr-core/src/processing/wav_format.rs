/// WAV file format utilities.
///
/// Generates the RIFF WAV header for a negotiated [`AudioFormat`]. The writer
/// emits it with a zero data size on open and rewrites it with the final
/// sizes on close. Plain mono/stereo layouts get the classic 16-byte fmt
/// chunk; anything else gets a 40-byte `WAVE_FORMAT_EXTENSIBLE` one so
/// speaker positions and valid bits survive.
use crate::models::audio_models::AudioFormat;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Size of the header when the fmt chunk is `WAVE_FORMAT_EXTENSIBLE`.
pub const EXTENSIBLE_HEADER_SIZE: usize = 68;

pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Tail shared by the KSDATAFORMAT_SUBTYPE_PCM / _IEEE_FLOAT GUIDs; the
/// first four bytes carry the plain format tag.
const SUBFORMAT_GUID_TAIL: [u8; 12] = [
    0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71,
];

/// Header length for `format`.
pub fn header_size(format: &AudioFormat) -> usize {
    if format.uses_extensible() {
        EXTENSIBLE_HEADER_SIZE
    } else {
        WAV_HEADER_SIZE
    }
}

/// Largest data size the RIFF header for `format` can express.
pub fn max_data_size(format: &AudioFormat) -> u64 {
    u32::MAX as u64 - (header_size(format) as u64 - 8)
}

/// Generate the WAV RIFF header.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    header_size - 8 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16, or 40 for WAVE_FORMAT_EXTENSIBLE
/// [20-21]  format tag (1 = PCM, 3 = IEEE float, 0xFFFE = extensible)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * block_align
/// [32-33]  block_align = channels * bits / 8
/// [34-35]  bits per sample (container size)
///  extensible only:
///  [36-37]  22 (cbSize)
///  [38-39]  valid bits per sample
///  [40-43]  channel mask
///  [44-59]  sub-format GUID
/// [..+4]   "data"
/// [..+4]   data_size
/// ```
///
/// `data_size` saturates at [`max_data_size`].
pub fn generate_wav_header(format: &AudioFormat, data_size: u64) -> Vec<u8> {
    let extensible = format.uses_extensible();
    let size = header_size(format);
    let data_size = data_size.min(max_data_size(format)) as u32;
    let riff_size = (size as u32 - 8) + data_size;

    let mut header = Vec::with_capacity(size);

    // RIFF chunk descriptor
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&riff_size.to_le_bytes());
    header.extend_from_slice(b"WAVE");

    // fmt sub-chunk
    let tag = if extensible {
        WAVE_FORMAT_EXTENSIBLE
    } else {
        format.wav_format_tag()
    };
    let fmt_size: u32 = if extensible { 40 } else { 16 };
    header.extend_from_slice(b"fmt ");
    header.extend_from_slice(&fmt_size.to_le_bytes());
    header.extend_from_slice(&tag.to_le_bytes());
    header.extend_from_slice(&format.channels.to_le_bytes());
    header.extend_from_slice(&format.sample_rate.to_le_bytes());
    header.extend_from_slice(&format.byte_rate().to_le_bytes());
    header.extend_from_slice(&format.block_align().to_le_bytes());
    header.extend_from_slice(&format.bits_per_sample.to_le_bytes());

    if extensible {
        header.extend_from_slice(&22u16.to_le_bytes());
        header.extend_from_slice(&format.valid_bits_per_sample.to_le_bytes());
        header.extend_from_slice(&format.channel_mask.to_le_bytes());
        header.extend_from_slice(&(format.wav_format_tag() as u32).to_le_bytes());
        header.extend_from_slice(&SUBFORMAT_GUID_TAIL);
    }

    // data sub-chunk
    header.extend_from_slice(b"data");
    header.extend_from_slice(&data_size.to_le_bytes());

    debug_assert_eq!(header.len(), size);
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(header: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([header[offset], header[offset + 1]])
    }

    fn u32_at(header: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([
            header[offset],
            header[offset + 1],
            header[offset + 2],
            header[offset + 3],
        ])
    }

    #[test]
    fn header_riff_magic() {
        let header = generate_wav_header(&AudioFormat::float32(48000, 2), 0);
        assert_eq!(header.len(), WAV_HEADER_SIZE);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(&header[36..40], b"data");
        assert_eq!(u32_at(&header, 16), 16);
    }

    #[test]
    fn header_48khz_stereo_float() {
        let header = generate_wav_header(&AudioFormat::float32(48000, 2), 9600);

        assert_eq!(u16_at(&header, 20), 3);
        assert_eq!(u16_at(&header, 22), 2);
        assert_eq!(u32_at(&header, 24), 48000);
        assert_eq!(u32_at(&header, 28), 384_000); // 48000 * 2 * 4
        assert_eq!(u16_at(&header, 32), 8);
        assert_eq!(u16_at(&header, 34), 32);
        assert_eq!(u32_at(&header, 40), 9600);
        assert_eq!(u32_at(&header, 4), 36 + 9600);
    }

    #[test]
    fn header_44khz_stereo_16bit_pcm() {
        let header = generate_wav_header(&AudioFormat::pcm(44100, 2, 16), 0);
        assert_eq!(u16_at(&header, 20), 1);
        assert_eq!(u32_at(&header, 28), 176_400);
        assert_eq!(u16_at(&header, 32), 4);
        assert_eq!(u16_at(&header, 34), 16);
    }

    #[test]
    fn surround_float_gets_extensible_chunk() {
        let format = AudioFormat::float32(48000, 6);
        let header = generate_wav_header(&format, 1152);

        assert_eq!(header.len(), EXTENSIBLE_HEADER_SIZE);
        assert_eq!(header_size(&format), EXTENSIBLE_HEADER_SIZE);
        assert_eq!(u32_at(&header, 4), 60 + 1152);
        assert_eq!(u32_at(&header, 16), 40);
        assert_eq!(u16_at(&header, 20), WAVE_FORMAT_EXTENSIBLE);
        assert_eq!(u16_at(&header, 22), 6);
        assert_eq!(u32_at(&header, 28), 48000 * 24);
        assert_eq!(u16_at(&header, 32), 24);
        assert_eq!(u16_at(&header, 34), 32);
        assert_eq!(u16_at(&header, 36), 22);
        assert_eq!(u16_at(&header, 38), 32);
        assert_eq!(u32_at(&header, 40), 0x3F);
        // KSDATAFORMAT_SUBTYPE_IEEE_FLOAT
        assert_eq!(
            &header[44..60],
            &[0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71]
        );
        assert_eq!(&header[60..64], b"data");
        assert_eq!(u32_at(&header, 64), 1152);
    }

    #[test]
    fn padded_pcm_keeps_valid_bits() {
        let format = AudioFormat {
            valid_bits_per_sample: 24,
            ..AudioFormat::pcm(96000, 2, 32)
        };
        let header = generate_wav_header(&format, 0);

        assert_eq!(header.len(), EXTENSIBLE_HEADER_SIZE);
        assert_eq!(u16_at(&header, 34), 32);
        assert_eq!(u16_at(&header, 38), 24);
        assert_eq!(u32_at(&header, 40), 0x3);
        // KSDATAFORMAT_SUBTYPE_PCM
        assert_eq!(u32_at(&header, 44), 1);
    }

    #[test]
    fn oversized_data_saturates() {
        let header = generate_wav_header(&AudioFormat::float32(48000, 2), u64::MAX);
        assert_eq!(u32_at(&header, 40) as u64, max_data_size(&AudioFormat::float32(48000, 2)));
        assert_eq!(u32_at(&header, 4), u32::MAX);

        let surround = AudioFormat::float32(48000, 8);
        let header = generate_wav_header(&surround, u64::MAX);
        assert_eq!(u32_at(&header, 64) as u64, max_data_size(&surround));
        assert_eq!(u32_at(&header, 4), u32::MAX);
    }
}
