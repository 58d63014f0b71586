use std::fs::File;
use std::io::{self, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::audio_models::AudioFormat;
use crate::models::error::CaptureError;
use crate::processing::wav_format;

/// What the writer reports once the file is finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavSummary {
    /// Audio data bytes, header excluded.
    pub data_bytes: u64,
    /// SHA-256 hex digest of the complete file, absent if it could not be
    /// read back after closing.
    pub checksum: Option<String>,
}

/// Streaming WAV sink.
///
/// ## File Format
/// ```text
/// [44-byte WAV header, 68 bytes for WAVE_FORMAT_EXTENSIBLE layouts]
/// [raw frames in the negotiated format...]
/// ```
///
/// The header is written with a zero data size by [`WavFileWriter::begin`]
/// and rewritten with the real sizes by [`WavFileWriter::close`].
pub struct WavFileWriter {
    file_path: PathBuf,
    file: Option<BufWriter<File>>,
    format: Option<AudioFormat>,
    data_bytes: u64,
}

impl WavFileWriter {
    /// Create or truncate the output file. Nothing is written yet.
    pub fn create(file_path: impl Into<PathBuf>) -> Result<Self, CaptureError> {
        let file_path = file_path.into();
        let file = File::create(&file_path).map_err(|e| {
            CaptureError::StorageError(format!("failed to create {}: {}", file_path.display(), e))
        })?;
        Ok(Self {
            file_path,
            file: Some(BufWriter::new(file)),
            format: None,
            data_bytes: 0,
        })
    }

    /// Write the placeholder header for `format`. Must precede any [`WavFileWriter::write`].
    pub fn begin(&mut self, format: &AudioFormat) -> Result<(), CaptureError> {
        if self.format.is_some() {
            return Err(CaptureError::StorageError("header already written".into()));
        }
        format.validate().map_err(CaptureError::ConfigurationFailed)?;

        let header = wav_format::generate_wav_header(format, 0);
        self.write_raw(&header)?;
        self.format = Some(*format);
        Ok(())
    }

    /// Append raw frames.
    pub fn write(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        if self.format.is_none() {
            return Err(CaptureError::StorageError("file is not open for writing".into()));
        }
        self.write_raw(data)?;
        self.data_bytes += data.len() as u64;
        Ok(())
    }

    /// Finalize the header sizes, flush, close, and checksum the file.
    ///
    /// If [`WavFileWriter::begin`] never ran, the file is closed as-is and
    /// no header is patched.
    pub fn close(mut self) -> Result<WavSummary, CaptureError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| CaptureError::StorageError("file is not open".into()))?;

        if let Some(format) = self.format {
            if self.data_bytes > wav_format::max_data_size(&format) {
                log::warn!(
                    "{} holds {} bytes of audio, more than a WAV header can describe",
                    self.file_path.display(),
                    self.data_bytes
                );
            }
            let header = wav_format::generate_wav_header(&format, self.data_bytes);
            file.seek(SeekFrom::Start(0))
                .and_then(|_| file.write_all(&header))
                .map_err(|e| CaptureError::StorageError(format!("failed to finalize header: {}", e)))?;
        }

        let file = file
            .into_inner()
            .map_err(|e| CaptureError::StorageError(format!("flush failed: {}", e.error())))?;
        file.sync_all()
            .map_err(|e| CaptureError::StorageError(format!("sync failed: {}", e)))?;
        drop(file);

        // The recording is complete on disk; a failed read-back only loses the checksum.
        let checksum = checksum_or_none(&self.file_path);
        log::debug!(
            "closed {} ({} data bytes, sha256 {})",
            self.file_path.display(),
            self.data_bytes,
            checksum.as_deref().unwrap_or("unavailable")
        );
        Ok(WavSummary {
            data_bytes: self.data_bytes,
            checksum,
        })
    }

    /// Audio data bytes written so far.
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::StorageError("file is not open".into()))?;
        file.write_all(data)
            .map_err(|e| CaptureError::StorageError(format!("write failed: {}", e)))
    }
}

fn checksum_or_none(path: &Path) -> Option<String> {
    match sha256_file(path) {
        Ok(checksum) => Some(checksum),
        Err(e) => {
            log::warn!("{}: {}", path.display(), e);
            None
        }
    }
}

/// Compute SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let file = File::open(path)
        .map_err(|e| CaptureError::StorageError(format!("failed to read file for checksum: {}", e)))?;
    let mut hasher = Sha256::new();
    io::copy(&mut BufReader::new(file), &mut hasher)
        .map_err(|e| CaptureError::StorageError(format!("failed to read file for checksum: {}", e)))?;
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn data_size_field(file_data: &[u8]) -> u32 {
        u32::from_le_bytes([file_data[40], file_data[41], file_data[42], file_data[43]])
    }

    #[test]
    fn write_float_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.wav");

        let mut writer = WavFileWriter::create(&path).unwrap();
        writer.begin(&AudioFormat::float32(48000, 2)).unwrap();

        // 2 stereo float frames
        writer.write(&[0u8; 16]).unwrap();
        writer.write(&[1u8; 8]).unwrap();
        assert_eq!(writer.data_bytes(), 24);

        let summary = writer.close().unwrap();
        assert_eq!(summary.data_bytes, 24);
        assert_eq!(summary.checksum.as_ref().map(String::len), Some(64));

        let file_data = fs::read(&path).unwrap();
        assert_eq!(file_data.len(), 44 + 24);
        assert_eq!(&file_data[0..4], b"RIFF");
        assert_eq!(&file_data[8..12], b"WAVE");
        assert_eq!(data_size_field(&file_data), 24);
        assert_eq!(&file_data[44..60], &[0u8; 16]);
        assert_eq!(&file_data[60..68], &[1u8; 8]);
    }

    #[test]
    fn checksum_matches_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sum.wav");

        let mut writer = WavFileWriter::create(&path).unwrap();
        writer.begin(&AudioFormat::pcm(44100, 1, 16)).unwrap();
        writer.write(&[7u8; 10]).unwrap();
        let summary = writer.close().unwrap();

        let expected = hex_encode(&Sha256::digest(fs::read(&path).unwrap()));
        assert_eq!(summary.checksum, Some(expected));
    }

    #[test]
    fn create_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.wav");
        fs::write(&path, vec![0xAB; 4096]).unwrap();

        let mut writer = WavFileWriter::create(&path).unwrap();
        writer.begin(&AudioFormat::float32(48000, 2)).unwrap();
        writer.close().unwrap();

        let file_data = fs::read(&path).unwrap();
        assert_eq!(file_data.len(), 44);
        assert_eq!(data_size_field(&file_data), 0);
    }

    #[test]
    fn write_before_begin_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = WavFileWriter::create(dir.path().join("early.wav")).unwrap();
        assert!(matches!(writer.write(&[0u8; 4]), Err(CaptureError::StorageError(_))));
    }

    #[test]
    fn begin_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = WavFileWriter::create(dir.path().join("twice.wav")).unwrap();
        writer.begin(&AudioFormat::float32(48000, 2)).unwrap();
        assert!(writer.begin(&AudioFormat::float32(48000, 2)).is_err());
    }

    #[test]
    fn close_without_header_leaves_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.wav");
        let writer = WavFileWriter::create(&path).unwrap();
        let summary = writer.close().unwrap();
        assert_eq!(summary.data_bytes, 0);
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn surround_file_patches_extensible_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surround.wav");
        let format = AudioFormat::float32(48000, 6);

        let mut writer = WavFileWriter::create(&path).unwrap();
        writer.begin(&format).unwrap();
        writer.write(&[5u8; 48]).unwrap();
        writer.close().unwrap();

        let file_data = fs::read(&path).unwrap();
        assert_eq!(file_data.len(), 68 + 48);
        assert_eq!(u16::from_le_bytes([file_data[20], file_data[21]]), 0xFFFE);
        assert_eq!(u32::from_le_bytes([file_data[64], file_data[65], file_data[66], file_data[67]]), 48);
        assert_eq!(&file_data[68..], &[5u8; 48]);
    }

    #[test]
    fn unreadable_file_has_no_checksum() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(checksum_or_none(&dir.path().join("vanished.wav")), None);
    }

    #[test]
    fn create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = WavFileWriter::create(dir.path().join("missing").join("out.wav"));
        assert!(matches!(result, Err(CaptureError::StorageError(_))));
    }
}
