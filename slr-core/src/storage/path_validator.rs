//! Output path validation.
//!
//! A path is accepted when it has no forbidden characters and a file can be
//! created at its resolved location right now. The probe leaves an empty file
//! behind, which the WAV writer truncates later.

use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::models::error::PathError;

/// Characters the host filesystem rejects anywhere in a path.
#[cfg(target_os = "windows")]
fn is_forbidden(c: char) -> bool {
    matches!(c, '"' | '<' | '>' | '|' | '\0'..='\u{1f}')
}

#[cfg(not(target_os = "windows"))]
fn is_forbidden(c: char) -> bool {
    c == '\0'
}

/// Validate `raw`, resolving a relative path against the current working directory.
pub fn validate(raw: &str) -> Result<PathBuf, PathError> {
    check_characters(raw)?;
    let base = env::current_dir().map_err(|e| PathError::NotWritable {
        path: PathBuf::from(raw),
        kind: e.kind(),
    })?;
    validate_from(raw, &base)
}

/// Validate `raw`, resolving a relative path against `base`.
pub fn validate_from(raw: &str, base: &Path) -> Result<PathBuf, PathError> {
    check_characters(raw)?;

    let candidate = Path::new(raw);
    let path = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    };

    match File::create(&path) {
        Ok(probe) => {
            drop(probe);
            log::debug!("output path {} is writable", path.display());
            Ok(path)
        }
        Err(e) => {
            log::debug!("output path {} rejected: {}", path.display(), e);
            Err(PathError::NotWritable { path, kind: e.kind() })
        }
    }
}

fn check_characters(raw: &str) -> Result<(), PathError> {
    if raw.is_empty() || raw.chars().any(is_forbidden) {
        return Err(PathError::InvalidCharacters);
    }
    // On NTFS `a:b.wav` names an alternate data stream of `a`, not a file.
    if cfg!(target_os = "windows") && has_stray_colon(raw) {
        return Err(PathError::InvalidCharacters);
    }
    Ok(())
}

/// Any `:` other than a drive letter's, optionally after a `\\?\` prefix.
fn has_stray_colon(raw: &str) -> bool {
    let rest = raw.strip_prefix(r"\\?\").unwrap_or(raw);
    let rest = match rest.as_bytes() {
        [drive, b':', ..] if drive.is_ascii_alphabetic() => &rest[2..],
        _ => rest,
    };
    rest.contains(':')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn absolute_path_is_probed_and_returned() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("capture.wav");

        let path = validate(target.to_str().unwrap()).unwrap();
        assert_eq!(path, target);
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn relative_path_resolves_against_base() {
        let dir = tempfile::tempdir().unwrap();
        let path = validate_from("take1.wav", dir.path()).unwrap();
        assert!(path.is_absolute());
        assert_eq!(path, dir.path().join("take1.wav"));
        assert!(path.exists());
    }

    #[test]
    fn nul_is_rejected_without_probe() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(validate_from("bad\0name.wav", dir.path()), Err(PathError::InvalidCharacters));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn empty_is_rejected() {
        assert_eq!(validate(""), Err(PathError::InvalidCharacters));
    }

    #[cfg(target_os = "windows")]
    #[test]
    fn windows_forbidden_characters() {
        for raw in ["a|b.wav", "a<b.wav", "a>b.wav", "\"a.wav\"", "a\tb.wav"] {
            assert_eq!(validate(raw), Err(PathError::InvalidCharacters), "{raw}");
        }
    }

    #[cfg(target_os = "windows")]
    #[test]
    fn windows_rejects_stream_syntax() {
        let dir = tempfile::tempdir().unwrap();
        let inside = dir.path().join("a:b.wav");
        assert_eq!(validate(inside.to_str().unwrap()), Err(PathError::InvalidCharacters));
        assert_eq!(validate_from("take:1.wav", dir.path()), Err(PathError::InvalidCharacters));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        let drive_qualified = dir.path().join("ok.wav");
        assert!(validate(drive_qualified.to_str().unwrap()).is_ok());
    }

    #[test]
    fn colon_is_allowed_only_after_drive_letter() {
        assert!(!has_stray_colon(r"C:\rec\take.wav"));
        assert!(!has_stray_colon(r"\\?\C:\rec\take.wav"));
        assert!(!has_stray_colon("take.wav"));
        assert!(has_stray_colon(r"C:\rec\a:b.wav"));
        assert!(has_stray_colon(r"\\?\C:\rec\a:b.wav"));
        assert!(has_stray_colon("a:b.wav"));
        assert!(has_stray_colon(r"C::\take.wav"));
        assert!(has_stray_colon(r"1:\take.wav"));
    }

    #[test]
    fn missing_parent_directory_is_not_writable() {
        let dir = tempfile::tempdir().unwrap();
        let result = validate_from("no/such/dir/out.wav", dir.path());
        assert!(matches!(
            result,
            Err(PathError::NotWritable { kind: std::io::ErrorKind::NotFound, .. })
        ));
    }

    #[test]
    fn directory_is_not_writable() {
        let dir = tempfile::tempdir().unwrap();
        let result = validate(dir.path().to_str().unwrap());
        assert!(matches!(result, Err(PathError::NotWritable { .. })));
    }

    #[test]
    fn existing_file_is_truncated_by_probe() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("old.wav");
        fs::write(&target, b"previous take").unwrap();

        validate(target.to_str().unwrap()).unwrap();
        assert_eq!(fs::metadata(&target).unwrap().len(), 0);
    }
}
