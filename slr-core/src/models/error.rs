use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while acquiring a device or running a capture session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("device not available")]
    DeviceNotAvailable,

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("capture stream failed: {0}")]
    StreamFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("invalid session state: {0}")]
    InvalidState(String),

    #[error("loopback capture is not supported on this platform")]
    Unsupported,

    #[error("unknown error: {0}")]
    Unknown(String),
}

/// Why an output path was rejected.
///
/// Probe failures carry only the [`io::ErrorKind`] as a cause tag; the
/// platform error itself is not kept.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty or contains characters the filesystem does not allow")]
    InvalidCharacters,

    #[error("{} is not writable ({kind})", path.display())]
    NotWritable { path: PathBuf, kind: io::ErrorKind },
}

/// Command-line problems. Always turned into an exit code 1 outcome by the parser.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("Invalid arguments: {0} requires a value")]
    MissingValue(String),

    #[error("Invalid arguments: unexpected '{0}'")]
    UnexpectedArgument(String),

    #[error("Invalid arguments: no output file specified")]
    MissingOutput,

    #[error("Invalid filename '{raw}': {source}")]
    InvalidFilename {
        raw: String,
        #[source]
        source: PathError,
    },

    #[error("Invalid device ID '{0}'")]
    InvalidDeviceId(String),

    #[error("Invalid arguments: '{value}' is not a valid value for {flag}")]
    InvalidStopValue { flag: String, value: String },

    #[error("failed to query audio devices: {0}")]
    DeviceQuery(#[source] CaptureError),
}
