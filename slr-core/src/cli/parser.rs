use std::path::PathBuf;
use std::time::Duration;

use crate::models::audio_models::AudioDevice;
use crate::models::config::{CaptureConfig, StopPolicy};
use crate::models::error::{ArgumentError, CaptureError};
use crate::storage::path_validator;
use crate::traits::device_catalog::DeviceCatalog;

use super::{version_text, USAGE};

/// Result of parsing the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Everything needed to start a capture.
    Recordable(CaptureConfig),
    /// Nothing to record; print `message` and exit with `exit_code`.
    /// Exit code 0 goes to stdout, anything else to stderr.
    Terminal { exit_code: u8, message: String },
}

impl ParseOutcome {
    fn success(message: String) -> Self {
        Self::Terminal {
            exit_code: 0,
            message,
        }
    }

    fn invalid(error: &ArgumentError) -> Self {
        Self::Terminal {
            exit_code: 1,
            message: error.to_string(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Recordable(_) => 0,
            Self::Terminal { exit_code, .. } => *exit_code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flag {
    Output,
    Device,
    Time,
    Size,
    List,
    Version,
    Help,
}

impl Flag {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "-o" | "--output" => Some(Self::Output),
            "-d" | "--device" => Some(Self::Device),
            "-t" | "--time" => Some(Self::Time),
            "-s" | "--size" => Some(Self::Size),
            "-l" | "--list" => Some(Self::List),
            "-v" | "--version" => Some(Self::Version),
            "-h" | "--help" => Some(Self::Help),
            _ => None,
        }
    }
}

/// Resolve the command line (program name excluded) into a capture request
/// or a terminal outcome.
///
/// Tokens are scanned left to right. `--list`, `--version` and `--help` end
/// the scan immediately. For every flag that takes a value the first
/// occurrence wins; later occurrences still consume a value and are ignored.
pub fn parse<C: DeviceCatalog + ?Sized>(args: &[String], catalog: &C) -> ParseOutcome {
    match scan(args, catalog) {
        Ok(outcome) => outcome,
        Err(error) => {
            log::debug!("rejecting command line {:?}: {}", args, error);
            ParseOutcome::invalid(&error)
        }
    }
}

fn scan<C: DeviceCatalog + ?Sized>(args: &[String], catalog: &C) -> Result<ParseOutcome, ArgumentError> {
    let mut output_path: Option<PathBuf> = None;
    let mut device: Option<AudioDevice> = None;
    let mut stop_policy: Option<StopPolicy> = None;

    let mut tokens = args.iter();
    while let Some(token) = tokens.next() {
        let flag = Flag::from_token(token).ok_or_else(|| ArgumentError::UnexpectedArgument(token.clone()))?;

        let value = match flag {
            Flag::List => return Ok(ParseOutcome::success(device_list(catalog)?)),
            Flag::Version => return Ok(ParseOutcome::success(version_text())),
            Flag::Help => {
                return Ok(ParseOutcome::success(format!("{}\n{}", USAGE, device_list(catalog)?)));
            }
            Flag::Output | Flag::Device | Flag::Time | Flag::Size => match tokens.next() {
                Some(value) if !value.starts_with('-') => value,
                _ => return Err(ArgumentError::MissingValue(token.clone())),
            },
        };

        match flag {
            Flag::Output if output_path.is_none() => {
                let path = path_validator::validate(value).map_err(|source| ArgumentError::InvalidFilename {
                    raw: value.clone(),
                    source,
                })?;
                output_path = Some(path);
            }
            Flag::Device if device.is_none() => {
                let resolved = catalog.resolve(value).map_err(|e| match e {
                    CaptureError::DeviceNotFound(_) => ArgumentError::InvalidDeviceId(value.clone()),
                    other => ArgumentError::DeviceQuery(other),
                })?;
                device = Some(resolved);
            }
            Flag::Time if stop_policy.is_none() => {
                stop_policy = Some(StopPolicy::AfterDuration(parse_seconds(token, value)?));
            }
            Flag::Size if stop_policy.is_none() => {
                stop_policy = Some(StopPolicy::AfterBytes(parse_bytes(token, value)?));
            }
            _ => log::debug!("ignoring repeated {} {}", token, value),
        }
    }

    let output_path = output_path.ok_or(ArgumentError::MissingOutput)?;
    let device = match device {
        Some(device) => device,
        None => catalog.default_device().map_err(ArgumentError::DeviceQuery)?,
    };

    Ok(ParseOutcome::Recordable(CaptureConfig {
        output_path,
        device,
        stop_policy: stop_policy.unwrap_or_default(),
    }))
}

fn device_list<C: DeviceCatalog + ?Sized>(catalog: &C) -> Result<String, ArgumentError> {
    catalog.device_list_text().map_err(ArgumentError::DeviceQuery)
}

fn parse_seconds(flag: &str, value: &str) -> Result<Duration, ArgumentError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| ArgumentError::InvalidStopValue {
            flag: flag.to_string(),
            value: value.to_string(),
        })
}

fn parse_bytes(flag: &str, value: &str) -> Result<u64, ArgumentError> {
    value
        .parse::<u64>()
        .ok()
        .filter(|bytes| *bytes > 0)
        .ok_or_else(|| ArgumentError::InvalidStopValue {
            flag: flag.to_string(),
            value: value.to_string(),
        })
}
