//! # slr-core
//!
//! Platform-agnostic core of SimpleLoopbackRecorder.
//!
//! Provides argument parsing, output path validation, WAV I/O, and the
//! loopback session state machine. Platform backends (Windows WASAPI)
//! implement `CaptureProvider`, `SilenceRenderer` and `DeviceCatalog` and
//! plug into the generic `LoopbackSession`.
//!
//! ## Architecture
//!
//! ```text
//! slr-core (this crate)
//! ├── cli/          ← argument parser, usage and version text
//! ├── traits/       ← CaptureProvider, SilenceRenderer, DeviceCatalog, SessionDelegate
//! ├── models/       ← CaptureError, SessionState, CaptureConfig, AudioFormat, etc.
//! ├── processing/   ← WAV header generation
//! ├── session/      ← LoopbackSession (generic orchestrator)
//! └── storage/      ← WavFileWriter, path validation
//! ```

pub mod cli;
pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use cli::{parse, ParseOutcome};
pub use models::audio_models::{AudioDevice, AudioFormat, CaptureProgress, SampleType};
pub use models::config::{CaptureConfig, SessionOptions, StopPolicy};
pub use models::error::{ArgumentError, CaptureError, PathError};
pub use models::recording_result::SessionResult;
pub use models::state::SessionState;
pub use session::loopback::{LoopbackSession, StateObserver};
pub use storage::wav_writer::WavFileWriter;
pub use traits::capture_delegate::SessionDelegate;
pub use traits::capture_provider::{CaptureEvent, CaptureProvider, FrameSender, StopSignal};
pub use traits::device_catalog::DeviceCatalog;
pub use traits::silence_renderer::SilenceRenderer;
