//! # slr-windows
//!
//! Windows WASAPI backend for SimpleLoopbackRecorder.
//!
//! Provides:
//! - `WasapiDeviceCatalog` — render endpoint enumeration via the MMDevice API
//! - `WasapiLoopbackCapture` — loopback capture on one render endpoint
//! - `WasapiSilenceRenderer` — silent playback that keeps the loopback stream flowing
//!
//! ## Platform Requirements
//! - Windows Vista+ for shared-mode loopback
//! - Visual Studio Build Tools 2022 + Windows SDK for linking
//!
//! ## Usage
//! ```ignore
//! use slr_core::{DeviceCatalog, LoopbackSession};
//! use slr_windows::{WasapiDeviceCatalog, WasapiLoopbackCapture, WasapiSilenceRenderer};
//!
//! let device = WasapiDeviceCatalog::new().default_device().unwrap();
//! let mut session = LoopbackSession::new(
//!     WasapiLoopbackCapture::for_device(&device),
//!     WasapiSilenceRenderer::for_device(&device),
//! );
//! ```

#[cfg(target_os = "windows")]
mod com;
#[cfg(target_os = "windows")]
pub mod device_enumerator;
#[cfg(target_os = "windows")]
pub mod wasapi_loopback;
#[cfg(target_os = "windows")]
pub mod wasapi_silence;

#[cfg(target_os = "windows")]
pub use device_enumerator::WasapiDeviceCatalog;
#[cfg(target_os = "windows")]
pub use wasapi_loopback::WasapiLoopbackCapture;
#[cfg(target_os = "windows")]
pub use wasapi_silence::WasapiSilenceRenderer;
