//! Silence playback on the captured render endpoint.
//!
//! Without any playback a loopback stream delivers no packets, so quiet
//! stretches would be missing from the recording. Rendering silence keeps
//! the endpoint's engine running.

use std::thread;
use std::time::Duration;

use crossbeam_channel::bounded;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::CoTaskMemFree;

use slr_core::models::audio_models::{AudioDevice, AudioFormat};
use slr_core::models::error::CaptureError;
use slr_core::traits::capture_provider::StopSignal;
use slr_core::traits::silence_renderer::SilenceRenderer;

use crate::com::{self, ComScope};
use crate::wasapi_loopback::audio_format_from_wave;

/// 100ms in 100ns units.
const BUFFER_DURATION: i64 = 1_000_000;
const REFILL_INTERVAL: Duration = Duration::from_millis(10);

/// Shared-mode render stream that writes silent buffers until stopped.
pub struct WasapiSilenceRenderer {
    device: AudioDevice,
    running: StopSignal,
    render_handle: Option<thread::JoinHandle<()>>,
}

impl WasapiSilenceRenderer {
    pub fn for_device(device: &AudioDevice) -> Self {
        Self {
            device: device.clone(),
            running: StopSignal::new(),
            render_handle: None,
        }
    }
}

impl SilenceRenderer for WasapiSilenceRenderer {
    fn start(&mut self, format: &AudioFormat) -> Result<(), CaptureError> {
        if self.render_handle.is_some() {
            return Err(CaptureError::ConfigurationFailed("silence playback already running".into()));
        }

        let (ready_tx, ready_rx) = bounded(1);
        let device_id = self.device.id.clone();
        let capture_format = *format;
        self.running = StopSignal::new();
        let stop = self.running.clone();

        let handle = thread::Builder::new()
            .name("wasapi-silence-render".into())
            .spawn(move || {
                let _com = match ComScope::enter() {
                    Ok(scope) => scope,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let stream = match SilenceStream::open(&device_id, &capture_format) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                if let Err(e) = stream.render_until(&stop) {
                    log::error!("silence playback error: {}", e);
                }
            })
            .map_err(|e| CaptureError::Unknown(format!("failed to spawn silence thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.render_handle = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::Unknown("silence thread exited during setup".into()))
            }
        }
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.running.request();
        if let Some(handle) = self.render_handle.take() {
            handle
                .join()
                .map_err(|_| CaptureError::Unknown("silence thread panicked".into()))?;
        }
        Ok(())
    }
}

struct SilenceStream {
    audio_client: IAudioClient,
    render_client: IAudioRenderClient,
    buffer_frames: u32,
}

impl SilenceStream {
    fn open(device_id: &str, capture_format: &AudioFormat) -> Result<Self, CaptureError> {
        let enumerator = com::device_enumerator()?;
        let device = com::render_device(&enumerator, device_id)?;

        unsafe {
            let audio_client: IAudioClient = device
                .Activate(CLSCTX_ALL, None)
                .map_err(|e| CaptureError::ConfigurationFailed(format!("Activate failed: {}", e)))?;

            // Shared mode only accepts the engine's mix format.
            let mix_format_ptr = audio_client
                .GetMixFormat()
                .map_err(|e| CaptureError::ConfigurationFailed(format!("GetMixFormat failed: {}", e)))?;
            let render_format = audio_format_from_wave(mix_format_ptr);
            if render_format != *capture_format {
                log::debug!("silence renders as {} while capturing {}", render_format, capture_format);
            }

            let initialized = audio_client.Initialize(
                AUDCLNT_SHAREMODE_SHARED,
                AUDCLNT_STREAMFLAGS_NOPERSIST,
                BUFFER_DURATION,
                0,
                mix_format_ptr,
                None,
            );
            CoTaskMemFree(Some(mix_format_ptr as *const _));
            initialized.map_err(|e| {
                CaptureError::ConfigurationFailed(format!("IAudioClient::Initialize (render) failed: {}", e))
            })?;

            let buffer_frames = audio_client
                .GetBufferSize()
                .map_err(|e| CaptureError::ConfigurationFailed(format!("GetBufferSize failed: {}", e)))?;
            let render_client: IAudioRenderClient = audio_client
                .GetService()
                .map_err(|e| CaptureError::ConfigurationFailed(format!("GetService failed: {}", e)))?;

            let stream = Self {
                audio_client,
                render_client,
                buffer_frames,
            };
            // Prime the whole buffer before starting so the engine never underruns.
            stream.write_silence(buffer_frames)?;
            stream
                .audio_client
                .Start()
                .map_err(|e| CaptureError::ConfigurationFailed(format!("IAudioClient::Start failed: {}", e)))?;
            Ok(stream)
        }
    }

    fn render_until(&self, stop: &StopSignal) -> Result<(), CaptureError> {
        let outcome = self.refill_loop(stop);
        unsafe {
            if let Err(e) = self.audio_client.Stop() {
                log::warn!("IAudioClient::Stop failed: {}", e);
            }
        }
        outcome
    }

    fn refill_loop(&self, stop: &StopSignal) -> Result<(), CaptureError> {
        while !stop.is_requested() {
            thread::sleep(REFILL_INTERVAL);
            let padding = unsafe {
                self.audio_client
                    .GetCurrentPadding()
                    .map_err(|e| CaptureError::StreamFailed(format!("GetCurrentPadding failed: {}", e)))?
            };
            let available = self.buffer_frames.saturating_sub(padding);
            if available > 0 {
                self.write_silence(available)?;
            }
        }
        Ok(())
    }

    fn write_silence(&self, frames: u32) -> Result<(), CaptureError> {
        unsafe {
            self.render_client
                .GetBuffer(frames)
                .map_err(|e| CaptureError::StreamFailed(format!("GetBuffer failed: {}", e)))?;
            self.render_client
                .ReleaseBuffer(frames, AUDCLNT_BUFFERFLAGS_SILENT.0 as u32)
                .map_err(|e| CaptureError::StreamFailed(format!("ReleaseBuffer failed: {}", e)))
        }
    }
}
