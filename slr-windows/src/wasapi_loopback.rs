//! WASAPI loopback capture provider.
//!
//! Captures the mix going to one render endpoint using
//! `AUDCLNT_STREAMFLAGS_LOOPBACK` in shared mode, in the endpoint's own mix
//! format. DRM-protected audio arrives silenced.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Sender};
use windows::core::PCWSTR;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::CoTaskMemFree;
use windows::Win32::System::Threading::AvSetMmThreadCharacteristicsW;

use slr_core::models::audio_models::{default_channel_mask, AudioDevice, AudioFormat, SampleType};
use slr_core::models::error::CaptureError;
use slr_core::traits::capture_provider::{CaptureEvent, CaptureProvider, FrameSender, StopSignal};

use crate::com::{self, ComScope};

const WAVE_FORMAT_IEEE_FLOAT_TAG: u16 = 0x0003;
const WAVE_FORMAT_EXTENSIBLE_TAG: u16 = 0xFFFE;

/// 100ms in 100ns units.
const BUFFER_DURATION: i64 = 1_000_000;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

type Handshake<T> = Sender<Result<T, CaptureError>>;

/// WASAPI loopback capture for one render endpoint.
pub struct WasapiLoopbackCapture {
    device: AudioDevice,
    stop: Option<StopSignal>,
    capture_handle: Option<thread::JoinHandle<()>>,
}

impl WasapiLoopbackCapture {
    pub fn for_device(device: &AudioDevice) -> Self {
        Self {
            device: device.clone(),
            stop: None,
            capture_handle: None,
        }
    }
}

impl CaptureProvider for WasapiLoopbackCapture {
    fn device_info(&self) -> AudioDevice {
        self.device.clone()
    }

    fn start(&mut self, frames: FrameSender, stop: StopSignal) -> Result<AudioFormat, CaptureError> {
        if self.capture_handle.is_some() {
            return Err(CaptureError::ConfigurationFailed("loopback capture already running".into()));
        }

        let (ready_tx, ready_rx) = bounded(1);
        let device_id = self.device.id.clone();
        let signal = stop.clone();
        let handle = thread::Builder::new()
            .name("wasapi-loopback-capture".into())
            .spawn(move || capture_thread(&device_id, frames, signal, ready_tx))
            .map_err(|e| CaptureError::Unknown(format!("failed to spawn loopback thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(format)) => {
                self.stop = Some(stop);
                self.capture_handle = Some(handle);
                Ok(format)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::Unknown("loopback thread exited during setup".into()))
            }
        }
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        if let Some(ref stop) = self.stop {
            stop.request();
        }
        if let Some(handle) = self.capture_handle.take() {
            handle
                .join()
                .map_err(|_| CaptureError::Unknown("loopback thread panicked".into()))?;
        }
        Ok(())
    }
}

fn capture_thread(device_id: &str, frames: FrameSender, stop: StopSignal, ready: Handshake<AudioFormat>) {
    let _com = match ComScope::enter() {
        Ok(scope) => scope,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    // Declared after the COM scope so the interfaces are released first.
    let stream = match LoopbackStream::open(device_id) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if let Err(e) = stream.start() {
        let _ = ready.send(Err(e));
        return;
    }
    log::info!("loopback capture started on {} ({})", device_id, stream.format);
    let _ = ready.send(Ok(stream.format));

    let outcome = stream.pump(&frames, &stop);
    stream.halt();

    match outcome {
        Ok(true) => {
            let _ = frames.send(CaptureEvent::Stopped(None));
        }
        Ok(false) => log::debug!("frame receiver dropped, loopback capture exiting"),
        Err(e) => {
            log::error!("loopback capture error: {}", e);
            let _ = frames.send(CaptureEvent::Stopped(Some(e)));
        }
    }
}

struct LoopbackStream {
    audio_client: IAudioClient,
    capture_client: IAudioCaptureClient,
    format: AudioFormat,
}

impl LoopbackStream {
    /// Sequence:
    /// 1. Look up the render endpoint by ID
    /// 2. Activate IAudioClient
    /// 3. Initialize with LOOPBACK flag in shared mode, using the mix format
    /// 4. Get IAudioCaptureClient
    fn open(device_id: &str) -> Result<Self, CaptureError> {
        let enumerator = com::device_enumerator()?;
        let device = com::render_device(&enumerator, device_id)?;

        unsafe {
            let audio_client: IAudioClient = device
                .Activate(CLSCTX_ALL, None)
                .map_err(|e| CaptureError::ConfigurationFailed(format!("Activate failed: {}", e)))?;

            let mix_format_ptr = audio_client
                .GetMixFormat()
                .map_err(|e| CaptureError::ConfigurationFailed(format!("GetMixFormat failed: {}", e)))?;
            let format = audio_format_from_wave(mix_format_ptr);

            let initialized = audio_client.Initialize(
                AUDCLNT_SHAREMODE_SHARED,
                AUDCLNT_STREAMFLAGS_LOOPBACK | AUDCLNT_STREAMFLAGS_NOPERSIST,
                BUFFER_DURATION,
                0,
                mix_format_ptr,
                None,
            );
            CoTaskMemFree(Some(mix_format_ptr as *const _));
            initialized.map_err(|e| {
                CaptureError::ConfigurationFailed(format!("IAudioClient::Initialize (loopback) failed: {}", e))
            })?;

            let capture_client: IAudioCaptureClient = audio_client
                .GetService()
                .map_err(|e| CaptureError::ConfigurationFailed(format!("GetService failed: {}", e)))?;

            Ok(Self {
                audio_client,
                capture_client,
                format,
            })
        }
    }

    fn start(&self) -> Result<(), CaptureError> {
        unsafe {
            // MMCSS registration for real-time priority
            let mut task_index: u32 = 0;
            let task_name: Vec<u16> = "Pro Audio\0".encode_utf16().collect();
            if AvSetMmThreadCharacteristicsW(PCWSTR(task_name.as_ptr()), &mut task_index).is_err() {
                log::debug!("MMCSS registration failed, capturing at normal priority");
            }

            self.audio_client
                .Start()
                .map_err(|e| CaptureError::StreamFailed(format!("IAudioClient::Start failed: {}", e)))
        }
    }

    fn halt(&self) {
        unsafe {
            if let Err(e) = self.audio_client.Stop() {
                log::warn!("IAudioClient::Stop failed: {}", e);
            }
        }
    }

    /// Poll until a stop is requested, with one final drain after it is seen.
    ///
    /// Returns `Ok(false)` if the receiver went away.
    fn pump(&self, frames: &FrameSender, stop: &StopSignal) -> Result<bool, CaptureError> {
        loop {
            let stopping = stop.is_requested();
            if !self.drain_packets(frames)? {
                return Ok(false);
            }
            if stopping {
                return Ok(true);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn drain_packets(&self, frames: &FrameSender) -> Result<bool, CaptureError> {
        let block_align = self.format.block_align() as usize;
        unsafe {
            let mut packet_length = self
                .capture_client
                .GetNextPacketSize()
                .map_err(|e| CaptureError::StreamFailed(format!("GetNextPacketSize failed: {}", e)))?;

            while packet_length > 0 {
                let mut buffer_ptr: *mut u8 = std::ptr::null_mut();
                let mut num_frames: u32 = 0;
                let mut flags: u32 = 0;

                self.capture_client
                    .GetBuffer(&mut buffer_ptr, &mut num_frames, &mut flags, None, None)
                    .map_err(|e| CaptureError::StreamFailed(format!("GetBuffer failed: {}", e)))?;

                let byte_len = num_frames as usize * block_align;
                let packet = if byte_len == 0 || buffer_ptr.is_null() {
                    Vec::new()
                } else if flags & (AUDCLNT_BUFFERFLAGS_SILENT.0 as u32) != 0 {
                    vec![0u8; byte_len]
                } else {
                    std::slice::from_raw_parts(buffer_ptr, byte_len).to_vec()
                };

                self.capture_client
                    .ReleaseBuffer(num_frames)
                    .map_err(|e| CaptureError::StreamFailed(format!("ReleaseBuffer failed: {}", e)))?;

                if !packet.is_empty() && frames.send(CaptureEvent::Data(packet)).is_err() {
                    return Ok(false);
                }

                packet_length = self
                    .capture_client
                    .GetNextPacketSize()
                    .map_err(|e| CaptureError::StreamFailed(format!("GetNextPacketSize failed: {}", e)))?;
            }
        }
        Ok(true)
    }
}

/// Describe a mix format, including `WAVE_FORMAT_EXTENSIBLE` streams with
/// their speaker positions and valid bits.
pub(crate) unsafe fn audio_format_from_wave(ptr: *const WAVEFORMATEX) -> AudioFormat {
    let wave = std::ptr::read_unaligned(ptr);
    let channels = wave.nChannels;
    let bits = wave.wBitsPerSample;

    let mut format = AudioFormat {
        sample_rate: wave.nSamplesPerSec,
        channels,
        bits_per_sample: bits,
        valid_bits_per_sample: bits,
        channel_mask: default_channel_mask(channels),
        sample_type: SampleType::Int,
    };

    match wave.wFormatTag {
        WAVE_FORMAT_IEEE_FLOAT_TAG => format.sample_type = SampleType::Float,
        WAVE_FORMAT_EXTENSIBLE_TAG if wave.cbSize >= 22 => {
            let extensible = std::ptr::read_unaligned(ptr as *const WAVEFORMATEXTENSIBLE);
            let sub_format = extensible.SubFormat;
            let samples = extensible.Samples;
            let valid_bits = samples.wValidBitsPerSample;

            if sub_format.data1 == WAVE_FORMAT_IEEE_FLOAT_TAG as u32 {
                format.sample_type = SampleType::Float;
            }
            if valid_bits != 0 {
                format.valid_bits_per_sample = valid_bits;
            }
            format.channel_mask = extensible.dwChannelMask;
        }
        _ => {}
    }
    format
}
