use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::models::audio_models::{AudioDevice, AudioFormat};
use crate::models::error::CaptureError;

/// What a capture stream delivers to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Raw frames in the negotiated format.
    Data(Vec<u8>),
    /// The stream has finished. No `Data` follows this event.
    Stopped(Option<CaptureError>),
}

/// Producer half of the bounded frame queue.
pub type FrameSender = Sender<CaptureEvent>;

/// Shared, idempotent stop request.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A loopback capture stream on one rendering endpoint.
///
/// Implemented by `WasapiLoopbackCapture` on Windows and by in-process fakes in tests.
pub trait CaptureProvider: Send {
    /// The endpoint this provider captures from.
    fn device_info(&self) -> AudioDevice;

    /// Acquire the device and start delivering frames into `frames`.
    ///
    /// Returns the negotiated format once the stream is running. Delivery
    /// happens on a provider-owned thread. Once `stop` is requested (or the
    /// stream ends by itself) the provider sends any frames it already holds,
    /// then exactly one [`CaptureEvent::Stopped`]. If the receiver goes away
    /// the provider must stop delivering and exit. On error nothing is left running.
    fn start(&mut self, frames: FrameSender, stop: StopSignal) -> Result<AudioFormat, CaptureError>;

    /// Release the stream. Requests a stop if one is still pending and waits
    /// for the delivery thread to finish.
    fn stop(&mut self) -> Result<(), CaptureError>;
}
