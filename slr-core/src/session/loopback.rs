use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver};
use parking_lot::Mutex;

use crate::models::audio_models::CaptureProgress;
use crate::models::config::{CaptureConfig, SessionOptions, StopPolicy};
use crate::models::error::CaptureError;
use crate::models::recording_result::SessionResult;
use crate::models::state::SessionState;
use crate::storage::wav_writer::{WavFileWriter, WavSummary};
use crate::traits::capture_delegate::SessionDelegate;
use crate::traits::capture_provider::{CaptureEvent, CaptureProvider, StopSignal};
use crate::traits::silence_renderer::SilenceRenderer;

/// Read-only view of a session's state, usable from other threads.
#[derive(Clone)]
pub struct StateObserver(Arc<Mutex<SessionState>>);

impl StateObserver {
    pub fn current(&self) -> SessionState {
        self.0.lock().clone()
    }
}

/// Everything the sink-writer thread needs besides the writer and the queue.
struct SinkContext {
    stop: StopSignal,
    policy: StopPolicy,
    started: Instant,
    bytes_written: Arc<AtomicU64>,
}

/// Loopback capture session.
///
/// Generic over the capture backend and the silence renderer so the whole
/// lifecycle runs against in-process fakes in tests.
///
/// Data flow:
/// ```text
/// [CaptureProvider thread] → bounded queue → [sink-writer thread] → WavFileWriter
/// [SilenceRenderer thread]   (plays silence on the captured endpoint)
/// [run() caller]             progress, stop requests, ordered shutdown
/// ```
///
/// Shutdown order: the sink is finalized and closed after the last data
/// buffer, then the capture stream is released, then silence playback stops.
pub struct LoopbackSession<C: CaptureProvider, S: SilenceRenderer> {
    capture: C,
    silence: S,
    options: SessionOptions,
    state: Arc<Mutex<SessionState>>,
    delegate: Option<Arc<dyn SessionDelegate>>,
    stop: StopSignal,
    bytes_written: Arc<AtomicU64>,
    started: Option<Instant>,
}

impl<C: CaptureProvider, S: SilenceRenderer> LoopbackSession<C, S> {
    pub fn new(capture: C, silence: S) -> Self {
        Self::with_options(capture, silence, SessionOptions::default())
    }

    pub fn with_options(capture: C, silence: S, options: SessionOptions) -> Self {
        Self {
            capture,
            silence,
            options,
            state: Arc::new(Mutex::new(SessionState::Idle)),
            delegate: None,
            stop: StopSignal::new(),
            bytes_written: Arc::new(AtomicU64::new(0)),
            started: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn SessionDelegate>) {
        self.delegate = Some(delegate);
    }

    /// Handle for requesting a stop from outside, e.g. on user input.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state.lock().clone()
    }

    pub fn state_observer(&self) -> StateObserver {
        StateObserver(Arc::clone(&self.state))
    }

    pub fn progress(&self) -> CaptureProgress {
        CaptureProgress {
            elapsed: self.started.map(|s| s.elapsed()).unwrap_or_default(),
            bytes_written: self.bytes_written.load(Ordering::SeqCst),
        }
    }

    /// Record until the stop policy fires, a stop is requested through
    /// [`LoopbackSession::stop_signal`], or the stream ends.
    ///
    /// A session runs at most once. On error the partially written file is
    /// kept, with its header finalized when possible.
    pub fn run(&mut self, config: &CaptureConfig) -> Result<SessionResult, CaptureError> {
        if !self.state.lock().is_idle() {
            return Err(CaptureError::InvalidState("a session can only run once".into()));
        }

        let outcome = self.run_inner(config);
        match &outcome {
            Ok(result) => {
                log::info!(
                    "saved {} ({} bytes, {:.3}s of audio)",
                    result.file_path.display(),
                    result.bytes_written,
                    result.audio_duration().as_secs_f64()
                );
                self.set_state(SessionState::Stopped(Box::new(result.clone())));
            }
            Err(error) => {
                log::error!("capture session failed: {}", error);
                self.set_state(SessionState::Failed(error.clone()));
                if let Some(ref delegate) = self.delegate {
                    delegate.on_error(error);
                }
            }
        }
        outcome
    }

    fn run_inner(&mut self, config: &CaptureConfig) -> Result<SessionResult, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        self.options.validate().map_err(CaptureError::ConfigurationFailed)?;

        let bound = self.capture.device_info();
        if bound.id != config.device.id {
            log::warn!("capture provider is bound to {} but the config names {}", bound, config.device);
        }
        log::info!("recording {} to {}", config.device, config.output_path.display());

        let mut writer = WavFileWriter::create(&config.output_path)?;

        let (frame_tx, frame_rx) = bounded(self.options.channel_capacity);
        let format = match self.capture.start(frame_tx, self.stop.clone()) {
            Ok(format) => format,
            Err(e) => {
                close_quietly(writer);
                return Err(e);
            }
        };
        log::info!("negotiated capture format: {}", format);

        let opened = writer.begin(&format).and_then(|_| self.silence.start(&format));
        if let Err(e) = opened {
            // Drop the queue first so a producer blocked on a full queue can exit.
            drop(frame_rx);
            self.release_capture();
            close_quietly(writer);
            return Err(e);
        }

        let started = Instant::now();
        self.started = Some(started);
        self.set_state(SessionState::Capturing { elapsed: Duration::ZERO });

        let context = SinkContext {
            stop: self.stop.clone(),
            policy: config.stop_policy,
            started,
            bytes_written: Arc::clone(&self.bytes_written),
        };
        let sink = thread::Builder::new()
            .name("slr-sink-writer".into())
            .spawn(move || drain_into_sink(writer, frame_rx, context));
        let sink = match sink {
            Ok(handle) => handle,
            Err(e) => {
                self.release_capture();
                self.release_silence();
                return Err(CaptureError::Unknown(format!("failed to spawn sink writer: {}", e)));
            }
        };

        let mut stopping = false;
        while !sink.is_finished() {
            let progress = self.progress();
            if !self.stop.is_requested() && config.stop_policy.is_satisfied(progress.elapsed, progress.bytes_written) {
                log::info!("stop condition reached after {:.3}s", progress.elapsed.as_secs_f64());
                self.stop.request();
            }

            if self.stop.is_requested() && !stopping {
                self.set_state(SessionState::Stopping);
                stopping = true;
            } else if !stopping {
                *self.state.lock() = SessionState::Capturing {
                    elapsed: progress.elapsed,
                };
            }

            if let Some(ref delegate) = self.delegate {
                delegate.on_progress(&progress);
            }
            thread::sleep(self.options.poll_interval);
        }

        if !stopping {
            log::info!("capture stream ended without a stop request");
            self.set_state(SessionState::Stopping);
        }
        let duration = started.elapsed();

        let sink_outcome = sink
            .join()
            .unwrap_or_else(|_| Err(CaptureError::Unknown("sink writer thread panicked".into())));

        // The sink is closed by now; only then let go of the device streams.
        self.release_capture();
        self.release_silence();

        let summary = sink_outcome?;
        Ok(SessionResult {
            file_path: config.output_path.clone(),
            format,
            duration,
            bytes_written: summary.data_bytes,
            checksum: summary.checksum,
        })
    }

    fn release_capture(&mut self) {
        self.stop.request();
        if let Err(e) = self.capture.stop() {
            log::warn!("failed to release capture stream: {}", e);
        }
    }

    fn release_silence(&mut self) {
        if let Err(e) = self.silence.stop() {
            log::warn!("failed to stop silence playback: {}", e);
        }
    }

    fn set_state(&self, next: SessionState) {
        {
            let mut state = self.state.lock();
            if !state.can_transition_to(&next) {
                log::warn!("ignoring session transition {} -> {}", state.name(), next.name());
                return;
            }
            *state = next.clone();
        }
        log::debug!("session state: {}", next.name());
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&next);
        }
    }
}

/// Sink-writer thread body. Sole owner of the writer for the session.
///
/// Appends every data buffer in arrival order until the stream signals
/// completion, then finalizes the file. After a write failure it keeps
/// draining (and discarding) so the producer can finish, and still closes the
/// file best-effort.
fn drain_into_sink(
    mut writer: WavFileWriter,
    frames: Receiver<CaptureEvent>,
    context: SinkContext,
) -> Result<WavSummary, CaptureError> {
    let mut failure: Option<CaptureError> = None;

    loop {
        match frames.recv() {
            Ok(CaptureEvent::Data(buffer)) => {
                if failure.is_some() {
                    continue;
                }
                if let Err(e) = writer.write(&buffer) {
                    log::error!("failed to write audio data: {}", e);
                    context.stop.request();
                    failure = Some(e);
                    continue;
                }
                let written = context.bytes_written.fetch_add(buffer.len() as u64, Ordering::SeqCst)
                    + buffer.len() as u64;
                if !context.stop.is_requested() && context.policy.is_satisfied(context.started.elapsed(), written)
                {
                    log::info!("stop condition reached at {} bytes", written);
                    context.stop.request();
                }
            }
            Ok(CaptureEvent::Stopped(stream_error)) => {
                if let Some(e) = stream_error {
                    log::error!("capture stream stopped with error: {}", e);
                    failure.get_or_insert(e);
                }
                break;
            }
            Err(_) => {
                failure.get_or_insert(CaptureError::StreamFailed(
                    "capture stream ended without a completion signal".into(),
                ));
                break;
            }
        }
    }
    drop(frames);

    let closed = writer.close();
    match failure {
        Some(e) => {
            if let Err(close_error) = closed {
                log::error!("failed to finalize partial recording: {}", close_error);
            }
            Err(e)
        }
        None => closed,
    }
}

fn close_quietly(writer: WavFileWriter) {
    let path = writer.file_path().to_path_buf();
    if let Err(e) = writer.close() {
        log::warn!("failed to close {}: {}", path.display(), e);
    }
}
