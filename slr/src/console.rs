//! Interactive console around a capture session: in-place elapsed time,
//! any key stops the recording.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use slr_core::{
    CaptureConfig, CaptureError, CaptureProgress, LoopbackSession, SessionDelegate, SessionState, StopPolicy,
    StopSignal,
};

use crate::platform::{PlatformCapture, PlatformSilence};

/// Run a session for `config` on the platform backend and report the outcome.
pub fn record(config: &CaptureConfig) -> ExitCode {
    let mut session = LoopbackSession::new(
        PlatformCapture::for_device(&config.device),
        PlatformSilence::for_device(&config.device),
    );
    let delegate = Arc::new(ConsoleDelegate::new(session.stop_signal(), config.stop_policy));
    session.set_delegate(delegate);

    let outcome = {
        let _raw_mode = RawModeGuard::enable();
        session.run(config)
    };

    match outcome {
        Ok(result) => {
            println!("\r{}", format_elapsed(result.duration));
            println!("\"{}\" has been saved.", result.file_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!();
            eprintln!("Error: {}", e);
            let written = session.progress().bytes_written;
            if written > 0 {
                eprintln!(
                    "Partial recording kept at \"{}\" ({} bytes of audio).",
                    config.output_path.display(),
                    written
                );
            }
            ExitCode::FAILURE
        }
    }
}

/// Redraws the elapsed time and turns any key press into a stop request.
struct ConsoleDelegate {
    stop: StopSignal,
    policy: StopPolicy,
}

impl ConsoleDelegate {
    fn new(stop: StopSignal, policy: StopPolicy) -> Self {
        Self { stop, policy }
    }

    fn key_pressed(&self) -> bool {
        drain_key_presses(|| event::poll(Duration::ZERO), event::read)
    }
}

/// Consume pending console events, reporting whether any was a key press.
///
/// Stops at the first error from either call; errors mean there is no
/// usable console input.
fn drain_key_presses(
    mut poll: impl FnMut() -> io::Result<bool>,
    mut read: impl FnMut() -> io::Result<Event>,
) -> bool {
    while let Ok(true) = poll() {
        match read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => return true,
            Ok(_) => {}
            Err(e) => {
                log::debug!("console input unavailable: {}", e);
                return false;
            }
        }
    }
    false
}

impl SessionDelegate for ConsoleDelegate {
    fn on_state_changed(&self, state: &SessionState) {
        if state.is_capturing() {
            match self.policy {
                StopPolicy::Manual => print!("Recording. Press any key to stop.\r\n"),
                _ => print!("Recording. Press any key to stop early.\r\n"),
            }
        }
    }

    fn on_progress(&self, progress: &CaptureProgress) {
        let mut stdout = io::stdout();
        let _ = write!(stdout, "\r{}", format_elapsed(progress.elapsed));
        let _ = stdout.flush();

        if !self.stop.is_requested() && self.key_pressed() {
            log::info!("key pressed, stopping capture");
            self.stop.request();
        }
    }

    fn on_error(&self, error: &CaptureError) {
        log::debug!("session reported error: {}", error);
    }
}

/// Raw mode for the lifetime of the guard, so single key presses are seen
/// without Enter.
struct RawModeGuard {
    enabled: bool,
}

impl RawModeGuard {
    fn enable() -> Self {
        match enable_raw_mode() {
            Ok(()) => Self { enabled: true },
            Err(e) => {
                log::warn!("console raw mode unavailable, key presses will not stop the capture: {}", e);
                Self { enabled: false }
            }
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.enabled {
            let _ = disable_raw_mode();
        }
    }
}

/// `hh:mm:ss.fff`
fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60,
        elapsed.subsec_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::cell::RefCell;

    #[test]
    fn failing_reads_end_the_drain() {
        let mut reads = 0;
        let pressed = drain_key_presses(
            || Ok(true),
            || {
                reads += 1;
                Err(io::Error::other("console detached"))
            },
        );
        assert!(!pressed);
        assert_eq!(reads, 1);
    }

    #[test]
    fn key_press_is_found_among_other_events() {
        let pending = RefCell::new(vec![
            Event::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)),
            Event::FocusGained,
        ]);
        let pressed = drain_key_presses(
            || Ok(!pending.borrow().is_empty()),
            || Ok(pending.borrow_mut().pop().unwrap()),
        );
        assert!(pressed);
    }

    #[test]
    fn no_pending_events_means_no_press() {
        assert!(!drain_key_presses(|| Ok(false), || unreachable!()));
    }

    #[test]
    fn elapsed_time_formatting() {
        assert_eq!(format_elapsed(Duration::ZERO), "00:00:00.000");
        assert_eq!(format_elapsed(Duration::from_millis(61_005)), "00:01:01.005");
        assert_eq!(format_elapsed(Duration::from_millis(3_723_450)), "01:02:03.450");
        assert_eq!(format_elapsed(Duration::from_secs(100 * 3600)), "100:00:00.000");
    }
}
