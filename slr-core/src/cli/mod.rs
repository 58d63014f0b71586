//! Command-line surface of the recorder.

pub mod parser;

pub use parser::{parse, ParseOutcome};

pub const USAGE: &str = "Usage:\n\
\tslr {-o | --output} <filename> [Options]\n\
Options:\n\
\t-o, --output <filename>\tspecify output\n\
\t-d, --device <id>\tspecify device\n\
\t-t, --time <seconds>\tstop after this many seconds\n\
\t-s, --size <bytes>\tstop after this many bytes of audio\n\
\t-l, --list\t\tprint device list\n\
\t-v, --version\t\tprint version\n\
\t-h, --help\t\tprint help";

pub fn version_text() -> String {
    format!("SimpleLoopbackRecorder version {}", env!("CARGO_PKG_VERSION"))
}
