mod console;
mod platform;

use std::env;
use std::process::ExitCode;

use env_logger::Env;
use slr_core::cli::USAGE;
use slr_core::{parse, ParseOutcome};

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    let catalog = platform::PlatformCatalog::new();
    match parse(&args, &catalog) {
        ParseOutcome::Terminal { exit_code: 0, message } => {
            println!("{}", message);
            ExitCode::SUCCESS
        }
        ParseOutcome::Terminal { exit_code, message } => {
            eprintln!("Error: {}", message);
            eprintln!("{}", USAGE);
            ExitCode::from(exit_code)
        }
        ParseOutcome::Recordable(config) => console::record(&config),
    }
}
