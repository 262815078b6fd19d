//! JavaScript test sandbox CLI
//!
//! Parses arguments, sets up logging on stderr and runs the entry file.
//! Exits with status 1 when a test fails or the run cannot start its tests,
//! and 2 when the sources or configuration cannot be loaded.

use std::process::ExitCode;

use clap::Parser;
use sandbox_cli::{execute, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .init();

    let stdout = std::io::stdout();
    match execute(&cli, &mut stdout.lock()) {
        Ok(result) if result.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(error) => {
            eprintln!("Error: {}", error);
            ExitCode::from(2)
        }
    }
}
