//! Runs the sandbox for parsed arguments

use std::io::Write;

use sandbox::{RunResult, Sandbox};
use tracing::info;

use crate::cli::Cli;
use crate::error::CliResult;
use crate::loader::load_sources;

/// Load sources, run the entry file and write the output to `out`
///
/// Output lines are written as they are produced; with `--json` only the
/// final result is written.
pub fn execute(cli: &Cli, out: &mut impl Write) -> CliResult<RunResult> {
    let config = cli.sandbox_config()?;
    let entry = cli.entry_file(&config);
    let sources = load_sources(&cli.dir)?;
    info!(dir = %cli.dir.display(), files = sources.len(), entry = %entry, "starting run");

    let mut write_error = None;
    let result = Sandbox::new(config).run(&sources, &entry, |line| {
        if cli.json || write_error.is_some() {
            return;
        }
        if let Err(error) = writeln!(out, "{}", line) {
            write_error = Some(error);
        }
    });
    if let Some(error) = write_error {
        return Err(error.into());
    }

    if cli.json {
        serde_json::to_writer_pretty(&mut *out, &result)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(result)
}
