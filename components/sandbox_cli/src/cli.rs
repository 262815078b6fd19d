//! Command-line arguments

use std::fs;
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use sandbox::SandboxConfig;
use tracing::Level;

use crate::error::{CliError, CliResult};

/// Run a JavaScript test file against the sources of a directory
#[derive(Debug, Parser)]
#[command(name = "js-sandbox", version, about)]
pub struct Cli {
    /// Directory whose `.js` files make up the module table
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Entry test file, as a path relative to `--dir`
    #[arg(short, long)]
    pub entry: Option<String>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Step budget for the entry module and for each test
    #[arg(long)]
    pub max_steps: Option<u64>,

    /// Maximum call depth
    #[arg(long)]
    pub max_call_depth: Option<usize>,

    /// Print the run result as JSON instead of output lines
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Configuration file contents with command-line overrides applied
    pub fn sandbox_config(&self) -> CliResult<SandboxConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| CliError::Io {
                    path: path.clone(),
                    source,
                })?;
                SandboxConfig::from_json_str(&text)?
            }
            None => SandboxConfig::default(),
        };
        if let Some(max_steps) = self.max_steps {
            config = config.with_max_steps(max_steps);
        }
        if let Some(max_call_depth) = self.max_call_depth {
            config = config.with_max_call_depth(max_call_depth);
        }
        Ok(config)
    }

    /// Entry file: `--entry`, else the configured default
    pub fn entry_file(&self, config: &SandboxConfig) -> String {
        self.entry.clone().unwrap_or_else(|| config.default_entry.clone())
    }

    /// Log level selected by `-v`
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}
