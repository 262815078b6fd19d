//! Command-line front end for the JavaScript test sandbox
//!
//! Loads every `.js` file under a directory into a [`sandbox::SourceSet`],
//! runs one entry test file and prints its output lines (or the whole
//! [`sandbox::RunResult`] as JSON).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod loader;
pub mod runner;

pub use cli::Cli;
pub use error::{CliError, CliResult};
pub use loader::load_sources;
pub use runner::execute;
