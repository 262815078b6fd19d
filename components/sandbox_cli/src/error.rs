//! Error types for the CLI

use std::path::PathBuf;

use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    /// A file could not be read
    #[error("could not read '{}': {source}", .path.display())]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying failure
        source: std::io::Error,
    },

    /// `--dir` does not name a directory
    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// Directory traversal failed
    #[error("could not scan sources: {0}")]
    Walk(#[from] walkdir::Error),

    /// The configuration file is invalid
    #[error(transparent)]
    Config(#[from] sandbox::SandboxError),

    /// Writing output failed
    #[error("could not write output: {0}")]
    Output(#[from] std::io::Error),

    /// The run result could not be encoded
    #[error("could not encode result: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let error = CliError::NotADirectory(PathBuf::from("tests/missing"));
        assert_eq!(error.to_string(), "'tests/missing' is not a directory");

        let error = CliError::Io {
            path: PathBuf::from("a.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(error.to_string(), "could not read 'a.json': gone");
    }
}
