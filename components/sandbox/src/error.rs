//! Host-side errors of the sandbox

use thiserror::Error;

/// Failures of the sandbox machinery itself, as opposed to failures of the
/// code running inside it
#[derive(Debug, Error)]
pub enum SandboxError {
    /// Configuration text could not be parsed
    #[error("invalid sandbox configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The worker thread could not be started
    #[error("failed to start sandbox thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The worker thread panicked
    #[error("sandbox thread panicked: {0}")]
    WorkerPanicked(String),
}

/// Result alias for sandbox host operations
pub type Result<T> = std::result::Result<T, SandboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = SandboxError::from(parse);
        assert!(error.to_string().starts_with("invalid sandbox configuration:"));
    }

    #[test]
    fn test_panic_display() {
        let error = SandboxError::WorkerPanicked("boom".to_string());
        assert_eq!(error.to_string(), "sandbox thread panicked: boom");
    }
}
