//! Run limits and defaults

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default number of evaluation steps per budget window
pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;

/// Default nested call limit
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// Default entry filename
pub const DEFAULT_ENTRY: &str = "index.test.js";

/// Default stack size of the worker thread (64 MiB)
pub const DEFAULT_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Sandbox configuration
///
/// Every field is optional when loaded from JSON; missing fields take their
/// defaults.
///
/// # Examples
///
/// ```
/// use sandbox::SandboxConfig;
///
/// let config = SandboxConfig::from_json_str(r#"{ "max_steps": 5000 }"#).unwrap();
/// assert_eq!(config.max_steps, 5000);
/// assert_eq!(config.default_entry, "index.test.js");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Steps allowed for the entry module's top level and for each test
    pub max_steps: u64,
    /// Maximum nesting of calls before a `RangeError`
    pub max_call_depth: usize,
    /// Entry file used when the caller does not name one
    pub default_entry: String,
    /// Stack size in bytes of the thread executing the run
    pub stack_size: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            default_entry: DEFAULT_ENTRY.to_string(),
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl SandboxConfig {
    /// Parse a JSON configuration document
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Set the step budget
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set the call depth limit
    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    /// Set the worker stack size
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SandboxConfig::default();
        assert_eq!(config.max_steps, 1_000_000);
        assert_eq!(config.max_call_depth, 256);
        assert_eq!(config.default_entry, "index.test.js");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SandboxConfig::from_json_str(r#"{ "max_call_depth": 10, "default_entry": "main.test.js" }"#).unwrap();
        assert_eq!(config.max_call_depth, 10);
        assert_eq!(config.default_entry, "main.test.js");
        assert_eq!(config.max_steps, DEFAULT_MAX_STEPS);
        assert_eq!(config.stack_size, DEFAULT_STACK_SIZE);
    }

    #[test]
    fn test_invalid_json() {
        assert!(SandboxConfig::from_json_str(r#"{ "max_steps": "many" }"#).is_err());
    }

    #[test]
    fn test_builders() {
        let config = SandboxConfig::default().with_max_steps(10).with_max_call_depth(3);
        assert_eq!((config.max_steps, config.max_call_depth), (10, 3));
    }
}
