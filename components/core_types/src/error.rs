//! Engine error types.
//!
//! [`JsError`] is what the parser and the host report when something goes wrong
//! outside of running JavaScript; errors thrown *by* JavaScript code are values
//! and live in the interpreter.

use crate::SourcePosition;
use std::fmt;
use thiserror::Error;

/// The kind of JavaScript error.
///
/// These correspond to JavaScript's built-in error constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Plain `Error`
    Error,
    /// Syntax error in JavaScript code
    SyntaxError,
    /// Type error (e.g., calling a non-function)
    TypeError,
    /// Reference to an undefined variable
    ReferenceError,
    /// Value out of allowed range
    RangeError,
    /// Internal engine error
    InternalError,
}

impl ErrorKind {
    /// The constructor name JavaScript code sees (`err.name`).
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::InternalError => "InternalError",
        }
    }

    /// Every kind that has a global constructor.
    pub fn constructible() -> [ErrorKind; 5] {
        [
            ErrorKind::Error,
            ErrorKind::SyntaxError,
            ErrorKind::TypeError,
            ErrorKind::ReferenceError,
            ErrorKind::RangeError,
        ]
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An engine error with kind, message and optional location.
///
/// # Examples
///
/// ```
/// use core_types::{JsError, ErrorKind};
///
/// let error = JsError::new(ErrorKind::TypeError, "undefined is not a function");
/// assert_eq!(error.message, "undefined is not a function");
/// assert_eq!(error.to_string(), "TypeError: undefined is not a function");
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
pub struct JsError {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Source position where the error occurred
    pub source_position: Option<SourcePosition>,
}

impl JsError {
    /// Create an error without a location.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source_position: None,
        }
    }

    /// Attach a source position.
    pub fn with_position(mut self, position: SourcePosition) -> Self {
        self.source_position = Some(position);
        self
    }
}

impl fmt::Display for JsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(position) = &self.source_position {
            write!(f, " ({})", position)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_names() {
        assert_eq!(ErrorKind::TypeError.name(), "TypeError");
        assert_eq!(ErrorKind::RangeError.to_string(), "RangeError");
    }

    #[test]
    fn test_display_without_position() {
        let error = JsError::new(ErrorKind::ReferenceError, "x is not defined");
        assert_eq!(error.to_string(), "ReferenceError: x is not defined");
    }

    #[test]
    fn test_display_with_position() {
        let error =
            JsError::new(ErrorKind::SyntaxError, "Unexpected token").with_position(SourcePosition::new(2, 5, 10));
        assert_eq!(error.to_string(), "SyntaxError: Unexpected token (2:5)");
    }
}
