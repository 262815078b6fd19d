//! Source position tracking for error reporting.

use std::fmt;

/// Represents a position in source code.
///
/// Lines and columns are 1-based; `offset` is a character offset from the
/// start of the source text.
///
/// # Examples
///
/// ```
/// use core_types::SourcePosition;
///
/// let pos = SourcePosition::new(10, 5, 150);
///
/// assert_eq!(pos.line, 10);
/// assert_eq!(pos.to_string(), "10:5");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
    /// Line number (1-based)
    pub line: u32,
    /// Column number (1-based)
    pub column: u32,
    /// Character offset from the start of the source file
    pub offset: usize,
}

impl SourcePosition {
    /// Create a position.
    pub fn new(line: u32, column: u32, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_position_creation() {
        let pos = SourcePosition::new(10, 5, 150);
        assert_eq!(pos.line, 10);
        assert_eq!(pos.column, 5);
        assert_eq!(pos.offset, 150);
    }
}
