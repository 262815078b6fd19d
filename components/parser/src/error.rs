//! Parser error types and helpers

use core_types::{ErrorKind, JsError, SourcePosition};

use crate::lexer::Token;

/// Create a syntax error at a given position
pub fn syntax_error(message: impl Into<String>, position: Option<SourcePosition>) -> JsError {
    let error = JsError::new(ErrorKind::SyntaxError, message);
    match position {
        Some(position) => error.with_position(position),
        None => error,
    }
}

/// Create an unexpected token error
pub fn unexpected_token(token: &Token, position: Option<SourcePosition>) -> JsError {
    match token {
        Token::EOF => unexpected_eof(position),
        _ => syntax_error(format!("Unexpected {}", token.describe()), position),
    }
}

/// Create an error for a token that does not match what the grammar requires
pub fn expected(what: &str, got: &Token, position: Option<SourcePosition>) -> JsError {
    syntax_error(format!("Expected {} but found {}", what, got.describe()), position)
}

/// Create an unexpected end of input error
pub fn unexpected_eof(position: Option<SourcePosition>) -> JsError {
    syntax_error("Unexpected end of input", position)
}

/// Create an error for syntax outside the supported language subset
pub fn unsupported(feature: &str, position: Option<SourcePosition>) -> JsError {
    syntax_error(format!("{} are not supported", feature), position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Punctuator;

    #[test]
    fn test_syntax_error() {
        let err = syntax_error("test", None);
        assert!(matches!(err.kind, ErrorKind::SyntaxError));
        assert!(err.source_position.is_none());
    }

    #[test]
    fn test_unexpected_token() {
        let err = unexpected_token(&Token::Punctuator(Punctuator::RParen), Some(SourcePosition::new(2, 5, 10)));
        assert_eq!(err.to_string(), "SyntaxError: Unexpected ')' (2:5)");
    }

    #[test]
    fn test_unexpected_eof() {
        let err = unexpected_token(&Token::EOF, None);
        assert_eq!(err.message, "Unexpected end of input");
    }

    #[test]
    fn test_unsupported() {
        let err = unsupported("Class declarations", None);
        assert_eq!(err.message, "Class declarations are not supported");
    }
}
