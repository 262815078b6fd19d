//! Unit tests for JsError and ErrorKind

use core_types::{ErrorKind, JsError, SourcePosition};

#[test]
fn test_constructible_kinds_have_distinct_names() {
    let names: Vec<&str> = ErrorKind::constructible().iter().map(|k| k.name()).collect();
    assert_eq!(
        names,
        vec!["Error", "SyntaxError", "TypeError", "ReferenceError", "RangeError"]
    );
}

#[test]
fn test_internal_error_is_not_constructible() {
    assert!(!ErrorKind::constructible().contains(&ErrorKind::InternalError));
}

#[test]
fn test_js_error_is_std_error() {
    fn takes_error(_: &dyn std::error::Error) {}
    let error = JsError::new(ErrorKind::TypeError, "boom");
    takes_error(&error);
}

#[test]
fn test_with_position_keeps_message() {
    let error = JsError::new(ErrorKind::SyntaxError, "Unterminated string")
        .with_position(SourcePosition::new(1, 9, 8));
    assert_eq!(error.message, "Unterminated string");
    assert_eq!(error.source_position, Some(SourcePosition::new(1, 9, 8)));
    assert!(error.to_string().ends_with("(1:9)"));
}
