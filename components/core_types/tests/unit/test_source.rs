//! Unit tests for SourcePosition

use core_types::SourcePosition;

#[test]
fn test_source_position_display() {
    assert_eq!(SourcePosition::new(12, 1, 300).to_string(), "12:1");
}

#[test]
fn test_source_position_is_copy() {
    let a = SourcePosition::new(1, 1, 0);
    let b = a;
    assert_eq!(a, b);
}
