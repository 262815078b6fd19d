//! Integration test suite for the JavaScript test sandbox
//!
//! These tests exercise the parser, interpreter, standard library and
//! sandbox together across crate boundaries.

/// Re-export components for test convenience
pub mod components {
    pub use builtins;
    pub use core_types;
    pub use interpreter;
    pub use parser;
    pub use sandbox;
}
