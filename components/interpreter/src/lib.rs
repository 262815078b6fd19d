//! Tree-walking JavaScript interpreter
//!
//! This crate evaluates programs produced by the `parser` crate:
//! - Values and a shared, prototype-based object model
//! - Lexical scopes with hoisting and temporal dead zones
//! - Closures and host (native) functions
//! - A step budget and call-depth limit so hosts can stop runaway code
//!
//! Built-in library objects are installed by the `builtins` crate; a bare
//! [`Interpreter`] only knows the intrinsic prototypes and value globals.
//!
//! # Example
//!
//! ```
//! use interpreter::{Interpreter, Value};
//!
//! let mut interp = Interpreter::new();
//! let result = interp
//!     .eval_source("function square(x) { return x * x; } square(7)")
//!     .unwrap();
//!
//! assert_eq!(result, Value::Number(49.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod budget;
pub mod error;
mod eval;
pub mod interpreter;
pub mod object;
mod operators;
pub mod realm;
pub mod scope;
pub mod value;

// Re-export main types at crate root
pub use budget::StepBudget;
pub use error::{Control, Halt};
pub use interpreter::{Hint, Interpreter, DEFAULT_MAX_CALL_DEPTH};
pub use object::{JsObject, NativeFn, ObjectKind, ObjectRef, Property, MAX_ARRAY_LENGTH};
pub use realm::{Intrinsics, Realm};
pub use scope::{Scope, ScopeRef};
pub use value::{Value, MAX_STRING_LENGTH};
