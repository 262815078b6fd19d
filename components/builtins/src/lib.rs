//! Standard library for the sandbox interpreter
//!
//! This crate installs the built-in objects and prototypes into an
//! [`Interpreter`] realm:
//! - Object, Function.prototype
//! - Array, String, Number, Boolean, RegExp
//! - Error constructors
//! - Math, JSON
//! - console
//!
//! # Example
//!
//! ```
//! use builtins::install;
//! use interpreter::{Interpreter, Value};
//!
//! let mut interp = Interpreter::new();
//! install(&mut interp);
//!
//! let sum = interp.eval_source("[1, 2, 3].reduce((a, b) => a + b, 0)").unwrap();
//! assert_eq!(sum, Value::Number(6.0));
//!
//! let text = interp.eval_source("JSON.stringify({ a: Math.max(1, 5) })").unwrap();
//! assert_eq!(text, Value::from("{\"a\":5}"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::rc::Rc;

use interpreter::Interpreter;

pub mod array;
pub mod console;
pub mod error;
pub mod inspect;
pub mod json;
pub mod math;
pub mod number;
pub mod object;
pub mod regexp;
pub mod string;
pub mod value;

// Re-export main types for convenience
pub use array::ArrayPrototype;
pub use console::{CaptureWriter, ConsoleObject, ConsoleWriter, StdoutWriter};
pub use error::{describe_thrown, ErrorConstructor};
pub use inspect::{display, error_summary, inspect};
pub use json::JSONObject;
pub use math::MathObject;
pub use number::{BooleanObject, NumberObject, NumberPrototype};
pub use object::{FunctionPrototype, ObjectPrototype};
pub use regexp::RegExpPrototype;
pub use string::StringPrototype;
pub use value::{Builtin, JsResult};

/// Install the standard library with a console printing to stdout
pub fn install(interp: &mut Interpreter) {
    install_with_console(interp, Rc::new(StdoutWriter));
}

/// Install the standard library with a console writing through `writer`
pub fn install_with_console(interp: &mut Interpreter, writer: Rc<dyn ConsoleWriter>) {
    ObjectPrototype::install(interp);
    FunctionPrototype::install(interp);
    ArrayPrototype::install(interp);
    StringPrototype::install(interp);
    NumberObject::install(interp);
    BooleanObject::install(interp);
    RegExpPrototype::install(interp);
    ErrorConstructor::install(interp);
    MathObject::install(interp);
    JSONObject::install(interp);
    ConsoleObject::with_writer(writer).install(interp);
}

#[cfg(test)]
mod tests {
    use super::*;
    use interpreter::Value;

    #[test]
    fn test_install_defines_globals() {
        let mut interp = Interpreter::new();
        install(&mut interp);
        for name in ["Object", "Array", "String", "Number", "Boolean", "RegExp", "Error", "TypeError", "Math", "JSON", "console", "parseInt"] {
            let kind = interp.eval_source(&format!("typeof {}", name)).unwrap();
            assert_ne!(kind, Value::from("undefined"), "{} should be installed", name);
        }
    }

    #[test]
    fn test_method_properties_are_not_enumerable() {
        let mut interp = Interpreter::new();
        install(&mut interp);
        let keys = interp.eval_source("let n = 0; for (const k in []) n++; n").unwrap();
        assert_eq!(keys, Value::Number(0.0));
    }

    #[test]
    fn test_primitive_methods() {
        let mut interp = Interpreter::new();
        install(&mut interp);
        let value = interp.eval_source("(12).toString() + 'ab'.toUpperCase() + true.toString()").unwrap();
        assert_eq!(value, Value::from("12ABtrue"));
    }
}
