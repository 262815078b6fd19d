//! Error constructors and Error.prototype

use std::rc::Rc;

use core_types::ErrorKind;
use interpreter::{Interpreter, NativeFn, Property, Value};

use crate::value::{define_method, JsResult};

/// Error constructors (`Error`, `TypeError`, ...) and `Error.prototype.toString`
pub struct ErrorConstructor;

impl ErrorConstructor {
    /// Install one constructor per constructible error kind
    pub fn install(interp: &mut Interpreter) {
        for kind in ErrorKind::constructible() {
            let prototype = interp.realm.intrinsics().error_prototype(kind).clone();
            let func: NativeFn = Rc::new(move |interp: &mut Interpreter, _this: Value, args: &[Value]| -> JsResult {
                Self::construct(interp, kind, args)
            });
            let constructor = interp.realm.new_native_constructor(kind.name(), 1, func);
            constructor.define(
                "prototype",
                Property {
                    value: Value::Object(prototype.clone()),
                    writable: false,
                    enumerable: false,
                },
            );
            prototype.put_hidden("constructor", Value::Object(constructor.clone()));
            interp.realm.global().define(kind.name(), Value::Object(constructor.clone()));

            if kind == ErrorKind::Error {
                define_method(interp, &prototype, "toString", 0, Self::to_string);
                define_method(interp, &constructor, "captureStackTrace", 1, |_: &mut Interpreter, _: Value, _: &[Value]| {
                    Ok(Value::Undefined)
                });
            }
        }
    }

    /// `new Error(message, { cause })`, also callable without `new`
    pub fn construct(interp: &mut Interpreter, kind: ErrorKind, args: &[Value]) -> JsResult {
        let message = match args.first() {
            None | Some(Value::Undefined) => None,
            Some(value) => Some(interp.to_string(value)?),
        };
        let error = interp.realm.new_error(kind, message.as_deref().unwrap_or(""));
        if message.is_none() {
            error.delete("message");
        }
        if let Some(Value::Object(options)) = args.get(1) {
            if options.has_property("cause") {
                error.put_hidden("cause", options.get("cause"));
            }
        }
        let summary = crate::inspect::error_summary(&error);
        error.put_hidden("stack", Value::from(format!("{}\n    at <anonymous>", summary)));
        Ok(Value::Object(error))
    }

    /// Error.prototype.toString()
    pub fn to_string(interp: &mut Interpreter, this: Value, _args: &[Value]) -> JsResult {
        if !this.is_object() {
            return Err(interp.type_error("Error.prototype.toString called on non-object"));
        }
        let name = match interp.get(&this, "name")? {
            Value::Undefined => "Error".into(),
            other => interp.to_string(&other)?,
        };
        let message = match interp.get(&this, "message")? {
            Value::Undefined => "".into(),
            other => interp.to_string(&other)?,
        };
        Ok(Value::from(match (name.is_empty(), message.is_empty()) {
            (_, true) => name.to_string(),
            (true, false) => message.to_string(),
            (false, false) => format!("{}: {}", name, message),
        }))
    }
}

/// Message of a thrown value when it is an error object, otherwise its rendering
pub fn describe_thrown(value: &Value) -> String {
    match value {
        Value::Object(object) if object.is_error() => crate::inspect::error_summary(object),
        other => format!("Uncaught {}", crate::inspect::inspect(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> String {
        let mut interp = Interpreter::new();
        crate::install(&mut interp);
        let value = interp.eval_source(source).unwrap();
        crate::display(&value)
    }

    #[test]
    fn test_construct_with_and_without_new() {
        assert_eq!(eval("new Error('boom').message"), "boom");
        assert_eq!(eval("TypeError('bad').name"), "TypeError");
        assert_eq!(eval("new RangeError('r') instanceof Error"), "true");
        assert_eq!(eval("new SyntaxError('s') instanceof TypeError"), "false");
    }

    #[test]
    fn test_to_string() {
        assert_eq!(eval("String(new Error('boom'))"), "Error: boom");
        assert_eq!(eval("String(new Error())"), "Error");
        assert_eq!(eval("'' + new ReferenceError('x is not defined')"), "ReferenceError: x is not defined");
    }

    #[test]
    fn test_cause() {
        assert_eq!(eval("new Error('outer', { cause: 'inner' }).cause"), "inner");
    }

    #[test]
    fn test_engine_errors_share_prototypes() {
        assert_eq!(
            eval("let ok; try { null.x } catch (e) { ok = e instanceof TypeError && e.constructor === TypeError } ok"),
            "true"
        );
    }

    #[test]
    fn test_describe_thrown() {
        assert_eq!(describe_thrown(&Value::from("plain")), "Uncaught 'plain'");
    }
}
