//! Shared plumbing for native functions

use std::rc::Rc;

use interpreter::{Control, Interpreter, ObjectRef, Value};

/// Result type of every native function
pub type JsResult = Result<Value, Control>;

/// Native function signature used throughout this crate
pub type Builtin = fn(&mut Interpreter, Value, &[Value]) -> JsResult;

/// Argument `index`, or `undefined` when absent
pub fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

/// Install `func` as a non-enumerable method of `target`
pub fn define_method(interp: &Interpreter, target: &ObjectRef, name: &str, length: usize, func: Builtin) {
    let function = interp.realm.new_native_function(name, length, Rc::new(func));
    target.put_hidden(name, Value::Object(function));
}

/// Create a constructor whose `prototype` is `prototype`, linked back through `constructor`
pub fn define_constructor(interp: &Interpreter, name: &str, length: usize, prototype: &ObjectRef, func: Builtin) -> ObjectRef {
    let constructor = interp.realm.new_native_constructor(name, length, Rc::new(func));
    constructor.define(
        "prototype",
        interpreter::Property {
            value: Value::Object(prototype.clone()),
            writable: false,
            enumerable: false,
        },
    );
    prototype.put_hidden("constructor", Value::Object(constructor.clone()));
    interp.realm.global().define(name, Value::Object(constructor.clone()));
    constructor
}

/// Plain namespace object (`Math`, `JSON`, `console`) bound as a global
pub fn define_namespace(interp: &Interpreter, name: &str) -> ObjectRef {
    let namespace = interp.realm.new_object();
    interp.realm.global().define(name, Value::Object(namespace.clone()));
    namespace
}

/// ToIntegerOrInfinity
pub fn to_integer(interp: &mut Interpreter, value: &Value) -> Result<f64, Control> {
    let n = interp.to_number(value)?;
    Ok(if n.is_nan() { 0.0 } else { n.trunc() })
}

/// Resolve a relative index argument (negative counts from `len`) into `0..=len`
pub fn relative_index(interp: &mut Interpreter, value: &Value, len: usize, default: usize) -> Result<usize, Control> {
    if value.is_undefined() {
        return Ok(default);
    }
    let n = to_integer(interp, value)?;
    let len = len as f64;
    let index = if n < 0.0 { (len + n).max(0.0) } else { n.min(len) };
    Ok(index as usize)
}

/// The callable at `args[index]`, or a `TypeError`
pub fn callback_arg(interp: &Interpreter, args: &[Value], index: usize) -> Result<Value, Control> {
    let callback = arg(args, index);
    if callback.is_callable() {
        Ok(callback)
    } else {
        Err(interp.type_error(format!("{} is not a function", interp.describe(&callback))))
    }
}
