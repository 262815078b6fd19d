//! Console object methods

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use interpreter::{Interpreter, NativeFn, Value};

use crate::inspect::display;
use crate::value::{define_namespace, JsResult};

/// Console output writer trait
pub trait ConsoleWriter {
    /// Write a message to the console output
    fn write(&self, message: &str);
}

/// Default console writer that prints to stdout
pub struct StdoutWriter;

impl ConsoleWriter for StdoutWriter {
    fn write(&self, message: &str) {
        println!("{}", message);
    }
}

/// Writer that captures output lines into a shared vector
pub struct CaptureWriter {
    output: Rc<RefCell<Vec<String>>>,
}

impl CaptureWriter {
    /// Capture into `output`
    pub fn new(output: Rc<RefCell<Vec<String>>>) -> Self {
        Self { output }
    }
}

impl ConsoleWriter for CaptureWriter {
    fn write(&self, message: &str) {
        self.output.borrow_mut().push(message.to_string());
    }
}

/// Console object
pub struct ConsoleObject {
    timers: RefCell<HashMap<String, Instant>>,
    writer: Rc<dyn ConsoleWriter>,
}

impl ConsoleObject {
    /// Create a new console with default stdout output
    pub fn new() -> Self {
        Self::with_writer(Rc::new(StdoutWriter))
    }

    /// Create a console writing through `writer`
    pub fn with_writer(writer: Rc<dyn ConsoleWriter>) -> Self {
        ConsoleObject {
            timers: RefCell::new(HashMap::new()),
            writer,
        }
    }

    /// Format values for output
    fn format_values(values: &[Value]) -> String {
        values.iter().map(display).collect::<Vec<_>>().join(" ")
    }

    /// console.log(...values)
    pub fn log(&self, values: &[Value]) {
        self.writer.write(&Self::format_values(values));
    }

    /// console.error(...values)
    pub fn error(&self, values: &[Value]) {
        self.writer.write(&format!("Error: {}", Self::format_values(values)));
    }

    /// console.warn(...values)
    pub fn warn(&self, values: &[Value]) {
        self.writer.write(&format!("Warning: {}", Self::format_values(values)));
    }

    /// console.info(...values)
    pub fn info(&self, values: &[Value]) {
        self.writer.write(&format!("Info: {}", Self::format_values(values)));
    }

    /// console.debug(...values)
    pub fn debug(&self, values: &[Value]) {
        self.writer.write(&format!("Debug: {}", Self::format_values(values)));
    }

    /// console.assert(condition, ...values)
    pub fn assert(&self, condition: bool, values: &[Value]) {
        if !condition {
            let message = if values.is_empty() {
                "Assertion failed".to_string()
            } else {
                format!("Assertion failed: {}", Self::format_values(values))
            };
            self.writer.write(&message);
        }
    }

    /// console.time(label)
    pub fn time(&self, label: &str) {
        self.timers.borrow_mut().insert(label.to_string(), Instant::now());
    }

    /// console.timeEnd(label)
    pub fn time_end(&self, label: &str) {
        let started = self.timers.borrow_mut().remove(label);
        if let Some(start) = started {
            let elapsed = start.elapsed();
            self.writer.write(&format!("{}: {}ms", label, elapsed.as_millis()));
        }
    }

    /// Bind this console as the global `console`
    pub fn install(self, interp: &mut Interpreter) {
        let console = Rc::new(self);
        let namespace = define_namespace(interp, "console");

        type Method = fn(&ConsoleObject, &[Value]);
        let methods: [(&str, Method); 5] = [
            ("log", ConsoleObject::log),
            ("info", ConsoleObject::info),
            ("debug", ConsoleObject::debug),
            ("warn", ConsoleObject::warn),
            ("error", ConsoleObject::error),
        ];
        for (name, method) in methods {
            let target = console.clone();
            let func: NativeFn = Rc::new(move |_interp: &mut Interpreter, _this: Value, args: &[Value]| -> JsResult {
                method(&target, args);
                Ok(Value::Undefined)
            });
            namespace.put_hidden(name, Value::Object(interp.realm.new_native_function(name, 0, func)));
        }

        let target = console.clone();
        let assert: NativeFn = Rc::new(move |_interp: &mut Interpreter, _this: Value, args: &[Value]| -> JsResult {
            let condition = args.first().map(Value::to_boolean).unwrap_or(false);
            target.assert(condition, args.get(1..).unwrap_or(&[]));
            Ok(Value::Undefined)
        });
        namespace.put_hidden("assert", Value::Object(interp.realm.new_native_function("assert", 0, assert)));

        let target = console.clone();
        let time: NativeFn = Rc::new(move |interp: &mut Interpreter, _this: Value, args: &[Value]| -> JsResult {
            let label = timer_label(interp, args)?;
            target.time(&label);
            Ok(Value::Undefined)
        });
        namespace.put_hidden("time", Value::Object(interp.realm.new_native_function("time", 0, time)));

        let target = console;
        let time_end: NativeFn = Rc::new(move |interp: &mut Interpreter, _this: Value, args: &[Value]| -> JsResult {
            let label = timer_label(interp, args)?;
            target.time_end(&label);
            Ok(Value::Undefined)
        });
        namespace.put_hidden("timeEnd", Value::Object(interp.realm.new_native_function("timeEnd", 0, time_end)));
    }
}

impl Default for ConsoleObject {
    fn default() -> Self {
        Self::new()
    }
}

fn timer_label(interp: &mut Interpreter, args: &[Value]) -> Result<String, interpreter::Control> {
    match args.first() {
        None | Some(Value::Undefined) => Ok("default".to_string()),
        Some(value) => Ok(interp.to_string(value)?.to_string()),
    }
}
