//! Source text through parser, interpreter and standard library

use std::cell::RefCell;
use std::rc::Rc;

use builtins::CaptureWriter;
use interpreter::{Control, Interpreter, StepBudget, Value};

fn interpreter_with_console() -> (Interpreter, Rc<RefCell<Vec<String>>>) {
    let output = Rc::new(RefCell::new(Vec::new()));
    let mut interp = Interpreter::new();
    builtins::install_with_console(&mut interp, Rc::new(CaptureWriter::new(output.clone())));
    (interp, output)
}

fn eval(source: &str) -> Value {
    let (mut interp, _) = interpreter_with_console();
    interp.eval_source(source).unwrap()
}

#[test]
fn test_arithmetic_and_closures() {
    let value = eval(
        "function counter() { let n = 0; return () => ++n; }
         const next = counter();
         next(); next();
         next() * 10 + 2;",
    );
    assert!(matches!(value, Value::Number(n) if n == 32.0));
}

#[test]
fn test_array_and_string_builtins() {
    let value = eval("[3, 1, 2].map((n) => n * 2).filter((n) => n > 2).join('-')");
    assert!(matches!(value, Value::String(ref s) if &**s == "6-4"));

    let value = eval("'Hello, World'.toUpperCase().split(', ').length");
    assert!(matches!(value, Value::Number(n) if n == 2.0));
}

#[test]
fn test_json_round_trip_keeps_key_order() {
    let value = eval("JSON.stringify(JSON.parse('{\"b\":1,\"a\":[true,null]}'))");
    assert!(matches!(value, Value::String(ref s) if &**s == r#"{"b":1,"a":[true,null]}"#));
}

#[test]
fn test_console_is_captured() {
    let (mut interp, output) = interpreter_with_console();
    interp.eval_source("console.log('sum', 1 + 2); console.error('bad')").unwrap();
    assert_eq!(*output.borrow(), vec!["sum 3".to_string(), "Error: bad".to_string()]);
}

#[test]
fn test_uncaught_error_is_thrown_value() {
    let (mut interp, _) = interpreter_with_console();
    match interp.eval_source("null.field") {
        Err(Control::Throw(value)) => {
            assert!(builtins::describe_thrown(&value).starts_with("TypeError"));
        }
        _ => panic!("expected a thrown TypeError"),
    }
}

#[test]
fn test_try_catch_finally() {
    let value = eval(
        "let log = [];
         try { throw new RangeError('out') } catch (e) { log.push(e.name) } finally { log.push('done') }
         log.join(',')",
    );
    assert!(matches!(value, Value::String(ref s) if &**s == "RangeError,done"));
}

#[test]
fn test_step_budget_halts_infinite_loop() {
    let mut interp = Interpreter::with_limits(StepBudget::new(500), 64);
    builtins::install(&mut interp);
    assert!(matches!(interp.eval_source("for (;;) {}"), Err(Control::Halt(_))));
}

#[test]
fn test_syntax_error_has_position() {
    let error = parser::parse("let = 5;").unwrap_err();
    assert!(error.to_string().contains("1:"), "{}", error);
}
