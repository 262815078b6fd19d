//! Exception handling tests for try/catch/finally, throw statements and host halts

use interpreter::{Control, Halt, Interpreter, StepBudget, Value};

fn eval(source: &str) -> Value {
    let mut interp = Interpreter::new();
    match interp.eval_source(source) {
        Ok(value) => value,
        Err(control) => panic!("evaluation failed: {:?}", control),
    }
}

/// Evaluate and return `(name, message)` of the thrown error object
fn thrown_error(source: &str) -> (String, String) {
    let mut interp = Interpreter::new();
    match interp.eval_source(source) {
        Err(Control::Throw(Value::Object(error))) => {
            let name = interp.to_string(&error.get("name")).unwrap().to_string();
            let message = interp.to_string(&error.get("message")).unwrap().to_string();
            (name, message)
        }
        other => panic!("expected a thrown error, got {:?}", other),
    }
}

#[test]
fn test_try_catch_basic() {
    assert_eq!(eval("let r; try { throw 'boom'; } catch (e) { r = e; } r"), Value::from("boom"));
}

#[test]
fn test_uncaught_exception() {
    let mut interp = Interpreter::new();
    match interp.eval_source("throw 42") {
        Err(Control::Throw(value)) => assert_eq!(value, Value::Number(42.0)),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_try_no_exception() {
    assert_eq!(eval("let r = 'untouched'; try { r = 'ok'; } catch (e) { r = 'caught'; } r"), Value::from("ok"));
}

#[test]
fn test_nested_try_catch() {
    let source = r#"
        let log = '';
        try {
            try { throw 'inner'; }
            catch (e) { log += e; throw 'outer'; }
        } catch (e) { log += '+' + e; }
        log
    "#;
    assert_eq!(eval(source), Value::from("inner+outer"));
}

#[test]
fn test_finally_runs_and_overrides() {
    assert_eq!(eval("let r = 0; try { r += 1; } finally { r += 10; } r"), Value::Number(11.0));
    assert_eq!(eval("function f() { try { return 1; } finally { return 2; } } f()"), Value::Number(2.0));
    assert_eq!(
        eval("let seen = false; try { try { throw 1; } finally { seen = true; } } catch (e) {} seen"),
        Value::Boolean(true)
    );
}

#[test]
fn test_optional_catch_binding() {
    assert_eq!(eval("let r = 0; try { throw 1; } catch { r = 2; } r"), Value::Number(2.0));
}

#[test]
fn test_engine_errors_are_catchable_objects() {
    let source = r#"
        let name;
        try { undefinedVariable; } catch (e) { name = e.name; }
        name
    "#;
    assert_eq!(eval(source), Value::from("ReferenceError"));
}

#[test]
fn test_reference_error_message() {
    assert_eq!(
        thrown_error("missing + 1"),
        ("ReferenceError".to_string(), "missing is not defined".to_string())
    );
}

#[test]
fn test_temporal_dead_zone() {
    assert_eq!(
        thrown_error("x; let x = 1;"),
        ("ReferenceError".to_string(), "Cannot access 'x' before initialization".to_string())
    );
}

#[test]
fn test_const_assignment() {
    assert_eq!(
        thrown_error("const c = 1; c = 2;"),
        ("TypeError".to_string(), "Assignment to constant variable.".to_string())
    );
}

#[test]
fn test_reading_property_of_undefined() {
    assert_eq!(
        thrown_error("const o = {}; o.a.b"),
        (
            "TypeError".to_string(),
            "Cannot read properties of undefined (reading 'b')".to_string()
        )
    );
}

#[test]
fn test_destructuring_null() {
    let (name, message) = thrown_error("const { a } = null;");
    assert_eq!(name, "TypeError");
    assert!(message.contains("null"));
}

#[test]
fn test_syntax_error_from_source() {
    let (name, message) = thrown_error("let = ;");
    assert_eq!(name, "SyntaxError");
    assert!(message.contains("1:"));
}

#[test]
fn test_call_depth_limit_is_catchable() {
    let mut interp = Interpreter::new();
    interp.set_max_call_depth(8);
    let result = interp
        .eval_source(
            r#"
            function recurse() { return recurse(); }
            let message;
            try { recurse(); } catch (e) { message = e.message; }
            message
        "#,
        )
        .unwrap();
    assert_eq!(result, Value::from("Maximum call stack size exceeded"));
}

#[test]
fn test_budget_halt_is_not_catchable() {
    let mut interp = Interpreter::new();
    interp.set_budget(StepBudget::new(1_000));
    let result = interp.eval_source("let caught = false; try { while (true) {} } catch (e) { caught = true; }");
    assert!(matches!(result, Err(Control::Halt(Halt::BudgetExhausted { steps: 1_000 }))));
}

#[test]
fn test_finally_skipped_on_halt() {
    let mut interp = Interpreter::new();
    interp.set_budget(StepBudget::new(500));
    let result = interp.eval_source("try { for (;;) {} } finally { globalThis.cleaned = true; }");
    assert!(matches!(result, Err(Control::Halt(_))));

    interp.set_budget(StepBudget::unlimited());
    assert_eq!(interp.eval_source("globalThis.cleaned").unwrap(), Value::Undefined);
}

#[test]
fn test_throw_with_undefined() {
    let mut interp = Interpreter::new();
    match interp.eval_source("throw undefined") {
        Err(Control::Throw(value)) => assert_eq!(value, Value::Undefined),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_oversized_array_length_is_a_range_error() {
    assert_eq!(
        thrown_error("const a = []; a.length = 4e9"),
        ("RangeError".to_string(), "Invalid array length".to_string())
    );
    assert_eq!(
        thrown_error("const a = [1]; a[2 ** 30] = 2"),
        ("RangeError".to_string(), "Invalid array length".to_string())
    );
    assert_eq!(
        eval("const a = [1, 2]; let caught; try { a.length = 4e9 } catch (e) { caught = e.name } caught + a.length"),
        Value::from("RangeError2")
    );
}
