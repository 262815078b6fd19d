//! Tests for function call execution
//!
//! Tests cover:
//! - Simple function calls with arguments
//! - Return values
//! - Nested function calls and recursion
//! - Immediately Invoked Function Expressions (IIFE)
//! - Closures, `this` binding and `new`
//! - Host (native) functions

use std::rc::Rc;

use interpreter::{Control, Interpreter, Value};

fn eval(source: &str) -> Value {
    let mut interp = Interpreter::new();
    match interp.eval_source(source) {
        Ok(value) => value,
        Err(control) => panic!("evaluation failed: {:?}", control),
    }
}

fn number(source: &str) -> f64 {
    match eval(source) {
        Value::Number(n) => n,
        other => panic!("expected number, got {:?}", other),
    }
}

#[test]
fn test_simple_function_call() {
    assert_eq!(number("function add(a, b) { return a + b; } add(2, 3)"), 5.0);
}

#[test]
fn test_function_with_no_return() {
    assert_eq!(eval("function f() {} f()"), Value::Undefined);
}

#[test]
fn test_nested_function_calls() {
    let source = r#"
        function double(x) { return x * 2; }
        function inc(x) { return x + 1; }
        double(inc(double(3)))
    "#;
    assert_eq!(number(source), 14.0);
}

#[test]
fn test_iife_immediate_invocation() {
    assert_eq!(number("(function () { return 42; })()"), 42.0);
    assert_eq!(number("(() => 7)()"), 7.0);
}

#[test]
fn test_factorial_recursive() {
    let source = r#"
        function factorial(n) {
            if (n <= 1) return 1;
            return n * factorial(n - 1);
        }
        factorial(10)
    "#;
    assert_eq!(number(source), 3628800.0);
}

#[test]
fn test_call_with_extra_and_missing_arguments() {
    assert_eq!(number("function first(a) { return a; } first(1, 2, 3)"), 1.0);
    assert_eq!(eval("function second(a, b) { return b; } second(1)"), Value::Undefined);
}

#[test]
fn test_default_and_rest_parameters() {
    assert_eq!(number("function f(a, b = a * 2) { return a + b; } f(3)"), 9.0);
    assert_eq!(number("function g(first, ...rest) { return rest.length; } g(1, 2, 3)"), 2.0);
    assert_eq!(number("const h = ({ x }, [y]) => x + y; h({ x: 1 }, [2])"), 3.0);
}

#[test]
fn test_spread_arguments() {
    assert_eq!(number("function sum(a, b, c) { return a + b + c; } sum(...[1, 2], 3)"), 6.0);
}

#[test]
fn test_closure_captures_variable() {
    let source = r#"
        function counter() {
            let count = 0;
            return () => ++count;
        }
        const next = counter();
        next();
        next();
        next()
    "#;
    assert_eq!(number(source), 3.0);
}

#[test]
fn test_for_let_creates_binding_per_iteration() {
    let source = r#"
        const fns = [];
        for (let i = 0; i < 3; i++) { fns[i] = () => i; }
        fns[0]() + fns[1]() * 10 + fns[2]() * 100
    "#;
    assert_eq!(number(source), 210.0);
}

#[test]
fn test_method_call_binds_this() {
    let source = r#"
        const obj = { value: 5, get() { return this.value; } };
        obj.get()
    "#;
    assert_eq!(number(source), 5.0);
}

#[test]
fn test_arrow_captures_lexical_this() {
    let source = r#"
        const obj = {
            value: 9,
            run() { const inner = () => this.value; return inner(); }
        };
        obj.run()
    "#;
    assert_eq!(number(source), 9.0);
}

#[test]
fn test_new_with_constructor_function() {
    let source = r#"
        function Point(x, y) { this.x = x; this.y = y; }
        Point.prototype.sum = function () { return this.x + this.y; };
        const p = new Point(3, 4);
        (p instanceof Point) && p.sum()
    "#;
    assert_eq!(number(source), 7.0);
}

#[test]
fn test_function_name_inference() {
    assert_eq!(eval("const anon = () => 1; anon.name"), Value::from("anon"));
    assert_eq!(eval("const o = { m: function () {} }; o.m.name"), Value::from("m"));
    assert_eq!(number("function f(a, b, c = 1) {} f.length"), 2.0);
}

#[test]
fn test_named_function_expression_sees_itself() {
    assert_eq!(number("const fib = function f(n) { return n < 2 ? n : f(n - 1) + f(n - 2); }; fib(10)"), 55.0);
}

#[test]
fn test_call_non_function_is_type_error() {
    let mut interp = Interpreter::new();
    let err = interp.eval_source("const obj = {}; obj.missing()").unwrap_err();
    let thrown = match err {
        Control::Throw(value) => value,
        other => panic!("expected throw, got {:?}", other),
    };
    let object = thrown.as_object().expect("error object").clone();
    assert_eq!(object.get("name"), Value::from("TypeError"));
    assert_eq!(object.get("message"), Value::from("obj.missing is not a function"));
}

#[test]
fn test_native_function_receives_arguments() {
    let mut interp = Interpreter::new();
    let func = interp.realm.new_native_function(
        "twice",
        1,
        Rc::new(|interp: &mut Interpreter, _this: Value, args: &[Value]| -> Result<Value, Control> {
            let n = interp.to_number(args.first().unwrap_or(&Value::Undefined))?;
            Ok(Value::Number(n * 2.0))
        }),
    );
    interp.realm.global().define("twice", Value::Object(func));
    assert_eq!(interp.eval_source("twice('21')").unwrap(), Value::Number(42.0));
}

#[test]
fn test_call_from_host() {
    let mut interp = Interpreter::new();
    let callback = interp.eval_source("(a, b) => a - b").unwrap();
    let result = interp
        .call(&callback, Value::Undefined, &[Value::Number(10.0), Value::Number(4.0)])
        .unwrap();
    assert_eq!(result, Value::Number(6.0));
}
