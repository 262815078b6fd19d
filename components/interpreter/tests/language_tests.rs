//! Expression and statement semantics

use interpreter::{Interpreter, Value};

fn eval(source: &str) -> Value {
    let mut interp = Interpreter::new();
    match interp.eval_source(source) {
        Ok(value) => value,
        Err(control) => panic!("evaluation of {:?} failed: {:?}", source, control),
    }
}

#[test]
fn test_arithmetic_and_concatenation() {
    assert_eq!(eval("1 + 2 * 3"), Value::Number(7.0));
    assert_eq!(eval("'a' + 1 + 2"), Value::from("a12"));
    assert_eq!(eval("1 + 2 + 'a'"), Value::from("3a"));
    assert_eq!(eval("2 ** 3 ** 2"), Value::Number(512.0));
    assert_eq!(eval("'6' * '7'"), Value::Number(42.0));
    assert_eq!(eval("0.1 + 0.2 + ''"), Value::from("0.30000000000000004"));
}

#[test]
fn test_equality() {
    assert_eq!(eval("1 == '1'"), Value::Boolean(true));
    assert_eq!(eval("1 === '1'"), Value::Boolean(false));
    assert_eq!(eval("null == undefined"), Value::Boolean(true));
    assert_eq!(eval("null == 0"), Value::Boolean(false));
    assert_eq!(eval("NaN === NaN"), Value::Boolean(false));
    assert_eq!(eval("true == 1"), Value::Boolean(true));
}

#[test]
fn test_comparison_and_bitwise() {
    assert_eq!(eval("'b' > 'a'"), Value::Boolean(true));
    assert_eq!(eval("'10' < '9'"), Value::Boolean(true));
    assert_eq!(eval("NaN <= 1"), Value::Boolean(false));
    assert_eq!(eval("5 & 3 | 8"), Value::Number(9.0));
    assert_eq!(eval("-1 >>> 28"), Value::Number(15.0));
    assert_eq!(eval("~5"), Value::Number(-6.0));
}

#[test]
fn test_typeof() {
    assert_eq!(eval("typeof notDeclared"), Value::from("undefined"));
    assert_eq!(eval("typeof null"), Value::from("object"));
    assert_eq!(eval("typeof (() => 1)"), Value::from("function"));
    assert_eq!(eval("typeof 'x'"), Value::from("string"));
}

#[test]
fn test_logical_and_nullish() {
    assert_eq!(eval("0 || 'fallback'"), Value::from("fallback"));
    assert_eq!(eval("0 ?? 'fallback'"), Value::Number(0.0));
    assert_eq!(eval("let a = null; a ??= 5; a"), Value::Number(5.0));
    assert_eq!(eval("let b = 1; b &&= 2; b"), Value::Number(2.0));
}

#[test]
fn test_optional_chaining() {
    assert_eq!(eval("const o = null; o?.a.b.c"), Value::Undefined);
    assert_eq!(eval("const o = { f: null }; o.f?.()"), Value::Undefined);
    assert_eq!(eval("const o = { a: { b: 3 } }; o?.a?.b"), Value::Number(3.0));
}

#[test]
fn test_destructuring() {
    assert_eq!(eval("const { a, b: { c = 4 } } = { a: 1, b: {} }; a + c"), Value::Number(5.0));
    assert_eq!(eval("const [x, , y = 9, ...rest] = [1, 2, undefined, 4, 5]; x + y + rest.length"), Value::Number(12.0));
    assert_eq!(eval("let p, q; [p, q] = [1, 2]; [p, q] = [q, p]; p * 10 + q"), Value::Number(21.0));
    assert_eq!(eval("const { a, ...others } = { a: 1, b: 2, c: 3 }; others.c"), Value::Number(3.0));
}

#[test]
fn test_template_literal() {
    assert_eq!(eval("const n = 3; `n=${n}, double=${n * 2}`"), Value::from("n=3, double=6"));
}

#[test]
fn test_object_literal_features() {
    assert_eq!(eval("const k = 'dyn'; const o = { [k + 1]: 2 }; o.dyn1"), Value::Number(2.0));
    assert_eq!(eval("const a = { x: 1 }; const b = { ...a, y: 2 }; b.x + b.y"), Value::Number(3.0));
    assert_eq!(eval("const o = { 'quoted key': 1, 2: 'two' }; o['quoted key'] + o[2]"), Value::from("1two"));
}

#[test]
fn test_loops() {
    assert_eq!(eval("let s = 0; for (const v of [1, 2, 3]) { s += v; } s"), Value::Number(6.0));
    assert_eq!(eval("let k = ''; for (const key in { a: 1, b: 2 }) { k += key; } k"), Value::from("ab"));
    assert_eq!(
        eval("let n = 0; while (true) { n++; if (n < 5) continue; break; } n"),
        Value::Number(5.0)
    );
    assert_eq!(eval("let i = 0; do { i++; } while (i < 3); i"), Value::Number(3.0));
    assert_eq!(eval("let chars = ''; for (const c of 'hey') chars = c + chars; chars"), Value::from("yeh"));
}

#[test]
fn test_switch_fallthrough() {
    let source = r#"
        function classify(x) {
            let out = '';
            switch (x) {
                case 1: out += 'one';
                case 2: out += 'two'; break;
                default: out += 'other';
            }
            return out;
        }
        classify(1) + '|' + classify(2) + '|' + classify(3)
    "#;
    assert_eq!(eval(source), Value::from("onetwo|two|other"));
}

#[test]
fn test_var_hoisting_and_function_hoisting() {
    assert_eq!(eval("function f() { x = 5; var x; return x; } f()"), Value::Number(5.0));
    assert_eq!(eval("hoisted(); function hoisted() { return 'ok'; } hoisted()"), Value::from("ok"));
    assert_eq!(eval("var v; typeof v"), Value::from("undefined"));
}

#[test]
fn test_block_scoping() {
    assert_eq!(eval("let x = 1; { let x = 2; } x"), Value::Number(1.0));
    assert_eq!(eval("var y = 1; { var y = 2; } y"), Value::Number(2.0));
}

#[test]
fn test_in_and_delete() {
    assert_eq!(eval("const o = { a: 1 }; 'a' in o"), Value::Boolean(true));
    assert_eq!(eval("const o = { a: 1 }; delete o.a; 'a' in o"), Value::Boolean(false));
}

#[test]
fn test_array_holes_and_length() {
    assert_eq!(eval("const a = [1, , 3]; a.length"), Value::Number(3.0));
    assert_eq!(eval("const a = []; a[4] = 1; a.length"), Value::Number(5.0));
    assert_eq!(eval("'héllo'.length"), Value::Number(5.0));
    assert_eq!(eval("'abc'[1]"), Value::from("b"));
}

#[test]
fn test_sloppy_global_assignment() {
    assert_eq!(eval("function set() { leaked = 3; } set(); leaked"), Value::Number(3.0));
}

#[test]
fn test_regexp_literal_is_object() {
    assert_eq!(eval("typeof /ab+c/i"), Value::from("object"));
}
