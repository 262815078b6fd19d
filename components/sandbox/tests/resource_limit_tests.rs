//! Scripts that ask for unreasonable resources fail their own test and
//! leave the rest of the run intact

use sandbox::{run, RunResult, SourceSet};

fn run_entry(files: &[(&str, &str)]) -> RunResult {
    let sources: SourceSet = files.iter().copied().collect();
    run(&sources, "index.test.js", |_| {})
}

fn lines(result: &RunResult) -> Vec<String> {
    result.lines.iter().map(ToString::to_string).collect()
}

#[test]
fn extreme_close_to_precision_fails_one_test() {
    let result = run_entry(&[(
        "index.test.js",
        "test('t', () => { expect(1).toBeCloseTo(1.5, -3e9) });
         test('after', () => {});",
    )]);
    assert_eq!(
        lines(&result),
        vec![
            "FAIL t: TypeError: expect(received).toBeCloseTo(): precision must be between -20 and 20",
            "PASS after",
            "Tests: 1 passed, 1 failed, 0 skipped / 2 total",
        ]
    );
    assert!(result.fatal.is_none());
}

#[test]
fn huge_allocations_are_range_errors() {
    let result = run_entry(&[(
        "index.test.js",
        "test('repeat', () => { 'ab'.repeat(2 ** 40) });
         test('pad', () => { 'x'.padStart(1e11) });
         test('array length', () => { const a = []; a.length = 4e9 });
         test('array constructor', () => { new Array(2 ** 31) });
         test('caught', () => {
             let name;
             try { 'ab'.repeat(2 ** 40) } catch (e) { name = e.name }
             expect(name).toBe('RangeError');
         });
         test('after', () => {});",
    )]);
    assert_eq!(
        lines(&result),
        vec![
            "FAIL repeat: RangeError: Invalid string length",
            "FAIL pad: RangeError: Invalid string length",
            "FAIL array length: RangeError: Invalid array length",
            "FAIL array constructor: RangeError: Invalid array length",
            "PASS caught",
            "PASS after",
            "Tests: 2 passed, 4 failed, 0 skipped / 6 total",
        ]
    );
}

#[test]
fn deeply_nested_module_is_a_syntax_error() {
    let deep = format!("module.exports = {}1{};", "[".repeat(3000), "]".repeat(3000));
    let parens = format!("module.exports = {}1{};", "(".repeat(5000), ")".repeat(5000));
    let result = run_entry(&[
        ("deep.js", &deep),
        ("parens.js", &parens),
        (
            "index.test.js",
            "test('deep', () => require('./deep.js'));
             test('parens', () => require('./parens.js'));
             test('after', () => {});",
        ),
    ]);

    let lines = lines(&result);
    assert_eq!(lines.len(), 4, "{:?}", lines);
    assert!(lines[0].starts_with("FAIL deep: SyntaxError: Maximum nesting depth exceeded (deep.js:1:"), "{}", lines[0]);
    assert!(lines[1].starts_with("FAIL parens: SyntaxError: Maximum nesting depth exceeded (parens.js:1:"), "{}", lines[1]);
    assert_eq!(lines[2], "PASS after");
    assert_eq!(lines[3], "Tests: 1 passed, 2 failed, 0 skipped / 3 total");
}

#[test]
fn deeply_nested_entry_is_reported() {
    let entry = format!("test('never registered', () => {{ const x = {}1{} }});", "[".repeat(3000), "]".repeat(3000));
    let result = run_entry(&[("index.test.js", &entry)]);

    let lines = lines(&result);
    assert_eq!(lines.len(), 1, "{:?}", lines);
    assert!(lines[0].starts_with("ERROR index.test.js: SyntaxError: Maximum nesting depth exceeded"), "{}", lines[0]);
    assert_eq!(result.fatal.map(|fatal| fatal.name), Some("SyntaxError".to_string()));
}

#[test]
fn default_call_depth_allows_ordinary_recursion() {
    let result = run_entry(&[(
        "index.test.js",
        "function sum(list, i = 0) { return i === list.length ? 0 : list[i] + sum(list, i + 1) }
         test('sums a long list', () => {
             const list = Array.from({ length: 200 }, (_, i) => i);
             expect(sum(list)).toBe(19900);
         });",
    )]);
    assert!(result.is_success(), "{}", result.text());
}
