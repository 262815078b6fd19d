//! Whole projects run through the sandbox

use sandbox::{run, OutputLine, RunResult, Sandbox, SandboxConfig, SourceSet, TestFailure};

fn run_project(files: &[(&str, &str)]) -> RunResult {
    let sources: SourceSet = files.iter().copied().collect();
    run(&sources, "index.test.js", |_| {})
}

fn failures(result: &RunResult) -> Vec<(&str, &TestFailure)> {
    result
        .lines
        .iter()
        .filter_map(|line| match line {
            OutputLine::Fail { path, reason } => Some((path.as_str(), reason)),
            _ => None,
        })
        .collect()
}

const CART: &str = "
const { round } = require('./lib/money.js');

function Cart() {
  this.items = [];
}

Cart.prototype.add = function (name, price, qty = 1) {
  if (price < 0) throw new RangeError('negative price: ' + name);
  this.items.push({ name, price, qty });
  return this;
};

Cart.prototype.total = function () {
  return round(this.items.reduce((sum, item) => sum + item.price * item.qty, 0));
};

module.exports = Cart;
";

const MONEY: &str = "exports.round = (n) => Math.round(n * 100) / 100;";

#[test]
fn test_multi_module_project() {
    let result = run_project(&[
        ("cart.js", CART),
        ("lib/money.js", MONEY),
        (
            "index.test.js",
            "const Cart = require('./cart.js');
             describe('Cart', () => {
               let cart;
               beforeEach(() => { cart = new Cart(); });

               test('starts empty', () => expect(cart.items).toEqual([]));
               test('totals items', () => {
                 cart.add('tea', 3.333, 3).add('cake', 2);
                 expect(cart.total()).toBeCloseTo(12);
                 expect(cart.items).toHaveLength(2);
                 expect(cart.items[0]).toHaveProperty('name', 'tea');
               });
               test('rejects negative prices', () => {
                 expect(() => cart.add('refund', -1)).toThrow(RangeError);
                 expect(() => cart.add('refund', -1)).toThrow(/negative price/);
               });
               test.skip('discounts', () => {});
             });",
        ),
    ]);

    assert!(result.is_success(), "{}", result.text());
    assert_eq!((result.summary.passed, result.summary.skipped, result.summary.total), (3, 1, 4));
    assert!(result.text().contains("PASS Cart > totals items"));
    assert!(result.text().contains("SKIP Cart > discounts"));
}

#[test]
fn test_failures_are_classified() {
    let result = run_project(&[
        ("util.js", "module.exports = { broken: () => missingHelper() }"),
        (
            "index.test.js",
            "const util = require('./util.js');
             test('assertion', () => expect({ a: 1 }).toEqual({ a: 2 }));
             test('unexpected', () => util.broken());
             test('module', () => require('./nowhere.js'));
             test('runaway', () => { while (true) {} });",
        ),
    ]);

    let failures = failures(&result);
    assert_eq!(failures.len(), 4, "{}", result.text());
    assert!(matches!(failures[0], ("assertion", TestFailure::AssertionFailure(_))));
    assert!(matches!(
        failures[1],
        ("unexpected", TestFailure::UnexpectedError { name, .. }) if name == "ReferenceError"
    ));
    assert!(matches!(failures[2], ("module", TestFailure::ModuleError(_))));
    assert!(matches!(failures[3], ("runaway", TestFailure::BudgetExhausted { .. })));
    assert_eq!(result.summary.failed, 4);
}

#[test]
fn test_helper_module_sees_test_globals() {
    let result = run_project(&[
        ("shared.js", "module.exports = (label) => test(label, () => expect(1).toBe(1));"),
        ("index.test.js", "const define = require('./shared.js'); define('from helper');"),
    ]);
    assert_eq!(result.text(), "PASS from helper\nTests: 1 passed, 0 failed, 0 skipped / 1 total");
}

#[test]
fn test_streamed_lines_match_result() {
    let sources: SourceSet = [(
        "index.test.js",
        "console.log('boot');
         test('one', () => console.info('running'));
         test('two', () => expect([1, 2]).not.toContain(3));",
    )]
    .into_iter()
    .collect();

    let mut streamed = Vec::new();
    let result = Sandbox::new(SandboxConfig::default()).run(&sources, "index.test.js", |line| {
        streamed.push(line.to_string())
    });
    assert_eq!(
        streamed,
        vec![
            "boot",
            "Info: running",
            "PASS one",
            "PASS two",
            "Tests: 2 passed, 0 failed, 0 skipped / 2 total",
        ]
    );
    assert_eq!(streamed.join("\n"), result.text());
}

#[test]
fn test_same_sources_run_twice_identically() {
    let sources: SourceSet = [
        ("state.js", "module.exports = { calls: 0 }"),
        ("index.test.js", "const s = require('./state.js'); test('once', () => expect(++s.calls).toBe(1))"),
    ]
    .into_iter()
    .collect();

    let sandbox = Sandbox::default();
    let first = sandbox.run(&sources, "index.test.js", |_| {});
    let second = sandbox.run(&sources, "index.test.js", |_| {});
    assert!(first.is_success());
    assert_eq!(first.text(), second.text());
}
