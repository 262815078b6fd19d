//! End-to-end runs through the public `Sandbox` API

use sandbox::{OutputLine, Sandbox, SandboxConfig, SourceSet, TestFailure};

const TRUTH_TEST: &str = "const { truth } = require('index.js');
describe('truth', () => {
    test('All number is 42', () => {
        expect(truth()).toBe(42)
    })
})";

fn truth_sources(answer: u32) -> SourceSet {
    let mut sources = SourceSet::new();
    sources.insert("index.js", format!("module.exports = {{ truth: () => {} }}", answer));
    sources.insert("index.test.js", TRUTH_TEST);
    sources
}

#[test]
fn failing_truth_reports_actual_and_expected() {
    let result = Sandbox::default().run(&truth_sources(48), "index.test.js", |_| {});

    assert_eq!(result.lines.len(), 2);
    match &result.lines[0] {
        OutputLine::Fail { path, reason } => {
            assert_eq!(path, "truth > All number is 42");
            match reason {
                TestFailure::AssertionFailure(failure) => {
                    assert_eq!(failure.actual, "48");
                    assert_eq!(failure.expected, "42");
                }
                other => panic!("unexpected failure {:?}", other),
            }
        }
        other => panic!("unexpected line {:?}", other),
    }
    let text = result.text();
    assert!(text.contains("0 passed"), "{}", text);
    assert!(text.contains("/ 1 total"), "{}", text);
}

#[test]
fn passing_truth_has_no_failure_lines() {
    let result = Sandbox::default().run(&truth_sources(42), "index.test.js", |_| {});
    let text = result.text();
    assert!(text.contains("1 passed"), "{}", text);
    assert!(text.contains("/ 1 total"), "{}", text);
    assert!(!text.contains("FAIL"), "{}", text);
    assert!(result.is_success());
}

#[test]
fn order_matches_registration() {
    let mut sources = SourceSet::new();
    sources.insert(
        "index.test.js",
        "describe('a', () => { test('1', () => {}); test('2', () => {}) }); test('3', () => {})",
    );
    let result = Sandbox::default().run(&sources, "index.test.js", |_| {});
    let paths: Vec<&str> = result
        .lines
        .iter()
        .filter_map(|line| match line {
            OutputLine::Pass { path } => Some(path.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(paths, vec!["a > 1", "a > 2", "3"]);
}

#[test]
fn summary_counts_passes_and_failures() {
    let mut sources = SourceSet::new();
    sources.insert(
        "index.test.js",
        "test('one', () => expect(1).toBe(1));
         test('two', () => expect(2).toBe(3));
         test('three', () => expect([3]).toEqual([3]));
         test.skip('four', () => {});",
    );
    let result = Sandbox::default().run(&sources, "index.test.js", |_| {});
    assert_eq!((result.summary.passed, result.summary.failed, result.summary.skipped), (2, 1, 1));
    assert_eq!(result.summary.total, 4);
    assert_eq!(
        result.lines.last().map(ToString::to_string).as_deref(),
        Some("Tests: 2 passed, 1 failed, 1 skipped / 4 total")
    );
}

#[test]
fn output_is_streamed_in_order() {
    let mut sources = SourceSet::new();
    sources.insert(
        "index.test.js",
        "console.log('start');
         test('t', () => { console.info('inside') });
         console.error('registered');",
    );
    let mut streamed = Vec::new();
    let result = Sandbox::default().run(&sources, "index.test.js", |line| streamed.push(line.to_string()));
    assert_eq!(
        streamed,
        vec![
            "start",
            "Error: registered",
            "Info: inside",
            "PASS t",
            "Tests: 1 passed, 0 failed, 0 skipped / 1 total",
        ]
    );
    assert_eq!(streamed.join("\n"), result.text());
}

#[test]
fn runaway_test_is_stopped_by_the_budget() {
    let mut sources = SourceSet::new();
    sources.insert(
        "index.test.js",
        "test('spin', () => { for (;;) {} }); test('next', () => expect(true).toBeTruthy())",
    );
    let sandbox = Sandbox::new(SandboxConfig::default().with_max_steps(10_000));
    let result = sandbox.run(&sources, "index.test.js", |_| {});
    assert_eq!(result.lines[0].to_string(), "FAIL spin: execution budget of 10000 steps exhausted");
    assert_eq!(result.lines[1].to_string(), "PASS next");
}

#[test]
fn fatal_entry_error_stops_before_tests() {
    let mut sources = SourceSet::new();
    sources.insert("index.test.js", "require('./missing.js'); test('never', () => {})");
    let result = Sandbox::default().run(&sources, "index.test.js", |_| {});
    assert_eq!(
        result.text(),
        "ERROR index.test.js: ModuleNotFoundError: Cannot find module './missing.js' from 'index.test.js'"
    );
    assert!(result.fatal.is_some());
    assert_eq!(result.summary.total, 0);
}

#[test]
fn result_serializes_to_json() {
    let result = Sandbox::default().run(&truth_sources(48), "index.test.js", |_| {});
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["lines"][0]["kind"], "fail");
    assert_eq!(json["lines"][0]["reason"]["type"], "AssertionFailure");
    assert_eq!(json["lines"][0]["reason"]["matcher"], "toBe");
    assert_eq!(json["summary"]["failed"], 1);
    assert!(json["fatal"].is_null());
}
