//! End-to-end runs over directories on disk

use std::fs;
use std::path::Path;

use clap::Parser;
use sandbox_cli::{execute, Cli, CliError};
use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, text) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }
    dir
}

fn cli(dir: &Path, extra: &[&str]) -> Cli {
    let mut args = vec!["js-sandbox", "--dir", dir.to_str().unwrap()];
    args.extend_from_slice(extra);
    Cli::try_parse_from(args).unwrap()
}

fn run(dir: &Path, extra: &[&str]) -> (sandbox::RunResult, String) {
    let mut out = Vec::new();
    let result = execute(&cli(dir, extra), &mut out).unwrap();
    (result, String::from_utf8(out).unwrap())
}

#[test]
fn test_passing_project() {
    let dir = project(&[
        ("index.js", "module.exports = { truth: () => 42 }"),
        ("index.test.js", "const { truth } = require('./index.js'); test('truth', () => expect(truth()).toBe(42))"),
    ]);
    let (result, out) = run(dir.path(), &[]);
    assert!(result.is_success());
    assert_eq!(out, "PASS truth\nTests: 1 passed, 0 failed, 0 skipped / 1 total\n");
}

#[test]
fn test_failing_project() {
    let dir = project(&[
        ("index.js", "module.exports = { truth: () => 48 }"),
        ("index.test.js", "const { truth } = require('./index.js'); test('truth', () => expect(truth()).toBe(42))"),
    ]);
    let (result, out) = run(dir.path(), &[]);
    assert!(!result.is_success());
    assert!(out.starts_with("FAIL truth: "), "{}", out);
    assert!(out.ends_with("Tests: 0 passed, 1 failed, 0 skipped / 1 total\n"), "{}", out);
}

/// Nested files are addressable by their relative paths
#[test]
fn test_nested_modules() {
    let dir = project(&[
        ("lib/math.js", "exports.double = (n) => n * 2"),
        ("specs/math.test.js", "const { double } = require('../lib/math.js'); test('double', () => expect(double(4)).toBe(8))"),
    ]);
    let (result, _) = run(dir.path(), &["--entry", "specs/math.test.js"]);
    assert!(result.is_success(), "{}", result.text());
}

#[test]
fn test_config_file_sets_entry_and_flags_override() {
    let dir = project(&[("loop.test.js", "test('spin', () => { while (true) {} })")]);
    let config = dir.path().join("sandbox.json");
    fs::write(&config, r#"{ "default_entry": "loop.test.js", "max_steps": 1000000 }"#).unwrap();

    let (result, out) = run(dir.path(), &["--config", config.to_str().unwrap(), "--max-steps", "2000"]);
    assert_eq!(result.summary.failed, 1);
    assert!(out.contains("execution budget of 2000 steps exhausted"), "{}", out);
}

#[test]
fn test_json_output() {
    let dir = project(&[("index.test.js", "console.log('hi'); test('ok', () => {})")]);
    let (result, out) = run(dir.path(), &["--json"]);
    assert!(result.is_success());

    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["summary"]["passed"], 1);
    assert_eq!(json["lines"][0]["kind"], "console");
    assert_eq!(json["lines"][1]["kind"], "pass");
}

#[test]
fn test_missing_entry_reports_fatal() {
    let dir = project(&[("other.js", "")]);
    let (result, out) = run(dir.path(), &[]);
    assert!(result.fatal.is_some());
    assert_eq!(out, "ERROR index.test.js: ModuleNotFoundError: Cannot find module 'index.test.js'\n");
}

#[test]
fn test_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut out = Vec::new();
    let error = execute(&cli(&dir.path().join("absent"), &[]), &mut out).unwrap_err();
    assert!(matches!(error, CliError::NotADirectory(_)));
}
