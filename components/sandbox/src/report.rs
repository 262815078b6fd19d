//! Lines and totals produced by a run

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::harness::{TestFailure, TestOutcome};

/// Pass/fail/skip counts of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Tests that passed
    pub passed: usize,
    /// Tests that failed
    pub failed: usize,
    /// Tests that were skipped
    pub skipped: usize,
    /// Every registered test
    pub total: usize,
}

impl Summary {
    /// Count one finished test
    pub fn record(&mut self, outcome: &TestOutcome) {
        self.total += 1;
        match outcome {
            TestOutcome::Passed => self.passed += 1,
            TestOutcome::Failed(_) => self.failed += 1,
            TestOutcome::Skipped => self.skipped += 1,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tests: {} passed, {} failed, {} skipped / {} total",
            self.passed, self.failed, self.skipped, self.total
        )
    }
}

/// Failure that stopped a run before or instead of its tests
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{name}: {message}")]
pub struct RunError {
    /// Entry filename of the run
    pub entry: String,
    /// Error name, e.g. `ModuleNotFoundError`
    pub name: String,
    /// Error message
    pub message: String,
}

/// One line of run output, in the order it was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputLine {
    /// Text written through `console`
    Console {
        /// Formatted console text
        text: String,
    },
    /// A test passed
    Pass {
        /// Ancestry and name joined with ` > `
        path: String,
    },
    /// A test failed
    Fail {
        /// Ancestry and name joined with ` > `
        path: String,
        /// Why it failed
        reason: TestFailure,
    },
    /// A test was skipped
    Skip {
        /// Ancestry and name joined with ` > `
        path: String,
    },
    /// The entry module could not be loaded
    Error(RunError),
    /// Final totals
    Summary(Summary),
}

impl OutputLine {
    /// Result line for a finished test
    pub fn for_outcome(path: &str, outcome: &TestOutcome) -> Self {
        let path = path.to_string();
        match outcome {
            TestOutcome::Passed => OutputLine::Pass { path },
            TestOutcome::Failed(reason) => OutputLine::Fail {
                path,
                reason: reason.clone(),
            },
            TestOutcome::Skipped => OutputLine::Skip { path },
        }
    }
}

impl fmt::Display for OutputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputLine::Console { text } => f.write_str(text),
            OutputLine::Pass { path } => write!(f, "PASS {}", path),
            OutputLine::Fail { path, reason } => write!(f, "FAIL {}: {}", path, reason),
            OutputLine::Skip { path } => write!(f, "SKIP {}", path),
            OutputLine::Error(error) => write!(f, "ERROR {}: {}", error.entry, error),
            OutputLine::Summary(summary) => write!(f, "{}", summary),
        }
    }
}

/// Everything one run produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunResult {
    /// Output lines in production order
    pub lines: Vec<OutputLine>,
    /// Test totals
    pub summary: Summary,
    /// Set when the entry module failed and no tests ran
    pub fatal: Option<RunError>,
}

impl RunResult {
    /// All lines joined with newlines
    pub fn text(&self) -> String {
        self.lines.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
    }

    /// True when the run completed and no test failed
    pub fn is_success(&self) -> bool {
        self.fatal.is_none() && self.summary.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut summary = Summary::default();
        summary.record(&TestOutcome::Passed);
        summary.record(&TestOutcome::Skipped);
        summary.record(&TestOutcome::Failed(TestFailure::BudgetExhausted { steps: 10 }));
        assert_eq!(summary.to_string(), "Tests: 1 passed, 1 failed, 1 skipped / 3 total");
    }

    #[test]
    fn test_line_formats() {
        let fail = OutputLine::for_outcome(
            "truth > All number is 42",
            &TestOutcome::Failed(TestFailure::UnexpectedError {
                name: "TypeError".to_string(),
                message: "x is not a function".to_string(),
            }),
        );
        assert_eq!(fail.to_string(), "FAIL truth > All number is 42: TypeError: x is not a function");
        assert_eq!(OutputLine::for_outcome("a", &TestOutcome::Skipped).to_string(), "SKIP a");

        let error = OutputLine::Error(RunError {
            entry: "index.test.js".to_string(),
            name: "ModuleNotFoundError".to_string(),
            message: "Cannot find module 'x.js' from 'index.test.js'".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "ERROR index.test.js: ModuleNotFoundError: Cannot find module 'x.js' from 'index.test.js'"
        );
    }

    #[test]
    fn test_result_text_and_json() {
        let result = RunResult {
            lines: vec![
                OutputLine::Console { text: "hello".to_string() },
                OutputLine::Pass { path: "works".to_string() },
                OutputLine::Summary(Summary {
                    passed: 1,
                    total: 1,
                    ..Summary::default()
                }),
            ],
            summary: Summary {
                passed: 1,
                total: 1,
                ..Summary::default()
            },
            fatal: None,
        };
        assert_eq!(result.text(), "hello\nPASS works\nTests: 1 passed, 0 failed, 0 skipped / 1 total");
        assert!(result.is_success());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["lines"][1]["kind"], "pass");
        assert_eq!(json["lines"][2]["kind"], "summary");
        assert_eq!(json["summary"]["passed"], 1);
    }
}
