//! Orchestrates one end-to-end run

use std::rc::Rc;
use std::thread;
use std::time::Duration;

use builtins::ConsoleWriter;
use crossbeam::channel::{self, RecvTimeoutError, Sender};
use interpreter::{Control, Interpreter, StepBudget};
use tracing::{debug, warn};

use crate::assertion;
use crate::config::SandboxConfig;
use crate::error::{Result, SandboxError};
use crate::harness::{error_parts, Harness};
use crate::instantiator::Instantiator;
use crate::report::{OutputLine, RunError, RunResult, Summary};
use crate::resolver::Resolver;
use crate::source_set::SourceSet;

/// How often the caller thread checks whether a silent worker has finished
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs test entry files against a source table
///
/// Each call to [`Sandbox::run`] builds a fresh realm, module registry and
/// test tree on a dedicated thread, so nothing leaks from one run into the
/// next.
///
/// # Examples
///
/// ```
/// use sandbox::{Sandbox, SandboxConfig, SourceSet};
///
/// let sources: SourceSet = [
///     ("index.js", "module.exports = { truth: () => 42 }"),
///     (
///         "index.test.js",
///         "const { truth } = require('index.js');
///          test('truth', () => expect(truth()).toBe(42));",
///     ),
/// ]
/// .into_iter()
/// .collect();
///
/// let mut streamed = Vec::new();
/// let result = Sandbox::new(SandboxConfig::default()).run(&sources, "index.test.js", |line| {
///     streamed.push(line.to_string());
/// });
///
/// assert_eq!(streamed, vec!["PASS truth", "Tests: 1 passed, 0 failed, 0 skipped / 1 total"]);
/// assert!(result.is_success());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    config: SandboxConfig,
}

impl Sandbox {
    /// Sandbox with `config`
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Run `entry` from `sources`, passing every output line to `on_output`
    /// as soon as it is produced
    ///
    /// Never fails: problems in the sandboxed code, and in the sandbox
    /// machinery itself, become output lines.
    #[tracing::instrument(skip(self, sources, on_output), fields(files = sources.len()))]
    pub fn run(&self, sources: &SourceSet, entry: &str, mut on_output: impl FnMut(&str)) -> RunResult {
        let (sender, receiver) = channel::unbounded::<OutputLine>();
        let config = &self.config;
        let mut lines = Vec::new();

        let finished = thread::scope(|scope| -> Result<(Summary, Option<RunError>)> {
            let worker = thread::Builder::new()
                .name("sandbox-run".to_string())
                .stack_size(config.stack_size)
                .spawn_scoped(scope, move || Run::new(config, sources, sender).execute(entry))?;

            let mut deliver = |line: OutputLine| {
                on_output(&line.to_string());
                lines.push(line);
            };
            loop {
                match receiver.recv_timeout(POLL_INTERVAL) {
                    Ok(line) => deliver(line),
                    Err(RecvTimeoutError::Timeout) if !worker.is_finished() => {}
                    Err(_) => break,
                }
            }
            receiver.try_iter().for_each(&mut deliver);
            worker.join().map_err(|panic| SandboxError::WorkerPanicked(panic_message(panic.as_ref())))
        });

        match finished {
            Ok((summary, fatal)) => RunResult { lines, summary, fatal },
            Err(error) => {
                warn!(%error, "sandbox run aborted");
                let fatal = RunError {
                    entry: entry.to_string(),
                    name: "InternalError".to_string(),
                    message: error.to_string(),
                };
                let line = OutputLine::Error(fatal.clone());
                on_output(&line.to_string());
                lines.push(line);
                RunResult {
                    lines,
                    summary: Summary::default(),
                    fatal: Some(fatal),
                }
            }
        }
    }
}

/// Run `entry` with the default configuration
pub fn run(sources: &SourceSet, entry: &str, on_output: impl FnMut(&str)) -> RunResult {
    Sandbox::default().run(sources, entry, on_output)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Sends console text into the run's output stream
struct ChannelWriter {
    sender: Sender<OutputLine>,
}

impl ConsoleWriter for ChannelWriter {
    fn write(&self, message: &str) {
        // The receiver only disappears once the run is over.
        let _ = self.sender.send(OutputLine::Console {
            text: message.to_string(),
        });
    }
}

/// State owned by one run on the worker thread
struct Run {
    interp: Interpreter,
    loader: Rc<Instantiator>,
    harness: Rc<Harness>,
    sender: Sender<OutputLine>,
}

impl Run {
    fn new(config: &SandboxConfig, sources: &SourceSet, sender: Sender<OutputLine>) -> Self {
        let mut interp = Interpreter::with_limits(StepBudget::new(config.max_steps), config.max_call_depth);
        builtins::install_with_console(&mut interp, Rc::new(ChannelWriter { sender: sender.clone() }));
        assertion::install(&mut interp);
        let harness = Harness::new();
        harness.install(&mut interp);

        Self {
            interp,
            loader: Instantiator::new(Resolver::new(sources.clone())),
            harness,
            sender,
        }
    }

    fn emit(&self, line: OutputLine) {
        let _ = self.sender.send(line);
    }

    fn execute(mut self, entry: &str) -> (Summary, Option<RunError>) {
        if let Err(control) = self.loader.require(&mut self.interp, entry, None) {
            let fatal = fatal_error(entry, &control);
            warn!(entry, name = %fatal.name, message = %fatal.message, "entry module failed");
            self.emit(OutputLine::Error(fatal.clone()));
            return (Summary::default(), Some(fatal));
        }
        debug!(entry, tests = self.harness.test_count(), modules = self.loader.registry().len(), "registration complete");

        let sender = self.sender.clone();
        let summary = self.harness.run(&mut self.interp, |path, outcome| {
            let _ = sender.send(OutputLine::for_outcome(path, outcome));
        });
        self.emit(OutputLine::Summary(summary));
        (summary, None)
    }
}

fn fatal_error(entry: &str, control: &Control) -> RunError {
    let (name, message) = match control {
        Control::Throw(value) => error_parts(value),
        Control::Halt(halt) => ("BudgetExhausted".to_string(), halt.to_string()),
    };
    RunError {
        entry: entry.to_string(),
        name,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(files: &[(&str, &str)]) -> SourceSet {
        files.iter().copied().collect()
    }

    fn run_text(files: &[(&str, &str)]) -> Vec<String> {
        let result = run(&sources(files), "index.test.js", |_| {});
        result.lines.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_console_output_interleaves_with_results() {
        let lines = run_text(&[(
            "index.test.js",
            "console.log('loading');
             test('first', () => { console.log('in first') });
             test('second', () => { console.warn('careful') });",
        )]);
        assert_eq!(
            lines,
            vec![
                "loading",
                "in first",
                "PASS first",
                "Warning: careful",
                "PASS second",
                "Tests: 2 passed, 0 failed, 0 skipped / 2 total",
            ]
        );
    }

    #[test]
    fn test_streams_every_line() {
        let mut streamed = Vec::new();
        let result = run(
            &sources(&[("index.test.js", "test('a', () => {}); test('b', () => { throw new Error('x') })")]),
            "index.test.js",
            |line| streamed.push(line.to_string()),
        );
        assert_eq!(streamed.join("\n"), result.text());
        assert_eq!(result.summary.failed, 1);
        assert!(!result.is_success());
    }

    #[test]
    fn test_zero_tests_still_summarize() {
        let lines = run_text(&[("index.test.js", "const x = 1;")]);
        assert_eq!(lines, vec!["Tests: 0 passed, 0 failed, 0 skipped / 0 total"]);
    }

    #[test]
    fn test_missing_entry_is_fatal() {
        let result = run(&SourceSet::new(), "index.test.js", |_| {});
        assert_eq!(result.text(), "ERROR index.test.js: ModuleNotFoundError: Cannot find module 'index.test.js'");
        assert_eq!(result.fatal.map(|fatal| fatal.name), Some("ModuleNotFoundError".to_string()));
    }

    #[test]
    fn test_registration_error_stops_the_run() {
        let lines = run_text(&[(
            "index.test.js",
            "test('never runs', () => {}); describe('broken', () => { undefinedFunction() })",
        )]);
        assert_eq!(lines, vec!["ERROR index.test.js: ReferenceError: undefinedFunction is not defined"]);
    }

    #[test]
    fn test_entry_syntax_error() {
        let lines = run_text(&[("index.test.js", "test('x', () => {")]);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("ERROR index.test.js: SyntaxError: "), "{}", lines[0]);
        assert!(lines[0].contains("(index.test.js"), "{}", lines[0]);
    }

    #[test]
    fn test_top_level_budget() {
        let sandbox = Sandbox::new(SandboxConfig::default().with_max_steps(1_000));
        let result = sandbox.run(&sources(&[("index.test.js", "while (true) {}")]), "index.test.js", |_| {});
        assert_eq!(result.text(), "ERROR index.test.js: BudgetExhausted: execution budget of 1000 steps exhausted");
    }

    #[test]
    fn test_deep_recursion_is_a_range_error() {
        let sandbox = Sandbox::new(SandboxConfig::default().with_max_call_depth(32));
        let result = sandbox.run(
            &sources(&[(
                "index.test.js",
                "function down(n) { return down(n + 1) }
                 test('recursion', () => { expect(() => down(0)).toThrow(RangeError) })",
            )]),
            "index.test.js",
            |_| {},
        );
        assert!(result.is_success(), "{}", result.text());
    }

    #[test]
    fn test_runs_are_isolated() {
        let files = sources(&[
            ("counter.js", "module.exports = { n: 0 }"),
            ("index.test.js", "const c = require('counter.js'); c.n++; test('fresh', () => expect(c.n).toBe(1))"),
        ]);
        let sandbox = Sandbox::default();
        assert!(sandbox.run(&files, "index.test.js", |_| {}).is_success());
        assert!(sandbox.run(&files, "index.test.js", |_| {}).is_success());
    }

    #[test]
    fn test_circular_entry() {
        let lines = run_text(&[
            ("index.test.js", "require('./a.js')"),
            ("a.js", "require('index.test.js')"),
        ]);
        assert_eq!(
            lines,
            vec!["ERROR index.test.js: CircularRequireError: Circular require detected: index.test.js -> a.js -> index.test.js"]
        );
    }
}
