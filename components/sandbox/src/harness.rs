//! `describe`/`test` registration and test execution

use std::cell::{OnceCell, RefCell};
use std::rc::Rc;

use builtins::value::arg;
use builtins::{display, JsResult};
use core_types::ErrorKind;
use interpreter::{Control, Halt, Interpreter, NativeFn, ObjectRef, Value};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::assertion::{assertion_failure, AssertionFailure};
use crate::instantiator::module_error;
use crate::report::Summary;
use crate::resolver::ModuleError;

/// Why a test failed
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type")]
pub enum TestFailure {
    /// An `expect` matcher failed
    #[error("{0}")]
    AssertionFailure(AssertionFailure),
    /// A `require` inside the test could not be satisfied
    #[error("{}: {0}", .0.name())]
    ModuleError(ModuleError),
    /// Any other thrown value
    #[error("{}", error_text(.name, .message))]
    UnexpectedError {
        /// Error name (`TypeError`, ...)
        name: String,
        /// Error message
        message: String,
    },
    /// The test ran out of execution steps
    #[error("execution budget of {steps} steps exhausted")]
    BudgetExhausted {
        /// Configured limit
        steps: u64,
    },
}

fn error_text(name: &str, message: &str) -> String {
    if message.is_empty() {
        name.to_string()
    } else {
        format!("{}: {}", name, message)
    }
}

impl TestFailure {
    /// Classify an abrupt completion escaping a test
    pub fn from_control(control: &Control) -> Self {
        match control {
            Control::Halt(Halt::BudgetExhausted { steps }) => TestFailure::BudgetExhausted { steps: *steps },
            Control::Throw(value) => Self::from_thrown(value),
        }
    }

    /// Classify a thrown value
    pub fn from_thrown(value: &Value) -> Self {
        if let Some(failure) = assertion_failure(value) {
            return TestFailure::AssertionFailure(failure);
        }
        if let Some(error) = module_error(value) {
            return TestFailure::ModuleError(error);
        }
        let (name, message) = error_parts(value);
        TestFailure::UnexpectedError { name, message }
    }
}

/// `(name, message)` of a thrown value; non-errors are reported as `Error`
pub fn error_parts(value: &Value) -> (String, String) {
    match value {
        Value::Object(object) if object.is_error() => {
            let name = match object.get("name") {
                Value::String(name) => name.to_string(),
                _ => "Error".to_string(),
            };
            let message = match object.get("message") {
                Value::Undefined => String::new(),
                other => display(&other),
            };
            (name, message)
        }
        other => ("Error".to_string(), display(other)),
    }
}

/// Final state of a test that has been run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TestOutcome {
    /// Body and hooks completed
    Passed,
    /// Something threw or the budget ran out
    Failed(TestFailure),
    /// Registered through `test.skip` or inside `describe.skip`
    Skipped,
}

/// One registered `test(name, body)`
#[derive(Debug)]
pub struct TestCase {
    /// Test name
    pub name: String,
    /// Enclosing describe names, outermost first
    pub ancestry: Vec<String>,
    body: Value,
    block: usize,
    skipped: bool,
    outcome: OnceCell<TestOutcome>,
}

impl TestCase {
    /// Ancestry and name joined with ` > `
    pub fn path(&self) -> String {
        let mut parts: Vec<&str> = self.ancestry.iter().map(String::as_str).collect();
        parts.push(&self.name);
        parts.join(" > ")
    }

    /// `None` until the test has run
    pub fn outcome(&self) -> Option<&TestOutcome> {
        self.outcome.get()
    }

    /// Store the outcome; `false` if one was already stored
    fn record(&self, outcome: TestOutcome) -> bool {
        self.outcome.set(outcome).is_ok()
    }
}

/// One `describe` block; block 0 is the implicit root
#[derive(Debug)]
struct DescribeBlock {
    name: String,
    parent: Option<usize>,
    skipped: bool,
    before_each: Vec<Value>,
    after_each: Vec<Value>,
    entries: Vec<Entry>,
}

#[derive(Debug, Clone, Copy)]
enum Entry {
    Test(usize),
    Block(usize),
}

#[derive(Debug)]
struct Registry {
    blocks: Vec<DescribeBlock>,
    tests: Vec<TestCase>,
    current: Vec<usize>,
    running: bool,
}

impl Registry {
    fn new() -> Self {
        Self {
            blocks: vec![DescribeBlock {
                name: String::new(),
                parent: None,
                skipped: false,
                before_each: Vec::new(),
                after_each: Vec::new(),
                entries: Vec::new(),
            }],
            tests: Vec::new(),
            current: vec![0],
            running: false,
        }
    }

    fn current_block(&self) -> usize {
        self.current.last().copied().unwrap_or(0)
    }

    fn open_block(&mut self, name: String, skip: bool) {
        let parent = self.current_block();
        let id = self.blocks.len();
        self.blocks.push(DescribeBlock {
            name,
            parent: Some(parent),
            skipped: skip || self.blocks[parent].skipped,
            before_each: Vec::new(),
            after_each: Vec::new(),
            entries: Vec::new(),
        });
        self.blocks[parent].entries.push(Entry::Block(id));
        self.current.push(id);
    }

    fn close_block(&mut self) {
        if self.current.len() > 1 {
            self.current.pop();
        }
    }

    fn add_test(&mut self, name: String, body: Value, skip: bool) {
        let block = self.current_block();
        let id = self.tests.len();
        self.tests.push(TestCase {
            name,
            ancestry: self.ancestry(block),
            body,
            block,
            skipped: skip || self.blocks[block].skipped,
            outcome: OnceCell::new(),
        });
        self.blocks[block].entries.push(Entry::Test(id));
    }

    /// Names from the outermost block down to `block`
    fn ancestry(&self, block: usize) -> Vec<String> {
        let mut names = Vec::new();
        let mut current = Some(block);
        while let Some(id) = current {
            if id != 0 {
                names.push(self.blocks[id].name.clone());
            }
            current = self.blocks[id].parent;
        }
        names.reverse();
        names
    }

    /// Depth-first, insertion-ordered test ids
    fn run_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.tests.len());
        let mut stack = vec![Entry::Block(0)];
        while let Some(entry) = stack.pop() {
            match entry {
                Entry::Test(id) => order.push(id),
                Entry::Block(id) => stack.extend(self.blocks[id].entries.iter().rev().copied()),
            }
        }
        order
    }

    /// `beforeEach` hooks outermost-first and `afterEach` hooks innermost-first
    fn hooks(&self, block: usize) -> (Vec<Value>, Vec<Value>) {
        let mut before = Vec::new();
        let mut after = Vec::new();
        let mut current = Some(block);
        while let Some(id) = current {
            let block = &self.blocks[id];
            before.splice(0..0, block.before_each.iter().cloned());
            after.extend(block.after_each.iter().cloned());
            current = block.parent;
        }
        (before, after)
    }
}

enum Done {
    Pending,
    Called,
    Failed(Value),
}

/// Test registry of one run plus the globals that feed it
///
/// Shared through an `Rc` because the installed natives hold handles back
/// to it.
#[derive(Debug)]
pub struct Harness {
    registry: RefCell<Registry>,
}

impl Harness {
    /// Harness with an empty root block
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            registry: RefCell::new(Registry::new()),
        })
    }

    /// Bind `describe`, `test`, `it`, `beforeEach` and `afterEach`
    pub fn install(self: &Rc<Self>, interp: &mut Interpreter) {
        let describe = self.registration_function(interp, "describe", false, Self::describe);
        let skip = self.registration_function(interp, "skip", true, Self::describe);
        describe.put_hidden("skip", Value::Object(skip));

        let test = self.registration_function(interp, "test", false, Self::test);
        let skip = self.registration_function(interp, "skip", true, Self::test);
        test.put_hidden("skip", Value::Object(skip));

        let global = interp.realm.global().clone();
        global.define("describe", Value::Object(describe));
        global.define("test", Value::Object(test.clone()));
        global.define("it", Value::Object(test));
        global.define("beforeEach", Value::Object(self.hook_function(interp, "beforeEach")));
        global.define("afterEach", Value::Object(self.hook_function(interp, "afterEach")));
    }

    /// Number of registered tests
    pub fn test_count(&self) -> usize {
        self.registry.borrow().tests.len()
    }

    /// `(path, outcome)` of every registered test, in registration order
    pub fn outcomes(&self) -> Vec<(String, Option<TestOutcome>)> {
        self.registry
            .borrow()
            .tests
            .iter()
            .map(|test| (test.path(), test.outcome().cloned()))
            .collect()
    }

    /// Close registration and run every test depth-first in registration
    /// order, reporting each outcome as soon as it is known
    pub fn run(&self, interp: &mut Interpreter, mut report: impl FnMut(&str, &TestOutcome)) -> Summary {
        let order = {
            let mut registry = self.registry.borrow_mut();
            registry.running = true;
            registry.run_order()
        };

        let mut summary = Summary::default();
        for id in order {
            let outcome = self.run_test(interp, id);
            let registry = self.registry.borrow();
            let test = &registry.tests[id];
            let path = test.path();
            match &outcome {
                TestOutcome::Failed(TestFailure::BudgetExhausted { steps }) => warn!(test = %path, steps, "test exhausted its budget"),
                other => debug!(test = %path, outcome = ?other, "test finished"),
            }
            summary.record(&outcome);
            report(&path, &outcome);
            if !test.record(outcome) {
                warn!(test = %path, "test outcome already recorded");
            }
        }
        summary
    }

    fn run_test(&self, interp: &mut Interpreter, id: usize) -> TestOutcome {
        let (body, skipped, before, after) = {
            let registry = self.registry.borrow();
            let test = &registry.tests[id];
            let (before, after) = registry.hooks(test.block);
            (test.body.clone(), test.skipped, before, after)
        };
        if skipped {
            return TestOutcome::Skipped;
        }

        interp.reset_budget();
        let mut failure = None;
        for hook in &before {
            if let Err(control) = interp.call(hook, Value::Undefined, &[]) {
                failure = Some(control);
                break;
            }
        }
        if failure.is_none() {
            failure = run_body(interp, &body).err();
        }
        for hook in &after {
            if matches!(failure, Some(Control::Halt(_))) {
                break;
            }
            if let Err(control) = interp.call(hook, Value::Undefined, &[]) {
                failure.get_or_insert(control);
            }
        }

        match failure {
            None => TestOutcome::Passed,
            Some(control) => TestOutcome::Failed(TestFailure::from_control(&control)),
        }
    }

    fn describe(self: &Rc<Self>, interp: &mut Interpreter, args: &[Value], skip: bool) -> JsResult {
        let (name, callback) = self.registration_args(interp, "describe", args)?;
        self.registry.borrow_mut().open_block(name, skip);
        let result = interp.call(&callback, Value::Undefined, &[]);
        self.registry.borrow_mut().close_block();
        result.map(|_| Value::Undefined)
    }

    fn test(self: &Rc<Self>, interp: &mut Interpreter, args: &[Value], skip: bool) -> JsResult {
        let (name, body) = self.registration_args(interp, "test", args)?;
        self.registry.borrow_mut().add_test(name, body, skip);
        Ok(Value::Undefined)
    }

    fn registration_args(&self, interp: &Interpreter, kind: &str, args: &[Value]) -> Result<(String, Value), Control> {
        let name = arg(args, 0);
        if self.registry.borrow().running {
            return Err(interp.throw_error(
                ErrorKind::Error,
                format!("Cannot register {} \"{}\" while tests are running", kind, display(&name)),
            ));
        }
        let name = match name {
            Value::String(name) => name.to_string(),
            other => {
                let received = interp.describe(&other);
                return Err(interp.type_error(format!("{}() name must be a string, received {}", kind, received)));
            }
        };
        let callback = arg(args, 1);
        if !callback.is_callable() {
            let received = interp.describe(&callback);
            return Err(interp.type_error(format!("{}() callback must be a function, received {}", kind, received)));
        }
        Ok((name, callback))
    }

    fn registration_function(
        self: &Rc<Self>,
        interp: &Interpreter,
        name: &str,
        skip: bool,
        register: fn(&Rc<Self>, &mut Interpreter, &[Value], bool) -> JsResult,
    ) -> ObjectRef {
        let harness = Rc::clone(self);
        let func: NativeFn = Rc::new(move |interp: &mut Interpreter, _this: Value, args: &[Value]| -> JsResult {
            register(&harness, interp, args, skip)
        });
        interp.realm.new_native_function(name, 2, func)
    }

    fn hook_function(self: &Rc<Self>, interp: &Interpreter, name: &'static str) -> ObjectRef {
        let harness = Rc::clone(self);
        let func: NativeFn = Rc::new(move |interp: &mut Interpreter, _this: Value, args: &[Value]| -> JsResult {
            let hook = arg(args, 0);
            let mut registry = harness.registry.borrow_mut();
            if registry.running {
                return Err(interp.throw_error(
                    ErrorKind::Error,
                    format!("Cannot register {} hook while tests are running", name),
                ));
            }
            if !hook.is_callable() {
                return Err(interp.type_error(format!("{}() expects a function, received {}", name, interp.describe(&hook))));
            }
            let block = registry.current_block();
            let hooks = &mut registry.blocks[block];
            if name == "beforeEach" {
                hooks.before_each.push(hook);
            } else {
                hooks.after_each.push(hook);
            }
            Ok(Value::Undefined)
        });
        interp.realm.new_native_function(name, 1, func)
    }
}

/// Call a test body; a body declaring a parameter must signal completion
/// through the `done` callback it receives
fn run_body(interp: &mut Interpreter, body: &Value) -> Result<(), Control> {
    let arity = match body.as_object().map(|function| function.get("length")) {
        Some(Value::Number(n)) => n,
        _ => 0.0,
    };
    if arity < 1.0 {
        return interp.call(body, Value::Undefined, &[]).map(|_| ());
    }

    let state = Rc::new(RefCell::new(Done::Pending));
    let signal = Rc::clone(&state);
    let func: NativeFn = Rc::new(move |_interp: &mut Interpreter, _this: Value, args: &[Value]| -> JsResult {
        let mut state = signal.borrow_mut();
        if matches!(*state, Done::Pending) {
            *state = match arg(args, 0) {
                Value::Undefined | Value::Null => Done::Called,
                error => Done::Failed(error),
            };
        }
        Ok(Value::Undefined)
    });
    let done = interp.realm.new_native_function("done", 1, func);
    interp.call(body, Value::Undefined, &[Value::Object(done)])?;

    let outcome = state.replace(Done::Pending);
    match outcome {
        Done::Called => Ok(()),
        Done::Failed(error) => Err(Control::Throw(error)),
        Done::Pending => Err(interp.throw_error(ErrorKind::Error, "done() was not called")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        interp: Interpreter,
        harness: Rc<Harness>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut interp = Interpreter::new();
            builtins::install(&mut interp);
            crate::assertion::install(&mut interp);
            let harness = Harness::new();
            harness.install(&mut interp);
            Self { interp, harness }
        }

        fn register(&mut self, source: &str) -> Result<Value, Control> {
            self.interp.eval_source(source)
        }

        fn run(&mut self) -> (Vec<String>, Summary) {
            let mut lines = Vec::new();
            let summary = self.harness.run(&mut self.interp, |path, outcome| {
                lines.push(crate::report::OutputLine::for_outcome(path, outcome).to_string());
            });
            (lines, summary)
        }
    }

    fn run(source: &str) -> Vec<String> {
        let mut fixture = Fixture::new();
        fixture.register(source).unwrap();
        fixture.run().0
    }

    #[test]
    fn test_runs_in_registration_order() {
        let lines = run("describe('a', () => { test('1', () => {}); test('2', () => {}) }); test('3', () => {})");
        assert_eq!(lines, vec!["PASS a > 1", "PASS a > 2", "PASS 3"]);
    }

    #[test]
    fn test_nested_ancestry() {
        let lines = run("describe('outer', () => { describe('inner', () => { it('deep', () => {}) }); test('shallow', () => {}) })");
        assert_eq!(lines, vec!["PASS outer > inner > deep", "PASS outer > shallow"]);
    }

    #[test]
    fn test_failure_does_not_stop_later_tests() {
        let mut fixture = Fixture::new();
        fixture
            .register("test('bad', () => { expect(1).toBe(2) }); test('throws', () => { null.x }); test('good', () => {})")
            .unwrap();
        let (lines, summary) = fixture.run();
        assert_eq!(lines[0], "FAIL bad: expect(received).toBe(expected): expected 2, received 1");
        assert!(lines[1].starts_with("FAIL throws: TypeError: "), "{}", lines[1]);
        assert_eq!(lines[2], "PASS good");
        assert_eq!((summary.passed, summary.failed, summary.total), (1, 2, 3));
    }

    #[test]
    fn test_failure_classification() {
        let mut fixture = Fixture::new();
        fixture
            .register(
                "test('a', () => expect(1).toBe(2));
                 test('m', () => { const e = new Error('x'); e.name = 'Custom'; throw e });
                 test('s', () => { throw 'plain' });",
            )
            .unwrap();
        fixture.run();
        let outcomes = fixture.harness.outcomes();
        assert!(matches!(outcomes[0].1, Some(TestOutcome::Failed(TestFailure::AssertionFailure(_)))));
        assert_eq!(
            outcomes[1].1,
            Some(TestOutcome::Failed(TestFailure::UnexpectedError {
                name: "Custom".to_string(),
                message: "x".to_string(),
            }))
        );
        assert_eq!(
            outcomes[2].1,
            Some(TestOutcome::Failed(TestFailure::UnexpectedError {
                name: "Error".to_string(),
                message: "plain".to_string(),
            }))
        );
    }

    #[test]
    fn test_skip() {
        let lines = run(
            "test.skip('later', () => { throw new Error('never') });
             describe.skip('off', () => { test('inside', () => {}) });
             test('on', () => {})",
        );
        assert_eq!(lines, vec!["SKIP later", "SKIP off > inside", "PASS on"]);
    }

    #[test]
    fn test_hook_order() {
        let mut fixture = Fixture::new();
        fixture
            .register(
                "const log = [];
                 beforeEach(() => log.push('b-outer'));
                 afterEach(() => log.push('a-outer'));
                 describe('d', () => {
                     beforeEach(() => log.push('b-inner'));
                     afterEach(() => log.push('a-inner'));
                     test('t', () => { log.push('body') });
                 });
                 test('check', () => expect(log.join()).toBe('b-outer,b-inner,body,a-inner,a-outer,b-outer'))",
            )
            .unwrap();
        let (lines, _) = fixture.run();
        assert_eq!(lines, vec!["PASS d > t", "PASS check"]);
    }

    #[test]
    fn test_after_each_runs_after_failure() {
        let lines = run(
            "let cleaned = 0;
             afterEach(() => { cleaned++ });
             test('fails', () => { throw new Error('boom') });
             test('sees cleanup', () => expect(cleaned).toBe(1))",
        );
        assert_eq!(lines, vec!["FAIL fails: Error: boom", "PASS sees cleanup"]);
    }

    #[test]
    fn test_failing_hook_fails_test() {
        let lines = run("beforeEach(() => { throw new RangeError('setup') }); test('t', () => {})");
        assert_eq!(lines, vec!["FAIL t: RangeError: setup"]);
    }

    #[test]
    fn test_done_callback() {
        let lines = run(
            "test('calls done', (done) => { done() });
             test('forgets', (done) => {});
             test('fails through done', (done) => { done(new Error('async boom')) });",
        );
        assert_eq!(
            lines,
            vec!["PASS calls done", "FAIL forgets: Error: done() was not called", "FAIL fails through done: Error: async boom"]
        );
    }

    #[test]
    fn test_registration_while_running() {
        let lines = run("test('outer', () => { test('inner', () => {}) })");
        assert_eq!(lines, vec!["FAIL outer: Error: Cannot register test \"inner\" while tests are running"]);
    }

    #[test]
    fn test_argument_validation() {
        let mut fixture = Fixture::new();
        let error = fixture.register("test(1, () => {})").unwrap_err();
        assert_eq!(builtins::describe_thrown(error.thrown().unwrap()), "TypeError: test() name must be a string, received 1");
        let error = fixture.register("describe('d', 'nope')").unwrap_err();
        assert!(builtins::describe_thrown(error.thrown().unwrap()).starts_with("TypeError: describe() callback"));
        assert_eq!(fixture.harness.test_count(), 0);
    }

    #[test]
    fn test_describe_errors_propagate() {
        let mut fixture = Fixture::new();
        let error = fixture.register("describe('d', () => { throw new Error('in describe') })").unwrap_err();
        assert_eq!(builtins::describe_thrown(error.thrown().unwrap()), "Error: in describe");
        fixture.register("test('after', () => {})").unwrap();
        assert_eq!(fixture.harness.outcomes()[0].0, "after");
    }

    #[test]
    fn test_budget_is_per_test() {
        let mut fixture = Fixture::new();
        fixture.interp.set_budget(interpreter::StepBudget::new(500));
        fixture
            .register(
                "test('spins', () => { while (true) {} });
                 test('small', () => { let n = 0; for (let i = 0; i < 50; i++) n += i; expect(n).toBe(1225) })",
            )
            .unwrap();
        let (lines, summary) = fixture.run();
        assert_eq!(lines[0], "FAIL spins: execution budget of 500 steps exhausted");
        assert_eq!(lines[1], "PASS small");
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn test_budget_exhaustion_is_not_catchable() {
        let mut fixture = Fixture::new();
        fixture.interp.set_budget(interpreter::StepBudget::new(200));
        fixture
            .register("test('catch', () => { try { for (;;) {} } catch (e) {} })")
            .unwrap();
        let (_, summary) = fixture.run();
        assert_eq!(fixture.harness.outcomes()[0].1, Some(TestOutcome::Failed(TestFailure::BudgetExhausted { steps: 200 })));
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn test_outcome_is_write_once() {
        let mut fixture = Fixture::new();
        fixture.register("test('once', () => {})").unwrap();
        fixture.run();
        let registry = fixture.harness.registry.borrow();
        assert!(!registry.tests[0].record(TestOutcome::Skipped));
        assert_eq!(registry.tests[0].outcome(), Some(&TestOutcome::Passed));
    }

    #[test]
    fn test_module_error_inside_test() {
        let failure = TestFailure::ModuleError(ModuleError::ModuleNotFound {
            specifier: "x.js".to_string(),
            from: Some("index.test.js".to_string()),
        });
        assert_eq!(failure.to_string(), "ModuleNotFoundError: Cannot find module 'x.js' from 'index.test.js'");
    }
}
