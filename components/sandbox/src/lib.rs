//! Virtual module system and sandboxed test runner
//!
//! A run takes a [`SourceSet`] (filename → source text) and an entry file,
//! and executes the entry inside a fresh interpreter realm that exposes:
//! - `require`, `module`, `exports` and `__filename` in every module scope
//! - `describe`, `test`/`it`, `beforeEach`, `afterEach` and `expect` globally
//! - the standard library from the `builtins` crate, with `console` output
//!   captured into the run
//!
//! Modules are instantiated at most once per run; circular requires and
//! missing modules are reported as errors rather than resolved partially.
//! After the entry module registers its tests they run depth-first in
//! registration order, each under a fresh step budget.
//!
//! # Example
//!
//! ```
//! use sandbox::{run, SourceSet};
//!
//! let mut sources = SourceSet::new();
//! sources.insert("index.js", "exports.truth = () => 48");
//! sources.insert(
//!     "index.test.js",
//!     "const { truth } = require('index.js');
//!      describe('truth', () => {
//!          test('All number is 42', () => { expect(truth()).toBe(42) })
//!      })",
//! );
//!
//! let result = run(&sources, "index.test.js", |_| {});
//! assert_eq!(
//!     result.text(),
//!     "FAIL truth > All number is 42: expect(received).toBe(expected): expected 42, received 48\n\
//!      Tests: 0 passed, 1 failed, 0 skipped / 1 total"
//! );
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assertion;
pub mod config;
pub mod error;
pub mod harness;
pub mod instantiator;
pub mod module;
pub mod report;
pub mod resolver;
pub mod run;
pub mod source_set;

// Re-export main types at crate root
pub use assertion::AssertionFailure;
pub use config::SandboxConfig;
pub use error::SandboxError;
pub use harness::{Harness, TestCase, TestFailure, TestOutcome};
pub use instantiator::Instantiator;
pub use module::{ModuleRecord, ModuleRegistry, ModuleState};
pub use report::{OutputLine, RunError, RunResult, Summary};
pub use resolver::{ModuleError, Resolver};
pub use run::{run, Sandbox};
pub use source_set::SourceSet;
