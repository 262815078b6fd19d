//! JavaScript Parser Component
//!
//! Provides the lexer, parser and AST for the JavaScript subset executed by
//! the sandbox: ES5 statements plus `let`/`const`, arrow functions,
//! destructuring, spread, template literals, optional chaining and regular
//! expression literals. Syntax outside that subset (classes, async functions,
//! generators, ES module syntax, labels) is rejected with a `SyntaxError`.
//!
//! # Overview
//!
//! - [`Lexer`] - Tokenizes JavaScript source code
//! - [`Token`] - Token types including identifiers, literals, keywords
//! - [`Parser`] - Recursive descent parser producing a [`Program`]
//! - [`ast`] - Abstract Syntax Tree node types
//!
//! # Example
//!
//! ```
//! use parser::{Parser, Statement};
//!
//! let source = "const answer = require('./answer.js');";
//! let mut parser = Parser::new(source);
//! let program = parser.parse().unwrap();
//!
//! assert!(matches!(program.body[0], Statement::VariableDeclaration { .. }));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::{Expression, FunctionNode, Program, Statement};
pub use lexer::{Keyword, Lexer, Punctuator, Token};
pub use parser::{Parser, MAX_NESTING_DEPTH};

/// Parse a complete source text.
pub fn parse(source: &str) -> Result<Program, core_types::JsError> {
    Parser::new(source).parse()
}
