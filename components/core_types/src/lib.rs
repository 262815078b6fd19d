//! Core error and source-location types shared by every sandbox component.
//!
//! # Overview
//!
//! - [`JsError`] - An engine-level error (syntax errors, internal failures)
//! - [`ErrorKind`] - The JavaScript error constructor an error corresponds to
//! - [`SourcePosition`] - Line/column location in a source file
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, JsError, SourcePosition};
//!
//! let error = JsError::new(ErrorKind::SyntaxError, "Unexpected token")
//!     .with_position(SourcePosition::new(3, 7, 42));
//!
//! assert_eq!(error.to_string(), "SyntaxError: Unexpected token (3:7)");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod source;

pub use error::{ErrorKind, JsError};
pub use source::SourcePosition;
