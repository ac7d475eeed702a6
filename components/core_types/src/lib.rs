//! Core value and error types for the event runtime.
//!
//! This crate provides the foundational types shared by the scheduler and
//! the promise engine: the dynamically typed payload of a promise, the error
//! type used as rejection reason, and source location / stack frame tracking.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of runtime values
//! - [`JsError`] - Errors with stack traces, used as rejection reasons
//! - [`ErrorKind`] - Types of errors
//! - [`SourcePosition`] - Source code location
//! - [`StackFrame`] - Call stack frame information
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, JsError, Value};
//!
//! let num = Value::Smi(42);
//! assert!(num.is_truthy());
//! assert_eq!(num.type_of(), "number");
//!
//! let error = JsError::type_error("undefined is not a function");
//! assert_eq!(error.kind, ErrorKind::TypeError);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod source;
mod value;

pub use error::{ErrorKind, JsError};
pub use source::{SourcePosition, StackFrame};
pub use value::Value;
