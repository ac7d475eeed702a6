//! Script-level error types.
//!
//! A [`JsError`] is the rejection reason carried by a promise and the failure
//! value returned by task, microtask and reaction callbacks.

use crate::{SourcePosition, StackFrame};
use std::fmt;
use thiserror::Error;

/// The kind of a script error.
///
/// These correspond to the built-in error constructors a promise runtime
/// produces or propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Plain `Error`, used for application-level failures
    Error,
    /// Type error (e.g. a promise resolved with itself)
    TypeError,
    /// Value out of allowed range
    RangeError,
    /// Reference to an unknown binding
    ReferenceError,
    /// Several errors reported together (`any` with every input rejected)
    AggregateError,
    /// Internal runtime error
    InternalError,
}

impl ErrorKind {
    /// Returns the constructor name of this kind.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::AggregateError => "AggregateError",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A script error with message and stack trace.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, JsError};
///
/// let error = JsError::type_error("undefined is not a function");
/// assert_eq!(error.kind, ErrorKind::TypeError);
/// assert_eq!(error.to_string(), "TypeError: undefined is not a function");
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct JsError {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Stack trace (call stack at the time of the error, innermost last)
    pub stack: Vec<StackFrame>,
    /// Source position where the error occurred
    pub source_position: Option<SourcePosition>,
    /// Member errors of an `AggregateError`, in input order
    pub errors: Vec<JsError>,
}

impl JsError {
    /// Creates an error of the given kind with an empty stack.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stack: Vec::new(),
            source_position: None,
            errors: Vec::new(),
        }
    }

    /// Creates a plain `Error`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Error, message)
    }

    /// Creates a `TypeError`.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    /// Creates a `RangeError`.
    pub fn range_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RangeError, message)
    }

    /// Creates an `AggregateError` wrapping `errors`.
    ///
    /// ```
    /// use core_types::{ErrorKind, JsError};
    ///
    /// let agg = JsError::aggregate(
    ///     vec![JsError::error("a"), JsError::error("b")],
    ///     "All promises were rejected",
    /// );
    /// assert_eq!(agg.kind, ErrorKind::AggregateError);
    /// assert_eq!(agg.errors.len(), 2);
    /// ```
    pub fn aggregate(errors: Vec<JsError>, message: impl Into<String>) -> Self {
        Self {
            errors,
            ..Self::new(ErrorKind::AggregateError, message)
        }
    }

    /// Replaces the stack trace.
    pub fn with_stack(mut self, stack: Vec<StackFrame>) -> Self {
        self.stack = stack;
        self
    }

    /// Sets the source position.
    pub fn with_position(mut self, position: SourcePosition) -> Self {
        self.source_position = Some(position);
        self
    }
}
