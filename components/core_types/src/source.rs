//! Source position and stack frame types.
//!
//! Frames are pushed on the runtime call stack for every task, microtask and
//! promise executor, and snapshotted into [`crate::JsError::stack`].

use std::fmt;

/// Represents a position in source code.
///
/// # Examples
///
/// ```
/// use core_types::SourcePosition;
///
/// let pos = SourcePosition {
///     line: 10,
///     column: 5,
///     offset: 150,
/// };
///
/// assert_eq!(pos.line, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePosition {
    /// Line number (1-indexed)
    pub line: u32,
    /// Column number (1-indexed)
    pub column: u32,
    /// Byte offset from the start of the source
    pub offset: usize,
}

/// Represents a single frame in a call stack.
///
/// # Examples
///
/// ```
/// use core_types::StackFrame;
///
/// let frame = StackFrame::named("timer#3");
/// assert_eq!(frame.function_name.as_deref(), Some("timer#3"));
/// assert_eq!(frame.to_string(), "at timer#3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Name of the function, or None for anonymous callbacks
    pub function_name: Option<String>,
    /// URL or file path of the source, or None if not available
    pub source_url: Option<String>,
    /// Line number where the call occurred
    pub line: u32,
    /// Column number where the call occurred
    pub column: u32,
}

impl StackFrame {
    /// Creates a frame carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            function_name: Some(name.into()),
            source_url: None,
            line: 0,
            column: 0,
        }
    }

    /// Creates an anonymous frame.
    pub fn anonymous() -> Self {
        Self {
            function_name: None,
            source_url: None,
            line: 0,
            column: 0,
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.function_name.as_deref().unwrap_or("<anonymous>");
        match &self.source_url {
            Some(url) => write!(f, "at {} ({}:{}:{})", name, url, self.line, self.column),
            None => write!(f, "at {}", name),
        }
    }
}
