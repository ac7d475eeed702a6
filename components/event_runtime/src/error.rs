//! Host-level runtime errors.
//!
//! These are failures of the scheduler itself, distinct from [`JsError`],
//! which is the script-level reason a promise rejects with.

use core_types::JsError;
use thiserror::Error;

/// Errors returned by the event loop and its handles.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The loop has terminated or been dropped; no more work can be scheduled.
    #[error("event loop has terminated")]
    Terminated,

    /// Shutdown was requested while work was still queued.
    #[error("cannot shut down with pending work ({tasks} tasks, {microtasks} microtasks)")]
    PendingWork {
        /// Live tasks still in the task queue
        tasks: usize,
        /// Microtasks still in the microtask queue
        microtasks: usize,
    },

    /// A frame was popped out of nesting order.
    #[error("unbalanced call stack: expected depth {expected}, found {actual}")]
    UnbalancedStack {
        /// Depth the stack should have had
        expected: usize,
        /// Depth the stack actually had
        actual: usize,
    },

    /// A single microtask drain ran more microtasks than the configured budget.
    #[error("microtask budget of {0} exceeded in a single drain")]
    MicrotaskBudgetExceeded(usize),

    /// A callback failed and the loop runs with [`crate::ErrorPolicy::Abort`].
    #[error("uncaught error: {0}")]
    Uncaught(#[source] JsError),

    /// The runtime configuration could not be parsed or serialized.
    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for runtime operations.
pub type Result<T, E = RuntimeError> = std::result::Result<T, E>;
