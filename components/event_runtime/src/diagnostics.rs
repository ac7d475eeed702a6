//! Host-facing diagnostics.
//!
//! Uncaught callback errors and unhandled promise rejections are not fatal:
//! they are logged and recorded here for the host to collect with
//! [`crate::EventLoop::take_diagnostics`].
//!
//! A rejection can only be called unhandled after a full microtask drain,
//! because a handler attached later in the same drain still observes it.
//! The tracker therefore holds rejected-without-handler promises until
//! [`RejectionTracker::flush`] runs at the end of the drain.

use crate::promise::{Promise, PromiseId, WeakPromise};
use crate::task_queue::TaskId;
use core_types::JsError;
use std::fmt;

/// Which kind of callback failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackSource {
    /// A task from the task queue
    Task(TaskId),
    /// A microtask (promise reaction, adoption job or scheduled callback)
    Microtask,
}

impl fmt::Display for CallbackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackSource::Task(id) => write!(f, "task#{}", id),
            CallbackSource::Microtask => f.write_str("microtask"),
        }
    }
}

/// An event surfaced to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A promise was rejected and no handler was attached by the end of the
    /// microtask drain.
    UnhandledRejection {
        /// The rejected promise
        promise: PromiseId,
        /// Its rejection reason
        reason: JsError,
    },
    /// A handler was attached to a promise previously reported unhandled.
    RejectionHandled {
        /// The promise that is now handled
        promise: PromiseId,
    },
    /// A task or microtask callback returned an error.
    UncaughtError {
        /// The failing callback
        source: CallbackSource,
        /// The error it returned
        error: JsError,
    },
}

/// Tracks rejections that have no handler yet.
#[derive(Debug, Default)]
pub(crate) struct RejectionTracker {
    pending: Vec<Promise>,
    reported: Vec<(PromiseId, WeakPromise)>,
}

impl RejectionTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records a promise that was rejected while nothing handled it.
    pub(crate) fn rejected(&mut self, promise: &Promise) {
        self.pending.push(promise.clone());
    }

    /// Notes that `promise` got its first handler.
    ///
    /// Returns a [`Diagnostic::RejectionHandled`] if the promise had already
    /// been reported as unhandled.
    pub(crate) fn handler_added(&mut self, promise: &Promise) -> Option<Diagnostic> {
        let id = promise.id();
        if let Some(index) = self.pending.iter().position(|p| p.id() == id) {
            self.pending.remove(index);
            return None;
        }
        let index = self.reported.iter().position(|(reported, _)| *reported == id)?;
        self.reported.remove(index);
        Some(Diagnostic::RejectionHandled { promise: id })
    }

    /// Reports every pending rejection that is still unhandled.
    pub(crate) fn flush(&mut self) -> Vec<Diagnostic> {
        self.reported.retain(|(_, weak)| weak.is_alive());
        let mut out = Vec::with_capacity(self.pending.len());
        for promise in self.pending.drain(..) {
            if promise.is_handled() {
                continue;
            }
            if let Some(reason) = promise.reason() {
                self.reported.push((promise.id(), promise.downgrade()));
                out.push(Diagnostic::UnhandledRejection {
                    promise: promise.id(),
                    reason,
                });
            }
        }
        out
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
