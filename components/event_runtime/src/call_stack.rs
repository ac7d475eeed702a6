//! Call stack of nested synchronous execution frames.
//!
//! The loop pushes one frame per task or microtask callback and every
//! promise executor runs inside its own frame. Frames must be popped in
//! strict LIFO order; a callback has run to completion when the stack is back
//! to the depth it had before the callback started.

use crate::error::{Result, RuntimeError};
use core_types::StackFrame;

/// Identifies a pushed frame by the depth it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameId(usize);

impl FrameId {
    /// Zero-based depth of the frame.
    pub fn depth(self) -> usize {
        self.0
    }
}

/// Stack of active frames, innermost last.
#[derive(Debug, Default)]
pub struct CallStack {
    frames: Vec<StackFrame>,
}

impl CallStack {
    /// Creates an empty call stack.
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Pushes a frame and returns its id.
    pub fn push(&mut self, frame: StackFrame) -> FrameId {
        let id = FrameId(self.frames.len());
        log::trace!("push frame {} at depth {}", frame, id.0);
        self.frames.push(frame);
        id
    }

    /// Pops the frame identified by `id`.
    ///
    /// Fails if `id` is not the innermost frame: a frame cannot be popped
    /// while frames it pushed remain.
    pub fn pop(&mut self, id: FrameId) -> Result<StackFrame> {
        let top = self.frames.len();
        if top != id.0 + 1 {
            return Err(RuntimeError::UnbalancedStack {
                expected: id.0 + 1,
                actual: top,
            });
        }
        self.frames.pop().ok_or(RuntimeError::UnbalancedStack {
            expected: id.0 + 1,
            actual: 0,
        })
    }

    /// Drops every frame above `depth`, returning how many were discarded.
    pub(crate) fn unwind_to(&mut self, depth: usize) -> usize {
        let extra = self.frames.len().saturating_sub(depth);
        self.frames.truncate(depth);
        extra
    }

    /// Number of active frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if no frame is active.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Snapshot of the active frames, innermost last.
    pub fn frames(&self) -> Vec<StackFrame> {
        self.frames.clone()
    }
}
