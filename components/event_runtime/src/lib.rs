//! Single-threaded cooperative event loop with a promise engine.
//!
//! This crate provides the async runtime for a JavaScript-style host:
//! - Event loop with a task queue, a microtask queue and a call stack
//! - Promise implementation following the Promise/A+ model, with
//!   thenable adoption
//! - The `all`, `all_settled`, `any` and `race` combinators
//!
//! # Overview
//!
//! - [`EventLoop`] - owns the queues and runs turns
//! - [`Handle`] - same-thread context for scheduling work and creating promises
//! - [`Remote`] - `Send` handle for injecting tasks from other threads
//! - [`Promise`] - deferred value with `then`/`catch`/`finally`
//!
//! # Examples
//!
//! ## Event Loop Usage
//!
//! ```
//! use event_runtime::{EventLoop, Task};
//!
//! let mut event_loop = EventLoop::new();
//! event_loop.enqueue_task(Task::new(|| Ok(()))).unwrap();
//! event_loop.run_until_done().unwrap();
//! ```
//!
//! ## Promise Usage
//!
//! ```
//! use core_types::Value;
//! use event_runtime::{EventLoop, Promise, PromiseState};
//!
//! let mut event_loop = EventLoop::new();
//! let (promise, resolvers) = Promise::pending(&event_loop.handle());
//! resolvers.resolve(Value::Smi(42));
//! assert_eq!(promise.state(), PromiseState::Fulfilled(Value::Smi(42)));
//!
//! let seen = promise.and_then(|v| Ok(v));
//! event_loop.run_until_done().unwrap();
//! assert_eq!(seen.value(), Some(Value::Smi(42)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod call_stack;
pub mod clock;
pub mod combinators;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod event_loop;
pub mod handle;
pub mod promise;
pub mod task_queue;
pub mod thenable;

// Re-export main types at crate root
pub use call_stack::{CallStack, FrameId};
pub use clock::{Clock, SystemClock, VirtualClock};
pub use combinators::{all, all_settled, any, race, SettledOutcome, ALL_REJECTED};
pub use config::{ClockKind, ErrorPolicy, RuntimeConfig};
pub use diagnostics::{CallbackSource, Diagnostic};
pub use error::{Result, RuntimeError};
pub use event_loop::{EventLoop, LoopState};
pub use handle::{Handle, Remote};
pub use promise::{FulfillHandler, Promise, PromiseId, PromiseState, RejectHandler, Resolvers};
pub use task_queue::{
    CancelHandle, MicroTask, MicrotaskQueue, Task, TaskId, TaskQueue, TaskStatus,
};
pub use thenable::{Resolution, Thenable};
