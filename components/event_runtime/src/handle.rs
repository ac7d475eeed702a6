//! Handles to an event loop.
//!
//! All scheduling goes through an explicit context rather than ambient global
//! state. [`Handle`] is the single-threaded context passed to application
//! code and captured by promises; [`Remote`] is the `Send` counterpart other
//! threads use to inject tasks by message passing.

use crate::call_stack::CallStack;
use crate::clock::Clock;
use crate::config::RuntimeConfig;
use crate::diagnostics::{Diagnostic, RejectionTracker};
use crate::error::{Result, RuntimeError};
use crate::promise::{Promise, PromiseId};
use crate::task_queue::{CancelHandle, MicroTask, MicrotaskQueue, Task, TaskQueue};
use core_types::{JsError, StackFrame};
use crossbeam::channel::Sender;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

/// State shared between an [`crate::EventLoop`] and its handles.
pub(crate) struct Shared {
    pub(crate) config: RuntimeConfig,
    pub(crate) clock: Rc<dyn Clock>,
    pub(crate) tasks: RefCell<TaskQueue>,
    pub(crate) microtasks: RefCell<MicrotaskQueue>,
    pub(crate) stack: RefCell<CallStack>,
    pub(crate) rejections: RefCell<RejectionTracker>,
    pub(crate) diagnostics: RefCell<Vec<Diagnostic>>,
    pub(crate) terminated: Cell<bool>,
    pub(crate) shutdown_requested: Cell<bool>,
    next_promise_id: Cell<u64>,
}

impl Shared {
    pub(crate) fn new(config: RuntimeConfig, clock: Rc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            tasks: RefCell::new(TaskQueue::new()),
            microtasks: RefCell::new(MicrotaskQueue::new()),
            stack: RefCell::new(CallStack::new()),
            rejections: RefCell::new(RejectionTracker::new()),
            diagnostics: RefCell::new(Vec::new()),
            terminated: Cell::new(false),
            shutdown_requested: Cell::new(false),
            next_promise_id: Cell::new(1),
        }
    }

    pub(crate) fn record(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }
}

/// Cheap-clone context for scheduling work on one event loop.
///
/// A handle does not keep its loop alive. Once the loop is dropped or
/// terminated, scheduling through the handle fails with
/// [`RuntimeError::Terminated`].
#[derive(Clone)]
pub struct Handle {
    shared: Weak<Shared>,
}

impl Handle {
    pub(crate) fn new(shared: &Rc<Shared>) -> Self {
        Self {
            shared: Rc::downgrade(shared),
        }
    }

    fn live(&self) -> Result<Rc<Shared>> {
        let shared = self.shared.upgrade().ok_or(RuntimeError::Terminated)?;
        if shared.terminated.get() {
            return Err(RuntimeError::Terminated);
        }
        Ok(shared)
    }

    /// Returns true while the loop exists and has not terminated.
    pub fn is_alive(&self) -> bool {
        self.live().is_ok()
    }

    /// Schedules `callback` as a task that becomes ready after `not_before`.
    pub fn schedule_task<F>(&self, callback: F, not_before: Duration) -> Result<CancelHandle>
    where
        F: FnOnce() -> Result<(), JsError> + 'static,
    {
        self.enqueue_task(Task::delayed(callback, not_before))
    }

    /// Schedules `callback` to run every `period` until cancelled.
    pub fn schedule_repeating<F>(&self, callback: F, period: Duration) -> Result<CancelHandle>
    where
        F: FnMut() -> Result<(), JsError> + 'static,
    {
        self.enqueue_task(Task::repeating(callback, period))
    }

    /// Adds a prepared task to the task queue.
    pub fn enqueue_task(&self, task: Task) -> Result<CancelHandle> {
        let shared = self.live()?;
        let now = shared.clock.now();
        let handle = shared.tasks.borrow_mut().enqueue(task, now);
        Ok(handle)
    }

    /// Schedules `callback` as a microtask.
    pub fn schedule_microtask<F>(&self, callback: F) -> Result<()>
    where
        F: FnOnce() -> Result<(), JsError> + 'static,
    {
        self.enqueue_microtask(MicroTask::new(callback))
    }

    /// Adds a prepared microtask to the microtask queue.
    pub fn enqueue_microtask(&self, microtask: MicroTask) -> Result<()> {
        let shared = self.live()?;
        shared.microtasks.borrow_mut().enqueue(microtask);
        log::trace!("enqueue microtask");
        Ok(())
    }

    /// Current loop time.
    pub fn now(&self) -> Result<Duration> {
        Ok(self.live()?.clock.now())
    }

    /// Asks a loop running in service mode to terminate once idle.
    pub fn request_shutdown(&self) {
        if let Some(shared) = self.shared.upgrade() {
            log::debug!("[{}] shutdown requested", shared.config.name);
            shared.shutdown_requested.set(true);
        }
    }

    /// Number of frames currently on the call stack.
    pub fn stack_depth(&self) -> usize {
        self.shared
            .upgrade()
            .map_or(0, |shared| shared.stack.borrow().depth())
    }

    /// Snapshot of the call stack, innermost frame last.
    pub fn stack_trace(&self) -> Vec<StackFrame> {
        self.shared
            .upgrade()
            .map(|shared| shared.stack.borrow().frames())
            .unwrap_or_default()
    }

    /// Runs `f` inside a call-stack frame.
    pub(crate) fn with_frame<R>(&self, frame: StackFrame, f: impl FnOnce() -> R) -> R {
        let Some(shared) = self.shared.upgrade() else {
            return f();
        };
        let depth = shared.stack.borrow().depth();
        let id = shared.stack.borrow_mut().push(frame);
        let result = f();
        let mut stack = shared.stack.borrow_mut();
        if let Err(err) = stack.pop(id) {
            log::error!("[{}] {}", shared.config.name, err);
            stack.unwind_to(depth);
        }
        result
    }

    pub(crate) fn next_promise_id(&self) -> PromiseId {
        match self.shared.upgrade() {
            Some(shared) => {
                let id = shared.next_promise_id.get();
                shared.next_promise_id.set(id + 1);
                PromiseId(id)
            }
            None => PromiseId(0),
        }
    }

    pub(crate) fn track_rejection(&self, promise: &Promise) {
        if let Some(shared) = self.shared.upgrade() {
            if shared.config.track_unhandled_rejections {
                shared.rejections.borrow_mut().rejected(promise);
            }
        }
    }

    pub(crate) fn rejection_handled(&self, promise: &Promise) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let event = shared.rejections.borrow_mut().handler_added(promise);
        if let Some(event) = event {
            log::info!("[{}] rejection of promise {} handled late", shared.config.name, promise.id());
            shared.record(event);
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

type RemoteCallback = Box<dyn FnOnce(&Handle) -> Result<(), JsError> + Send>;

/// Message sent from a [`Remote`] to its loop.
pub(crate) enum RemoteMessage {
    Task {
        callback: RemoteCallback,
        delay: Duration,
    },
    Shutdown,
}

/// `Send` handle for injecting work from other threads.
///
/// Callbacks are shipped over a channel and run on the loop's thread with a
/// [`Handle`], so they may create promises and schedule further work.
#[derive(Clone)]
pub struct Remote {
    sender: Sender<RemoteMessage>,
}

impl Remote {
    pub(crate) fn new(sender: Sender<RemoteMessage>) -> Self {
        Self { sender }
    }

    /// Sends a task that becomes ready `delay` after the loop receives it.
    pub fn schedule_task<F>(&self, callback: F, delay: Duration) -> Result<()>
    where
        F: FnOnce(&Handle) -> Result<(), JsError> + Send + 'static,
    {
        self.sender
            .send(RemoteMessage::Task {
                callback: Box::new(callback),
                delay,
            })
            .map_err(|_| RuntimeError::Terminated)
    }

    /// Asks the loop to terminate once idle.
    pub fn request_shutdown(&self) -> Result<()> {
        self.sender
            .send(RemoteMessage::Shutdown)
            .map_err(|_| RuntimeError::Terminated)
    }
}

impl fmt::Debug for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Remote {{ ... }}")
    }
}
