//! Event loop implementation.
//!
//! This module provides the main event loop that coordinates task and microtask
//! execution following the JavaScript event loop model.

use crate::clock::{Clock, SystemClock, VirtualClock};
use crate::config::{ClockKind, ErrorPolicy, RuntimeConfig};
use crate::diagnostics::{CallbackSource, Diagnostic};
use crate::error::{Result, RuntimeError};
use crate::handle::{Handle, Remote, RemoteMessage, Shared};
use crate::task_queue::{CancelHandle, MicroTask, ReadyTask, Task, TaskStatus};
use core_types::{JsError, StackFrame};
use crossbeam::channel::{self, Receiver, Sender};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// What the loop is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Between turns.
    Idle,
    /// Executing a task callback.
    RunningTask,
    /// Draining the microtask queue.
    DrainingMicrotasks,
    /// Shut down; no further work is accepted.
    Terminated,
}

/// The JavaScript event loop.
///
/// Each iteration (turn) of the loop:
/// 1. Takes the oldest ready task from the task queue and executes it
/// 2. Drains all microtasks, including ones enqueued during the drain
/// 3. Reports rejections that are still unhandled
///
/// Application code never touches the loop directly while it runs; it
/// schedules work through a [`Handle`] (same thread) or a [`Remote`] (other
/// threads).
///
/// # Examples
///
/// ```
/// use event_runtime::{EventLoop, Task};
///
/// let mut event_loop = EventLoop::new();
///
/// event_loop.enqueue_task(Task::new(|| Ok(()))).unwrap();
/// event_loop.run_until_done().unwrap();
/// assert!(event_loop.is_task_queue_empty());
/// ```
pub struct EventLoop {
    shared: Rc<Shared>,
    state: LoopState,
    sender: Sender<RemoteMessage>,
    receiver: Option<Receiver<RemoteMessage>>,
}

impl EventLoop {
    /// Creates an event loop with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Creates an event loop using the clock named by `config.clock`.
    pub fn with_config(config: RuntimeConfig) -> Self {
        let clock: Rc<dyn Clock> = match config.clock {
            ClockKind::System => Rc::new(SystemClock::new()),
            ClockKind::Virtual => Rc::new(VirtualClock::new()),
        };
        Self::with_clock(config, clock)
    }

    /// Creates an event loop driven by `clock`, ignoring `config.clock`.
    pub fn with_clock(config: RuntimeConfig, clock: Rc<dyn Clock>) -> Self {
        let (sender, receiver) = channel::unbounded();
        log::debug!("[{}] event loop created", config.name);
        Self {
            shared: Rc::new(Shared::new(config, clock)),
            state: LoopState::Idle,
            sender,
            receiver: Some(receiver),
        }
    }

    /// Returns a handle for scheduling work on this loop.
    pub fn handle(&self) -> Handle {
        Handle::new(&self.shared)
    }

    /// Returns a `Send` handle for injecting work from other threads.
    pub fn remote(&self) -> Remote {
        Remote::new(self.sender.clone())
    }

    /// Configuration this loop was created with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.shared.config
    }

    /// Clock driving task readiness.
    pub fn clock(&self) -> Rc<dyn Clock> {
        self.shared.clock.clone()
    }

    /// Current loop state.
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Current loop time.
    pub fn now(&self) -> Duration {
        self.shared.clock.now()
    }

    /// Adds a task to the task queue.
    ///
    /// The task runs in the first turn after its delay has elapsed and every
    /// earlier-enqueued ready task has run.
    pub fn enqueue_task(&mut self, task: Task) -> Result<CancelHandle> {
        self.handle().enqueue_task(task)
    }

    /// Adds a microtask to the microtask queue.
    ///
    /// The microtask will be executed after the current task completes.
    pub fn enqueue_microtask(&mut self, microtask: MicroTask) -> Result<()> {
        self.handle().enqueue_microtask(microtask)
    }

    /// Returns true if the task queue holds no live task.
    pub fn is_task_queue_empty(&self) -> bool {
        self.shared.tasks.borrow().is_empty()
    }

    /// Returns true if the microtask queue is empty.
    pub fn is_microtask_queue_empty(&self) -> bool {
        self.shared.microtasks.borrow().is_empty()
    }

    /// Number of live tasks, ready or not.
    pub fn pending_tasks(&self) -> usize {
        self.shared.tasks.borrow().len()
    }

    /// Number of queued microtasks.
    pub fn pending_microtasks(&self) -> usize {
        self.shared.microtasks.borrow().len()
    }

    /// Returns true while any task or microtask is queued.
    pub fn has_pending_work(&self) -> bool {
        self.pending_tasks() > 0 || self.pending_microtasks() > 0
    }

    /// Takes every diagnostic recorded so far.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.shared.diagnostics.borrow_mut())
    }

    /// Runs one iteration: at most one ready task, then a full microtask
    /// drain.
    ///
    /// Returns whether a task ran.
    pub fn turn(&mut self) -> Result<bool> {
        self.ensure_running()?;
        self.ingest_remote();

        let now = self.shared.clock.now();
        let next = self.shared.tasks.borrow_mut().dequeue_next(now);
        let ran = match next {
            Some(ready) => {
                self.run_task(ready)?;
                true
            }
            None => false,
        };

        self.drain_microtasks()?;
        Ok(ran)
    }

    /// Runs the event loop until no task and no microtask remains.
    ///
    /// When only future tasks remain, waits for the earliest one: a virtual
    /// clock jumps ahead, a system clock blocks on the remote channel until
    /// the deadline.
    pub fn run_until_done(&mut self) -> Result<()> {
        self.ensure_running()?;
        loop {
            self.turn()?;
            let now = self.shared.clock.now();
            let next = self.shared.tasks.borrow().next_ready_at();
            match next {
                None => return Ok(()),
                Some(ready_at) if ready_at <= now => continue,
                Some(ready_at) => self.wait_until(ready_at),
            }
        }
    }

    /// Runs the loop as a service until shutdown is requested.
    ///
    /// Blocks on the remote channel while there is nothing to do. Once a
    /// shutdown has been requested (through a [`Handle`] or [`Remote`]) and
    /// no ready work is left, tasks scheduled for the future are cancelled
    /// and the loop terminates.
    pub fn run(&mut self) -> Result<()> {
        self.ensure_running()?;
        log::debug!("[{}] entering service mode", self.shared.config.name);
        loop {
            self.turn()?;
            let now = self.shared.clock.now();
            let (has_ready, next) = {
                let tasks = self.shared.tasks.borrow();
                (tasks.has_ready(now), tasks.next_ready_at())
            };
            if has_ready {
                continue;
            }
            if self.shared.shutdown_requested.get() {
                let discarded = self.shared.tasks.borrow_mut().clear();
                if discarded > 0 {
                    log::debug!(
                        "[{}] discarding {} future tasks on shutdown",
                        self.shared.config.name,
                        discarded
                    );
                }
                self.terminate();
                return Ok(());
            }
            match next {
                Some(ready_at) => self.wait_until(ready_at),
                None => self.wait_for_message(),
            }
        }
    }

    /// Terminates the loop if nothing is pending.
    ///
    /// Calling it again after termination is a no-op.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.state == LoopState::Terminated {
            return Ok(());
        }
        self.ingest_remote();
        let tasks = self.pending_tasks();
        let microtasks = self.pending_microtasks();
        if tasks > 0 || microtasks > 0 {
            return Err(RuntimeError::PendingWork { tasks, microtasks });
        }
        self.terminate();
        Ok(())
    }

    /// Runs all microtasks in the queue until empty.
    ///
    /// This drains the microtask queue completely. New microtasks added during
    /// execution will also be processed before this method returns.
    pub fn run_all_microtasks(&mut self) -> Result<()> {
        self.ensure_running()?;
        self.drain_microtasks()
    }

    fn ensure_running(&self) -> Result<()> {
        if self.state == LoopState::Terminated {
            return Err(RuntimeError::Terminated);
        }
        Ok(())
    }

    fn set_state(&mut self, state: LoopState) {
        if self.state != state {
            log::trace!("[{}] {:?} -> {:?}", self.shared.config.name, self.state, state);
            self.state = state;
        }
    }

    fn terminate(&mut self) {
        self.set_state(LoopState::Terminated);
        self.shared.terminated.set(true);
        // Dropping the receiver makes every later `Remote` send fail.
        self.receiver = None;
        log::debug!("[{}] event loop terminated", self.shared.config.name);
    }

    fn ingest_remote(&mut self) {
        let messages: Vec<RemoteMessage> = match &self.receiver {
            Some(receiver) => receiver.try_iter().collect(),
            None => return,
        };
        for message in messages {
            self.accept(message);
        }
    }

    fn accept(&mut self, message: RemoteMessage) {
        match message {
            RemoteMessage::Task { callback, delay } => {
                let handle = self.handle();
                let task = Task::delayed(move || callback(&handle), delay);
                let now = self.shared.clock.now();
                let cancel = self.shared.tasks.borrow_mut().enqueue(task, now);
                log::trace!("[{}] accepted remote task {}", self.shared.config.name, cancel.id());
            }
            RemoteMessage::Shutdown => {
                log::debug!("[{}] remote shutdown requested", self.shared.config.name);
                self.shared.shutdown_requested.set(true);
            }
        }
    }

    fn wait_until(&mut self, deadline: Duration) {
        let clock = self.shared.clock.clone();
        if clock.is_virtual() {
            log::trace!("[{}] advancing virtual clock to {:?}", self.shared.config.name, deadline);
            clock.advance_to(deadline);
            return;
        }
        let timeout = deadline.saturating_sub(clock.now());
        let received = match &self.receiver {
            Some(receiver) => receiver.recv_timeout(timeout).ok(),
            None => None,
        };
        if let Some(message) = received {
            self.accept(message);
        }
    }

    fn wait_for_message(&mut self) {
        let received = match &self.receiver {
            Some(receiver) => receiver.recv().ok(),
            None => None,
        };
        if let Some(message) = received {
            self.accept(message);
        }
    }

    fn run_task(&mut self, ready: ReadyTask) -> Result<()> {
        let ReadyTask { id, task, status } = ready;
        self.set_state(LoopState::RunningTask);

        let frame = if task.is_repeating() {
            StackFrame::named(format!("interval#{}", id))
        } else {
            StackFrame::named(format!("task#{}", id))
        };
        let mut next = None;
        let result = self.run_callback(frame, CallbackSource::Task(id), || {
            let (result, again) = task.invoke();
            next = again;
            result
        });

        match next {
            Some(task) if status.get() != TaskStatus::Cancelled => {
                let now = self.shared.clock.now();
                self.shared
                    .tasks
                    .borrow_mut()
                    .requeue(ReadyTask { id, task, status }, now);
            }
            _ => {
                if status.get() == TaskStatus::Running {
                    status.set(TaskStatus::Completed);
                }
            }
        }

        self.set_state(LoopState::Idle);
        result
    }

    fn drain_microtasks(&mut self) -> Result<()> {
        self.set_state(LoopState::DrainingMicrotasks);
        let result = self.drain_inner();
        self.flush_rejections();
        self.set_state(LoopState::Idle);
        result
    }

    fn drain_inner(&mut self) -> Result<()> {
        let budget = self.shared.config.microtask_budget;
        let mut ran = 0;
        loop {
            if self.shared.microtasks.borrow().is_empty() {
                return Ok(());
            }
            if let Some(budget) = budget {
                if ran >= budget {
                    log::error!(
                        "[{}] microtask budget of {} exceeded",
                        self.shared.config.name,
                        budget
                    );
                    return Err(RuntimeError::MicrotaskBudgetExceeded(budget));
                }
            }
            let Some(microtask) = self.shared.microtasks.borrow_mut().dequeue() else {
                return Ok(());
            };
            ran += 1;
            self.run_callback(
                StackFrame::named("microtask"),
                CallbackSource::Microtask,
                || microtask.run(),
            )?;
        }
    }

    /// Runs one callback inside its own frame and checks the stack is
    /// balanced afterwards.
    fn run_callback<F>(&mut self, frame: StackFrame, source: CallbackSource, f: F) -> Result<()>
    where
        F: FnOnce() -> Result<(), JsError>,
    {
        let depth = self.shared.stack.borrow().depth();
        let id = self.shared.stack.borrow_mut().push(frame);

        let result = f().map_err(|mut error| {
            if error.stack.is_empty() {
                error.stack = self.shared.stack.borrow().frames();
            }
            error
        });

        let popped = self.shared.stack.borrow_mut().pop(id);
        if let Err(err) = popped {
            let discarded = self.shared.stack.borrow_mut().unwind_to(depth);
            log::error!(
                "[{}] {} after {}; discarded {} frames",
                self.shared.config.name,
                err,
                source,
                discarded
            );
            return Err(err);
        }

        match result {
            Ok(()) => Ok(()),
            Err(error) => self.report_uncaught(source, error),
        }
    }

    fn report_uncaught(&self, source: CallbackSource, error: JsError) -> Result<()> {
        log::error!(
            "[{}] uncaught error in {}: {}",
            self.shared.config.name,
            source,
            error
        );
        match self.shared.config.error_policy {
            ErrorPolicy::Report => {
                self.shared
                    .record(Diagnostic::UncaughtError { source, error });
                Ok(())
            }
            ErrorPolicy::Abort => Err(RuntimeError::Uncaught(error)),
        }
    }

    fn flush_rejections(&mut self) {
        let reported = self.shared.rejections.borrow_mut().flush();
        for diagnostic in reported {
            if let Diagnostic::UnhandledRejection { promise, reason } = &diagnostic {
                log::warn!(
                    "[{}] unhandled rejection of promise {}: {}",
                    self.shared.config.name,
                    promise,
                    reason
                );
            }
            self.shared.record(diagnostic);
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("name", &self.shared.config.name)
            .field("state", &self.state)
            .field("tasks", &self.pending_tasks())
            .field("microtasks", &self.pending_microtasks())
            .finish()
    }
}
