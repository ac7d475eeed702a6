//! Task and microtask queue management.
//!
//! Tasks are executed one per loop turn, oldest ready task first; the
//! microtask queue is drained completely after each task.

use core_types::JsError;
use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

type OnceCallback = Box<dyn FnOnce() -> Result<(), JsError>>;
type RepeatingCallback = Box<dyn FnMut() -> Result<(), JsError>>;

enum TaskCallback {
    Once(OnceCallback),
    Repeating {
        callback: RepeatingCallback,
        period: Duration,
    },
}

/// A task to be executed by the event loop.
///
/// Tasks represent work injected from outside the promise engine: timer
/// firings, I/O completions, dispatched events.
pub struct Task {
    callback: TaskCallback,
    delay: Duration,
}

impl Task {
    /// Creates a task that is ready as soon as it is enqueued.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), JsError> + 'static,
    {
        Self::delayed(f, Duration::ZERO)
    }

    /// Creates a task that may not run before `delay` has elapsed from its
    /// enqueue time.
    ///
    /// The delay is a minimum: the task still waits behind every
    /// earlier-enqueued ready task.
    pub fn delayed<F>(f: F, delay: Duration) -> Self
    where
        F: FnOnce() -> Result<(), JsError> + 'static,
    {
        Self {
            callback: TaskCallback::Once(Box::new(f)),
            delay,
        }
    }

    /// Creates a task that runs every `period` until cancelled.
    pub fn repeating<F>(f: F, period: Duration) -> Self
    where
        F: FnMut() -> Result<(), JsError> + 'static,
    {
        Self {
            callback: TaskCallback::Repeating {
                callback: Box::new(f),
                period,
            },
            delay: period,
        }
    }

    /// Delay between enqueue and readiness.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns true for tasks created with [`Task::repeating`].
    pub fn is_repeating(&self) -> bool {
        matches!(self.callback, TaskCallback::Repeating { .. })
    }

    /// Executes the task once.
    pub fn run(self) -> Result<(), JsError> {
        self.invoke().0
    }

    /// Executes the task, handing back the task again if it repeats.
    pub(crate) fn invoke(self) -> (Result<(), JsError>, Option<Task>) {
        match self.callback {
            TaskCallback::Once(f) => (f(), None),
            TaskCallback::Repeating {
                mut callback,
                period,
            } => {
                let result = callback();
                let next = Task {
                    callback: TaskCallback::Repeating { callback, period },
                    delay: period,
                };
                (result, Some(next))
            }
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("delay", &self.delay)
            .field("repeating", &self.is_repeating())
            .finish_non_exhaustive()
    }
}

/// A microtask to be executed by the event loop.
///
/// Microtasks are promise reactions, adoption jobs and explicitly scheduled
/// callbacks. They run after the current task, before the next one.
pub struct MicroTask {
    callback: OnceCallback,
}

impl MicroTask {
    /// Creates a new MicroTask from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), JsError> + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Executes the microtask.
    pub fn run(self) -> Result<(), JsError> {
        (self.callback)()
    }
}

impl fmt::Debug for MicroTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MicroTask {{ ... }}")
    }
}

/// Identifies a task for the lifetime of its cancel handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a queued task as seen through its [`CancelHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Waiting in the queue
    Queued,
    /// Dequeued and executing
    Running,
    /// Ran to completion and will not run again
    Completed,
    /// Cancelled before it could run (again)
    Cancelled,
}

/// Handle for cancelling a task before it is dequeued.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    id: TaskId,
    status: Rc<Cell<TaskStatus>>,
    repeating: bool,
}

impl CancelHandle {
    /// Id of the task.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Current status of the task.
    pub fn status(&self) -> TaskStatus {
        self.status.get()
    }

    /// Cancels the task.
    ///
    /// Returns true if this call prevented a future run. A one-shot task that
    /// has already been dequeued cannot be cancelled; a repeating task can be
    /// cancelled at any point, which stops all of its later runs.
    pub fn cancel(&self) -> bool {
        match self.status.get() {
            TaskStatus::Queued => {
                self.status.set(TaskStatus::Cancelled);
                log::trace!("task {} cancelled", self.id);
                true
            }
            TaskStatus::Running if self.repeating => {
                self.status.set(TaskStatus::Cancelled);
                log::trace!("repeating task {} cancelled while running", self.id);
                true
            }
            TaskStatus::Running | TaskStatus::Completed | TaskStatus::Cancelled => false,
        }
    }
}

/// A task taken out of the queue, ready to run.
#[derive(Debug)]
pub(crate) struct ReadyTask {
    pub(crate) id: TaskId,
    pub(crate) task: Task,
    pub(crate) status: Rc<Cell<TaskStatus>>,
}

#[derive(Debug)]
struct QueueEntry {
    seq: u64,
    id: TaskId,
    ready_at: Duration,
    task: Task,
    status: Rc<Cell<TaskStatus>>,
}

impl QueueEntry {
    fn is_live(&self) -> bool {
        self.status.get() != TaskStatus::Cancelled
    }
}

/// A queue for tasks.
///
/// Entries stay in enqueue order. [`TaskQueue::dequeue`] returns the
/// oldest entry whose readiness time has arrived.
#[derive(Debug, Default)]
pub struct TaskQueue {
    queue: VecDeque<QueueEntry>,
    next_seq: u64,
    next_id: u64,
}

impl TaskQueue {
    /// Creates a new empty TaskQueue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            next_seq: 0,
            next_id: 0,
        }
    }

    /// Adds a task to the end of the queue; `now` anchors its delay.
    pub fn enqueue(&mut self, task: Task, now: Duration) -> CancelHandle {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let status = Rc::new(Cell::new(TaskStatus::Queued));
        let handle = CancelHandle {
            id,
            status: status.clone(),
            repeating: task.is_repeating(),
        };
        self.push(id, task, status, now);
        handle
    }

    /// Puts a repeating task back at the end of the queue under its old id.
    pub(crate) fn requeue(&mut self, ready: ReadyTask, now: Duration) {
        ready.status.set(TaskStatus::Queued);
        self.push(ready.id, ready.task, ready.status, now);
    }

    fn push(&mut self, id: TaskId, task: Task, status: Rc<Cell<TaskStatus>>, now: Duration) {
        let seq = self.next_seq;
        self.next_seq += 1;
        // A delay past the end of time leaves the task queued forever.
        let ready_at = now.saturating_add(task.delay);
        log::trace!("enqueue task {} ready at {:?}", id, ready_at);
        self.queue.push_back(QueueEntry {
            seq,
            id,
            ready_at,
            task,
            status,
        });
    }

    /// Removes and returns the oldest task that is ready at `now`.
    ///
    /// Cancelled entries encountered on the way are dropped.
    pub(crate) fn dequeue_next(&mut self, now: Duration) -> Option<ReadyTask> {
        self.queue.retain(QueueEntry::is_live);
        let index = self.queue.iter().position(|e| e.ready_at <= now)?;
        let entry = self.queue.remove(index)?;
        entry.status.set(TaskStatus::Running);
        log::trace!("dequeue task {} (seq {})", entry.id, entry.seq);
        Some(ReadyTask {
            id: entry.id,
            task: entry.task,
            status: entry.status,
        })
    }

    /// Removes and returns the oldest ready task, discarding its handle state.
    pub fn dequeue(&mut self, now: Duration) -> Option<Task> {
        self.dequeue_next(now).map(|ready| {
            ready.status.set(TaskStatus::Completed);
            ready.task
        })
    }

    /// Earliest readiness time among live tasks.
    pub fn next_ready_at(&self) -> Option<Duration> {
        self.queue
            .iter()
            .filter(|e| e.is_live())
            .map(|e| e.ready_at)
            .min()
    }

    /// Returns true if a live task is ready at `now`.
    pub fn has_ready(&self, now: Duration) -> bool {
        self.queue.iter().any(|e| e.is_live() && e.ready_at <= now)
    }

    /// Returns true if no live task is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of live tasks in the queue.
    pub fn len(&self) -> usize {
        self.queue.iter().filter(|e| e.is_live()).count()
    }

    /// Cancels and drops every queued task, returning how many were live.
    pub(crate) fn clear(&mut self) -> usize {
        let live = self.len();
        for entry in self.queue.drain(..) {
            entry.status.set(TaskStatus::Cancelled);
        }
        live
    }
}

/// A queue for microtasks.
///
/// Microtasks are drained completely after each task, including microtasks
/// enqueued while the drain is in progress.
#[derive(Debug, Default)]
pub struct MicrotaskQueue {
    queue: VecDeque<MicroTask>,
}

impl MicrotaskQueue {
    /// Creates a new empty MicrotaskQueue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Adds a microtask to the end of the queue.
    pub fn enqueue(&mut self, microtask: MicroTask) {
        self.queue.push_back(microtask);
    }

    /// Removes and returns the next microtask from the queue.
    pub fn dequeue(&mut self) -> Option<MicroTask> {
        self.queue.pop_front()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of microtasks in the queue.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}
