//! Unit tests for TaskQueue and MicrotaskQueue

use event_runtime::{MicroTask, MicrotaskQueue, Task, TaskQueue, TaskStatus};
use std::time::Duration;

const NOW: Duration = Duration::ZERO;

#[test]
fn new_task_queue_is_empty() {
    let queue = TaskQueue::new();
    assert!(queue.is_empty());
    assert_eq!(queue.len(), 0);
    assert_eq!(queue.next_ready_at(), None);
}

#[test]
fn dequeue_respects_readiness() {
    let mut queue = TaskQueue::new();
    queue.enqueue(Task::delayed(|| Ok(()), Duration::from_millis(100)), NOW);

    assert!(!queue.has_ready(NOW));
    assert!(queue.dequeue(NOW).is_none());
    assert_eq!(queue.next_ready_at(), Some(Duration::from_millis(100)));
    assert!(queue.dequeue(Duration::from_millis(100)).is_some());
}

#[test]
fn oldest_ready_task_wins_over_earlier_deadline() {
    let mut queue = TaskQueue::new();
    let late_deadline = queue.enqueue(Task::delayed(|| Ok(()), Duration::from_millis(50)), NOW);
    let early_deadline = queue.enqueue(Task::delayed(|| Ok(()), Duration::from_millis(10)), NOW);

    let later = Duration::from_millis(60);
    assert!(queue.dequeue(later).is_some());
    assert_eq!(late_deadline.status(), TaskStatus::Completed);
    assert_eq!(early_deadline.status(), TaskStatus::Queued);
}

#[test]
fn cancelled_task_is_skipped() {
    let mut queue = TaskQueue::new();
    let first = queue.enqueue(Task::new(|| Ok(())), NOW);
    let second = queue.enqueue(Task::new(|| Ok(())), NOW);

    assert!(first.cancel());
    assert!(!first.cancel());
    assert_eq!(queue.len(), 1);

    assert!(queue.dequeue(NOW).is_some());
    assert_eq!(second.status(), TaskStatus::Completed);
    assert!(!second.cancel());
    assert!(queue.is_empty());
}

#[test]
fn repeating_task_reports_its_period_as_delay() {
    let task = Task::repeating(|| Ok(()), Duration::from_millis(25));
    assert!(task.is_repeating());
    assert_eq!(task.delay(), Duration::from_millis(25));
}

#[test]
fn microtask_queue_fifo() {
    let mut queue = MicrotaskQueue::new();
    queue.enqueue(MicroTask::new(|| Ok(())));
    queue.enqueue(MicroTask::new(|| Err(core_types::JsError::error("second"))));
    assert_eq!(queue.len(), 2);

    assert!(queue.dequeue().map(MicroTask::run).expect("first").is_ok());
    assert!(queue.dequeue().map(MicroTask::run).expect("second").is_err());
    assert!(queue.is_empty());
}
