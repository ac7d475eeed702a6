//! Unit tests for EventLoop

use core_types::{JsError, Value};
use event_runtime::{
    Clock, ClockKind, Diagnostic, EventLoop, LoopState, MicroTask, Promise, RuntimeConfig, Task,
    TaskStatus, VirtualClock,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

fn log() -> Rc<RefCell<Vec<&'static str>>> {
    Rc::new(RefCell::new(Vec::new()))
}

#[test]
fn new_event_loop_has_empty_task_queue() {
    let event_loop = EventLoop::new();
    assert!(event_loop.is_task_queue_empty());
    assert!(!event_loop.has_pending_work());
}

#[test]
fn new_event_loop_has_empty_microtask_queue() {
    let event_loop = EventLoop::new();
    assert!(event_loop.is_microtask_queue_empty());
}

#[test]
fn task_queue_fifo_order() {
    let mut event_loop = EventLoop::new();
    let results = Rc::new(RefCell::new(vec![]));

    for n in 1..=3 {
        let r = results.clone();
        event_loop
            .enqueue_task(Task::new(move || {
                r.borrow_mut().push(n);
                Ok(())
            }))
            .unwrap();
    }

    event_loop.run_until_done().unwrap();
    assert_eq!(*results.borrow(), vec![1, 2, 3]);
}

#[test]
fn microtask_queue_fifo_order() {
    let mut event_loop = EventLoop::new();
    let results = Rc::new(RefCell::new(vec![]));

    for n in 1..=2 {
        let r = results.clone();
        event_loop
            .enqueue_microtask(MicroTask::new(move || {
                r.borrow_mut().push(n);
                Ok(())
            }))
            .unwrap();
    }

    event_loop.run_all_microtasks().unwrap();
    assert_eq!(*results.borrow(), vec![1, 2]);
}

#[test]
fn multiple_tasks_with_microtasks() {
    let mut event_loop = EventLoop::new();
    let results = Rc::new(RefCell::new(vec![]));

    let r1 = results.clone();
    let task1 = Task::new(move || {
        r1.borrow_mut().push(1);
        Ok(())
    });

    let r2 = results.clone();
    let microtask1 = MicroTask::new(move || {
        r2.borrow_mut().push(2);
        Ok(())
    });

    let r3 = results.clone();
    let task2 = Task::new(move || {
        r3.borrow_mut().push(3);
        Ok(())
    });

    event_loop.enqueue_task(task1).unwrap();
    event_loop.enqueue_microtask(microtask1).unwrap();
    event_loop.enqueue_task(task2).unwrap();

    event_loop.run_until_done().unwrap();

    // Task1 (1), then microtask1 (2), then Task2 (3)
    assert_eq!(*results.borrow(), vec![1, 2, 3]);
}

#[test]
fn microtask_enqueued_during_drain_runs_in_same_drain() {
    let mut event_loop = EventLoop::new();
    let handle = event_loop.handle();
    let order = log();

    let o = order.clone();
    event_loop
        .enqueue_task(Task::new(move || {
            o.borrow_mut().push("task");
            let inner = o.clone();
            let h = handle.clone();
            handle
                .schedule_microtask(move || {
                    inner.borrow_mut().push("outer");
                    let innermost = inner.clone();
                    h.schedule_microtask(move || {
                        innermost.borrow_mut().push("inner");
                        Ok(())
                    })
                    .map_err(|e| JsError::error(e.to_string()))
                })
                .map_err(|e| JsError::error(e.to_string()))
        }))
        .unwrap();
    let o = order.clone();
    event_loop
        .enqueue_task(Task::new(move || {
            o.borrow_mut().push("next task");
            Ok(())
        }))
        .unwrap();

    event_loop.run_until_done().unwrap();
    assert_eq!(*order.borrow(), vec!["task", "outer", "inner", "next task"]);
}

#[test]
fn delayed_task_waits_for_busy_task() {
    let clock = Rc::new(VirtualClock::new());
    let mut event_loop = EventLoop::with_clock(RuntimeConfig::virtual_time(), clock.clone());
    let handle = event_loop.handle();
    let order = Rc::new(RefCell::new(Vec::new()));

    let o = order.clone();
    let h = handle.clone();
    handle
        .schedule_task(
            move || {
                o.borrow_mut().push(("timer", h.now().unwrap_or_default()));
                Ok(())
            },
            Duration::from_millis(500),
        )
        .unwrap();

    let o = order.clone();
    let busy_clock = clock.clone();
    event_loop
        .enqueue_task(Task::new(move || {
            // Simulated busy loop: no other callback can run meanwhile
            busy_clock.advance(Duration::from_millis(2000));
            o.borrow_mut().push(("busy", busy_clock.now()));
            Ok(())
        }))
        .unwrap();

    event_loop.run_until_done().unwrap();
    assert_eq!(
        *order.borrow(),
        vec![
            ("busy", Duration::from_millis(2000)),
            ("timer", Duration::from_millis(2000)),
        ]
    );
}

#[test]
fn zero_delay_task_runs_after_earlier_ready_tasks() {
    let mut event_loop = EventLoop::with_config(RuntimeConfig::virtual_time());
    let handle = event_loop.handle();
    let order = log();

    let o = order.clone();
    event_loop
        .enqueue_task(Task::new(move || {
            o.borrow_mut().push("first");
            Ok(())
        }))
        .unwrap();
    let o = order.clone();
    handle
        .schedule_task(
            move || {
                o.borrow_mut().push("zero delay");
                Ok(())
            },
            Duration::ZERO,
        )
        .unwrap();

    event_loop.run_until_done().unwrap();
    assert_eq!(*order.borrow(), vec!["first", "zero delay"]);
}

#[test]
fn unhandled_rejection_reported_after_drain() {
    let mut event_loop = EventLoop::new();
    let handle = event_loop.handle();

    let rejected = Promise::rejected(&handle, JsError::error("lost"));
    event_loop.run_until_done().unwrap();

    assert_eq!(
        event_loop.take_diagnostics(),
        vec![Diagnostic::UnhandledRejection {
            promise: rejected.id(),
            reason: JsError::error("lost"),
        }]
    );

    let _ = rejected.catch(|_| Ok(Value::Undefined));
    event_loop.run_until_done().unwrap();
    assert_eq!(
        event_loop.take_diagnostics(),
        vec![Diagnostic::RejectionHandled {
            promise: rejected.id()
        }]
    );
}

#[test]
fn handler_attached_within_drain_is_not_reported() {
    let mut event_loop = EventLoop::new();
    let handle = event_loop.handle();

    let (promise, resolvers) = Promise::pending(&handle);
    let p = promise.clone();
    event_loop
        .enqueue_microtask(MicroTask::new(move || {
            resolvers.reject(JsError::error("late"));
            Ok(())
        }))
        .unwrap();
    event_loop
        .enqueue_microtask(MicroTask::new(move || {
            let _ = p.catch(|_| Ok(Value::Undefined));
            Ok(())
        }))
        .unwrap();

    event_loop.run_until_done().unwrap();
    assert!(event_loop.take_diagnostics().is_empty());
    assert!(promise.is_handled());
}

#[test]
fn tracking_can_be_disabled() {
    let config = RuntimeConfig {
        track_unhandled_rejections: false,
        ..RuntimeConfig::default()
    };
    let mut event_loop = EventLoop::with_config(config);
    let _ = Promise::rejected(&event_loop.handle(), JsError::error("quiet"));
    event_loop.run_until_done().unwrap();
    assert!(event_loop.take_diagnostics().is_empty());
}

#[test]
fn with_config_uses_configured_clock() {
    let event_loop = EventLoop::with_config(RuntimeConfig::virtual_time());
    assert_eq!(event_loop.config().clock, ClockKind::Virtual);
    assert!(event_loop.clock().is_virtual());
    assert_eq!(event_loop.now(), Duration::ZERO);
    assert_eq!(event_loop.state(), LoopState::Idle);
}

#[test]
fn unbounded_delay_never_becomes_ready() {
    crate::init_logging();
    let mut event_loop = EventLoop::new();
    let handle = event_loop.handle();
    let local = handle.schedule_task(|| Ok(()), Duration::MAX).unwrap();
    event_loop
        .remote()
        .schedule_task(|_| Ok(()), Duration::MAX)
        .unwrap();

    assert!(!event_loop.turn().unwrap());
    assert_eq!(event_loop.pending_tasks(), 2);
    assert_eq!(local.status(), TaskStatus::Queued);
}

#[test]
fn unbounded_repeating_period_is_accepted() {
    let mut event_loop = EventLoop::new();
    let cancel = event_loop
        .handle()
        .schedule_repeating(|| Ok(()), Duration::MAX)
        .unwrap();

    assert!(!event_loop.turn().unwrap());
    assert!(cancel.cancel());
    assert!(event_loop.is_task_queue_empty());
}
