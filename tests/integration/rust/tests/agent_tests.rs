//! Cross-thread agent tests
//!
//! Each agent owns one EventLoop on its own thread. Other threads talk to it
//! only through its `Remote`.

use core_types::Value;
use crossbeam::channel;
use event_runtime::{EventLoop, LoopState, Promise, Remote, RuntimeConfig, RuntimeError, TaskStatus};
use integration_tests::init_logging;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[test]
fn remote_tasks_run_in_order_before_shutdown() {
    init_logging();
    let mut event_loop = EventLoop::new();
    let remote = event_loop.remote();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let s = seen.clone();
    let producer = thread::spawn(move || {
        for n in 0..3 {
            let s = s.clone();
            remote
                .schedule_task(
                    move |handle| {
                        let _ = Promise::resolved(handle, Value::Smi(n)).and_then(move |_| {
                            s.lock().unwrap().push(n);
                            Ok(Value::Undefined)
                        });
                        Ok(())
                    },
                    Duration::ZERO,
                )
                .unwrap();
        }
        remote.request_shutdown().unwrap();
    });

    event_loop.run().unwrap();
    producer.join().unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    assert_eq!(event_loop.state(), LoopState::Terminated);
}

#[test]
fn agent_replies_over_channel() {
    init_logging();
    let (remote_tx, remote_rx) = channel::bounded::<Remote>(1);
    let (reply_tx, reply_rx) = channel::unbounded::<i32>();

    let agent = thread::spawn(move || {
        let config = RuntimeConfig {
            name: "worker".to_string(),
            ..RuntimeConfig::default()
        };
        let mut event_loop = EventLoop::with_config(config);
        remote_tx.send(event_loop.remote()).unwrap();
        event_loop.run()
    });

    let remote = remote_rx.recv().unwrap();
    for n in [20, 21] {
        let reply = reply_tx.clone();
        remote
            .schedule_task(
                move |handle| {
                    let _ = Promise::resolved(handle, Value::Smi(n)).and_then(move |v| {
                        if let Value::Smi(n) = v {
                            reply.send(n * 2).unwrap();
                        }
                        Ok(Value::Undefined)
                    });
                    Ok(())
                },
                Duration::from_millis(5),
            )
            .unwrap();
    }
    let replies: Vec<i32> = (0..2).map(|_| reply_rx.recv().unwrap()).collect();
    remote.request_shutdown().unwrap();

    agent.join().unwrap().unwrap();
    assert_eq!(replies, vec![40, 42]);
    assert!(matches!(
        remote.schedule_task(|_| Ok(()), Duration::ZERO),
        Err(RuntimeError::Terminated)
    ));
}

#[test]
fn shutdown_discards_future_timers() {
    let mut event_loop = EventLoop::new();
    let handle = event_loop.handle();
    let far_future = handle
        .schedule_task(|| Ok(()), Duration::from_secs(3600))
        .unwrap();

    handle.request_shutdown();
    event_loop.run().unwrap();

    assert_eq!(far_future.status(), TaskStatus::Cancelled);
    assert!(!handle.is_alive());
}
