//! Unit tests for the promise combinators

use core_types::{ErrorKind, JsError, Value};
use event_runtime::{
    all, all_settled, any, race, EventLoop, Promise, PromiseState, Resolution, SettledOutcome,
};

#[test]
fn all_reports_values_in_input_order() {
    let mut event_loop = EventLoop::new();
    let handle = event_loop.handle();
    let (first, first_resolvers) = Promise::pending(&handle);
    let (second, second_resolvers) = Promise::pending(&handle);

    let combined = all(
        &handle,
        vec![
            Resolution::from(first),
            second.into(),
            Value::Smi(3).into(),
        ],
    );
    second_resolvers.resolve(Value::Smi(2));
    event_loop.run_until_done().unwrap();
    assert!(combined.is_pending());

    first_resolvers.resolve(Value::Smi(1));
    event_loop.run_until_done().unwrap();
    assert_eq!(
        combined.value(),
        Some(Value::Array(vec![Value::Smi(1), Value::Smi(2), Value::Smi(3)]))
    );
}

#[test]
fn all_rejects_with_first_reason() {
    let mut event_loop = EventLoop::new();
    let handle = event_loop.handle();
    let (slow, slow_resolvers) = Promise::pending(&handle);
    let (fast, fast_resolvers) = Promise::pending(&handle);

    let combined = all(&handle, [slow, fast]);
    fast_resolvers.reject(JsError::error("fast"));
    slow_resolvers.reject(JsError::error("slow"));
    event_loop.run_until_done().unwrap();

    assert_eq!(combined.reason(), Some(JsError::error("fast")));
}

#[test]
fn all_of_nothing_fulfills_with_empty_array() {
    let mut event_loop = EventLoop::new();
    let handle = event_loop.handle();
    let a = all(&handle, Vec::<Promise>::new());
    let b = all_settled(&handle, Vec::<Promise>::new());
    event_loop.run_until_done().unwrap();
    assert_eq!(a.value(), Some(Value::Array(vec![])));
    assert_eq!(b.value(), Some(Value::Array(vec![])));
}

#[test]
fn all_settled_records_every_outcome() {
    let mut event_loop = EventLoop::new();
    let handle = event_loop.handle();
    let inputs = vec![
        Promise::rejected(&handle, JsError::error("no")),
        Promise::resolved(&handle, Value::from("yes")),
    ];

    let combined = all_settled(&handle, inputs);
    event_loop.run_until_done().unwrap();

    let records = combined.value().expect("fulfilled");
    let outcomes: Vec<SettledOutcome> = records
        .as_array()
        .expect("array")
        .iter()
        .filter_map(SettledOutcome::from_value)
        .collect();
    assert_eq!(
        outcomes,
        vec![
            SettledOutcome::Rejected(JsError::error("no")),
            SettledOutcome::Fulfilled(Value::from("yes")),
        ]
    );
    assert!(event_loop.take_diagnostics().is_empty());
}

#[test]
fn any_fulfills_with_first_fulfillment() {
    let mut event_loop = EventLoop::new();
    let handle = event_loop.handle();
    let combined = any(
        &handle,
        [
            Promise::resolved(&handle, Value::from("a")),
            Promise::rejected(&handle, JsError::error("b")),
        ],
    );
    event_loop.run_until_done().unwrap();
    assert_eq!(combined.value(), Some(Value::from("a")));
}

#[test]
fn any_aggregates_reasons_in_input_order() {
    let mut event_loop = EventLoop::new();
    let handle = event_loop.handle();
    let (a, a_resolvers) = Promise::pending(&handle);
    let (b, b_resolvers) = Promise::pending(&handle);

    let combined = any(&handle, [a, b]);
    b_resolvers.reject(JsError::error("B"));
    a_resolvers.reject(JsError::error("A"));
    let _ = combined.catch(|_| Ok(Value::Undefined));
    event_loop.run_until_done().unwrap();

    let reason = combined.reason().expect("rejected");
    assert_eq!(reason.kind, ErrorKind::AggregateError);
    assert_eq!(reason.errors, vec![JsError::error("A"), JsError::error("B")]);
}

#[test]
fn race_settles_like_first_input() {
    let mut event_loop = EventLoop::new();
    let handle = event_loop.handle();
    let (never, _keep) = Promise::pending(&handle);
    let (soon, soon_resolvers) = Promise::pending(&handle);

    let combined = race(&handle, [never, soon]);
    soon_resolvers.reject(JsError::error("lost the race"));
    let _ = combined.catch(|_| Ok(Value::Undefined));
    event_loop.run_until_done().unwrap();

    assert_eq!(combined.reason(), Some(JsError::error("lost the race")));
}

#[test]
fn race_of_nothing_never_settles() {
    let mut event_loop = EventLoop::new();
    let handle = event_loop.handle();
    let combined = race(&handle, Vec::<Promise>::new());

    for _ in 0..100 {
        event_loop.turn().unwrap();
    }
    assert_eq!(combined.state(), PromiseState::Pending);
}
