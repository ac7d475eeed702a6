//! Promise combinators.
//!
//! Each combinator coerces its inputs with [`Promise::resolved`], subscribes
//! to every one of them in input order and settles a single result promise.
//! Results are always reported in input order, regardless of the order in
//! which the inputs settle.

use crate::handle::Handle;
use crate::promise::{Promise, Resolvers};
use crate::thenable::Resolution;
use core_types::{JsError, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Message of the AggregateError produced by [`any`].
pub const ALL_REJECTED: &str = "All promises were rejected";

/// Slots filled in input order, with a count of the ones still empty.
struct Collector<T> {
    slots: Vec<Option<T>>,
    remaining: usize,
}

impl<T> Collector<T> {
    fn new(len: usize) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            slots: (0..len).map(|_| None).collect(),
            remaining: len,
        }))
    }

    /// Stores `item` at `index`; returns every item once the last slot fills.
    fn fill(&mut self, index: usize, item: T) -> Option<Vec<T>> {
        if self.slots[index].replace(item).is_none() {
            self.remaining -= 1;
        }
        if self.remaining > 0 {
            return None;
        }
        Some(self.slots.drain(..).flatten().collect())
    }
}

fn coerce<I>(handle: &Handle, inputs: I) -> Vec<Promise>
where
    I: IntoIterator,
    I::Item: Into<Resolution>,
{
    inputs
        .into_iter()
        .map(|input| Promise::resolved(handle, input))
        .collect()
}

/// Fulfills with every input's value, in input order, once all inputs have
/// fulfilled. Rejects with the first rejection reason observed.
///
/// An empty input fulfills with an empty array.
///
/// ```
/// use core_types::Value;
/// use event_runtime::{all, EventLoop, Promise, Resolution};
///
/// let mut event_loop = EventLoop::new();
/// let handle = event_loop.handle();
/// let (late, resolvers) = Promise::pending(&handle);
/// let combined = all(&handle, vec![Resolution::from(Value::Smi(1)), late.into()]);
///
/// resolvers.resolve(Value::Smi(2));
/// event_loop.run_until_done().unwrap();
/// assert_eq!(combined.value(), Some(Value::Array(vec![Value::Smi(1), Value::Smi(2)])));
/// ```
pub fn all<I>(handle: &Handle, inputs: I) -> Promise
where
    I: IntoIterator,
    I::Item: Into<Resolution>,
{
    let inputs = coerce(handle, inputs);
    let (result, resolvers) = Promise::pending(handle);
    if inputs.is_empty() {
        resolvers.resolve(Value::Array(Vec::new()));
        return result;
    }

    let collector = Collector::new(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        let collector = collector.clone();
        let on_fulfilled = resolvers.clone();
        let on_rejected = resolvers.clone();
        input.subscribe(
            move |value| {
                let done = collector.borrow_mut().fill(index, value);
                if let Some(values) = done {
                    on_fulfilled.resolve(Value::Array(values));
                }
                Ok(())
            },
            move |reason| {
                on_rejected.reject(reason);
                Ok(())
            },
        );
    }
    result
}

/// The outcome of one input to [`all_settled`].
#[derive(Debug, Clone, PartialEq)]
pub enum SettledOutcome {
    /// The input fulfilled with this value.
    Fulfilled(Value),
    /// The input rejected with this reason.
    Rejected(JsError),
}

impl SettledOutcome {
    /// Converts to the record form: `{status: "fulfilled", value}` or
    /// `{status: "rejected", reason}`.
    pub fn into_value(self) -> Value {
        match self {
            SettledOutcome::Fulfilled(value) => {
                Value::object([("status", Value::from("fulfilled")), ("value", value)])
            }
            SettledOutcome::Rejected(reason) => Value::object([
                ("status", Value::from("rejected")),
                ("reason", Value::from(reason)),
            ]),
        }
    }

    /// Reads a record produced by [`SettledOutcome::into_value`].
    pub fn from_value(record: &Value) -> Option<Self> {
        match record.get("status")?.as_str()? {
            "fulfilled" => Some(SettledOutcome::Fulfilled(record.get("value")?.clone())),
            "rejected" => match record.get("reason")? {
                Value::Error(reason) => Some(SettledOutcome::Rejected((**reason).clone())),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns true for the fulfilled case.
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, SettledOutcome::Fulfilled(_))
    }
}

/// Fulfills once every input has settled, with one outcome record per input
/// in input order. Never rejects.
pub fn all_settled<I>(handle: &Handle, inputs: I) -> Promise
where
    I: IntoIterator,
    I::Item: Into<Resolution>,
{
    let inputs = coerce(handle, inputs);
    let (result, resolvers) = Promise::pending(handle);
    if inputs.is_empty() {
        resolvers.resolve(Value::Array(Vec::new()));
        return result;
    }

    let collector = Collector::new(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        let record = {
            let collector = collector.clone();
            let resolvers = resolvers.clone();
            move |outcome: SettledOutcome| {
                let done = collector.borrow_mut().fill(index, outcome.into_value());
                if let Some(records) = done {
                    resolvers.resolve(Value::Array(records));
                }
            }
        };
        let on_rejected = record.clone();
        input.subscribe(
            move |value| {
                record(SettledOutcome::Fulfilled(value));
                Ok(())
            },
            move |reason| {
                on_rejected(SettledOutcome::Rejected(reason));
                Ok(())
            },
        );
    }
    result
}

/// Fulfills with the first fulfillment value observed. Rejects with an
/// AggregateError carrying every reason in input order once all inputs have
/// rejected.
///
/// An empty input rejects immediately with an empty AggregateError.
pub fn any<I>(handle: &Handle, inputs: I) -> Promise
where
    I: IntoIterator,
    I::Item: Into<Resolution>,
{
    let inputs = coerce(handle, inputs);
    let (result, resolvers) = Promise::pending(handle);
    if inputs.is_empty() {
        resolvers.reject(JsError::aggregate(Vec::new(), ALL_REJECTED));
        return result;
    }

    let collector = Collector::new(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        let collector = collector.clone();
        let on_fulfilled = resolvers.clone();
        let on_rejected = resolvers.clone();
        input.subscribe(
            move |value| {
                on_fulfilled.resolve(value);
                Ok(())
            },
            move |reason| {
                let done = collector.borrow_mut().fill(index, reason);
                if let Some(errors) = done {
                    on_rejected.reject(JsError::aggregate(errors, ALL_REJECTED));
                }
                Ok(())
            },
        );
    }
    result
}

/// Settles like the first input to settle.
///
/// An empty input never settles.
pub fn race<I>(handle: &Handle, inputs: I) -> Promise
where
    I: IntoIterator,
    I::Item: Into<Resolution>,
{
    let inputs = coerce(handle, inputs);
    let (result, resolvers) = Promise::pending(handle);
    if inputs.is_empty() {
        log::debug!("race over no inputs stays pending");
    }
    for input in &inputs {
        subscribe_resolvers(input, &resolvers);
    }
    result
}

fn subscribe_resolvers(input: &Promise, resolvers: &Resolvers) {
    let on_fulfilled = resolvers.clone();
    let on_rejected = resolvers.clone();
    input.subscribe(
        move |value| {
            on_fulfilled.resolve(value);
            Ok(())
        },
        move |reason| {
            on_rejected.reject(reason);
            Ok(())
        },
    );
}
