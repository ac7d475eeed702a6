//! Thenable adoption.
//!
//! A promise can be resolved with a plain value, another [`Promise`], or any
//! foreign type that knows how to report its eventual outcome. Instead of
//! duck typing, the three cases are an explicit [`Resolution`] variant and
//! foreign types opt in by implementing [`Thenable`].

use crate::promise::{Promise, Resolvers};
use core_types::{JsError, Value};
use std::fmt;
use std::rc::Rc;

/// Something a promise can adopt the outcome of.
///
/// `chain` is called from a microtask with fresh resolving functions for the
/// adopting promise. Implementations call `resolvers.resolve` or
/// `resolvers.reject` once the outcome is known, now or later. Only the first
/// call has any effect. Returning `Err` rejects the adopting promise unless
/// one of the resolvers was already called.
///
/// ```
/// use core_types::{JsError, Value};
/// use event_runtime::{EventLoop, Promise, Resolution, Resolvers, Thenable};
/// use std::rc::Rc;
///
/// struct Ready(i32);
///
/// impl Thenable for Ready {
///     fn chain(&self, resolvers: Resolvers) -> Result<(), JsError> {
///         resolvers.resolve(Value::Smi(self.0));
///         Ok(())
///     }
/// }
///
/// let mut event_loop = EventLoop::new();
/// let promise = Promise::resolved(&event_loop.handle(), Resolution::Thenable(Rc::new(Ready(7))));
/// event_loop.run_until_done().unwrap();
/// assert_eq!(promise.value(), Some(Value::Smi(7)));
/// ```
pub trait Thenable {
    /// Subscribes `resolvers` to this value's outcome.
    fn chain(&self, resolvers: Resolvers) -> Result<(), JsError>;
}

/// What a promise is resolved with.
#[derive(Clone)]
pub enum Resolution {
    /// A plain value; the promise fulfills immediately
    Immediate(Value),
    /// Another promise; its eventual state is adopted
    Deferred(Promise),
    /// A foreign thenable; its eventual state is adopted
    Thenable(Rc<dyn Thenable>),
}

impl Resolution {
    /// Wraps a foreign thenable.
    pub fn thenable<T: Thenable + 'static>(thenable: T) -> Self {
        Resolution::Thenable(Rc::new(thenable))
    }
}

impl From<Value> for Resolution {
    fn from(value: Value) -> Self {
        Resolution::Immediate(value)
    }
}

impl From<Promise> for Resolution {
    fn from(promise: Promise) -> Self {
        Resolution::Deferred(promise)
    }
}

impl From<&Promise> for Resolution {
    fn from(promise: &Promise) -> Self {
        Resolution::Deferred(promise.clone())
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Immediate(value) => f.debug_tuple("Immediate").field(value).finish(),
            Resolution::Deferred(promise) => f.debug_tuple("Deferred").field(promise).finish(),
            Resolution::Thenable(_) => write!(f, "Thenable(...)"),
        }
    }
}

impl Thenable for Promise {
    fn chain(&self, resolvers: Resolvers) -> Result<(), JsError> {
        let on_reject = resolvers.clone();
        self.subscribe(
            move |value| {
                resolvers.resolve(value);
                Ok(())
            },
            move |reason| {
                on_reject.reject(reason);
                Ok(())
            },
        );
        Ok(())
    }
}
