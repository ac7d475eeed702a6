//! Promise implementation following the Promise/A+ model.
//!
//! A [`Promise`] is a shared handle to a settlement state machine:
//! `Pending` moves exactly once to `Fulfilled` or `Rejected` and never
//! changes again. Reactions registered with [`Promise::then`] always run as
//! their own microtask, in registration order, even when the promise is
//! already settled at registration time.
//!
//! Resolving with another promise or a [`Thenable`] does not settle
//! immediately: an adoption job is queued that subscribes to the inner value,
//! and the outer promise takes on the inner's eventual state.

use crate::handle::Handle;
use crate::task_queue::MicroTask;
use crate::thenable::{Resolution, Thenable};
use core_types::{JsError, StackFrame, Value};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Runtime-unique promise identifier, used in diagnostics and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PromiseId(pub(crate) u64);

impl fmt::Display for PromiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The state of a Promise.
///
/// Once settled (Fulfilled or Rejected), a Promise cannot change state.
#[derive(Debug, Clone, PartialEq)]
pub enum PromiseState {
    /// Neither fulfilled nor rejected yet.
    Pending,
    /// Fulfilled with a value.
    Fulfilled(Value),
    /// Rejected with a reason.
    Rejected(JsError),
}

impl PromiseState {
    fn settlement(&self) -> Option<Result<Value, JsError>> {
        match self {
            PromiseState::Pending => None,
            PromiseState::Fulfilled(value) => Some(Ok(value.clone())),
            PromiseState::Rejected(reason) => Some(Err(reason.clone())),
        }
    }
}

type FulfillCallback = Box<dyn FnOnce(Value) -> Result<Resolution, JsError>>;
type RejectCallback = Box<dyn FnOnce(JsError) -> Result<Resolution, JsError>>;

/// Handler invoked with the fulfillment value.
///
/// Returning `Ok` resolves the derived promise (adopting it if the result is
/// itself a promise or thenable); returning `Err` rejects it.
pub struct FulfillHandler {
    callback: FulfillCallback,
}

impl FulfillHandler {
    /// Creates a handler from a closure.
    pub fn new<F, R>(f: F) -> Self
    where
        F: FnOnce(Value) -> Result<R, JsError> + 'static,
        R: Into<Resolution>,
    {
        Self {
            callback: Box::new(move |value| f(value).map(Into::into)),
        }
    }

    /// Calls the handler.
    pub fn call(self, value: Value) -> Result<Resolution, JsError> {
        (self.callback)(value)
    }
}

impl fmt::Debug for FulfillHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FulfillHandler {{ ... }}")
    }
}

/// Handler invoked with the rejection reason.
pub struct RejectHandler {
    callback: RejectCallback,
}

impl RejectHandler {
    /// Creates a handler from a closure.
    pub fn new<F, R>(f: F) -> Self
    where
        F: FnOnce(JsError) -> Result<R, JsError> + 'static,
        R: Into<Resolution>,
    {
        Self {
            callback: Box::new(move |reason| f(reason).map(Into::into)),
        }
    }

    /// Calls the handler.
    pub fn call(self, reason: JsError) -> Result<Resolution, JsError> {
        (self.callback)(reason)
    }
}

impl fmt::Debug for RejectHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RejectHandler {{ ... }}")
    }
}

/// A reaction to be triggered when a Promise settles.
///
/// Pairs the handlers registered by one `then` call with the derived promise
/// they settle. Internal subscriptions (adoption, combinators) have no
/// derived promise.
#[derive(Debug)]
pub(crate) struct PromiseReaction {
    derived: Option<Promise>,
    on_fulfilled: Option<FulfillHandler>,
    on_rejected: Option<RejectHandler>,
}

impl PromiseReaction {
    fn run(self, settlement: Result<Value, JsError>) -> Result<(), JsError> {
        // Only errors raised by a handler get the current stack attached;
        // pass-through rejections keep the reason untouched.
        let outcome = match settlement {
            Ok(value) => match self.on_fulfilled {
                Some(handler) => handler.call(value).map_err(|e| (e, true)),
                None => Ok(Resolution::Immediate(value)),
            },
            Err(reason) => match self.on_rejected {
                Some(handler) => handler.call(reason).map_err(|e| (e, true)),
                None => Err((reason, false)),
            },
        };
        let Some(derived) = self.derived else {
            return outcome.map(drop).map_err(|(reason, _)| reason);
        };
        match outcome {
            Ok(resolution) => derived.resolve(resolution),
            Err((mut reason, raised)) => {
                if raised && reason.stack.is_empty() {
                    reason.stack = derived.handle().stack_trace();
                }
                derived.reject(reason);
            }
        }
        Ok(())
    }
}

struct PromiseInner {
    id: PromiseId,
    state: PromiseState,
    reactions: Vec<PromiseReaction>,
    handled: bool,
    already_resolved: Rc<Cell<bool>>,
    handle: Handle,
}

/// A deferred value.
///
/// Cloning a `Promise` clones the handle, not the state: all clones observe
/// and settle the same promise.
///
/// # Examples
///
/// ```
/// use core_types::Value;
/// use event_runtime::{EventLoop, Promise, PromiseState};
///
/// let mut event_loop = EventLoop::new();
/// let promise = Promise::new(&event_loop.handle(), |resolvers| {
///     resolvers.resolve(Value::Smi(1));
///     Ok(())
/// });
/// let doubled = promise.and_then(|v| Ok(Value::Smi(v.as_number().unwrap_or(0.0) as i32 * 2)));
///
/// assert!(doubled.is_pending());
/// event_loop.run_until_done().unwrap();
/// assert_eq!(doubled.state(), PromiseState::Fulfilled(Value::Smi(2)));
/// ```
#[derive(Clone)]
pub struct Promise {
    inner: Rc<RefCell<PromiseInner>>,
}

/// Non-owning reference to a promise.
#[derive(Clone)]
pub(crate) struct WeakPromise {
    inner: Weak<RefCell<PromiseInner>>,
}

impl WeakPromise {
    pub(crate) fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl fmt::Debug for WeakPromise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakPromise {{ alive: {} }}", self.is_alive())
    }
}

impl Promise {
    fn pending_on(handle: &Handle) -> Self {
        Self {
            inner: Rc::new(RefCell::new(PromiseInner {
                id: handle.next_promise_id(),
                state: PromiseState::Pending,
                reactions: Vec::new(),
                handled: false,
                already_resolved: Rc::new(Cell::new(false)),
                handle: handle.clone(),
            })),
        }
    }

    /// Creates a promise and runs `executor` synchronously with its
    /// resolving functions.
    ///
    /// An `Err` returned by the executor rejects the promise, unless the
    /// executor already resolved it.
    pub fn new<F>(handle: &Handle, executor: F) -> Self
    where
        F: FnOnce(&Resolvers) -> Result<(), JsError>,
    {
        let promise = Self::pending_on(handle);
        let resolvers = Resolvers::primary(&promise);
        let result = handle.with_frame(StackFrame::named("executor"), || executor(&resolvers));
        if let Err(reason) = result {
            log::debug!("executor of promise {} failed: {}", promise.id(), reason);
            resolvers.reject(reason);
        }
        promise
    }

    /// Creates a pending promise together with its resolving functions.
    pub fn pending(handle: &Handle) -> (Self, Resolvers) {
        let promise = Self::pending_on(handle);
        let resolvers = Resolvers::primary(&promise);
        (promise, resolvers)
    }

    /// Coerces a value into a promise.
    ///
    /// A promise is returned as-is; a plain value gives an already-fulfilled
    /// promise; a thenable gives a promise adopting it.
    pub fn resolved(handle: &Handle, value: impl Into<Resolution>) -> Self {
        match value.into() {
            Resolution::Deferred(promise) => promise,
            other => {
                let promise = Self::pending_on(handle);
                promise.resolve(other);
                promise
            }
        }
    }

    /// Creates an already-rejected promise.
    pub fn rejected(handle: &Handle, reason: JsError) -> Self {
        let promise = Self::pending_on(handle);
        promise.reject(reason);
        promise
    }

    /// Identifier of this promise.
    pub fn id(&self) -> PromiseId {
        self.inner.borrow().id
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PromiseState {
        self.inner.borrow().state.clone()
    }

    /// Returns true while the promise is pending.
    pub fn is_pending(&self) -> bool {
        matches!(self.inner.borrow().state, PromiseState::Pending)
    }

    /// Returns true once the promise is fulfilled or rejected.
    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    /// Fulfillment value, if fulfilled.
    pub fn value(&self) -> Option<Value> {
        match &self.inner.borrow().state {
            PromiseState::Fulfilled(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Rejection reason, if rejected.
    pub fn reason(&self) -> Option<JsError> {
        match &self.inner.borrow().state {
            PromiseState::Rejected(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Returns true once any reaction has been registered.
    pub fn is_handled(&self) -> bool {
        self.inner.borrow().handled
    }

    /// Checks if there are reactions waiting for settlement.
    pub fn has_pending_reactions(&self) -> bool {
        !self.inner.borrow().reactions.is_empty()
    }

    /// Returns true if both handles refer to the same promise.
    pub fn ptr_eq(&self, other: &Promise) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn handle(&self) -> Handle {
        self.inner.borrow().handle.clone()
    }

    pub(crate) fn downgrade(&self) -> WeakPromise {
        WeakPromise {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Resolves the promise.
    ///
    /// No-op if the promise was already resolved or rejected, including when
    /// it is still pending on an adopted value.
    pub fn resolve(&self, value: impl Into<Resolution>) {
        Resolvers::primary(self).resolve(value);
    }

    /// Rejects the promise. No-op if it was already resolved or rejected.
    pub fn reject(&self, reason: JsError) {
        Resolvers::primary(self).reject(reason);
    }

    fn resolve_unchecked(&self, resolution: Resolution) {
        match resolution {
            Resolution::Immediate(value) => self.settle(PromiseState::Fulfilled(value)),
            Resolution::Deferred(inner) if inner.ptr_eq(self) => {
                let reason = JsError::type_error(format!(
                    "Chaining cycle detected for promise {}",
                    self.id()
                ));
                self.settle(PromiseState::Rejected(reason));
            }
            Resolution::Deferred(inner) => {
                log::debug!("promise {} adopting promise {}", self.id(), inner.id());
                self.adopt(Rc::new(inner));
            }
            Resolution::Thenable(thenable) => {
                log::debug!("promise {} adopting thenable", self.id());
                self.adopt(thenable);
            }
        }
    }

    fn adopt(&self, thenable: Rc<dyn Thenable>) {
        let target = self.clone();
        self.enqueue_job(move || {
            let resolvers = Resolvers::fresh(&target);
            if let Err(reason) = thenable.chain(resolvers.clone()) {
                resolvers.reject(reason);
            }
            Ok(())
        });
    }

    fn settle(&self, state: PromiseState) {
        let (reactions, unhandled) = {
            let mut inner = self.inner.borrow_mut();
            if !matches!(inner.state, PromiseState::Pending) {
                return;
            }
            log::debug!("promise {} settled: {:?}", inner.id, state);
            let unhandled = matches!(state, PromiseState::Rejected(_)) && !inner.handled;
            inner.state = state.clone();
            (std::mem::take(&mut inner.reactions), unhandled)
        };
        if unhandled {
            self.handle().track_rejection(self);
        }
        let Some(settlement) = state.settlement() else {
            return;
        };
        for reaction in reactions {
            self.enqueue_reaction(reaction, settlement.clone());
        }
    }

    fn enqueue_reaction(&self, reaction: PromiseReaction, settlement: Result<Value, JsError>) {
        self.enqueue_job(move || reaction.run(settlement));
    }

    fn enqueue_job<F>(&self, job: F)
    where
        F: FnOnce() -> Result<(), JsError> + 'static,
    {
        if let Err(err) = self.handle().enqueue_microtask(MicroTask::new(job)) {
            log::warn!("dropping job of promise {}: {}", self.id(), err);
        }
    }

    fn perform_then(&self, reaction: PromiseReaction) {
        let (settlement, newly_handled) = {
            let mut inner = self.inner.borrow_mut();
            let was_handled = std::mem::replace(&mut inner.handled, true);
            match inner.state.settlement() {
                None => {
                    inner.reactions.push(reaction);
                    return;
                }
                Some(settlement) => {
                    let newly_handled = settlement.is_err() && !was_handled;
                    (settlement, newly_handled)
                }
            }
        };
        if newly_handled {
            self.handle().rejection_handled(self);
        }
        self.enqueue_reaction(reaction, settlement);
    }

    /// Registers fulfillment and/or rejection handlers.
    ///
    /// Returns a derived promise settled by whichever handler runs. A missing
    /// handler passes the state through unchanged.
    pub fn then(
        &self,
        on_fulfilled: Option<FulfillHandler>,
        on_rejected: Option<RejectHandler>,
    ) -> Promise {
        let derived = Self::pending_on(&self.handle());
        self.perform_then(PromiseReaction {
            derived: Some(derived.clone()),
            on_fulfilled,
            on_rejected,
        });
        derived
    }

    /// Registers a fulfillment handler; rejections pass through.
    pub fn and_then<F, R>(&self, on_fulfilled: F) -> Promise
    where
        F: FnOnce(Value) -> Result<R, JsError> + 'static,
        R: Into<Resolution>,
    {
        self.then(Some(FulfillHandler::new(on_fulfilled)), None)
    }

    /// Registers a rejection handler; fulfillments pass through.
    pub fn catch<F, R>(&self, on_rejected: F) -> Promise
    where
        F: FnOnce(JsError) -> Result<R, JsError> + 'static,
        R: Into<Resolution>,
    {
        self.then(None, Some(RejectHandler::new(on_rejected)))
    }

    /// Registers a callback run on settlement in either direction.
    ///
    /// The original outcome passes through, unless `on_settled` fails or
    /// returns a promise that rejects; that rejection replaces it.
    pub fn finally<F, R>(&self, on_settled: F) -> Promise
    where
        F: FnOnce() -> Result<R, JsError> + 'static,
        R: Into<Resolution>,
    {
        let slot = Rc::new(RefCell::new(Some(on_settled)));
        let reject_slot = slot.clone();
        let handle = self.handle();
        let reject_handle = handle.clone();

        self.then(
            Some(FulfillHandler::new(move |value| {
                let cleanup = Promise::resolved(&handle, run_once(&*slot)?);
                Ok(cleanup.and_then(move |_| Ok(value)))
            })),
            Some(RejectHandler::new(move |reason| {
                let cleanup = Promise::resolved(&reject_handle, run_once(&*reject_slot)?);
                Ok(cleanup.and_then(move |_| Err::<Value, _>(reason)))
            })),
        )
    }

    /// Registers an internal reaction without a derived promise.
    pub(crate) fn subscribe<F, G>(&self, on_fulfilled: F, on_rejected: G)
    where
        F: FnOnce(Value) -> Result<(), JsError> + 'static,
        G: FnOnce(JsError) -> Result<(), JsError> + 'static,
    {
        self.perform_then(PromiseReaction {
            derived: None,
            on_fulfilled: Some(FulfillHandler::new(move |value| {
                on_fulfilled(value).map(|()| Value::Undefined)
            })),
            on_rejected: Some(RejectHandler::new(move |reason| {
                on_rejected(reason).map(|()| Value::Undefined)
            })),
        });
    }
}

fn run_once<F, R>(slot: &RefCell<Option<F>>) -> Result<Resolution, JsError>
where
    F: FnOnce() -> Result<R, JsError>,
    R: Into<Resolution>,
{
    let callback = slot.borrow_mut().take();
    match callback {
        Some(callback) => callback().map(Into::into),
        None => Ok(Resolution::Immediate(Value::Undefined)),
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Promise")
            .field("id", &inner.id)
            .field("state", &inner.state)
            .field("reactions", &inner.reactions.len())
            .finish()
    }
}

/// The resolving functions of a promise.
///
/// All clones share one "already resolved" flag: the first `resolve` or
/// `reject` call wins and every later call is ignored, even while the promise
/// is still pending on an adopted value.
#[derive(Clone)]
pub struct Resolvers {
    promise: Promise,
    already_resolved: Rc<Cell<bool>>,
}

impl Resolvers {
    fn primary(promise: &Promise) -> Self {
        let already_resolved = promise.inner.borrow().already_resolved.clone();
        Self {
            promise: promise.clone(),
            already_resolved,
        }
    }

    fn fresh(promise: &Promise) -> Self {
        Self {
            promise: promise.clone(),
            already_resolved: Rc::new(Cell::new(false)),
        }
    }

    /// The promise these functions settle.
    pub fn promise(&self) -> &Promise {
        &self.promise
    }

    /// Returns true once `resolve` or `reject` has been called.
    pub fn is_resolved(&self) -> bool {
        self.already_resolved.get()
    }

    /// Resolves the promise with a value, promise or thenable.
    pub fn resolve(&self, value: impl Into<Resolution>) {
        if self.already_resolved.replace(true) {
            log::trace!("ignoring resolve of promise {}", self.promise.id());
            return;
        }
        self.promise.resolve_unchecked(value.into());
    }

    /// Rejects the promise.
    pub fn reject(&self, reason: JsError) {
        if self.already_resolved.replace(true) {
            log::trace!("ignoring reject of promise {}", self.promise.id());
            return;
        }
        self.promise.settle(PromiseState::Rejected(reason));
    }
}

impl fmt::Debug for Resolvers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolvers")
            .field("promise", &self.promise.id())
            .field("already_resolved", &self.already_resolved.get())
            .finish()
    }
}
