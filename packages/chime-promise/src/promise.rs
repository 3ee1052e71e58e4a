use crate::reason::Reason;
use crate::state::PromiseState;
use chime_scheduler::Scheduler;
use chime_scheduler::task::panic_message;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

type Outcome<T> = Result<T, Reason>;
type Reaction<T> = Box<dyn FnOnce(Outcome<T>)>;

struct Inner<T> {
    state: PromiseState<T>,
    reactions: SmallVec<[Reaction<T>; 2]>,
    /// Set once any continuation is registered.
    observed: bool,
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        if let PromiseState::Rejected(reason) = &self.state {
            if !self.observed {
                tracing::warn!(%reason, "unhandled promise rejection");
            }
        }
    }
}

/// A single-assignment value whose continuations run as scheduler microtasks.
///
/// Continuations registered with [`then`](Promise::then) and friends never run
/// synchronously: settling the promise (or registering on an already settled
/// one) enqueues one microtask per continuation, in registration order.
pub struct Promise<T> {
    inner: Rc<RefCell<Inner<T>>>,
    scheduler: Rc<dyn Scheduler>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            scheduler: self.scheduler.clone(),
        }
    }
}

/// The settling half of a promise. The first `resolve`/`reject` wins.
pub struct Resolver<T> {
    promise: Promise<T>,
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
        }
    }
}

impl<T: Clone + 'static> Resolver<T> {
    /// Fulfil the promise. Returns `false` if it was already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.promise.settle(Ok(value))
    }

    /// Reject the promise. Returns `false` if it was already settled.
    pub fn reject(&self, reason: impl Into<Reason>) -> bool {
        self.promise.settle(Err(reason.into()))
    }

    pub fn settle(&self, outcome: Result<T, Reason>) -> bool {
        self.promise.settle(outcome)
    }
}

fn guarded<R>(f: impl FnOnce() -> R) -> Result<R, Reason> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| Reason::new(panic_message(payload.as_ref())))
}

impl<T: Clone + 'static> Promise<T> {
    /// Create a pending promise and hand its resolver to `executor`, which
    /// runs synchronously. A panicking executor rejects the promise.
    pub fn new<F>(scheduler: Rc<dyn Scheduler>, executor: F) -> Self
    where
        F: FnOnce(Resolver<T>),
    {
        let (promise, resolver) = Self::with_resolver(scheduler);
        if let Err(reason) = guarded(|| executor(resolver.clone())) {
            resolver.reject(reason);
        }
        promise
    }

    /// A pending promise together with the resolver that settles it.
    pub fn with_resolver(scheduler: Rc<dyn Scheduler>) -> (Self, Resolver<T>) {
        let promise = Self {
            inner: Rc::new(RefCell::new(Inner {
                state: PromiseState::Pending,
                reactions: SmallVec::new(),
                observed: false,
            })),
            scheduler,
        };
        let resolver = Resolver {
            promise: promise.clone(),
        };
        (promise, resolver)
    }

    pub fn resolved(scheduler: Rc<dyn Scheduler>, value: T) -> Self {
        let (promise, resolver) = Self::with_resolver(scheduler);
        resolver.resolve(value);
        promise
    }

    pub fn rejected(scheduler: Rc<dyn Scheduler>, reason: impl Into<Reason>) -> Self {
        let (promise, resolver) = Self::with_resolver(scheduler);
        resolver.reject(reason);
        promise
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PromiseState<T> {
        self.inner.borrow().state.clone()
    }

    pub fn is_pending(&self) -> bool {
        !self.inner.borrow().state.is_settled()
    }

    pub fn value(&self) -> Option<T> {
        match &self.inner.borrow().state {
            PromiseState::Fulfilled(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<Reason> {
        match &self.inner.borrow().state {
            PromiseState::Rejected(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Run `f` with the fulfilled value; rejections pass through untouched.
    pub fn then<U, F>(&self, f: F) -> Promise<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> U + 'static,
    {
        self.chain(move |outcome, resolver| match outcome {
            Ok(value) => {
                resolver.settle(guarded(|| f(value)));
            }
            Err(reason) => {
                resolver.reject(reason);
            }
        })
    }

    /// Like [`then`](Self::then) for handlers that can fail.
    pub fn try_then<U, F>(&self, f: F) -> Promise<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<U, Reason> + 'static,
    {
        self.chain(move |outcome, resolver| {
            resolver.settle(outcome.and_then(|value| guarded(|| f(value)).and_then(|r| r)));
        })
    }

    /// Chain a handler that returns another promise; the derived promise
    /// adopts that promise's outcome.
    pub fn and_then<U, F>(&self, f: F) -> Promise<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Promise<U> + 'static,
    {
        self.chain(move |outcome, resolver: Resolver<U>| {
            let next = match outcome {
                Ok(value) => guarded(|| f(value)),
                Err(reason) => Err(reason),
            };
            match next {
                Ok(promise) => promise.subscribe(Box::new(move |outcome| {
                    resolver.settle(outcome);
                })),
                Err(reason) => {
                    resolver.reject(reason);
                }
            }
        })
    }

    /// Recover from a rejection; fulfilments pass through untouched.
    pub fn catch<F>(&self, f: F) -> Promise<T>
    where
        F: FnOnce(Reason) -> T + 'static,
    {
        self.chain(move |outcome, resolver| match outcome {
            Ok(value) => {
                resolver.resolve(value);
            }
            Err(reason) => {
                resolver.settle(guarded(|| f(reason)));
            }
        })
    }

    /// Run `f` once the promise settles either way, passing the outcome on.
    pub fn finally<F>(&self, f: F) -> Promise<T>
    where
        F: FnOnce() + 'static,
    {
        self.chain(move |outcome, resolver| match guarded(f) {
            Ok(()) => {
                resolver.settle(outcome);
            }
            Err(reason) => {
                resolver.reject(reason);
            }
        })
    }

    fn chain<U, H>(&self, handler: H) -> Promise<U>
    where
        U: Clone + 'static,
        H: FnOnce(Outcome<T>, Resolver<U>) + 'static,
    {
        let (derived, resolver) = Promise::with_resolver(self.scheduler.clone());
        self.subscribe(Box::new(move |outcome| handler(outcome, resolver)));
        derived
    }

    fn subscribe(&self, reaction: Reaction<T>) {
        let mut inner = self.inner.borrow_mut();
        inner.observed = true;
        let settled = inner.state.outcome();
        match settled {
            None => inner.reactions.push(reaction),
            Some(outcome) => {
                drop(inner);
                self.scheduler
                    .schedule_microtask(Box::new(move || reaction(outcome)));
            }
        }
    }

    fn settle(&self, outcome: Outcome<T>) -> bool {
        let reactions = {
            let mut inner = self.inner.borrow_mut();
            if inner.state.is_settled() {
                return false;
            }
            inner.state = match &outcome {
                Ok(value) => PromiseState::Fulfilled(value.clone()),
                Err(reason) => PromiseState::Rejected(reason.clone()),
            };
            std::mem::take(&mut inner.reactions)
        };

        tracing::trace!(
            fulfilled = outcome.is_ok(),
            continuations = reactions.len(),
            "promise settled"
        );
        for reaction in reactions {
            let outcome = outcome.clone();
            self.scheduler
                .schedule_microtask(Box::new(move || reaction(outcome)));
        }
        true
    }
}
