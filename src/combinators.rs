//! Promises derived from values, errors, or several other promises
//!
//! Joins never block an executor thread: each input promise gets an inline
//! handler which records its outcome into the join's own state, and the last
//! one to arrive settles the combined promise.

use crate::context::PromiseContext;
use crate::errors::PromiseError;
use crate::executor::{InlineExecutor, SharedExecutor};
use crate::monitor::callback::Handler;
use crate::promise::Promise;
use crate::status::PromiseStatus;
use crate::transition::Transition;
use parking_lot::Mutex;
use std::sync::Arc;


impl<T, S> Promise<T, S>
    where T: Clone + Send + 'static,
          S: PromiseStatus
{
    /// Promise which is already fulfilled with some value
    pub fn resolve(value: T) -> Self {
        Promise::resolve_in(PromiseContext::global(), value)
    }

    /// Variant of `resolve()` in an explicit execution context
    pub fn resolve_in(context: &PromiseContext, value: T) -> Self {
        let promise = Promise::pending_in(context.clone(), None);
        Transition::bind(&promise).fulfill(value);
        promise
    }

    /// Promise which settles the same way as another promise
    pub fn resolve_promise(promise: Promise<T, S>) -> Self {
        Promise::resolve_promise_in(PromiseContext::global(), promise)
    }

    /// Variant of `resolve_promise()` in an explicit execution context
    pub fn resolve_promise_in(context: &PromiseContext,
                              promise: Promise<T, S>) -> Self {
        let resolved = Promise::pending_in(context.clone(), None);
        Transition::bind(&resolved).fulfill_with(promise);
        resolved
    }

    /// Promise which is already rejected
    pub fn reject(reason: impl Into<PromiseError>) -> Self {
        Promise::reject_in(PromiseContext::global(), reason)
    }

    /// Variant of `reject()` in an explicit execution context
    pub fn reject_in(context: &PromiseContext,
                     reason: impl Into<PromiseError>) -> Self {
        let promise = Promise::pending_in(context.clone(), None);
        Transition::bind(&promise).reject(reason);
        promise
    }

    /// Promise which is fulfilled with the values of every input, in input
    /// order, or rejected as soon as one input is rejected
    ///
    /// An empty input yields a promise which is already fulfilled with an
    /// empty vector.
    pub fn all<I>(promises: I) -> Promise<Vec<T>, S>
        where I: IntoIterator<Item = Promise<T, S>>
    {
        Promise::all_in(PromiseContext::global(), promises)
    }

    /// Variant of `all()` in an explicit execution context
    pub fn all_in<I>(context: &PromiseContext, promises: I) -> Promise<Vec<T>, S>
        where I: IntoIterator<Item = Promise<T, S>>
    {
        let promises: Vec<_> = promises.into_iter().collect();
        let combined = Promise::pending_in(context.clone(), None);
        let transition = Transition::bind(&combined);
        if promises.is_empty() {
            transition.fulfill(Vec::new());
            return combined;
        }

        let join = Arc::new(Mutex::new(Join {
            values: vec![None; promises.len()],
            remaining: promises.len(),
        }));
        let inline: SharedExecutor = Arc::new(InlineExecutor::new());
        for (index, promise) in promises.iter().enumerate() {
            let on_value = (join.clone(), transition.clone());
            let on_reason = transition.clone();
            promise.handle_on(inline.clone(), Handler::new()
                .on_fulfilled(move |value| {
                    let (join, transition) = on_value;
                    let complete = join.lock().record(index, value);
                    if let Some(values) = complete {
                        transition.fulfill(values);
                    }
                })
                .on_rejected(move |reason| { on_reason.reject(reason); }));
        }
        combined
    }

    /// Promise which settles the same way as the first input to settle
    ///
    /// An empty input yields a promise which never settles.
    pub fn race<I>(promises: I) -> Promise<T, S>
        where I: IntoIterator<Item = Promise<T, S>>
    {
        Promise::race_in(PromiseContext::global(), promises)
    }

    /// Variant of `race()` in an explicit execution context
    pub fn race_in<I>(context: &PromiseContext, promises: I) -> Promise<T, S>
        where I: IntoIterator<Item = Promise<T, S>>
    {
        let winner = Promise::pending_in(context.clone(), None);
        let transition = Transition::bind(&winner);
        let inline: SharedExecutor = Arc::new(InlineExecutor::new());
        for promise in promises {
            let on_value = transition.clone();
            let on_reason = transition.clone();
            promise.handle_on(inline.clone(), Handler::new()
                .on_fulfilled(move |value| { on_value.fulfill(value); })
                .on_rejected(move |reason| { on_reason.reject(reason); }));
        }
        winner
    }
}


/// Values collected so far by `Promise::all()`
struct Join<T> {
    /// Value of each input, once it is fulfilled
    values: Vec<Option<T>>,

    /// Number of inputs which have not been fulfilled yet
    remaining: usize,
}
//
impl<T> Join<T> {
    /// Record the value of an input, returning every value once all are known
    fn record(&mut self, index: usize, value: T) -> Option<Vec<T>> {
        if self.values[index].replace(value).is_none() {
            self.remaining -= 1;
        }
        if self.remaining > 0 {
            return None;
        }
        Some(self.values.iter_mut().filter_map(Option::take).collect())
    }
}
