//! Deferred promises
//!
//! Sometimes the code which settles a promise does not fit in an initializer,
//! for example because settlement is triggered by some unrelated event loop.
//! A `Deferred` pairs a pending promise with the transition which settles it,
//! so that the producer can keep both around for as long as it needs.

use crate::context::PromiseContext;
use crate::errors::PromiseError;
use crate::promise::Promise;
use crate::status::PromiseStatus;
use crate::transition::Transition;


/// Pending promise, along with the capability to settle it
#[derive(Debug)]
pub struct Deferred<T, S = ()> {
    /// Client side, to be handed out to consumers
    promise: Promise<T, S>,

    /// Producer side
    transition: Transition<T, S>,
}
//
impl<T, S> Deferred<T, S>
    where T: Clone + Send + 'static,
          S: PromiseStatus
{
    /// Create a deferred promise without status, in the default context
    pub fn new() -> Self {
        Deferred::new_in(PromiseContext::global(), None)
    }

    /// Create a deferred promise with an initial status, in the default context
    pub fn with_status(initial_status: S) -> Self {
        Deferred::new_in(PromiseContext::global(), Some(initial_status))
    }

    /// Create a deferred promise in an explicit execution context
    pub fn new_in(context: &PromiseContext, initial_status: Option<S>) -> Self {
        let promise = Promise::pending_in(context.clone(), initial_status);
        let transition = Transition::bind(&promise);
        Deferred { promise, transition }
    }

    /// Client side of the deferred promise
    pub fn promise(&self) -> &Promise<T, S> {
        &self.promise
    }

    /// Producer side of the deferred promise
    pub fn transition(&self) -> &Transition<T, S> {
        &self.transition
    }

    /// Split the deferred promise into its client and producer sides
    pub fn split(self) -> (Promise<T, S>, Transition<T, S>) {
        (self.promise, self.transition)
    }

    /// Fulfill the promise, see `Transition::fulfill()`
    pub fn fulfill(&self, value: T) -> bool {
        self.transition.fulfill(value)
    }

    /// Adopt another promise's outcome, see `Transition::fulfill_with()`
    pub fn fulfill_with(&self, promise: Promise<T, S>) -> bool {
        self.transition.fulfill_with(promise)
    }

    /// Reject the promise, see `Transition::reject()`
    pub fn reject(&self, reason: impl Into<PromiseError>) -> bool {
        self.transition.reject(reason)
    }

    /// Update the promise's status, see `Transition::update()`
    pub fn update(&self, status: S) -> bool {
        self.transition.update(status)
    }
}
//
impl<T, S> Default for Deferred<T, S>
    where T: Clone + Send + 'static,
          S: PromiseStatus
{
    fn default() -> Self {
        Deferred::new()
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::State;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    /// Check that a deferred promise starts out pending with its status
    #[test]
    fn initial_state() {
        let deferred: Deferred<String, &str> =
            Deferred::new_in(&PromiseContext::inline(), Some("init"));
        assert_eq!(deferred.promise().state(), State::Pending);
        assert_eq!(deferred.promise().current_status(), Some("init"));
        assert_eq!(deferred.transition().state(), State::Pending);
    }

    /// Check settlement by a producer thread, with progress reports
    #[test]
    fn producer_thread() {
        let deferred: Deferred<String, char> =
            Deferred::new_in(&PromiseContext::inline(), None);
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let s_statuses = statuses.clone();
        let promise = deferred.promise().clone();
        promise.status(move |s| s_statuses.lock().push(s));
        let chained = promise.then(|v| Ok(format!("#{}#", v)));

        let (_, transition) = deferred.split();
        let producer = thread::spawn(move || {
            for status in "ABCDE".chars() {
                transition.update(status);
            }
            transition.fulfill("webee.yw".to_owned());
        });
        assert_eq!(chained.wait_timeout(Duration::from_secs(5)).unwrap(),
                   "#webee.yw#");
        producer.join().unwrap();
        assert_eq!(*statuses.lock(), vec!['A', 'B', 'C', 'D', 'E']);
    }

    /// Check the default constructors
    #[test]
    fn defaults() {
        let deferred: Deferred<i32> = Deferred::default();
        assert!(deferred.reject("nope"));
        assert!(deferred.promise().wait().unwrap_err().to_string() == "nope");

        let with_status: Deferred<i32, u8> = Deferred::with_status(3);
        assert_eq!(with_status.promise().current_status(), Some(3));
        assert!(with_status.fulfill_with(Promise::resolve(4)));
        assert_eq!(with_status.promise().wait().unwrap(), 4);
    }
}
