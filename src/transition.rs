//! Producer side of a promise
//!
//! A `Transition` is the capability to settle a promise and to update its
//! status. It is handed over to the promise's initializer, and is the only way
//! to mutate the promise. It can be cloned and sent to other threads, so that
//! the work which eventually settles the promise may happen anywhere.
//!
//! Note that in general, transitions should not be handed out to clients, as
//! doing so would let them settle promises behind the producer's back.

use crate::errors::PromiseError;
use crate::promise::{Inner, Promise};
use crate::status::{PromiseStatus, State};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;


/// Capability to settle a promise and to update its status
pub struct Transition<T, S = ()> {
    inner: Arc<Inner<T, S>>,
}
//
impl<T, S> Transition<T, S>
    where T: Clone + Send + 'static,
          S: PromiseStatus
{
    /// Create the transition of a promise
    pub(crate) fn bind(promise: &Promise<T, S>) -> Self {
        Transition { inner: promise.inner.clone() }
    }

    /// Fulfill the promise with a value
    ///
    /// This does nothing, and returns false, unless the promise is pending. In
    /// particular, a promise which is waiting on another promise can only be
    /// settled by that other promise.
    pub fn fulfill(&self, value: T) -> bool {
        self.inner.settle(|state| state == State::Pending, Ok(value))
    }

    /// Fulfill the promise with the eventual outcome of another promise
    ///
    /// The promise enters the waiting state, relays every status update of the
    /// other promise, and finally settles the same way. This does nothing, and
    /// returns false, unless the promise is pending.
    pub fn fulfill_with(&self, promise: Promise<T, S>) -> bool {
        self.inner.adopt(&promise)
    }

    /// Reject the promise
    ///
    /// This does nothing, and returns false, unless the promise is pending.
    pub fn reject(&self, reason: impl Into<PromiseError>) -> bool {
        self.inner.settle(|state| state == State::Pending, Err(reason.into()))
    }

    /// Update the promise's status
    ///
    /// Listeners are only notified if the promise has not settled yet and the
    /// new status differs from the current one. Returns whether they were.
    pub fn update(&self, status: S) -> bool {
        self.inner.update(status)
    }

    /// Current life cycle state of the promise
    pub fn state(&self) -> State {
        self.inner.state()
    }

    /// Client handle to the promise which this transition settles
    pub fn promise(&self) -> Promise<T, S> {
        Promise { inner: self.inner.clone() }
    }

    /// Run some producer code with this transition, rejecting the promise if
    /// that code fails or panics
    pub(crate) fn drive<F>(self, producer: F)
        where F: FnOnce(Transition<T, S>) -> Result<(), PromiseError>
    {
        let guard = self.clone();
        let failure = match panic::catch_unwind(AssertUnwindSafe(|| producer(self))) {
            Ok(Ok(())) => return,
            Ok(Err(reason)) => reason,
            Err(payload) => PromiseError::from_panic(payload),
        };
        tracing::trace!(%failure, "promise producer failed");
        guard.reject(failure);
    }
}
//
impl<T, S> Clone for Transition<T, S> {
    fn clone(&self) -> Self {
        Transition { inner: self.inner.clone() }
    }
}
//
impl<T, S> fmt::Debug for Transition<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Transition").finish_non_exhaustive()
    }
}
