//! Future-based promise monitoring
//!
//! Promises can be awaited from async code. The future registers an inline
//! settlement handler the first time it is polled, which wakes the task that
//! polled it most recently.

use crate::errors::Outcome;
use crate::executor::{InlineExecutor, SharedExecutor};
use crate::promise::Promise;
use crate::status::PromiseStatus;
use parking_lot::Mutex;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};


/// Future which resolves to the outcome of a promise
pub struct PromiseFuture<T, S = ()> {
    /// Promise being awaited
    promise: Promise<T, S>,

    /// Waker of the task to be notified upon settlement, shared with the
    /// settlement handler once it has been registered
    waker: Option<Arc<Mutex<Option<Waker>>>>,
}
//
impl<T, S> PromiseFuture<T, S> {
    fn new(promise: Promise<T, S>) -> Self {
        PromiseFuture { promise, waker: None }
    }
}
//
impl<T, S> Future for PromiseFuture<T, S>
    where T: Clone + Send + 'static,
          S: PromiseStatus
{
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Outcome<T>> {
        let this = self.get_mut();
        if let Some(outcome) = this.promise.outcome() {
            return Poll::Ready(outcome);
        }

        match &this.waker {
            Some(slot) => {
                *slot.lock() = Some(cx.waker().clone());
            }
            None => {
                let slot = Arc::new(Mutex::new(Some(cx.waker().clone())));
                let handler_slot = slot.clone();
                let inline: SharedExecutor = Arc::new(InlineExecutor::new());
                this.promise.settled_on(inline, move || {
                    let waker = handler_slot.lock().take();
                    if let Some(waker) = waker {
                        waker.wake();
                    }
                });
                this.waker = Some(slot);
            }
        }

        // The promise may have settled while the waker was being stored
        match this.promise.outcome() {
            Some(outcome) => Poll::Ready(outcome),
            None => Poll::Pending,
        }
    }
}
//
impl<T, S: fmt::Debug> fmt::Debug for PromiseFuture<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PromiseFuture")
         .field("promise", &self.promise)
         .finish_non_exhaustive()
    }
}


impl<T, S> Promise<T, S>
    where T: Clone + Send + 'static,
          S: PromiseStatus
{
    /// Build a future which resolves to the outcome of this promise
    pub fn to_future(&self) -> PromiseFuture<T, S> {
        PromiseFuture::new(self.clone())
    }
}
//
impl<T, S> IntoFuture for Promise<T, S>
    where T: Clone + Send + 'static,
          S: PromiseStatus
{
    type Output = Outcome<T>;
    type IntoFuture = PromiseFuture<T, S>;

    fn into_future(self) -> PromiseFuture<T, S> {
        PromiseFuture::new(self)
    }
}
