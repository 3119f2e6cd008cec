//! Callback-based promise monitoring
//!
//! Clients attach handlers, which bundle up to three callbacks, to be run once
//! a promise settles, and status listeners, to be run whenever its status
//! changes. Each handler or listener is bound to the executor that will
//! eventually run it. Promises store these bindings in registration order and
//! submit them to their executors without holding any internal lock.

use crate::errors::{Outcome, PromiseError};
use crate::executor::{Executor, SharedExecutor};
use std::fmt;
use std::sync::Arc;


/// Callbacks to be run when a promise settles
///
/// The fulfilled callback receives the promise's value, the rejected callback
/// receives its rejection reason, and the settled callback runs after either
/// of them, whichever way the promise settled.
pub struct Handler<T> {
    on_fulfilled: Option<Box<dyn FnOnce(T) + Send>>,
    on_rejected: Option<Box<dyn FnOnce(PromiseError) + Send>>,
    on_settled: Option<Box<dyn FnOnce() + Send>>,
}
//
impl<T> Handler<T> {
    /// Create a handler which does nothing
    pub fn new() -> Self {
        Handler { on_fulfilled: None, on_rejected: None, on_settled: None }
    }

    /// Set the callback run when the promise is fulfilled
    pub fn on_fulfilled<F>(mut self, callback: F) -> Self
        where F: FnOnce(T) + Send + 'static
    {
        self.on_fulfilled = Some(Box::new(callback));
        self
    }

    /// Set the callback run when the promise is rejected
    pub fn on_rejected<F>(mut self, callback: F) -> Self
        where F: FnOnce(PromiseError) + Send + 'static
    {
        self.on_rejected = Some(Box::new(callback));
        self
    }

    /// Set the callback run after the promise settled either way
    pub fn on_settled<F>(mut self, callback: F) -> Self
        where F: FnOnce() + Send + 'static
    {
        self.on_settled = Some(Box::new(callback));
        self
    }

    /// Run the callbacks matching a promise outcome
    pub fn invoke(self, outcome: Outcome<T>) {
        match outcome {
            Ok(value) => {
                if let Some(on_fulfilled) = self.on_fulfilled {
                    on_fulfilled(value);
                }
            }
            Err(reason) => {
                if let Some(on_rejected) = self.on_rejected {
                    on_rejected(reason);
                }
            }
        }
        if let Some(on_settled) = self.on_settled {
            on_settled();
        }
    }
}
//
impl<T> Default for Handler<T> {
    fn default() -> Self {
        Handler::new()
    }
}
//
impl<T> fmt::Debug for Handler<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Handler")
         .field("on_fulfilled", &self.on_fulfilled.is_some())
         .field("on_rejected", &self.on_rejected.is_some())
         .field("on_settled", &self.on_settled.is_some())
         .finish()
    }
}


/// Handler bound to the executor which will run it
pub(crate) struct ScheduledHandler<T> {
    handler: Handler<T>,
    executor: SharedExecutor,
}
//
impl<T: Send + 'static> ScheduledHandler<T> {
    pub(crate) fn new(handler: Handler<T>, executor: SharedExecutor) -> Self {
        ScheduledHandler { handler, executor }
    }

    /// Submit the handler to its executor, with a settled promise's outcome
    pub(crate) fn dispatch(self, outcome: Outcome<T>) {
        let handler = self.handler;
        self.executor.execute(Box::new(move || handler.invoke(outcome)));
    }
}


/// Callback run on every status change of a promise
pub type StatusCallback<S> = Arc<dyn Fn(S) + Send + Sync>;


/// Status callback bound to the executor which will run it
pub(crate) struct StatusListener<S> {
    callback: StatusCallback<S>,
    executor: SharedExecutor,
}
//
impl<S: Send + 'static> StatusListener<S> {
    pub(crate) fn new(callback: StatusCallback<S>,
                      executor: SharedExecutor) -> Self {
        StatusListener { callback, executor }
    }

    /// Submit a status notification to the listener's executor
    pub(crate) fn notify(&self, status: S) {
        let callback = self.callback.clone();
        self.executor.execute(Box::new(move || callback(status)));
    }
}
//
impl<S> Clone for StatusListener<S> {
    fn clone(&self) -> Self {
        StatusListener {
            callback: self.callback.clone(),
            executor: self.executor.clone(),
        }
    }
}
