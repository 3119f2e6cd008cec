//! Blocking-based promise monitoring
//!
//! This module provides a way to synchronize with a promise by blocking the
//! calling thread until it settles. This synchronization mechanism is easy to
//! use and reason about, but should be used with care as the unpredictable
//! application delays that it introduces can be harmful to performance. In
//! particular, waiting for a promise from a thread of the pool which is
//! supposed to settle it will deadlock.
//!
//! A bounded wait which times out withdraws the handler through which it was
//! waiting, so that repeated bounded waits on a long-running promise do not
//! accumulate handlers.

use crate::errors::{Outcome, PromiseError};
use crate::executor::{InlineExecutor, SharedExecutor};
use crate::monitor::callback::{Handler, ScheduledHandler};
use crate::promise::Promise;
use crate::status::PromiseStatus;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};


impl<T, S> Promise<T, S>
    where T: Clone + Send + 'static,
          S: PromiseStatus
{
    /// Block until the promise settles, then return its outcome
    pub fn wait(&self) -> Outcome<T> {
        self.wait_deadline(None)
    }

    /// Block until the promise settles or a timeout elapses
    ///
    /// On timeout, `PromiseError::AwaitTimeout` is returned and the promise
    /// is left untouched. It is up to the caller to cancel it if the outcome
    /// is not needed anymore. A promise which settles while the timeout is
    /// being processed is reported as settled.
    pub fn wait_timeout(&self, timeout: Duration) -> Outcome<T> {
        // Timeouts which overflow the clock are as good as no timeout at all
        self.wait_deadline(Instant::now().checked_add(timeout))
    }

    fn wait_deadline(&self, deadline: Option<Instant>) -> Outcome<T> {
        // Fast path for promises which are already settled
        if let Some(outcome) = self.outcome() {
            return outcome;
        }

        // Have the promise open a gate upon settlement, then wait for it
        let gate = Arc::new(Gate::new());
        let opener = gate.clone();
        let inline: SharedExecutor = Arc::new(InlineExecutor::new());
        let handler = Handler::new().on_settled(move || opener.open());
        let queued = self.inner.handle(ScheduledHandler::new(handler, inline));
        let opened = match deadline {
            Some(deadline) => gate.wait_until(deadline),
            None => {
                gate.wait();
                true
            }
        };
        if !opened {
            // Failing to withdraw the handler means that settlement won the race
            if queued.map_or(false, |id| self.inner.unhandle(id)) {
                tracing::debug!("timed out waiting for a promise");
                return Err(PromiseError::AwaitTimeout);
            }
        }
        self.outcome().unwrap_or(Err(PromiseError::AwaitTimeout))
    }
}


/// One-shot synchronization point, opened once and for all
struct Gate {
    /// Whether the gate was opened (mutex-protected)
    open_lock: Mutex<bool>,

    /// Condition variable used to notify waiters about the opening
    open_cv: Condvar,
}
//
impl Gate {
    fn new() -> Self {
        Gate { open_lock: Mutex::new(false), open_cv: Condvar::new() }
    }

    /// Open the gate and wake up every waiter
    fn open(&self) {
        *self.open_lock.lock() = true;
        self.open_cv.notify_all();
    }

    /// Wait until the gate is opened
    fn wait(&self) {
        let mut open = self.open_lock.lock();
        while !*open {
            self.open_cv.wait(&mut open);
        }
    }

    /// Wait until the gate is opened or a deadline is reached, telling
    /// whether the gate was opened
    fn wait_until(&self, deadline: Instant) -> bool {
        let mut open = self.open_lock.lock();
        while !*open {
            if self.open_cv.wait_until(&mut open, deadline).timed_out() {
                return *open;
            }
        }
        true
    }
}
