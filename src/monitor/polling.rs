//! Polling-based promise monitoring
//!
//! This module provides a way to monitor the status of a promise through
//! polling. It provides maximal performance in scenarios where a client does
//! not need to synchronize with a promise, but only to periodically check its
//! status, as is the case for example when updating progress bars and status
//! graphs in user interfaces.

use crate::executor::{InlineExecutor, SharedExecutor};
use crate::promise::Promise;
use crate::status::PromiseStatus;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use triple_buffer::{Output, TripleBuffer};


impl<T, S> Promise<T, S>
    where T: Clone + Send + 'static,
          S: PromiseStatus
{
    /// Build a poller which gives wait-free access to the latest status
    ///
    /// Status updates are written into a triple buffer as they happen, and
    /// the poller reads the most recent one whenever it is asked to. The
    /// status which the promise has at construction time does not count as an
    /// update.
    pub fn status_poller(&self) -> StatusPoller<S> {
        let buffer = TripleBuffer::new(&None::<S>);
        let (buf_input, mut buf_output) = buffer.split();
        let buf_input = Mutex::new(buf_input);
        let inline: SharedExecutor = Arc::new(InlineExecutor::new());
        self.status_on(inline, move |status| {
            buf_input.lock().write(Some(status));
        });

        // Registration wrote the current status, if any, which is not news
        buf_output.read();
        StatusPoller { buf_output }
    }
}


/// Client interface, used to poll the status of a promise
pub struct StatusPoller<S: Send> {
    /// Latest status will be read through this triple buffer
    buf_output: Output<Option<S>>,
}
//
impl<S: PromiseStatus> StatusPoller<S> {
    /// Access the latest status of the promise, if any was set
    pub fn status(&mut self) -> Option<&S> {
        self.buf_output.read().as_ref()
    }

    /// Truth that a status update happened since the last read
    pub fn updated(&self) -> bool {
        self.buf_output.updated()
    }
}
//
impl<S: Send> fmt::Debug for StatusPoller<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("StatusPoller").finish_non_exhaustive()
    }
}
