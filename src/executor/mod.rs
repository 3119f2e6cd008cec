//! Callback executors
//!
//! Whenever callback-based notifications are used, one important design issue
//! is to decide how the callback functions should be executed.
//!
//! A traditional answer to this problem has been to run callbacks directly on
//! the thread which settles the promise, as part of the settlement process.
//! While this approach, also known as inline callback execution, works and has
//! minimal scheduling overhead, it also means that long-running callbacks
//! delay the producer, and that the order in which producers and consumers
//! make progress becomes tightly coupled.
//!
//! For this reason, every callback registered on a promise is bound to an
//! executor, which decides where and when the callback actually runs. Two
//! implementations are provided:
//!
//! - `InlineExecutor` runs callbacks immediately on the calling thread. It is
//!   used internally for cheap plumbing, and makes unit tests deterministic.
//! - `ThreadPoolExecutor` hands callbacks over to a fixed set of worker
//!   threads.
//!
//! Note that promises never hold their internal lock while submitting work to
//! an executor, so an inline executor cannot deadlock on the promise which
//! scheduled it.

pub mod inline;
pub mod pool;

pub use self::inline::InlineExecutor;
pub use self::pool::{PoolConfig, ThreadPoolExecutor};

use std::sync::Arc;


/// Unit of work submitted to an executor
pub type Task = Box<dyn FnOnce() + Send + 'static>;


/// Shared handle to an executor, as stored inside promises
pub type SharedExecutor = Arc<dyn Executor>;


/// Entry point to callback scheduling
///
/// Implementations must eventually run every task they accept exactly once.
/// Dropping a task without running it would silently lose a promise callback.
pub trait Executor: Send + Sync {
    /// Schedule a task for execution
    fn execute(&self, task: Task);
}
//
impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, task: Task) {
        (**self).execute(task)
    }
}


/// Run a task, reporting rather than propagating any panic that occurs
///
/// A panicking callback is a programming error in client code. It must not
/// prevent the remaining callbacks of a promise from running, nor take down
/// the worker thread which runs it.
pub(crate) fn run_guarded(task: Task) {
    use std::panic::{self, AssertUnwindSafe};
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        let message = crate::errors::PanicMessage::from_payload(payload);
        tracing::error!(panic = %message.message(), "promise callback panicked");
    }
}
