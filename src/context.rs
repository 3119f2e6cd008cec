//! Execution context of promises
//!
//! Every promise carries two default executors: one which runs plain handlers
//! (fulfilled, rejected, settled and status callbacks), and one which runs the
//! transforms of chained promises. Chained promises inherit the context of the
//! promise they were derived from.
//!
//! A process-wide default context is built lazily on first use and is never
//! mutated afterwards. Code which needs different scheduling, such as unit
//! tests which want deterministic inline execution, passes its own context to
//! the `_in` constructors instead.

use crate::executor::{InlineExecutor, PoolConfig, SharedExecutor,
                      ThreadPoolExecutor};
use std::fmt;
use std::io;
use std::sync::{Arc, OnceLock};


/// Default executors of a family of promises
#[derive(Clone)]
pub struct PromiseContext {
    /// Executor used by handlers registered without an explicit executor
    handler_executor: SharedExecutor,

    /// Executor used by transforms chained without an explicit executor
    transform_executor: SharedExecutor,
}
//
impl PromiseContext {
    /// Build a context from explicit handler and transform executors
    pub fn new(handler_executor: SharedExecutor,
               transform_executor: SharedExecutor) -> Self {
        PromiseContext { handler_executor, transform_executor }
    }

    /// Build a context which runs everything on the calling thread
    pub fn inline() -> Self {
        let executor: SharedExecutor = Arc::new(InlineExecutor::new());
        PromiseContext::new(executor.clone(), executor)
    }

    /// Build a context backed by a new thread pool, shared by handlers and
    /// transforms
    pub fn with_pool(config: &PoolConfig) -> io::Result<Self> {
        let pool: SharedExecutor = Arc::new(ThreadPoolExecutor::new(config)?);
        Ok(PromiseContext::new(pool.clone(), pool))
    }

    /// Access the process-wide default context
    ///
    /// It is backed by a thread pool configured from the environment. Should
    /// that pool fail to start, the default context falls back to inline
    /// execution.
    pub fn global() -> &'static PromiseContext {
        static GLOBAL: OnceLock<PromiseContext> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let config = PoolConfig::from_env();
            PromiseContext::with_pool(&config).unwrap_or_else(|error| {
                tracing::warn!(%error, "cannot start default thread pool, using inline execution");
                PromiseContext::inline()
            })
        })
    }

    /// Executor used by handlers registered without an explicit executor
    pub fn handler_executor(&self) -> &SharedExecutor {
        &self.handler_executor
    }

    /// Executor used by transforms chained without an explicit executor
    pub fn transform_executor(&self) -> &SharedExecutor {
        &self.transform_executor
    }
}
//
impl Default for PromiseContext {
    fn default() -> Self {
        PromiseContext::global().clone()
    }
}
//
impl fmt::Debug for PromiseContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PromiseContext").finish_non_exhaustive()
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Executor;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    /// Check that the inline context runs tasks on the calling thread
    #[test]
    fn inline_context() {
        let context = PromiseContext::inline();
        let caller = thread::current().id();
        let (sender, receiver) = mpsc::channel();
        context.handler_executor().execute(Box::new(move || {
            sender.send(thread::current().id()).unwrap();
        }));
        assert_eq!(receiver.try_recv(), Ok(caller));
    }

    /// Check that the global context is a lazily built singleton
    #[test]
    fn global_context() {
        let first = PromiseContext::global();
        let second = PromiseContext::global();
        assert!(Arc::ptr_eq(first.handler_executor(), second.handler_executor()));

        let (sender, receiver) = mpsc::channel();
        first.transform_executor().execute(Box::new(move || {
            sender.send(7).unwrap();
        }));
        assert_eq!(receiver.recv_timeout(Duration::from_secs(5)), Ok(7));
    }
}
