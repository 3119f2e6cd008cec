//! Thread pool callback executor
//!
//! This executor hands callbacks over to a fixed set of worker threads, fed by
//! a shared multi-consumer queue. It decouples producers from consumers: the
//! thread which settles a promise only pays for a queue insertion per
//! callback, however long the callbacks themselves take to run.

use crate::executor::{run_guarded, Executor, Task};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::env;
use std::io;
use std::thread::{self, JoinHandle};


/// Environment variable overriding the default worker count
pub const THREADS_ENV_VAR: &str = "THREADED_PROMISE_THREADS";

/// Environment variable overriding the default worker name prefix
pub const THREAD_NAME_ENV_VAR: &str = "THREADED_PROMISE_THREAD_NAME";


/// Configuration of a thread pool executor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads (at least one will be spawned)
    pub threads: usize,

    /// Prefix of the worker thread names, followed by the worker index
    pub thread_name: String,

    /// Stack size of the worker threads, or None for the platform default
    pub stack_size: Option<usize>,
}
//
impl PoolConfig {
    /// Start from the defaults, then apply any environment overrides
    ///
    /// Unparseable overrides are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = PoolConfig::default();
        if let Ok(threads) = env::var(THREADS_ENV_VAR) {
            match threads.trim().parse::<usize>() {
                Ok(threads) if threads > 0 => config.threads = threads,
                _ => tracing::warn!(
                    var = THREADS_ENV_VAR,
                    value = %threads,
                    "ignoring invalid worker count"
                ),
            }
        }
        if let Ok(name) = env::var(THREAD_NAME_ENV_VAR) {
            if !name.is_empty() {
                config.thread_name = name;
            }
        }
        config
    }

    /// Set the number of worker threads
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the worker thread name prefix
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Set the worker thread stack size
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}
//
impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            threads: thread::available_parallelism().map_or(4, |n| n.get()),
            thread_name: "promise-worker".to_owned(),
            stack_size: None,
        }
    }
}


/// Executor which runs tasks on a fixed pool of worker threads
///
/// Dropping the executor or calling `shutdown()` lets the workers finish the
/// tasks which were already queued, then joins them. Tasks submitted after
/// shutdown are run inline, so that no promise callback is ever lost.
pub struct ThreadPoolExecutor {
    /// Task queue, closed on shutdown
    sender: Mutex<Option<Sender<Task>>>,

    /// Worker threads, joined on shutdown
    workers: Mutex<Vec<JoinHandle<()>>>,
}
//
impl ThreadPoolExecutor {
    /// Spawn a thread pool with the given configuration
    pub fn new(config: &PoolConfig) -> io::Result<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded::<Task>();
        let threads = config.threads.max(1);
        let mut workers = Vec::with_capacity(threads);
        for index in 0..threads {
            let mut builder = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name, index));
            if let Some(bytes) = config.stack_size {
                builder = builder.stack_size(bytes);
            }
            let receiver = receiver.clone();
            // On failure, dropping the sender lets already spawned workers exit
            workers.push(builder.spawn(move || worker_loop(receiver))?);
        }
        tracing::debug!(threads, name = %config.thread_name, "thread pool started");
        Ok(ThreadPoolExecutor {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    /// Number of worker threads which have not been joined yet
    pub fn threads(&self) -> usize {
        self.workers.lock().len()
    }

    /// Stop accepting tasks, drain the queue, and join the worker threads
    ///
    /// If called from one of the pool's own workers, that worker is detached
    /// instead of joined.
    pub fn shutdown(&self) {
        // Closing the queue makes workers exit once it is drained
        if self.sender.lock().take().is_none() {
            return;
        }
        let current = thread::current().id();
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                tracing::error!("thread pool worker exited abnormally");
            }
        }
        tracing::debug!("thread pool shut down");
    }
}
//
impl Executor for ThreadPoolExecutor {
    fn execute(&self, task: Task) {
        let task = match &*self.sender.lock() {
            Some(sender) => match sender.send(task) {
                Ok(()) => return,
                Err(rejected) => rejected.into_inner(),
            },
            None => task,
        };
        tracing::warn!("thread pool is shut down, running task inline");
        run_guarded(task);
    }
}
//
impl Drop for ThreadPoolExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}


/// Main loop of a worker thread
fn worker_loop(receiver: Receiver<Task>) {
    for task in receiver.iter() {
        run_guarded(task);
    }
}
