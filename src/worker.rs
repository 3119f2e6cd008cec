//! Single-flight job runner
//!
//! A `SingletonWorker` wraps some asynchronous work, which can be triggered
//! at any time by calling `start()`. If the work is not running, it starts.
//! If it is running, one rerun is scheduled for when the current run is over,
//! however many times `start()` was called meanwhile. This is handy when some
//! view must be refreshed whenever its underlying data changes: refreshes then
//! never overlap, and bursts of changes only cost one extra refresh.
//!
//! A worker may also be created uninitialized, in which case triggers are
//! recorded but nothing runs until `init()` is called.

use crate::context::PromiseContext;
use crate::errors::PromiseError;
use crate::executor::{InlineExecutor, SharedExecutor};
use crate::monitor::callback::Handler;
use crate::promise::Promise;
use crate::status::PromiseStatus;
use parking_lot::Mutex;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;


/// Re-triggerable job runner, which never runs its work concurrently
pub struct SingletonWorker<T, S = ()> {
    shared: Arc<Shared<T, S>>,
}
//
impl<T, S> SingletonWorker<T, S>
    where T: Clone + Send + 'static,
          S: PromiseStatus
{
    /// Create an initialized worker, running on the default transform executor
    pub fn new<W>(work: W) -> Self
        where W: Fn() -> Promise<T, S> + Send + Sync + 'static
    {
        SingletonWorker::new_in(PromiseContext::global(), true, work)
    }

    /// Create a worker which does not run until `init()` is called
    pub fn deferred<W>(work: W) -> Self
        where W: Fn() -> Promise<T, S> + Send + Sync + 'static
    {
        SingletonWorker::new_in(PromiseContext::global(), false, work)
    }

    /// Create a worker running on the transform executor of some context
    pub fn new_in<W>(context: &PromiseContext, initialized: bool, work: W) -> Self
        where W: Fn() -> Promise<T, S> + Send + Sync + 'static
    {
        SingletonWorker {
            shared: Arc::new(Shared {
                work: Box::new(work),
                state: Mutex::new(WorkerState {
                    initialized,
                    triggered: false,
                    run: RunState::Idle,
                }),
                executor: context.transform_executor().clone(),
            }),
        }
    }

    /// Allow the worker to run, starting it if it was triggered beforehand
    pub fn init(&self) {
        let triggered = {
            let mut state = self.shared.state.lock();
            state.initialized = true;
            std::mem::replace(&mut state.triggered, false)
        };
        if triggered {
            self.start();
        }
    }

    /// Trigger the work
    ///
    /// Runs it if it is idle, otherwise schedules a single rerun.
    pub fn start(&self) {
        let launch = {
            let mut state = self.shared.state.lock();
            if !state.initialized {
                state.triggered = true;
                return;
            }
            match state.run {
                RunState::Idle => {
                    state.run = RunState::Running;
                    true
                }
                RunState::Running | RunState::RunningWithPending => {
                    state.run = RunState::RunningWithPending;
                    false
                }
            }
        };
        if launch {
            Shared::launch(&self.shared);
        }
    }

    /// Truth that the work is currently running
    pub fn is_running(&self) -> bool {
        self.shared.state.lock().run != RunState::Idle
    }
}
//
impl<T, S> Clone for SingletonWorker<T, S> {
    fn clone(&self) -> Self {
        SingletonWorker { shared: self.shared.clone() }
    }
}
//
impl<T, S> fmt::Debug for SingletonWorker<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("SingletonWorker")
         .field("initialized", &state.initialized)
         .field("triggered", &state.triggered)
         .field("run", &state.run)
         .finish()
    }
}


/// State shared between a worker's handles and its runs
struct Shared<T, S> {
    /// Work to be run on every trigger
    work: Box<dyn Fn() -> Promise<T, S> + Send + Sync>,

    /// Scheduling state (mutex-protected)
    state: Mutex<WorkerState>,

    /// Executor on which the work is started
    executor: SharedExecutor,
}
//
impl<T, S> Shared<T, S>
    where T: Clone + Send + 'static,
          S: PromiseStatus
{
    /// Start one run of the work, and follow its promise until it settles
    fn launch(shared: &Arc<Self>) {
        let run_shared = shared.clone();
        shared.executor.execute(Box::new(move || {
            let started = panic::catch_unwind(AssertUnwindSafe(|| (run_shared.work)()));
            match started {
                Ok(promise) => {
                    let on_settled = run_shared.clone();
                    let inline: SharedExecutor = Arc::new(InlineExecutor::new());
                    promise.handle_on(inline, Handler::new()
                        .on_rejected(|reason| {
                            tracing::warn!(%reason, "singleton worker run failed");
                        })
                        .on_settled(move || Shared::finish(&on_settled)));
                }
                Err(payload) => {
                    let reason = PromiseError::from_panic(payload);
                    tracing::warn!(%reason, "singleton worker run failed");
                    Shared::finish(&run_shared);
                }
            }
        }));
    }

    /// Conclude a run, starting the next one if it was requested meanwhile
    fn finish(shared: &Arc<Self>) {
        let relaunch = {
            let mut state = shared.state.lock();
            match state.run {
                RunState::RunningWithPending => {
                    state.run = RunState::Running;
                    true
                }
                RunState::Running | RunState::Idle => {
                    state.run = RunState::Idle;
                    false
                }
            }
        };
        if relaunch {
            tracing::trace!("singleton worker rerun");
            Shared::launch(shared);
        }
    }
}


/// Scheduling state of a worker
struct WorkerState {
    /// Whether the worker is allowed to run
    initialized: bool,

    /// Whether the worker was triggered before being initialized
    triggered: bool,

    /// Run state
    run: RunState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    RunningWithPending,
}
