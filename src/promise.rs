//! Promises and their state machine
//!
//! A `Promise` is a handle to a computation which eventually settles into a
//! value or a rejection reason, and which may report progress through a
//! status payload until then. Promises are cheap to clone: all clones refer to
//! the same shared state.
//!
//! The shared state is protected by a single mutex, which guards the life
//! cycle state, the outcome, the status, and the queues of handlers and status
//! listeners together. Checking whether a promise is settled and enqueuing a
//! handler otherwise is therefore atomic with respect to settlement, so that
//! no handler can be missed or run twice. User callbacks are always submitted
//! to their executors after the lock has been released.
//!
//! Status notifications additionally go through a per-promise dispatch lock,
//! which is held from the moment a status is stored until every listener has
//! received it, and which settlement must also acquire. Listeners therefore see
//! statuses in the order in which they were stored, and never after settlement.
//! The dispatch lock is reentrant, so that inline listeners may update or settle
//! the promise which notified them.

use crate::context::PromiseContext;
use crate::errors::{Outcome, PromiseError};
use crate::executor::{InlineExecutor, SharedExecutor};
use crate::monitor::callback::{Handler, ScheduledHandler, StatusListener};
use crate::status::{PromiseStatus, State};
use crate::transition::Transition;
use parking_lot::{Mutex, ReentrantMutex};
use std::fmt;
use std::sync::Arc;


/// Handle to the eventual outcome of a computation
///
/// `T` is the type of the value which the promise is fulfilled with, and `S`
/// the type of the status payload through which progress is reported.
pub struct Promise<T, S = ()> {
    pub(crate) inner: Arc<Inner<T, S>>,
}
//
impl<T, S> Promise<T, S>
    where T: Clone + Send + 'static,
          S: PromiseStatus
{
    /// Create a promise without initial status, using the default context
    ///
    /// The initializer is run synchronously with the transition which settles
    /// the promise. It may settle it right away, or hand the transition over
    /// to some other thread. Should the initializer fail or panic, the promise
    /// is rejected.
    pub fn new<F>(initializer: F) -> Self
        where F: FnOnce(Transition<T, S>) -> Result<(), PromiseError>
    {
        Promise::new_in(PromiseContext::global(), None, initializer)
    }

    /// Create a promise with some initial status, using the default context
    pub fn with_status<F>(initial_status: S, initializer: F) -> Self
        where F: FnOnce(Transition<T, S>) -> Result<(), PromiseError>
    {
        Promise::new_in(PromiseContext::global(), Some(initial_status),
                        initializer)
    }

    /// Create a promise in an explicit execution context
    pub fn new_in<F>(context: &PromiseContext,
                     initial_status: Option<S>,
                     initializer: F) -> Self
        where F: FnOnce(Transition<T, S>) -> Result<(), PromiseError>
    {
        let promise = Promise::pending_in(context.clone(), initial_status);
        Transition::bind(&promise).drive(initializer);
        promise
    }

    /// Create a pending promise, leaving the transition to the caller
    pub(crate) fn pending_in(context: PromiseContext,
                             initial_status: Option<S>) -> Self {
        Promise {
            inner: Arc::new(Inner {
                core: Mutex::new(Core {
                    state: State::Pending,
                    value: None,
                    reason: None,
                    status: initial_status,
                    handlers: Vec::new(),
                    next_handler_id: 0,
                    listeners: Vec::new(),
                }),
                dispatch: ReentrantMutex::new(()),
                context,
            }),
        }
    }

    /// Current life cycle state
    pub fn state(&self) -> State {
        self.inner.core.lock().state
    }

    /// Truth that the promise has been fulfilled or rejected
    pub fn is_settled(&self) -> bool {
        self.state().is_final()
    }

    /// Latest status, if any has been set
    pub fn current_status(&self) -> Option<S> {
        self.inner.core.lock().status.clone()
    }

    /// Outcome of the promise, or None if it has not settled yet
    pub fn outcome(&self) -> Option<Outcome<T>> {
        self.inner.core.lock().outcome()
    }

    /// Execution context which this promise and its derivatives use
    pub fn context(&self) -> &PromiseContext {
        &self.inner.context
    }

    /// Truth that two handles refer to the same promise
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Reject the promise as canceled, if it has not settled yet
    ///
    /// Returns true if this call settled the promise, false if the promise had
    /// already settled for another reason. Cancellation does not interrupt
    /// the producer, it only forecloses the outcome.
    pub fn cancel(&self) -> bool {
        let canceled = self.inner.settle(|state| !state.is_final(),
                                         Err(PromiseError::Canceled));
        if canceled {
            tracing::debug!("promise canceled");
        }
        canceled
    }

    /// Register a handler, run on the default handler executor
    pub fn handle(&self, handler: Handler<T>) -> &Self {
        self.handle_on(self.context().handler_executor().clone(), handler)
    }

    /// Register a handler, run on a specific executor
    ///
    /// If the promise has already settled, the handler is submitted to its
    /// executor right away. Otherwise, it will be submitted upon settlement.
    pub fn handle_on(&self, executor: SharedExecutor,
                     handler: Handler<T>) -> &Self {
        self.inner.handle(ScheduledHandler::new(handler, executor));
        self
    }

    /// Run a callback with the value once the promise is fulfilled
    pub fn fulfilled<F>(&self, on_fulfilled: F) -> &Self
        where F: FnOnce(T) + Send + 'static
    {
        self.handle(Handler::new().on_fulfilled(on_fulfilled))
    }

    /// Variant of `fulfilled()` with an explicit executor
    pub fn fulfilled_on<F>(&self, executor: SharedExecutor,
                           on_fulfilled: F) -> &Self
        where F: FnOnce(T) + Send + 'static
    {
        self.handle_on(executor, Handler::new().on_fulfilled(on_fulfilled))
    }

    /// Run a callback with the reason once the promise is rejected
    pub fn rejected<F>(&self, on_rejected: F) -> &Self
        where F: FnOnce(PromiseError) + Send + 'static
    {
        self.handle(Handler::new().on_rejected(on_rejected))
    }

    /// Variant of `rejected()` with an explicit executor
    pub fn rejected_on<F>(&self, executor: SharedExecutor,
                          on_rejected: F) -> &Self
        where F: FnOnce(PromiseError) + Send + 'static
    {
        self.handle_on(executor, Handler::new().on_rejected(on_rejected))
    }

    /// Run a callback once the promise has settled, either way
    pub fn settled<F>(&self, on_settled: F) -> &Self
        where F: FnOnce() + Send + 'static
    {
        self.handle(Handler::new().on_settled(on_settled))
    }

    /// Variant of `settled()` with an explicit executor
    pub fn settled_on<F>(&self, executor: SharedExecutor,
                         on_settled: F) -> &Self
        where F: FnOnce() + Send + 'static
    {
        self.handle_on(executor, Handler::new().on_settled(on_settled))
    }

    /// Run a callback on every status change until the promise settles
    ///
    /// If the promise already has a status, the callback is also run once
    /// with it right away.
    pub fn status<F>(&self, on_status: F) -> &Self
        where F: Fn(S) + Send + Sync + 'static
    {
        self.status_on(self.context().handler_executor().clone(), on_status)
    }

    /// Variant of `status()` with an explicit executor
    pub fn status_on<F>(&self, executor: SharedExecutor, on_status: F) -> &Self
        where F: Fn(S) + Send + Sync + 'static
    {
        self.inner.listen(StatusListener::new(Arc::new(on_status), executor));
        self
    }

    /// Chain a transform of the value, run on the default transform executor
    ///
    /// The resulting promise is fulfilled with the transform's result, or
    /// rejected if the transform fails or this promise is rejected.
    pub fn then<V, F>(&self, transform: F) -> Promise<V, S>
        where V: Clone + Send + 'static,
              F: FnOnce(T) -> Result<V, PromiseError> + Send + 'static
    {
        self.then_on(self.context().transform_executor().clone(), transform)
    }

    /// Variant of `then()` with an explicit executor
    pub fn then_on<V, F>(&self, executor: SharedExecutor,
                         transform: F) -> Promise<V, S>
        where V: Clone + Send + 'static,
              F: FnOnce(T) -> Result<V, PromiseError> + Send + 'static
    {
        self.then_with_on(executor, None, move |value, transition| {
            transition.fulfill(transform(value)?);
            Ok(())
        })
    }

    /// Chain a transform which produces another promise
    ///
    /// The resulting promise adopts the outcome and status updates of the
    /// promise returned by the transform.
    pub fn then_promise<V, F>(&self, transform: F) -> Promise<V, S>
        where V: Clone + Send + 'static,
              F: FnOnce(T) -> Result<Promise<V, S>, PromiseError> + Send + 'static
    {
        self.then_promise_on(self.context().transform_executor().clone(),
                             transform)
    }

    /// Variant of `then_promise()` with an explicit executor
    pub fn then_promise_on<V, F>(&self, executor: SharedExecutor,
                                 transform: F) -> Promise<V, S>
        where V: Clone + Send + 'static,
              F: FnOnce(T) -> Result<Promise<V, S>, PromiseError> + Send + 'static
    {
        self.then_with_on(executor, None, move |value, transition| {
            transition.fulfill_with(transform(value)?);
            Ok(())
        })
    }

    /// Chain a continuation which drives the next promise by itself
    ///
    /// The continuation receives the value along with the transition of the
    /// resulting promise, which it may update any number of times before
    /// settling it, possibly from another thread.
    pub fn then_with<V, S2, F>(&self, initial_status: Option<S2>,
                               continuation: F) -> Promise<V, S2>
        where V: Clone + Send + 'static,
              S2: PromiseStatus,
              F: FnOnce(T, Transition<V, S2>) -> Result<(), PromiseError>
                 + Send + 'static
    {
        self.then_with_on(self.context().transform_executor().clone(),
                          initial_status,
                          continuation)
    }

    /// Variant of `then_with()` with an explicit executor
    pub fn then_with_on<V, S2, F>(&self, executor: SharedExecutor,
                                  initial_status: Option<S2>,
                                  continuation: F) -> Promise<V, S2>
        where V: Clone + Send + 'static,
              S2: PromiseStatus,
              F: FnOnce(T, Transition<V, S2>) -> Result<(), PromiseError>
                 + Send + 'static
    {
        let next = Promise::pending_in(self.context().clone(), initial_status);
        let on_value = Transition::bind(&next);
        let on_reason = on_value.clone();
        self.handle_on(executor, Handler::new()
            .on_fulfilled(move |value| {
                on_value.drive(move |transition| continuation(value, transition))
            })
            .on_rejected(move |reason| { on_reason.reject(reason); }));
        next
    }

    /// Chain a recovery from rejection, run on the default transform executor
    ///
    /// Fulfillment is propagated unchanged. On rejection, the resulting
    /// promise is fulfilled with the recovered value, or rejected with the
    /// error returned by the recovery.
    pub fn then_catch<F>(&self, recovery: F) -> Promise<T, S>
        where F: FnOnce(PromiseError) -> Result<T, PromiseError> + Send + 'static
    {
        self.then_catch_on(self.context().transform_executor().clone(),
                           recovery)
    }

    /// Variant of `then_catch()` with an explicit executor
    pub fn then_catch_on<F>(&self, executor: SharedExecutor,
                            recovery: F) -> Promise<T, S>
        where F: FnOnce(PromiseError) -> Result<T, PromiseError> + Send + 'static
    {
        let next = Promise::pending_in(self.context().clone(), None);
        let on_value = Transition::bind(&next);
        let on_reason = on_value.clone();
        self.handle_on(executor, Handler::new()
            .on_fulfilled(move |value| { on_value.fulfill(value); })
            .on_rejected(move |reason| {
                on_reason.drive(move |transition| {
                    transition.fulfill(recovery(reason)?);
                    Ok(())
                })
            }));
        next
    }

    /// Chain a side effect, passing the value through unchanged
    pub fn then_run<F>(&self, action: F) -> Promise<T, S>
        where F: FnOnce() + Send + 'static
    {
        self.then(move |value| {
            action();
            Ok(value)
        })
    }
}
//
impl<T, S> Clone for Promise<T, S> {
    fn clone(&self) -> Self {
        Promise { inner: self.inner.clone() }
    }
}
//
impl<T, S: fmt::Debug> fmt::Debug for Promise<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let core = self.inner.core.lock();
        f.debug_struct("Promise")
         .field("state", &core.state)
         .field("status", &core.status)
         .field("handlers", &core.handlers.len())
         .field("listeners", &core.listeners.len())
         .finish()
    }
}


/// State shared by all handles and transitions of a promise
pub(crate) struct Inner<T, S> {
    /// Mutable state, protected by the promise's single lock
    core: Mutex<Core<T, S>>,

    /// Serializes status notifications with each other and with settlement
    dispatch: ReentrantMutex<()>,

    /// Default executors of this promise and its derivatives
    context: PromiseContext,
}
//
impl<T, S> Inner<T, S>
    where T: Clone + Send + 'static,
          S: PromiseStatus
{
    /// Settle the promise, provided that its current state is accepted
    ///
    /// Returns whether the promise was settled by this call. Queued handlers
    /// are dispatched in registration order, and status listeners are dropped
    /// since no further status update can occur.
    pub(crate) fn settle<A>(&self, accept: A, outcome: Outcome<T>) -> bool
        where A: FnOnce(State) -> bool
    {
        let (handlers, listeners) = {
            let _dispatch = self.dispatch.lock();
            let mut core = self.core.lock();
            if !accept(core.state) {
                return false;
            }
            match &outcome {
                Ok(value) => {
                    core.state = State::Fulfilled;
                    core.value = Some(value.clone());
                }
                Err(reason) => {
                    core.state = State::Rejected;
                    core.reason = Some(reason.clone());
                }
            }
            (std::mem::take(&mut core.handlers),
             std::mem::take(&mut core.listeners))
        };
        tracing::trace!(
            fulfilled = outcome.is_ok(),
            handlers = handlers.len(),
            "promise settled"
        );
        drop(listeners);
        for (_, handler) in handlers {
            handler.dispatch(outcome.clone());
        }
        true
    }

    /// Store a new status and notify listeners, if the status has changed
    /// and the promise has not settled yet
    pub(crate) fn update(&self, status: S) -> bool {
        let _dispatch = self.dispatch.lock();
        let listeners = {
            let mut core = self.core.lock();
            if !core.state.accepts_updates()
                || core.status.as_ref() == Some(&status) {
                return false;
            }
            core.status = Some(status.clone());
            core.listeners.clone()
        };
        for listener in listeners {
            listener.notify(status.clone());
        }
        true
    }

    /// Adopt the outcome and status updates of another promise
    ///
    /// Returns false if this promise was not pending anymore.
    pub(crate) fn adopt(self: &Arc<Self>, other: &Promise<T, S>) -> bool {
        if Arc::ptr_eq(self, &other.inner) {
            return self.settle(|state| state == State::Pending,
                               Err(PromiseError::ChainingCycle));
        }
        {
            let mut core = self.core.lock();
            if core.state != State::Pending {
                return false;
            }
            core.state = State::Waiting;
        }
        tracing::debug!("promise waiting on another promise");

        // Relaying happens inline, as if the other promise's status and
        // outcome were produced locally
        let inline: SharedExecutor = Arc::new(InlineExecutor::new());
        let relay = self.clone();
        let on_value = self.clone();
        let on_reason = self.clone();
        other.status_on(inline.clone(), move |status| { relay.update(status); })
             .handle_on(inline, Handler::new()
                 .on_fulfilled(move |value| {
                     on_value.settle(|state| state == State::Waiting, Ok(value));
                 })
                 .on_rejected(move |reason| {
                     on_reason.settle(|state| state == State::Waiting,
                                      Err(reason));
                 }));
        true
    }

    /// Register a handler, or dispatch it right away if already settled
    ///
    /// Returns the identifier of the queued handler, or None if it was
    /// dispatched right away.
    pub(crate) fn handle(&self, handler: ScheduledHandler<T>) -> Option<HandlerId> {
        let outcome = {
            let mut core = self.core.lock();
            match core.outcome() {
                Some(outcome) => outcome,
                None => {
                    let id = HandlerId(core.next_handler_id);
                    core.next_handler_id += 1;
                    core.handlers.push((id, handler));
                    return Some(id);
                }
            }
        };
        handler.dispatch(outcome);
        None
    }

    /// Withdraw a queued handler, which will then never run
    ///
    /// Returns false if the handler is not queued anymore, which means that
    /// the promise has settled and the handler was dispatched.
    pub(crate) fn unhandle(&self, id: HandlerId) -> bool {
        let mut core = self.core.lock();
        let queued = core.handlers.len();
        core.handlers.retain(|(queued_id, _)| *queued_id != id);
        core.handlers.len() != queued
    }

    /// Register a status listener, notifying it of the current status if any
    pub(crate) fn listen(&self, listener: StatusListener<S>) {
        let _dispatch = self.dispatch.lock();
        let current = {
            let mut core = self.core.lock();
            if core.state.accepts_updates() {
                core.listeners.push(listener.clone());
            }
            core.status.clone()
        };
        if let Some(status) = current {
            listener.notify(status);
        }
    }

    /// Current life cycle state
    pub(crate) fn state(&self) -> State {
        self.core.lock().state
    }
}


/// Identifier of a queued handler, used to withdraw it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct HandlerId(u64);


/// Mutable state of a promise
struct Core<T, S> {
    /// Life cycle state
    state: State,

    /// Value, set upon fulfillment
    value: Option<T>,

    /// Rejection reason, set upon rejection
    reason: Option<PromiseError>,

    /// Latest status, frozen upon settlement
    status: Option<S>,

    /// Handlers waiting for settlement, in registration order
    handlers: Vec<(HandlerId, ScheduledHandler<T>)>,

    /// Identifier of the next queued handler
    next_handler_id: u64,

    /// Status listeners, in registration order, dropped upon settlement
    listeners: Vec<StatusListener<S>>,
}
//
impl<T: Clone, S> Core<T, S> {
    /// Outcome of the promise, if it has settled
    fn outcome(&self) -> Option<Outcome<T>> {
        match self.state {
            State::Pending | State::Waiting => None,
            State::Fulfilled => self.value.clone().map(Ok),
            State::Rejected => self.reason.clone().map(Err),
        }
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Executor, Task};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn inline() -> PromiseContext {
        PromiseContext::inline()
    }

    fn log<V: Send + 'static>() -> (Arc<Mutex<Vec<V>>>, Arc<Mutex<Vec<V>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (log.clone(), log)
    }

    /// Check the initial state of promises
    #[test]
    fn initial_state() {
        let promise: Promise<i32, &str> =
            Promise::new_in(&inline(), Some("init"), |_| Ok(()));
        assert_eq!(promise.state(), State::Pending);
        assert_eq!(promise.current_status(), Some("init"));
        assert!(promise.outcome().is_none());
        assert!(!promise.is_settled());
    }

    /// Check that the first settlement wins and later ones are no-ops
    #[test]
    fn write_once() {
        let promise: Promise<i32> = Promise::new_in(&inline(), None, |t| {
            assert!(t.fulfill(1));
            assert!(!t.fulfill(2));
            assert!(!t.reject("late"));
            Ok(())
        });
        assert_eq!(promise.state(), State::Fulfilled);
        assert_eq!(promise.outcome().unwrap().unwrap(), 1);
        assert!(!promise.cancel());
    }

    /// Check that failing and panicking initializers reject the promise
    #[test]
    fn failing_initializers() {
        let failed: Promise<i32> =
            Promise::new_in(&inline(), None, |_| Err("setup failed".into()));
        assert_eq!(failed.outcome().unwrap().unwrap_err().to_string(),
                   "setup failed");

        let panicked: Promise<i32> =
            Promise::new_in(&inline(), None, |_| panic!("setup panicked"));
        match panicked.outcome() {
            Some(Err(PromiseError::TransformFailure(cause))) => {
                assert_eq!(cause.to_string(), "panicked: setup panicked")
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    /// Check that handlers registered before and after settlement all fire
    /// exactly once, in registration order
    #[test]
    fn handlers_fire_once() {
        let context = inline();
        let (seen, s1) = log();
        let (s2, s3) = (seen.clone(), seen.clone());
        let deferred: crate::Deferred<&str> = crate::Deferred::new_in(&context, None);
        let promise = deferred.promise().clone();
        promise.fulfilled(move |v| s1.lock().push(format!("first {}", v)))
               .settled(move || s2.lock().push("second".to_owned()));
        assert!(seen.lock().is_empty());

        deferred.fulfill("x");
        deferred.fulfill("y");
        promise.fulfilled(move |v| s3.lock().push(format!("late {}", v)));
        assert_eq!(*seen.lock(), vec!["first x", "second", "late x"]);
    }

    /// Check rejection handlers
    #[test]
    fn rejection_handlers() {
        let (seen, s1) = log();
        let s2 = seen.clone();
        let promise: Promise<i32> =
            Promise::new_in(&inline(), None, |t| { t.reject("bad"); Ok(()) });
        promise.fulfilled(move |_| s1.lock().push("fulfilled".to_owned()))
               .rejected(move |e| s2.lock().push(e.to_string()));
        assert_eq!(*seen.lock(), vec!["bad"]);
        assert_eq!(promise.state(), State::Rejected);
    }

    /// Check status propagation and deduplication
    #[test]
    fn status_updates() {
        let context = inline();
        let (seen, s1) = log();
        let deferred: crate::Deferred<(), u32> =
            crate::Deferred::new_in(&context, Some(0));
        deferred.promise().status(move |s| s1.lock().push(s));
        assert!(deferred.update(1));
        assert!(!deferred.update(1));
        assert!(deferred.update(2));
        deferred.fulfill(());
        assert!(!deferred.update(3));
        assert_eq!(*seen.lock(), vec![0, 1, 2]);
        assert_eq!(deferred.promise().current_status(), Some(2));
    }

    /// Check that listeners registered without a status are not notified
    /// until the first update
    #[test]
    fn no_initial_status() {
        let (seen, s1) = log();
        let deferred: crate::Deferred<(), &str> =
            crate::Deferred::new_in(&inline(), None);
        deferred.promise().status(move |s| s1.lock().push(s));
        assert!(seen.lock().is_empty());
        deferred.update("a");
        assert_eq!(*seen.lock(), vec!["a"]);
    }

    /// Executor which, once armed, holds back the next task until released,
    /// then runs tasks inline
    struct GatedExecutor {
        armed: AtomicBool,
        parked: crossbeam_channel::Sender<()>,
        release: crossbeam_channel::Receiver<()>,
    }
    //
    impl Executor for GatedExecutor {
        fn execute(&self, task: Task) {
            if self.armed.swap(false, Ordering::SeqCst) {
                self.parked.send(()).unwrap();
                self.release.recv().unwrap();
            }
            task();
        }
    }

    /// Check that interleaved updates reach listeners in the order in which
    /// they were stored, even if a notification is held back
    #[test]
    fn interleaved_updates_stay_ordered() {
        let (parked_sender, parked) = crossbeam_channel::unbounded();
        let (release, release_receiver) = crossbeam_channel::unbounded();
        let gated = Arc::new(GatedExecutor {
            armed: AtomicBool::new(false),
            parked: parked_sender,
            release: release_receiver,
        });
        let gated_executor: SharedExecutor = gated.clone();

        let deferred: crate::Deferred<(), u32> = crate::Deferred::new_in(&inline(), None);
        let (seen, s1) = log();
        deferred.promise().status_on(gated_executor, move |s| s1.lock().push(s));
        let mut poller = deferred.promise().status_poller();
        gated.armed.store(true, Ordering::SeqCst);

        // The first update gets stuck while notifying the gated listener...
        let first = deferred.transition().clone();
        let first_updater = thread::spawn(move || first.update(1));
        parked.recv_timeout(Duration::from_secs(5)).unwrap();

        // ...and the second one must wait for it to be fully delivered
        let second = deferred.transition().clone();
        let second_updater = thread::spawn(move || second.update(2));
        thread::sleep(Duration::from_millis(50));
        assert!(!second_updater.is_finished());
        assert_eq!(deferred.promise().current_status(), Some(1));

        release.send(()).unwrap();
        assert!(first_updater.join().unwrap());
        assert!(second_updater.join().unwrap());
        assert_eq!(*seen.lock(), vec![1, 2]);
        assert_eq!(poller.status(), Some(&2));
        assert_eq!(deferred.promise().current_status(), Some(2));
    }

    /// Check that settlement waits for in-flight status notifications
    #[test]
    fn settlement_after_notifications() {
        let (parked_sender, parked) = crossbeam_channel::unbounded();
        let (release, release_receiver) = crossbeam_channel::unbounded();
        let gated = Arc::new(GatedExecutor {
            armed: AtomicBool::new(true),
            parked: parked_sender,
            release: release_receiver,
        });
        let gated_executor: SharedExecutor = gated.clone();

        let deferred: crate::Deferred<&str, u32> = crate::Deferred::new_in(&inline(), None);
        let (seen, s1) = log();
        let s2 = seen.clone();
        deferred.promise().status_on(gated_executor, move |s| s1.lock().push(s.to_string()));
        deferred.promise().fulfilled(move |v| s2.lock().push(v.to_owned()));

        let updater = deferred.transition().clone();
        let updater = thread::spawn(move || updater.update(1));
        parked.recv_timeout(Duration::from_secs(5)).unwrap();
        let settler = deferred.transition().clone();
        let settler = thread::spawn(move || settler.fulfill("done"));
        thread::sleep(Duration::from_millis(50));
        assert!(!deferred.promise().is_settled());

        release.send(()).unwrap();
        assert!(updater.join().unwrap());
        assert!(settler.join().unwrap());
        assert_eq!(*seen.lock(), vec!["1", "done"]);
    }

    /// Check that inline listeners may update and settle their own promise
    #[test]
    fn reentrant_listeners() {
        let deferred: crate::Deferred<u32, u32> = crate::Deferred::new_in(&inline(), None);
        let transition = deferred.transition().clone();
        deferred.promise().status(move |s| {
            if s == 3 {
                transition.fulfill(s);
            } else {
                transition.update(s + 1);
            }
        });
        deferred.update(1);
        assert_eq!(deferred.promise().outcome().unwrap().unwrap(), 3);
        assert_eq!(deferred.promise().current_status(), Some(3));
    }

    /// Check value transforms
    #[test]
    fn then_transforms() {
        let promise: Promise<i32> = Promise::resolve_in(&inline(), 20);
        let next = promise.then(|v| Ok(v + 1))
                          .then(|v| Ok(format!("#{}#", v * 2)));
        assert_eq!(next.outcome().unwrap().unwrap(), "#42#");

        let failed = promise.then(|_| -> Result<i32, _> { Err("nope".into()) });
        assert_eq!(failed.outcome().unwrap().unwrap_err().to_string(), "nope");

        let panicked = promise.then(|_| -> Result<i32, _> { panic!("kaboom") });
        assert!(matches!(panicked.outcome(),
                         Some(Err(PromiseError::TransformFailure(_)))));
    }

    /// Check that rejections skip value transforms
    #[test]
    fn then_propagates_rejection() {
        let (ran, r1) = log();
        let promise: Promise<i32> = Promise::reject_in(&inline(), "upstream");
        let next = promise.then(move |v| { r1.lock().push(v); Ok(v) });
        assert_eq!(next.outcome().unwrap().unwrap_err().to_string(), "upstream");
        assert!(ran.lock().is_empty());
    }

    /// Check transforms which return promises
    #[test]
    fn then_promise_adopts() {
        let context = inline();
        let inner: crate::Deferred<String, &str> =
            crate::Deferred::new_in(&context, None);
        let inner_promise = inner.promise().clone();
        let source: Promise<i32, &str> = Promise::resolve_in(&context, 1);
        let next = source.then_promise(move |_| Ok(inner_promise));
        assert_eq!(next.state(), State::Waiting);

        let (seen, s1) = log();
        next.status(move |s| s1.lock().push(s));
        inner.update("halfway");
        inner.fulfill("done".to_owned());
        assert_eq!(*seen.lock(), vec!["halfway"]);
        assert_eq!(next.outcome().unwrap().unwrap(), "done");
    }

    /// Check recovery from rejection
    #[test]
    fn then_catch_recovers() {
        let context = inline();
        let failed: Promise<i32> = Promise::reject_in(&context, "xxx");
        let recovered = failed.then_catch(|e| {
            if e.to_string() == "xxx" { Ok(123) } else { Err(e) }
        });
        assert_eq!(recovered.outcome().unwrap().unwrap(), 123);

        let rethrown = failed.then_catch(|_| Err("still broken".into()));
        assert_eq!(rethrown.outcome().unwrap().unwrap_err().to_string(),
                   "still broken");

        let fine: Promise<i32> = Promise::resolve_in(&context, 5);
        let untouched = fine.then_catch(|_| Ok(0));
        assert_eq!(untouched.outcome().unwrap().unwrap(), 5);
    }

    /// Check continuations which drive the next promise's status
    #[test]
    fn then_with_streams_status() {
        let context = inline();
        let source: Promise<u32> = Promise::resolve_in(&context, 3);
        let (seen, s1) = log();
        let next = source.then_with(Some(0u32), |count, transition| {
            for step in 1..=count {
                transition.update(step);
            }
            transition.fulfill(format!("{} steps", count));
            Ok(())
        });
        next.status(move |s| s1.lock().push(s));
        assert_eq!(*seen.lock(), vec![3]);
        assert_eq!(next.outcome().unwrap().unwrap(), "3 steps");
        assert_eq!(next.current_status(), Some(3));
    }

    /// Check side effect chaining
    #[test]
    fn then_run_passes_value() {
        let (ran, r1) = log();
        let source: Promise<&str> = Promise::resolve_in(&inline(), "v");
        let next = source.then_run(move || r1.lock().push(()));
        assert_eq!(next.outcome().unwrap().unwrap(), "v");
        assert_eq!(ran.lock().len(), 1);
    }

    /// Check cancellation of pending and waiting promises
    #[test]
    fn cancellation() {
        let context = inline();
        let deferred: crate::Deferred<i32> = crate::Deferred::new_in(&context, None);
        let (seen, s1) = log();
        deferred.promise().rejected(move |e| s1.lock().push(e.is_canceled()));
        assert!(deferred.promise().cancel());
        assert!(!deferred.promise().cancel());
        assert!(!deferred.fulfill(1));
        assert_eq!(*seen.lock(), vec![true]);

        let never: crate::Deferred<i32> = crate::Deferred::new_in(&context, None);
        let waiting: crate::Deferred<i32> = crate::Deferred::new_in(&context, None);
        waiting.fulfill_with(never.promise().clone());
        assert_eq!(waiting.promise().state(), State::Waiting);
        assert!(waiting.promise().cancel());
        never.fulfill(1);
        assert!(waiting.promise().outcome().unwrap().unwrap_err().is_canceled());
    }

    /// Check that a promise refuses to adopt itself
    #[test]
    fn self_adoption() {
        let promise: Promise<i32> = Promise::new_in(&inline(), None, |t| {
            let itself = t.promise();
            t.fulfill_with(itself);
            Ok(())
        });
        assert!(matches!(promise.outcome(), Some(Err(PromiseError::ChainingCycle))));
    }

    /// Check that handlers run on the executor they were registered with
    #[test]
    fn explicit_executors() {
        let pool: SharedExecutor = Arc::new(
            crate::executor::ThreadPoolExecutor::new(
                &crate::executor::PoolConfig::default()
                    .with_threads(1)
                    .with_thread_name("explicit")
            ).unwrap()
        );
        let (sender, receiver) = mpsc::channel();
        let promise: Promise<i32> = Promise::resolve_in(&inline(), 1);
        promise.fulfilled_on(pool.clone(), move |v| {
            let name = thread::current().name().map(str::to_owned);
            sender.send((v, name)).unwrap();
        });
        let (value, name) = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(value, 1);
        assert_eq!(name.as_deref(), Some("explicit-0"));

        // The executor is also usable directly
        let (sender, receiver) = mpsc::channel();
        pool.execute(Box::new(move || sender.send(()).unwrap()));
        assert!(receiver.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    /// Check that concurrent producers settle a promise exactly once
    #[test]
    fn concurrent_settlement() {
        let deferred: crate::Deferred<usize> =
            crate::Deferred::new_in(&inline(), None);
        let workers: Vec<_> = (0..8).map(|i| {
            let transition = deferred.transition().clone();
            thread::spawn(move || transition.fulfill(i))
        }).collect();
        let wins = workers.into_iter()
                          .map(|w| w.join().unwrap())
                          .filter(|&won| won)
                          .count();
        assert_eq!(wins, 1);
        assert!(deferred.promise().is_settled());
    }

    /// Check the debug representation
    #[test]
    fn debug_output() {
        let promise: Promise<i32, u8> = Promise::new_in(&inline(), Some(1), |_| Ok(()));
        promise.settled(|| {});
        assert_eq!(format!("{:?}", promise),
                   "Promise { state: Pending, status: Some(1), handlers: 1, listeners: 0 }");
    }
}
