//! Thread-safe promises with progress reporting
//!
//! Picture yourself in a situation where: you want to delegate work to another
//! thread, or to a pool of them. You know that the work is going to take some
//! time, and you have other things to do meanwhile, so you would rather not
//! wait for its completion. But you would like a way to follow the progress of
//! this work, to know when it's done, to chain more work after it, to manage
//! errors...
//!
//! This crate provides promises for this purpose. A `Promise` eventually
//! settles, exactly once, into either a value or a rejection reason. Until
//! then, its producer may report progress through a status payload, which
//! clients can observe. The producer side of a promise is a `Transition`,
//! handed over to the promise's initializer or kept around in a `Deferred`.
//!
//! Clients can monitor promises in several ways, which are described in the
//! `monitor` module: callbacks, blocking waits, status polling, and futures.
//! Promises can also be chained into new promises, through transforms which
//! run on an executor of the client's choosing, and combined with `all()` and
//! `race()`.
//!
//! A promise may also follow another promise, in which case it relays the
//! other promise's status updates and eventually settles the same way. This is
//! what makes it possible for a transform to return a promise.

mod combinators;
pub mod context;
pub mod deferred;
pub mod errors;
pub mod executor;
pub mod monitor;
pub mod promise;
pub mod status;
pub mod transforms;
pub mod transition;
pub mod worker;

pub use crate::context::PromiseContext;
pub use crate::deferred::Deferred;
pub use crate::errors::{Outcome, PanicMessage, PromiseError, SharedError};
pub use crate::executor::{Executor, InlineExecutor, PoolConfig, SharedExecutor,
                          ThreadPoolExecutor};
pub use crate::monitor::callback::Handler;
pub use crate::monitor::future::PromiseFuture;
pub use crate::monitor::polling::StatusPoller;
pub use crate::promise::Promise;
pub use crate::status::{PromiseStatus, State};
pub use crate::transforms::delay;
pub use crate::transition::Transition;
pub use crate::worker::SingletonWorker;
