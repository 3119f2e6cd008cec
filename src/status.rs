//! Facilities to represent the state and status of promises
//!
//! The model is the following: a promise starts out in a pending state, may
//! temporarily wait on another promise whose outcome it has adopted, and
//! finally ends up in a fulfilled or rejected state, which never changes
//! afterwards.
//!
//! Orthogonal to this life cycle, a promise carries a user-defined status
//! payload which producers may update as many times as they like while the
//! promise is still pending. This is the channel through which progress is
//! reported to clients.

use std::fmt::Debug;


/// Life cycle state of a promise
///
/// Here are the possible state transitions:
///
/// - Pending -> Waiting / Fulfilled / Rejected
/// - Waiting -> Fulfilled / Rejected
///
/// Once a promise is Fulfilled or Rejected, its state won't change anymore.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    /// The promise has not been settled yet
    Pending,

    /// The promise has adopted the outcome of another promise, and is waiting
    /// for that promise to settle. Direct settlement is not allowed anymore.
    Waiting,

    /// The promise has settled with a value
    Fulfilled,

    /// The promise has settled with an error
    Rejected,
}
//
impl State {
    /// Check if the state is final (i.e. won't change anymore)
    pub fn is_final(self) -> bool {
        is_final(self)
    }

    /// Check if the promise can still receive status updates in this state
    pub fn accepts_updates(self) -> bool {
        !is_final(self)
    }
}


/// Check if a promise state is final (i.e. won't change anymore)
pub fn is_final(s: State) -> bool {
    use self::State::*;
    match s {
        Pending | Waiting => false,
        Fulfilled | Rejected => true,
    }
}


/// Trait bounds which every promise status payload should honor
///
/// Equality is needed because updates which do not change the status are not
/// propagated to listeners.
pub trait PromiseStatus: Clone + Debug + PartialEq + Send + Sync + 'static {}
//
impl<S> PromiseStatus for S
    where S: Clone + Debug + PartialEq + Send + Sync + 'static {}
