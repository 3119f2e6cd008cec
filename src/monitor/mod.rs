//! Promise monitoring
//!
//! This module provides the facilities through which clients synchronize with
//! the outcome and status of promises.
//!
//! Four monitoring mechanisms are proposed:
//!
//! - Callbacks allow a client to schedule code to be executed when the promise
//!   settles or its status changes. This is the most general and powerful
//!   synchronization mechanism, on top of which all others are built.
//! - Blocking allows a client thread to wait for settlement, optionally with a
//!   timeout. Although easy to use and reason about, this synchronization
//!   method should be used sparingly, as it ties up a whole thread.
//! - Polling is suitable when a client is only interested in periodically
//!   checking the latest status and does not want to synchronize with status
//!   updates. One possible use case is refreshing progress bars.
//! - Futures let async code await settlement without blocking its thread.

pub mod blocking;
pub mod callback;
pub mod future;
pub mod polling;
