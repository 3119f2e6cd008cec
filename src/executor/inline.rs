//! Inline callback executor, implementing synchronous callback execution
//!
//! This callback executor follows the traditional pattern of directly executing
//! callbacks on the thread which triggers them. It can harm producer
//! performance when callbacks are long-running, but it is the right choice for
//! short performance-critical callbacks, for the internal plumbing of promise
//! adoption and combinators, and for deterministic unit tests.

use crate::executor::{run_guarded, Executor, Task};


/// Executor implementation suitable for inline callback execution
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineExecutor {}
//
impl InlineExecutor {
    /// Create a new inline callback executor
    pub fn new() -> Self {
        InlineExecutor {}
    }
}
//
impl Executor for InlineExecutor {
    fn execute(&self, task: Task) {
        run_guarded(task);
    }
}
