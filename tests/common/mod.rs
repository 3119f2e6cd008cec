//! Helpers shared by the integration tests

#![allow(dead_code)]

use std::sync::Once;
use std::time::Duration;
use threaded_promise::{PoolConfig, PromiseContext};
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Upper bound on how long a test waits for something which should happen
pub const PATIENCE: Duration = Duration::from_secs(10);

/// Initialize test logging, filtered by `RUST_LOG` and defaulting to debug
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_names(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Context backed by a small dedicated thread pool
pub fn pool_context(name: &str) -> PromiseContext {
    PromiseContext::with_pool(&PoolConfig::default().with_threads(4)
                                                    .with_thread_name(name))
        .expect("failed to start test thread pool")
}
