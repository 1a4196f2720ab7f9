//! Shared test helpers: a scripted in-memory backend and SQLite fixtures.

pub mod scripted;
pub mod sqlite;

/// Route log output, including `tracing` events, to the test harness once per process.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
