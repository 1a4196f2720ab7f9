//! Run query descriptors against a backend and collect materialized rows.
//!
//! An executor is chosen by the kind of session a context factory produces:
//! [`executor::NativeAsyncExecutor`] drives [`backend::AsyncSession`]s on a
//! tokio runtime, [`executor::SynchronousExecutor`] drives
//! [`backend::BlockingSession`]s on the calling thread and hands back an
//! already resolved future. Both publish exactly one outcome per execution.

pub mod backend;
pub mod descriptor;
pub mod environment;
pub mod error;
pub mod executor;
pub mod future;
pub mod metrics;
pub mod parameters;
pub mod rusqlite_backend;
mod sink;
pub mod sqlx_backend;

pub use descriptor::{ConstructedQuery, QueryDescriptor};
pub use environment::{Diagnostics, ExecutionEnvironment};
pub use error::{ConnectionError, Error, ProjectionError};
pub use executor::{AsyncQueryExecutor, NativeAsyncExecutor, SynchronousExecutor};
pub use future::QueryFuture;
