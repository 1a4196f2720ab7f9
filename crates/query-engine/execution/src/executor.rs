//! Execute a query descriptor and publish its rows, or its single error.
//!
//! Every execution takes the same steps: obtain a fresh context from the
//! factory, construct the query (building the plan once), prepare the
//! backend command, open, run the command into a collecting sink, close and
//! release the context, and publish. Close always runs, also when the backend
//! panics, in which case [`Error::Abandoned`] is published. A failed close
//! after a successful run is logged and does not fail the execution.

use std::any::type_name;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use query_engine_materialization::FromRow;
use query_engine_sql::sql::diagnostics;
use query_engine_sql::sql::plan::QueryPlan;
use tokio::runtime::Handle;
use tracing::{info_span, Instrument};

use crate::backend::{AsyncSession, BlockingSession, RowSink, Session};
use crate::descriptor::QueryDescriptor;
use crate::environment::ExecutionEnvironment;
use crate::error::{ConnectionError, Error};
use crate::future::QueryFuture;
use crate::sink::Collector;

/// Runs descriptors against contexts of type `C`.
///
/// Which implementation applies follows from the context type the factory
/// produces: [`NativeAsyncExecutor`] for [`AsyncSession`]s and
/// [`SynchronousExecutor`] for [`BlockingSession`]s.
pub trait AsyncQueryExecutor<C: Session> {
    /// Start an execution and return the future of its outcome.
    ///
    /// `expected_count_hint` only pre-sizes the result list; it never bounds
    /// how many rows are returned.
    fn execute<F, P, Row, R>(
        &self,
        context_factory: F,
        descriptor: &QueryDescriptor<P, Row, R>,
        parameters: P,
        expected_count_hint: Option<usize>,
    ) -> QueryFuture<Vec<R>>
    where
        F: FnOnce() -> C,
        P: Send + 'static,
        Row: FromRow,
        R: Send + 'static;

    /// Execute and block until the outcome is published.
    ///
    /// Must not be called from within an asynchronous runtime unless the
    /// executor completes executions before returning from `execute`.
    fn execute_sync<F, P, Row, R>(
        &self,
        context_factory: F,
        descriptor: &QueryDescriptor<P, Row, R>,
        parameters: P,
        expected_count_hint: Option<usize>,
    ) -> Result<Vec<R>, Error>
    where
        F: FnOnce() -> C,
        P: Send + 'static,
        Row: FromRow,
        R: Send + 'static,
    {
        self.execute(context_factory, descriptor, parameters, expected_count_hint)
            .wait()
    }
}

/// Executes on sessions with native asynchronous I/O.
///
/// Each execution runs as a task on the given runtime; the continuation that
/// publishes the outcome may run on any of its worker threads.
#[derive(Debug, Clone)]
pub struct NativeAsyncExecutor {
    handle: Handle,
    environment: ExecutionEnvironment,
}

impl NativeAsyncExecutor {
    pub fn new(handle: Handle, environment: ExecutionEnvironment) -> Self {
        NativeAsyncExecutor {
            handle,
            environment,
        }
    }

    /// An executor on the runtime of the calling task.
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn current(environment: ExecutionEnvironment) -> Self {
        NativeAsyncExecutor::new(Handle::current(), environment)
    }

    pub fn environment(&self) -> &ExecutionEnvironment {
        &self.environment
    }
}

impl<C: AsyncSession> AsyncQueryExecutor<C> for NativeAsyncExecutor {
    fn execute<F, P, Row, R>(
        &self,
        context_factory: F,
        descriptor: &QueryDescriptor<P, Row, R>,
        parameters: P,
        expected_count_hint: Option<usize>,
    ) -> QueryFuture<Vec<R>>
    where
        F: FnOnce() -> C,
        P: Send + 'static,
        Row: FromRow,
        R: Send + 'static,
    {
        let context = context_factory();
        let (descriptor, mut context, plan) = descriptor.construct(context, parameters).into_parts();
        let environment = self.environment.clone();
        let expected_count = expected_count_hint.unwrap_or(environment.expected_count);

        let (publisher, future) = QueryFuture::channel();
        let span = info_span!("Execute query", mode = "async", row = type_name::<Row>());
        self.handle.spawn(
            async move {
                log_diagnostics(&environment, &plan);
                let mut collector =
                    Collector::<Row, R>::new(environment.clone(), descriptor.projection(), expected_count);

                let outcome = CatchUnwind(Box::pin(run_async(&mut context, &plan, &mut collector)))
                    .await
                    .unwrap_or_else(|_| Err(abandoned()));

                let closed = context.close().await;
                drop(context);

                publisher.publish(conclude(&environment, outcome, closed, collector));
            }
            .instrument(span),
        );
        future
    }
}

/// Executes on sessions that can only block.
///
/// All work runs on the calling thread before `execute` returns and the
/// returned future is already resolved. The caller is blocked for the whole
/// I/O of the query; run it on a blocking worker pool, e.g.
/// [`tokio::task::spawn_blocking`], to execute several at once.
#[derive(Debug, Clone)]
pub struct SynchronousExecutor {
    environment: ExecutionEnvironment,
}

impl SynchronousExecutor {
    pub fn new(environment: ExecutionEnvironment) -> Self {
        SynchronousExecutor { environment }
    }

    pub fn environment(&self) -> &ExecutionEnvironment {
        &self.environment
    }

    fn run<C, F, P, Row, R>(
        &self,
        context_factory: F,
        descriptor: &QueryDescriptor<P, Row, R>,
        parameters: P,
        expected_count_hint: Option<usize>,
    ) -> Result<Vec<R>, Error>
    where
        C: BlockingSession,
        F: FnOnce() -> C,
        Row: FromRow,
    {
        let span = info_span!("Execute query", mode = "sync", row = type_name::<Row>());
        let _entered = span.enter();

        let context = context_factory();
        let (descriptor, mut context, plan) = descriptor.construct(context, parameters).into_parts();
        let environment = &self.environment;
        log_diagnostics(environment, &plan);

        let expected_count = expected_count_hint.unwrap_or(environment.expected_count);
        let mut collector =
            Collector::<Row, R>::new(environment.clone(), descriptor.projection(), expected_count);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            run_blocking(&mut context, &plan, &mut collector)
        }))
        .unwrap_or_else(|_| Err(abandoned()));

        let closed = context.close();
        drop(context);

        conclude(environment, outcome, closed, collector)
    }
}

impl<C: BlockingSession> AsyncQueryExecutor<C> for SynchronousExecutor {
    fn execute<F, P, Row, R>(
        &self,
        context_factory: F,
        descriptor: &QueryDescriptor<P, Row, R>,
        parameters: P,
        expected_count_hint: Option<usize>,
    ) -> QueryFuture<Vec<R>>
    where
        F: FnOnce() -> C,
        P: Send + 'static,
        Row: FromRow,
        R: Send + 'static,
    {
        QueryFuture::ready(self.run(context_factory, descriptor, parameters, expected_count_hint))
    }

    /// Runs inline, so unlike the native executor this is safe to call from
    /// within an asynchronous runtime (it still blocks the calling thread).
    fn execute_sync<F, P, Row, R>(
        &self,
        context_factory: F,
        descriptor: &QueryDescriptor<P, Row, R>,
        parameters: P,
        expected_count_hint: Option<usize>,
    ) -> Result<Vec<R>, Error>
    where
        F: FnOnce() -> C,
        P: Send + 'static,
        Row: FromRow,
        R: Send + 'static,
    {
        self.run(context_factory, descriptor, parameters, expected_count_hint)
    }
}

async fn run_async<C: AsyncSession>(
    context: &mut C,
    plan: &QueryPlan,
    sink: &mut (dyn RowSink + Send),
) -> Result<(), Error> {
    let command = context.prepare(plan)?;
    context.open().await?;
    context
        .run(command, sink)
        .instrument(info_span!("Materialize rows"))
        .await
}

fn run_blocking<C: BlockingSession>(
    context: &mut C,
    plan: &QueryPlan,
    sink: &mut dyn RowSink,
) -> Result<(), Error> {
    let command = context.prepare(plan)?;
    context.open()?;
    info_span!("Materialize rows").in_scope(|| context.run(command, sink))
}

fn abandoned() -> Error {
    tracing::error!("the backend panicked while running the query");
    Error::Abandoned
}

/// Resolves to the panic payload instead of unwinding when `F` panics.
struct CatchUnwind<F>(Pin<Box<F>>);

impl<F: Future> Future for CatchUnwind<F> {
    type Output = std::thread::Result<F::Output>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let inner = self.0.as_mut();
        match panic::catch_unwind(AssertUnwindSafe(|| inner.poll(cx))) {
            Ok(Poll::Pending) => Poll::Pending,
            Ok(Poll::Ready(output)) => Poll::Ready(Ok(output)),
            Err(payload) => Poll::Ready(Err(payload)),
        }
    }
}

fn log_diagnostics(environment: &ExecutionEnvironment, plan: &QueryPlan) {
    if environment.diagnostics.log_queries {
        tracing::debug!(
            target: "asynq::diagnostics",
            query = %diagnostics::render(plan, environment.diagnostics.pretty_print),
            "executing query"
        );
    }
}

/// Turn the run and close results into the single published outcome.
fn conclude<Row, R>(
    environment: &ExecutionEnvironment,
    outcome: Result<(), Error>,
    closed: Result<(), ConnectionError>,
    collector: Collector<Row, R>,
) -> Result<Vec<R>, Error> {
    if let Err(err) = &closed {
        tracing::warn!(error = %err, "unable to close the connection");
    }

    match outcome {
        Ok(()) => {
            let rows = collector.into_rows();
            environment.metrics.record_success(rows.len());
            tracing::debug!(rows = rows.len(), "query completed");
            Ok(rows)
        }
        Err(err) => {
            // the collected rows are dropped with the collector
            environment.metrics.record_error(&err);
            tracing::error!(error = %err, kind = err.kind(), "query failed");
            Err(err)
        }
    }
}
