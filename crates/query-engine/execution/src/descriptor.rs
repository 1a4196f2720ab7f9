//! Typed, reusable descriptions of a query.

use std::fmt;
use std::sync::Arc;

use query_engine_sql::sql::plan::QueryPlan;

use crate::backend::QueryContext;
use crate::error::ProjectionError;

type BuildQuery<P> = dyn Fn(&dyn QueryContext, &P) -> QueryPlan + Send + Sync;
type Projection<Row, R> = dyn Fn(Row) -> Result<R, ProjectionError> + Send + Sync;

/// How to build a query from parameters, what rows it yields, and how each
/// row is projected into the result element `R`.
///
/// A descriptor holds no connection state and can be shared across threads
/// and executed any number of times. Cloning is cheap.
pub struct QueryDescriptor<P, Row, R = Row> {
    build_query: Arc<BuildQuery<P>>,
    projection: Arc<Projection<Row, R>>,
}

impl<P, Row, R> Clone for QueryDescriptor<P, Row, R> {
    fn clone(&self) -> Self {
        QueryDescriptor {
            build_query: self.build_query.clone(),
            projection: self.projection.clone(),
        }
    }
}

impl<P, Row, R> fmt::Debug for QueryDescriptor<P, Row, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("QueryDescriptor")
            .field("parameters", &std::any::type_name::<P>())
            .field("row", &std::any::type_name::<Row>())
            .field("result", &std::any::type_name::<R>())
            .finish()
    }
}

impl<P, Row: 'static> QueryDescriptor<P, Row, Row> {
    /// A descriptor whose result elements are the rows themselves.
    pub fn describe(
        build_query: impl Fn(&dyn QueryContext, &P) -> QueryPlan + Send + Sync + 'static,
    ) -> Self {
        QueryDescriptor {
            build_query: Arc::new(build_query),
            projection: Arc::new(Ok::<Row, ProjectionError>),
        }
    }
}

impl<P, Row: 'static, R: 'static> QueryDescriptor<P, Row, R> {
    /// A descriptor that maps every row through an infallible projection.
    pub fn describe_projected(
        build_query: impl Fn(&dyn QueryContext, &P) -> QueryPlan + Send + Sync + 'static,
        projection: impl Fn(Row) -> R + Send + Sync + 'static,
    ) -> Self {
        QueryDescriptor {
            build_query: Arc::new(build_query),
            projection: Arc::new(move |row| Ok(projection(row))),
        }
    }

    /// A descriptor whose projection may reject a row, failing the execution.
    pub fn describe_fallible(
        build_query: impl Fn(&dyn QueryContext, &P) -> QueryPlan + Send + Sync + 'static,
        projection: impl Fn(Row) -> Result<R, ProjectionError> + Send + Sync + 'static,
    ) -> Self {
        QueryDescriptor {
            build_query: Arc::new(build_query),
            projection: Arc::new(projection),
        }
    }
}

impl<P, Row, R> QueryDescriptor<P, Row, R> {
    /// Build the query plan for a context and parameters. Has no side effects.
    pub fn build_query(&self, context: &dyn QueryContext, parameters: &P) -> QueryPlan {
        (self.build_query)(context, parameters)
    }

    pub fn project(&self, row: Row) -> Result<R, ProjectionError> {
        (self.projection)(row)
    }

    pub(crate) fn projection(&self) -> Arc<Projection<Row, R>> {
        self.projection.clone()
    }

    /// Take ownership of a context and parameters and build the plan once.
    pub fn construct<C: QueryContext>(&self, context: C, parameters: P) -> ConstructedQuery<C, P, Row, R> {
        let plan = self.build_query(&context, &parameters);
        ConstructedQuery {
            descriptor: self.clone(),
            context,
            plan,
            parameters,
        }
    }
}

/// A descriptor bound to one context and one set of parameters, with its plan
/// already built. Exists for the duration of a single execution.
pub struct ConstructedQuery<C, P, Row, R = Row> {
    descriptor: QueryDescriptor<P, Row, R>,
    context: C,
    plan: QueryPlan,
    parameters: P,
}

impl<C, P, Row, R> ConstructedQuery<C, P, Row, R> {
    pub fn descriptor(&self) -> &QueryDescriptor<P, Row, R> {
        &self.descriptor
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    pub fn parameters(&self) -> &P {
        &self.parameters
    }

    pub fn project(&self, row: Row) -> Result<R, ProjectionError> {
        self.descriptor.project(row)
    }

    pub fn into_context(self) -> C {
        self.context
    }

    pub(crate) fn into_parts(self) -> (QueryDescriptor<P, Row, R>, C, QueryPlan) {
        (self.descriptor, self.context, self.plan)
    }
}
