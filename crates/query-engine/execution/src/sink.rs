//! Collect a result into a list of projected rows.

use std::sync::Arc;

use query_engine_materialization::{materialize, FromRow, Lookup, MappingPlan, RowValues};
use query_engine_metadata::metadata::Column;

use crate::backend::RowSink;
use crate::environment::ExecutionEnvironment;
use crate::error::{ConnectionError, Error, ProjectionError};

type Projection<Row, R> = dyn Fn(Row) -> Result<R, ProjectionError> + Send + Sync;

/// The most rows reserved up front, whatever the caller expects.
const MAX_PREALLOCATED_ROWS: usize = 1024;

/// Materializes each delivered row with the cached plan for its columns and
/// projects it. The list is only handed out once the backend is done, so a
/// failure part-way through never leaks the rows collected before it.
pub(crate) struct Collector<Row, R> {
    environment: ExecutionEnvironment,
    projection: Arc<Projection<Row, R>>,
    plan: Option<Arc<MappingPlan>>,
    rows: Vec<R>,
}

impl<Row, R> Collector<Row, R> {
    pub(crate) fn new(
        environment: ExecutionEnvironment,
        projection: Arc<Projection<Row, R>>,
        expected_count: usize,
    ) -> Self {
        Collector {
            environment,
            projection,
            plan: None,
            rows: Vec::with_capacity(expected_count.min(MAX_PREALLOCATED_ROWS)),
        }
    }

    pub(crate) fn into_rows(self) -> Vec<R> {
        self.rows
    }
}

impl<Row: FromRow, R> RowSink for Collector<Row, R> {
    fn columns(&mut self, columns: &[Column]) -> Result<(), Error> {
        let (plan, lookup) = self.environment.plans.lookup::<Row>(columns)?;
        match lookup {
            Lookup::Hit => self.environment.metrics.plan_cache_hit_total.inc(),
            Lookup::Built => self.environment.metrics.plan_cache_miss_total.inc(),
        }
        self.plan = Some(plan);
        Ok(())
    }

    fn row(&mut self, row: &dyn RowValues) -> Result<(), Error> {
        let index = self.rows.len();
        let plan = self.plan.as_ref().ok_or_else(|| {
            ConnectionError::execute(format!("row {index} was delivered before the columns"))
        })?;
        let value = materialize::<Row>(plan, row)
            .map_err(|source| Error::Materialization { row: index, source })?;
        let projected =
            (self.projection)(value).map_err(|source| Error::Projection { row: index, source })?;
        self.rows.push(projected);
        Ok(())
    }
}
