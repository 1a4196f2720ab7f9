//! The seams between the executors and a database.
//!
//! A session is the exclusively owned context of one execution. It is handed
//! to the descriptor's query builder, turns the resulting [`QueryPlan`] into a
//! backend-native command, and then runs that command over one connection,
//! pushing the result into a [`RowSink`].

use async_trait::async_trait;
use query_engine_materialization::RowValues;
use query_engine_metadata::metadata::{Column, Value};
use query_engine_sql::sql::plan::QueryPlan;
use query_engine_sql::sql::string::{Dialect, Param};

use crate::error::{ConnectionError, Error};

/// What a query builder may learn about the context it builds for.
pub trait QueryContext {
    fn dialect(&self) -> Dialect;
}

/// The receiving end of a query result.
///
/// `columns` is called once, before the first row. A backend that cannot
/// describe an empty result may skip it when there are no rows.
pub trait RowSink {
    fn columns(&mut self, columns: &[Column]) -> Result<(), Error>;

    fn row(&mut self, row: &dyn RowValues) -> Result<(), Error>;
}

/// A context that can turn plans into commands.
pub trait Session: QueryContext + Send + 'static {
    type Command: Send + 'static;

    fn prepare(&mut self, plan: &QueryPlan) -> Result<Self::Command, ConnectionError>;
}

/// A session whose I/O is natively asynchronous.
#[async_trait]
pub trait AsyncSession: Session {
    async fn open(&mut self) -> Result<(), ConnectionError>;

    /// Run a prepared command and push its result into the sink. Sink errors
    /// are returned as they are.
    async fn run(
        &mut self,
        command: Self::Command,
        sink: &mut (dyn RowSink + Send),
    ) -> Result<(), Error>;

    /// Release the connection. Called on every path, also when `open` failed.
    async fn close(&mut self) -> Result<(), ConnectionError>;
}

/// A session that can only block.
pub trait BlockingSession: Session {
    fn open(&mut self) -> Result<(), ConnectionError>;

    fn run(&mut self, command: Self::Command, sink: &mut dyn RowSink) -> Result<(), Error>;

    fn close(&mut self) -> Result<(), ConnectionError>;
}

/// SQL text with its parameter values, checked against the session's dialect.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn from_plan(plan: &QueryPlan, dialect: Dialect) -> Result<Self, ConnectionError> {
        if plan.dialect() != dialect {
            return Err(ConnectionError::prepare(format!(
                "the query was built for {:?} but the session speaks {:?}",
                plan.dialect(),
                dialect
            )));
        }
        Ok(Statement {
            text: plan.text().to_string(),
            params: plan
                .params()
                .iter()
                .map(|param| match param {
                    Param::Value(value) => value.clone(),
                })
                .collect(),
        })
    }
}
