//! An in-memory backend that replays a scripted result and records what the
//! executors did with it.
//!
//! The same session type is both an [`AsyncSession`] and a [`BlockingSession`],
//! so one script can be run through either executor and the outcomes compared.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use query_engine_execution::backend::{
    AsyncSession, BlockingSession, QueryContext, RowSink, Session, Statement,
};
use query_engine_execution::error::{ConnectionError, Error};
use query_engine_materialization::{MaterializationError, RowValues};
use query_engine_metadata::metadata::{Column, ColumnType, Value};
use query_engine_sql::sql::plan::QueryPlan;
use query_engine_sql::sql::string::Dialect;

/// One cell of a scripted row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Value(Value),
    /// Reading this cell fails.
    Poison,
}

/// A readable cell.
pub fn cell(value: impl Into<Value>) -> Cell {
    Cell::Value(value.into())
}

/// Where a scripted session fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Open,
    Prepare,
    /// The backend errors after delivering this many rows.
    Run { after_rows: usize },
    Close,
    /// The backend panics while running.
    Panic,
}

/// The result a scripted session replays.
#[derive(Debug, Clone, Default)]
pub struct Script {
    columns: Vec<Column>,
    rows: Vec<Vec<Cell>>,
    failures: Vec<Failure>,
    delay: Option<Duration>,
    dialect: Option<Dialect>,
}

impl Script {
    pub fn new(columns: Vec<Column>) -> Self {
        Script {
            columns,
            ..Script::default()
        }
    }

    /// A script over columns given as `(name, type)` pairs.
    pub fn with_columns(columns: &[(&str, ColumnType)]) -> Self {
        Script::new(
            columns
                .iter()
                .map(|(name, column_type)| Column::new(*name, *column_type))
                .collect(),
        )
    }

    #[must_use]
    pub fn row(mut self, cells: Vec<Cell>) -> Self {
        self.rows.push(cells);
        self
    }

    #[must_use]
    pub fn rows(mut self, rows: impl IntoIterator<Item = Vec<Cell>>) -> Self {
        self.rows.extend(rows);
        self
    }

    #[must_use]
    pub fn fail(mut self, failure: Failure) -> Self {
        self.failures.push(failure);
        self
    }

    /// Sleep before delivering the result.
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    fn fails(&self, failure: Failure) -> bool {
        self.failures.contains(&failure)
    }

    fn run_failure(&self) -> Option<usize> {
        self.failures.iter().find_map(|failure| match failure {
            Failure::Run { after_rows } => Some(*after_rows),
            _ => None,
        })
    }
}

/// What happened to the sessions of one backend.
#[derive(Debug, Default)]
pub struct Events {
    pub created: AtomicUsize,
    pub prepares: AtomicUsize,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub drops: AtomicUsize,
    /// `(row, ordinal)` of every cell read, in order.
    pub reads: Mutex<Vec<(usize, usize)>>,
    /// Every statement prepared, in order.
    pub statements: Mutex<Vec<Statement>>,
}

impl Events {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn drops(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> Vec<(usize, usize)> {
        self.reads.lock().map(|reads| reads.clone()).unwrap_or_default()
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.statements
            .lock()
            .map(|statements| statements.clone())
            .unwrap_or_default()
    }
}

/// A factory of scripted sessions that share one script and one event log.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    script: Arc<Script>,
    events: Arc<Events>,
}

impl ScriptedBackend {
    pub fn new(script: Script) -> Self {
        ScriptedBackend {
            script: Arc::new(script),
            events: Arc::default(),
        }
    }

    pub fn session(&self) -> ScriptedSession {
        self.events.created.fetch_add(1, Ordering::SeqCst);
        ScriptedSession {
            script: self.script.clone(),
            events: self.events.clone(),
            open: false,
        }
    }

    pub fn events(&self) -> &Events {
        &self.events
    }
}

#[derive(Debug)]
pub struct ScriptedSession {
    script: Arc<Script>,
    events: Arc<Events>,
    open: bool,
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.events.drops.fetch_add(1, Ordering::SeqCst);
    }
}

impl QueryContext for ScriptedSession {
    fn dialect(&self) -> Dialect {
        self.script.dialect.unwrap_or(Dialect::Sqlite)
    }
}

impl Session for ScriptedSession {
    type Command = Statement;

    fn prepare(&mut self, plan: &QueryPlan) -> Result<Statement, ConnectionError> {
        self.events.prepares.fetch_add(1, Ordering::SeqCst);
        if self.script.fails(Failure::Prepare) {
            return Err(ConnectionError::prepare("scripted prepare failure"));
        }
        let statement = Statement::from_plan(plan, self.dialect())?;
        if let Ok(mut statements) = self.events.statements.lock() {
            statements.push(statement.clone());
        }
        Ok(statement)
    }
}

impl ScriptedSession {
    fn open_now(&mut self) -> Result<(), ConnectionError> {
        self.events.opens.fetch_add(1, Ordering::SeqCst);
        if self.script.fails(Failure::Open) {
            return Err(ConnectionError::open("scripted open failure"));
        }
        self.open = true;
        Ok(())
    }

    fn replay(&self, sink: &mut dyn RowSink) -> Result<(), Error> {
        if !self.open {
            return Err(ConnectionError::execute("the session is not open").into());
        }
        if self.script.fails(Failure::Panic) {
            panic!("scripted backend panic");
        }
        let fail_after = self.script.run_failure();
        sink.columns(&self.script.columns)?;
        for (index, cells) in self.script.rows.iter().enumerate() {
            if fail_after == Some(index) {
                return Err(ConnectionError::execute("scripted run failure").into());
            }
            sink.row(&ScriptedRow {
                index,
                cells,
                events: &self.events,
            })?;
        }
        if fail_after.is_some_and(|after| after >= self.script.rows.len()) {
            return Err(ConnectionError::execute("scripted run failure").into());
        }
        Ok(())
    }

    fn close_now(&mut self) -> Result<(), ConnectionError> {
        self.events.closes.fetch_add(1, Ordering::SeqCst);
        self.open = false;
        if self.script.fails(Failure::Close) {
            return Err(ConnectionError::close("scripted close failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl AsyncSession for ScriptedSession {
    async fn open(&mut self) -> Result<(), ConnectionError> {
        self.open_now()
    }

    async fn run(
        &mut self,
        _command: Statement,
        sink: &mut (dyn RowSink + Send),
    ) -> Result<(), Error> {
        if let Some(delay) = self.script.delay {
            tokio::time::sleep(delay).await;
        }
        self.replay(sink)
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        self.close_now()
    }
}

impl BlockingSession for ScriptedSession {
    fn open(&mut self) -> Result<(), ConnectionError> {
        self.open_now()
    }

    fn run(&mut self, _command: Statement, sink: &mut dyn RowSink) -> Result<(), Error> {
        if let Some(delay) = self.script.delay {
            std::thread::sleep(delay);
        }
        self.replay(sink)
    }

    fn close(&mut self) -> Result<(), ConnectionError> {
        self.close_now()
    }
}

struct ScriptedRow<'a> {
    index: usize,
    cells: &'a [Cell],
    events: &'a Events,
}

impl ScriptedRow<'_> {
    fn read(&self, ordinal: usize) -> Result<Value, MaterializationError> {
        if let Ok(mut reads) = self.events.reads.lock() {
            reads.push((self.index, ordinal));
        }
        match self.cells.get(ordinal) {
            Some(Cell::Value(value)) => Ok(value.clone()),
            Some(Cell::Poison) => Err(MaterializationError::Read {
                ordinal,
                message: "poisoned cell".to_string(),
            }),
            None => Err(MaterializationError::Read {
                ordinal,
                message: format!("the row has only {} cells", self.cells.len()),
            }),
        }
    }
}

impl RowValues for ScriptedRow<'_> {
    fn field_count(&self) -> usize {
        self.cells.len()
    }

    fn is_null(&self, ordinal: usize) -> Result<bool, MaterializationError> {
        self.read(ordinal).map(|value| value.is_null())
    }

    fn value(&self, ordinal: usize) -> Result<Value, MaterializationError> {
        self.read(ordinal)
    }
}
