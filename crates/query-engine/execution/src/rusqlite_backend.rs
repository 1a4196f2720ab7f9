//! Blocking SQLite sessions over rusqlite.
//!
//! rusqlite has no asynchronous I/O, so these sessions are executed by the
//! [`SynchronousExecutor`](crate::executor::SynchronousExecutor). Rows are
//! streamed from the statement into the sink on the calling thread.

use std::path::{Path, PathBuf};

use query_engine_materialization::{MaterializationError, RowValues};
use query_engine_metadata::metadata::{Column, ColumnType, Value};
use query_engine_sql::sql::plan::QueryPlan;
use query_engine_sql::sql::string::Dialect;
use rusqlite::types::ValueRef;
use rusqlite::OpenFlags;

use crate::backend::{BlockingSession, QueryContext, RowSink, Session, Statement};
use crate::error::{ConnectionError, Error};

/// One execution's connection to a SQLite database file.
#[derive(Debug)]
pub struct RusqliteSession {
    path: PathBuf,
    flags: OpenFlags,
    connection: Option<rusqlite::Connection>,
}

impl RusqliteSession {
    /// A session that opens the database for reading and writing.
    pub fn new(path: impl AsRef<Path>) -> Self {
        RusqliteSession::with_flags(path, OpenFlags::default())
    }

    /// A session that opens the database read-only.
    pub fn read_only(path: impl AsRef<Path>) -> Self {
        RusqliteSession::with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    }

    pub fn with_flags(path: impl AsRef<Path>, flags: OpenFlags) -> Self {
        RusqliteSession {
            path: path.as_ref().to_path_buf(),
            flags,
            connection: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }
}

impl QueryContext for RusqliteSession {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }
}

impl Session for RusqliteSession {
    type Command = Statement;

    fn prepare(&mut self, plan: &QueryPlan) -> Result<Statement, ConnectionError> {
        Statement::from_plan(plan, Dialect::Sqlite)
    }
}

impl BlockingSession for RusqliteSession {
    fn open(&mut self) -> Result<(), ConnectionError> {
        let connection = rusqlite::Connection::open_with_flags(&self.path, self.flags)
            .map_err(ConnectionError::open)?;
        self.connection = Some(connection);
        Ok(())
    }

    fn run(&mut self, command: Statement, sink: &mut dyn RowSink) -> Result<(), Error> {
        let connection = self
            .connection
            .as_ref()
            .ok_or_else(|| ConnectionError::execute("the session is not open"))?;
        let mut statement = connection
            .prepare(&command.text)
            .map_err(ConnectionError::prepare)?;

        let declared: Vec<(String, Option<ColumnType>)> = statement
            .columns()
            .iter()
            .map(|column| {
                (
                    column.name().to_string(),
                    column.decl_type().map(ColumnType::from_declared),
                )
            })
            .collect();

        let params: Vec<rusqlite::types::Value> = command.params.iter().map(to_sqlite).collect();
        let mut rows = statement
            .query(rusqlite::params_from_iter(params))
            .map_err(ConnectionError::execute)?;

        // expression columns declare nothing, so fall back to the first row's values
        let first = rows.next().map_err(ConnectionError::execute)?;
        let columns: Vec<Column> = declared
            .iter()
            .enumerate()
            .map(|(ordinal, (name, column_type))| {
                let column_type = column_type.unwrap_or_else(|| {
                    first
                        .and_then(|row| row.get_ref(ordinal).ok())
                        .map_or(ColumnType::Unknown, storage_type)
                });
                Column::new(name.as_str(), column_type)
            })
            .collect();
        sink.columns(&columns)?;

        let Some(first) = first else {
            return Ok(());
        };
        let field_count = declared.len();
        sink.row(&RusqliteValues {
            row: first,
            field_count,
        })?;
        while let Some(row) = rows.next().map_err(ConnectionError::execute)? {
            sink.row(&RusqliteValues { row, field_count })?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), ConnectionError> {
        match self.connection.take() {
            Some(connection) => connection
                .close()
                .map_err(|(_, err)| ConnectionError::close(err)),
            None => Ok(()),
        }
    }
}

fn to_sqlite(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sqlite;
    match value {
        Value::Null => Sqlite::Null,
        Value::Boolean(b) => Sqlite::Integer(i64::from(*b)),
        Value::Smallint(i) => Sqlite::Integer(i64::from(*i)),
        Value::Integer(i) => Sqlite::Integer(i64::from(*i)),
        Value::Bigint(i) => Sqlite::Integer(*i),
        Value::Real(f) => Sqlite::Real(f64::from(*f)),
        Value::DoublePrecision(f) => Sqlite::Real(*f),
        Value::Text(s) => Sqlite::Text(s.clone()),
        Value::Bytes(b) => Sqlite::Blob(b.clone()),
    }
}

fn storage_type(value: ValueRef<'_>) -> ColumnType {
    match value {
        ValueRef::Null => ColumnType::Unknown,
        ValueRef::Integer(_) => ColumnType::Bigint,
        ValueRef::Real(_) => ColumnType::DoublePrecision,
        ValueRef::Text(_) => ColumnType::Text,
        ValueRef::Blob(_) => ColumnType::Bytes,
    }
}

struct RusqliteValues<'r, 's> {
    row: &'r rusqlite::Row<'s>,
    field_count: usize,
}

impl RowValues for RusqliteValues<'_, '_> {
    fn field_count(&self) -> usize {
        self.field_count
    }

    fn is_null(&self, ordinal: usize) -> Result<bool, MaterializationError> {
        self.row
            .get_ref(ordinal)
            .map(|value| matches!(value, ValueRef::Null))
            .map_err(|err| read_error(ordinal, &err))
    }

    fn value(&self, ordinal: usize) -> Result<Value, MaterializationError> {
        let value = self
            .row
            .get_ref(ordinal)
            .map_err(|err| read_error(ordinal, &err))?;
        Ok(match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Bigint(i),
            ValueRef::Real(f) => Value::DoublePrecision(f),
            ValueRef::Text(bytes) => Value::Text(
                std::str::from_utf8(bytes)
                    .map_err(|err| MaterializationError::Read {
                        ordinal,
                        message: err.to_string(),
                    })?
                    .to_string(),
            ),
            ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
        })
    }
}

fn read_error(ordinal: usize, err: &rusqlite::Error) -> MaterializationError {
    MaterializationError::Read {
        ordinal,
        message: err.to_string(),
    }
}
