//! Natively asynchronous sessions over sqlx, for PostgreSQL and SQLite.
//!
//! A session owns one connection, opened from its connection URI when the
//! execution starts and closed when it ends. Results are fetched in full and
//! then pushed into the sink. An empty result carries no column metadata, so
//! its columns are taken from the prepared statement instead.

use async_trait::async_trait;
use query_engine_materialization::{MaterializationError, RowValues};
use query_engine_metadata::metadata::{Column, ColumnType, Value};
use query_engine_sql::sql::plan::QueryPlan;
use query_engine_sql::sql::string::Dialect;
use sqlx::postgres::{PgColumn, PgConnection, PgRow};
use sqlx::sqlite::{SqliteColumn, SqliteConnection, SqliteRow};
use sqlx::{Column as _, Connection, Executor as _, Row, Statement as _, TypeInfo, ValueRef};

use crate::backend::{AsyncSession, QueryContext, RowSink, Session, Statement};
use crate::error::{ConnectionError, Error};

/// One execution's connection to a database reached through sqlx.
pub struct SqlxSession<DB: sqlx::Database> {
    connection_uri: String,
    connection: Option<DB::Connection>,
}

pub type PostgresSession = SqlxSession<sqlx::Postgres>;
pub type SqliteSession = SqlxSession<sqlx::Sqlite>;

impl<DB: sqlx::Database> SqlxSession<DB> {
    pub fn new(connection_uri: impl Into<String>) -> Self {
        SqlxSession {
            connection_uri: connection_uri.into(),
            connection: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    fn connection(&mut self) -> Result<&mut DB::Connection, ConnectionError> {
        self.connection
            .as_mut()
            .ok_or_else(|| ConnectionError::execute("the session is not open"))
    }
}

impl<DB: sqlx::Database> std::fmt::Debug for SqlxSession<DB> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // the connection URI may carry credentials
        f.debug_struct("SqlxSession")
            .field("database", &DB::NAME)
            .field("open", &self.connection.is_some())
            .finish_non_exhaustive()
    }
}

// PostgreSQL //

impl QueryContext for PostgresSession {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }
}

impl Session for PostgresSession {
    type Command = Statement;

    fn prepare(&mut self, plan: &QueryPlan) -> Result<Statement, ConnectionError> {
        Statement::from_plan(plan, Dialect::Postgres)
    }
}

#[async_trait]
impl AsyncSession for PostgresSession {
    async fn open(&mut self) -> Result<(), ConnectionError> {
        let connection = PgConnection::connect(&self.connection_uri)
            .await
            .map_err(ConnectionError::open)?;
        self.connection = Some(connection);
        Ok(())
    }

    async fn run(
        &mut self,
        command: Statement,
        sink: &mut (dyn RowSink + Send),
    ) -> Result<(), Error> {
        let connection = self.connection()?;
        let query = command
            .params
            .iter()
            .fold(sqlx::query(&command.text), |query, value| match value {
                // the SQL builder renders nulls inline; one added by hand is sent as text,
                // which the server only coerces to text-like types
                Value::Null => query.bind(None::<String>),
                Value::Boolean(b) => query.bind(*b),
                Value::Smallint(i) => query.bind(*i),
                Value::Integer(i) => query.bind(*i),
                Value::Bigint(i) => query.bind(*i),
                Value::Real(f) => query.bind(*f),
                Value::DoublePrecision(f) => query.bind(*f),
                Value::Text(s) => query.bind(s.as_str()),
                Value::Bytes(b) => query.bind(b.as_slice()),
            });
        let rows = query
            .fetch_all(&mut *connection)
            .await
            .map_err(ConnectionError::execute)?;

        let columns = match rows.first() {
            Some(first) => pg_columns(first.columns()),
            None => {
                let statement = (&mut *connection)
                    .prepare(&command.text)
                    .await
                    .map_err(ConnectionError::prepare)?;
                pg_columns(statement.columns())
            }
        };
        sink.columns(&columns)?;
        for row in &rows {
            sink.row(&PgValues(row))?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        match self.connection.take() {
            Some(connection) => connection.close().await.map_err(ConnectionError::close),
            None => Ok(()),
        }
    }
}

fn pg_columns(columns: &[PgColumn]) -> Vec<Column> {
    columns
        .iter()
        .map(|column| {
            Column::new(
                column.name(),
                ColumnType::from_declared(column.type_info().name()),
            )
        })
        .collect()
}

struct PgValues<'r>(&'r PgRow);

impl RowValues for PgValues<'_> {
    fn field_count(&self) -> usize {
        self.0.len()
    }

    fn is_null(&self, ordinal: usize) -> Result<bool, MaterializationError> {
        self.0
            .try_get_raw(ordinal)
            .map(|raw| raw.is_null())
            .map_err(|err| read_error(ordinal, &err))
    }

    fn value(&self, ordinal: usize) -> Result<Value, MaterializationError> {
        let row = self.0;
        let type_name = row
            .columns()
            .get(ordinal)
            .map(|column| column.type_info().name().to_string())
            .unwrap_or_default();
        let read = |err: sqlx::Error| read_error(ordinal, &err);
        let value = match ColumnType::from_declared(&type_name) {
            ColumnType::Boolean => row.try_get::<Option<bool>, _>(ordinal).map_err(read)?.into(),
            ColumnType::Smallint => row.try_get::<Option<i16>, _>(ordinal).map_err(read)?.into(),
            ColumnType::Integer => row.try_get::<Option<i32>, _>(ordinal).map_err(read)?.into(),
            ColumnType::Bigint => row.try_get::<Option<i64>, _>(ordinal).map_err(read)?.into(),
            ColumnType::Real => row.try_get::<Option<f32>, _>(ordinal).map_err(read)?.into(),
            ColumnType::DoublePrecision => {
                row.try_get::<Option<f64>, _>(ordinal).map_err(read)?.into()
            }
            ColumnType::Text => row.try_get::<Option<String>, _>(ordinal).map_err(read)?.into(),
            ColumnType::Bytes => row.try_get::<Option<Vec<u8>>, _>(ordinal).map_err(read)?.into(),
            ColumnType::Unknown => {
                return Err(MaterializationError::Read {
                    ordinal,
                    message: format!("unsupported column type '{type_name}'"),
                })
            }
        };
        Ok(value)
    }
}

// SQLite //

impl QueryContext for SqliteSession {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }
}

impl Session for SqliteSession {
    type Command = Statement;

    fn prepare(&mut self, plan: &QueryPlan) -> Result<Statement, ConnectionError> {
        Statement::from_plan(plan, Dialect::Sqlite)
    }
}

#[async_trait]
impl AsyncSession for SqliteSession {
    async fn open(&mut self) -> Result<(), ConnectionError> {
        let connection = SqliteConnection::connect(&self.connection_uri)
            .await
            .map_err(ConnectionError::open)?;
        self.connection = Some(connection);
        Ok(())
    }

    async fn run(
        &mut self,
        command: Statement,
        sink: &mut (dyn RowSink + Send),
    ) -> Result<(), Error> {
        let connection = self.connection()?;
        let query = command
            .params
            .iter()
            .fold(sqlx::query(&command.text), |query, value| match value {
                Value::Null => query.bind(None::<i64>),
                Value::Boolean(b) => query.bind(*b),
                Value::Smallint(i) => query.bind(*i),
                Value::Integer(i) => query.bind(*i),
                Value::Bigint(i) => query.bind(*i),
                Value::Real(f) => query.bind(*f),
                Value::DoublePrecision(f) => query.bind(*f),
                Value::Text(s) => query.bind(s.as_str()),
                Value::Bytes(b) => query.bind(b.as_slice()),
            });
        let rows = query
            .fetch_all(&mut *connection)
            .await
            .map_err(ConnectionError::execute)?;

        let columns = match rows.first() {
            Some(first) => sqlite_columns(first.columns()),
            None => {
                let statement = (&mut *connection)
                    .prepare(&command.text)
                    .await
                    .map_err(ConnectionError::prepare)?;
                sqlite_columns(statement.columns())
            }
        };
        sink.columns(&columns)?;
        for row in &rows {
            sink.row(&SqliteValues(row))?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        match self.connection.take() {
            Some(connection) => connection.close().await.map_err(ConnectionError::close),
            None => Ok(()),
        }
    }
}

fn sqlite_columns(columns: &[SqliteColumn]) -> Vec<Column> {
    columns
        .iter()
        .map(|column| {
            Column::new(
                column.name(),
                ColumnType::from_declared(column.type_info().name()),
            )
        })
        .collect()
}

/// SQLite values are read by their storage class, whatever the column declares.
struct SqliteValues<'r>(&'r SqliteRow);

impl RowValues for SqliteValues<'_> {
    fn field_count(&self) -> usize {
        self.0.len()
    }

    fn is_null(&self, ordinal: usize) -> Result<bool, MaterializationError> {
        self.0
            .try_get_raw(ordinal)
            .map(|raw| raw.is_null())
            .map_err(|err| read_error(ordinal, &err))
    }

    fn value(&self, ordinal: usize) -> Result<Value, MaterializationError> {
        let row = self.0;
        let read = |err: sqlx::Error| read_error(ordinal, &err);
        let raw = row.try_get_raw(ordinal).map_err(read)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let storage = raw.type_info().name().to_string();
        let value = match storage.as_str() {
            "INTEGER" | "BOOLEAN" => Value::Bigint(row.try_get_unchecked(ordinal).map_err(read)?),
            "REAL" => Value::DoublePrecision(row.try_get_unchecked(ordinal).map_err(read)?),
            "TEXT" => Value::Text(row.try_get_unchecked(ordinal).map_err(read)?),
            "BLOB" => Value::Bytes(row.try_get_unchecked(ordinal).map_err(read)?),
            other => {
                return Err(MaterializationError::Read {
                    ordinal,
                    message: format!("unsupported storage class '{other}'"),
                })
            }
        };
        Ok(value)
    }
}

fn read_error(ordinal: usize, err: &sqlx::Error) -> MaterializationError {
    MaterializationError::Read {
        ordinal,
        message: err.to_string(),
    }
}
