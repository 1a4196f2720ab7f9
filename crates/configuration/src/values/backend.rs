use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Which session implementation executions run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Backend {
    /// PostgreSQL through sqlx, on the native asynchronous executor.
    Postgres,
    /// SQLite through sqlx, on the native asynchronous executor.
    Sqlite,
    /// SQLite through rusqlite, on the synchronous executor.
    SqliteSynchronous,
}

impl Backend {
    pub fn is_asynchronous(self) -> bool {
        !matches!(self, Backend::SqliteSynchronous)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Postgres => write!(f, "postgres"),
            Backend::Sqlite => write!(f, "sqlite"),
            Backend::SqliteSynchronous => write!(f, "sqliteSynchronous"),
        }
    }
}
