//! Throwaway SQLite database files.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A database file in its own temporary directory, removed on drop.
#[derive(Debug)]
pub struct TempDatabase {
    // kept alive for the lifetime of the database
    _directory: TempDir,
    path: PathBuf,
}

impl TempDatabase {
    /// Create the database and run a batch of statements against it.
    pub fn with_script(script: &str) -> anyhow::Result<Self> {
        let directory = tempfile::tempdir()?;
        let path = directory.path().join("test.sqlite");
        let connection = rusqlite::Connection::open(&path)?;
        connection.execute_batch(script)?;
        connection.close().map_err(|(_, err)| err)?;
        Ok(TempDatabase {
            _directory: directory,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A connection URI for sqlx.
    pub fn uri(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }
}
