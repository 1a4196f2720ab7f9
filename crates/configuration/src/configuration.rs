//! The configuration executions are set up from at runtime.

use std::path::PathBuf;

use crate::values::Backend;
use crate::version1::{DiagnosticsSettings, ExecutionSettings};

/// The 'Configuration' type collects all the information necessary to execute queries at runtime.
///
/// Values of this type are produced from a 'ParsedConfiguration' using
/// 'make_runtime_configuration', with every secret resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub connection: Connection,
    pub execution: ExecutionSettings,
    pub diagnostics: DiagnosticsSettings,
}

/// A backend and the resolved URI to reach it with.
#[derive(Clone, PartialEq, Eq)]
pub struct Connection {
    pub backend: Backend,
    pub connection_uri: String,
}

impl Connection {
    /// The database file of a SQLite connection, with any `sqlite:` scheme and
    /// query string removed.
    pub fn sqlite_path(&self) -> Option<PathBuf> {
        if self.backend == Backend::Postgres {
            return None;
        }
        let uri = self.connection_uri.as_str();
        let path = uri
            .strip_prefix("sqlite://")
            .or_else(|| uri.strip_prefix("sqlite:"))
            .unwrap_or(uri);
        let path = path.split_once('?').map_or(path, |(path, _)| path);
        Some(PathBuf::from(path))
    }

    /// The URI in the form sqlx connects with.
    pub fn sqlx_uri(&self) -> String {
        match self.sqlite_path() {
            Some(path) if !self.connection_uri.starts_with("sqlite:") => {
                format!("sqlite://{}", path.display())
            }
            _ => self.connection_uri.clone(),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // the URI may carry credentials
        f.debug_struct("Connection")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(backend: Backend, uri: &str) -> Connection {
        Connection {
            backend,
            connection_uri: uri.to_string(),
        }
    }

    #[test]
    fn sqlite_paths_drop_the_scheme() {
        assert_eq!(
            connection(Backend::Sqlite, "sqlite:///tmp/school.sqlite?mode=ro").sqlite_path(),
            Some(PathBuf::from("/tmp/school.sqlite"))
        );
        assert_eq!(
            connection(Backend::SqliteSynchronous, "school.sqlite").sqlite_path(),
            Some(PathBuf::from("school.sqlite"))
        );
        assert_eq!(
            connection(Backend::Postgres, "postgres://localhost/school").sqlite_path(),
            None
        );
    }

    #[test]
    fn plain_paths_gain_a_scheme_for_sqlx() {
        assert_eq!(
            connection(Backend::SqliteSynchronous, "school.sqlite").sqlx_uri(),
            "sqlite://school.sqlite"
        );
        assert_eq!(
            connection(Backend::Sqlite, "sqlite://school.sqlite").sqlx_uri(),
            "sqlite://school.sqlite"
        );
    }

    #[test]
    fn debug_output_hides_the_uri() {
        let debug = format!("{:?}", connection(Backend::Postgres, "postgres://user:pw@db"));
        assert!(!debug.contains("pw"));
    }
}
