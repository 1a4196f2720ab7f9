//! The opaque handle a query descriptor builds for one execution.

use super::string::{Dialect, Param, SQL};

/// A fully described, not yet executed, query.
///
/// Building one has no side effects; only an executor ever runs it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub sql: SQL,
}

impl QueryPlan {
    pub fn new(sql: SQL) -> Self {
        QueryPlan { sql }
    }

    /// A plan for SQL text that binds no parameters.
    pub fn raw(dialect: Dialect, text: &str) -> Self {
        let mut sql = SQL::new(dialect);
        sql.append_syntax(text);
        QueryPlan { sql }
    }

    pub fn text(&self) -> &str {
        &self.sql.sql
    }

    pub fn params(&self) -> &[Param] {
        &self.sql.params
    }

    pub fn dialect(&self) -> Dialect {
        self.sql.dialect
    }
}

impl From<SQL> for QueryPlan {
    fn from(sql: SQL) -> Self {
        QueryPlan::new(sql)
    }
}
