//! Type definitions of a low-level SQL string representation.

use query_engine_metadata::metadata::Value;

/// Which placeholder syntax parameters are rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// `$1`, `$2`, ...
    Postgres,
    /// `?1`, `?2`, ...
    Sqlite,
}

/// SQL text and the parameters bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SQL {
    pub sql: String,
    pub params: Vec<Param>,
    pub dialect: Dialect,
    /// for internal use and tests only
    pub param_index: u64,
}

/// A parameter for a parameterized query.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// A scalar value bound by position.
    Value(Value),
}

impl SQL {
    pub fn new(dialect: Dialect) -> SQL {
        SQL {
            sql: String::new(),
            params: vec![],
            dialect,
            param_index: 0,
        }
    }

    pub fn append_syntax(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    pub fn append_identifier(&mut self, identifier: &str) {
        self.sql.push('"');
        self.sql.push_str(&identifier.replace('"', "\"\""));
        self.sql.push('"');
    }

    /// Append a placeholder for the parameter. A null is written as a `NULL`
    /// literal instead, leaving its type to the surrounding expression.
    pub fn append_param(&mut self, param: Param) {
        if matches!(param, Param::Value(Value::Null)) {
            self.sql.push_str("NULL");
            return;
        }
        self.param_index += 1;
        let placeholder = match self.dialect {
            Dialect::Postgres => format!("${}", self.param_index),
            Dialect::Sqlite => format!("?{}", self.param_index),
        };
        self.sql.push_str(&placeholder);
        self.params.push(param);
    }

    /// Append a scalar value as the next parameter.
    pub fn append_value(&mut self, value: impl Into<Value>) {
        self.append_param(Param::Value(value.into()));
    }

    /// The placeholder text of the parameter at `index` (zero-based).
    pub fn placeholder(&self, index: usize) -> String {
        match self.dialect {
            Dialect::Postgres => format!("${}", index + 1),
            Dialect::Sqlite => format!("?{}", index + 1),
        }
    }
}
