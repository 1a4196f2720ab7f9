//! Scalar values read from, or bound into, a result set.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::column::ColumnType;

/// A single scalar cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Null,
    Boolean(bool),
    Smallint(i16),
    Integer(i32),
    Bigint(i64),
    Real(f32),
    #[serde(rename = "double precision")]
    DoublePrecision(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// A short name of the value's kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Smallint(_) => "smallint",
            Value::Integer(_) => "integer",
            Value::Bigint(_) => "bigint",
            Value::Real(_) => "real",
            Value::DoublePrecision(_) => "double precision",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
        }
    }

    /// The column type a value of this kind would be declared as.
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Null => ColumnType::Unknown,
            Value::Boolean(_) => ColumnType::Boolean,
            Value::Smallint(_) => ColumnType::Smallint,
            Value::Integer(_) => ColumnType::Integer,
            Value::Bigint(_) => ColumnType::Bigint,
            Value::Real(_) => ColumnType::Real,
            Value::DoublePrecision(_) => ColumnType::DoublePrecision,
            Value::Text(_) => ColumnType::Text,
            Value::Bytes(_) => ColumnType::Bytes,
        }
    }

    /// The value as a 64-bit integer, if it is any integer kind.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Smallint(v) => Some(i64::from(*v)),
            Value::Integer(v) => Some(i64::from(*v)),
            Value::Bigint(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Smallint(v) => write!(f, "{v}"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Bigint(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::DoublePrecision(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i16> for Value {
    fn from(value: i16) -> Self {
        Value::Smallint(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Bigint(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Real(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::DoublePrecision(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
