//! Result column descriptions.

use std::fmt;

use enum_iterator::Sequence;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// The declared types a result column can report.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Sequence,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Boolean,
    Smallint,
    Integer,
    Bigint,
    Real,
    #[serde(rename = "double precision")]
    DoublePrecision,
    Text,
    Bytes,
    /// The backend could not tell us, e.g. an untyped expression.
    Unknown,
}

impl ColumnType {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::Smallint | ColumnType::Integer | ColumnType::Bigint
        )
    }

    /// Map a backend's declared type name onto a column type.
    ///
    /// Covers the names reported by PostgreSQL and the affinity rules of SQLite.
    pub fn from_declared(name: &str) -> ColumnType {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "bool" | "boolean" => ColumnType::Boolean,
            "int2" | "smallint" => ColumnType::Smallint,
            "int" | "int4" | "integer" | "serial" => ColumnType::Integer,
            "int8" | "bigint" | "bigserial" => ColumnType::Bigint,
            "float4" | "real" => ColumnType::Real,
            "float8" | "double" | "double precision" | "float" => ColumnType::DoublePrecision,
            "text" | "varchar" | "character varying" | "char" | "character" | "bpchar"
            | "name" => ColumnType::Text,
            "bytea" | "blob" => ColumnType::Bytes,
            // PostgreSQL names the affinity rules below would misread
            "interval" | "point" | "int2vector" | "int4range" | "int8range" | "int4multirange"
            | "int8multirange" => ColumnType::Unknown,
            _ if name.starts_with('_') || name.ends_with("[]") => ColumnType::Unknown,
            _ if name.contains("int") => ColumnType::Integer,
            _ if name.contains("char") || name.contains("clob") || name.contains("text") => {
                ColumnType::Text
            }
            _ if name.contains("real") || name.contains("floa") || name.contains("doub") => {
                ColumnType::DoublePrecision
            }
            _ => ColumnType::Unknown,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ColumnType::DoublePrecision => write!(f, "double precision"),
            _ => write!(f, "{}", format!("{self:?}").to_lowercase()),
        }
    }
}

/// One column of a result set, as reported by the backend cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Column {
    pub name: SmolStr,
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<SmolStr>, column_type: ColumnType) -> Self {
        Column {
            name: name.into(),
            column_type,
        }
    }
}

/// The ordered `(name, type)` pairs of a result set.
///
/// Two result sets with equal signatures can share a mapping plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub struct ColumnSignature(pub Vec<(SmolStr, ColumnType)>);

impl ColumnSignature {
    pub fn of(columns: &[Column]) -> Self {
        ColumnSignature(
            columns
                .iter()
                .map(|column| (column.name.clone(), column.column_type))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ColumnSignature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        for (i, (name, column_type)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {column_type}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_names_follow_sqlite_affinity() {
        assert_eq!(ColumnType::from_declared("INTEGER"), ColumnType::Integer);
        assert_eq!(ColumnType::from_declared("BIGINT"), ColumnType::Bigint);
        assert_eq!(ColumnType::from_declared("NVARCHAR(40)"), ColumnType::Text);
        assert_eq!(ColumnType::from_declared("REAL"), ColumnType::Real);
        assert_eq!(ColumnType::from_declared("BLOB"), ColumnType::Bytes);
        assert_eq!(ColumnType::from_declared("NULL"), ColumnType::Unknown);
    }

    #[test]
    fn postgres_names_mentioning_int_are_not_integers() {
        assert_eq!(ColumnType::from_declared("INT4"), ColumnType::Integer);
        assert_eq!(ColumnType::from_declared("INTERVAL"), ColumnType::Unknown);
        assert_eq!(ColumnType::from_declared("POINT"), ColumnType::Unknown);
        assert_eq!(ColumnType::from_declared("INT8RANGE"), ColumnType::Unknown);
        assert_eq!(ColumnType::from_declared("INT4[]"), ColumnType::Unknown);
        assert_eq!(ColumnType::from_declared("_int4"), ColumnType::Unknown);
        // SQLite affinity still applies to everything else
        assert_eq!(ColumnType::from_declared("UNSIGNED BIG INT"), ColumnType::Integer);
        assert_eq!(ColumnType::from_declared("TINYINT"), ColumnType::Integer);
    }

    #[test]
    fn every_column_type_round_trips_through_serde() {
        for column_type in enum_iterator::all::<ColumnType>() {
            let json = serde_json::to_value(column_type).unwrap();
            assert_eq!(json, serde_json::Value::String(column_type.to_string()));
            let back: ColumnType = serde_json::from_value(json).unwrap();
            assert_eq!(back, column_type);
        }
    }

    #[test]
    fn signature_displays_in_column_order() {
        let signature = ColumnSignature::of(&[
            Column::new("Id", ColumnType::Integer),
            Column::new("Name", ColumnType::Text),
        ]);
        assert_eq!(signature.to_string(), "(Id: integer, Name: text)");
    }
}
