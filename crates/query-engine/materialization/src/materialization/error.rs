//! Errors raised while building or applying a mapping plan.

use smol_str::SmolStr;
use thiserror::Error;

/// The result columns do not fit the destination type's declared shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeMismatchError {
    #[error("expecting more columns to map than there are: '{type_name}' needs column ordinal {ordinal} but the result has {column_count} columns")]
    TooFewColumns {
        type_name: &'static str,
        ordinal: usize,
        column_count: usize,
    },
    #[error("'{type_name}' maps {consumed} columns but the result has {column_count}")]
    TooManyColumns {
        type_name: &'static str,
        consumed: usize,
        column_count: usize,
    },
    #[error("attempting to map column ordinal {ordinal}: '{member}' member does not match '{column}' column")]
    ColumnNameMismatch {
        ordinal: usize,
        member: &'static str,
        column: SmolStr,
    },
    #[error("field {index} of named shape '{type_name}' has no name")]
    UnnamedField { type_name: &'static str, index: usize },
    #[error("'{type_name}' nests composites deeper than {max_depth} levels")]
    TooDeep {
        type_name: &'static str,
        max_depth: usize,
    },
}

/// A row could not be turned into an instance of the destination type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MaterializationError {
    #[error("cannot convert {found} value{} into '{expected}'", at(.ordinal))]
    IncompatibleValue {
        expected: &'static str,
        found: &'static str,
        ordinal: Option<usize>,
    },
    #[error("value {value}{} is out of range for '{expected}'", at(.ordinal))]
    OutOfRange {
        expected: &'static str,
        value: String,
        ordinal: Option<usize>,
    },
    #[error("'{type_name}' was marked absent by its null test but is not optional")]
    UnexpectedAbsent { type_name: &'static str },
    #[error("'{type_name}' expects {expected} but the plan supplies {found}")]
    UnexpectedInput {
        type_name: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("'{type_name}' asked for constructor argument {index} but the plan has no more")]
    MissingArgument { type_name: &'static str, index: usize },
    #[error("'{type_name}' has no field named '{field}'")]
    UnknownField {
        type_name: &'static str,
        field: &'static str,
    },
    #[error("plan was built for '{plan}' but is being applied to '{expected}'")]
    PlanTypeMismatch {
        expected: &'static str,
        plan: &'static str,
    },
    #[error("unable to read column ordinal {ordinal}: {message}")]
    Read { ordinal: usize, message: String },
    #[error("{0}")]
    Custom(String),
}

fn at(ordinal: &Option<usize>) -> String {
    ordinal.map_or_else(String::new, |ordinal| format!(" at ordinal {ordinal}"))
}

impl MaterializationError {
    pub fn custom(message: impl Into<String>) -> Self {
        MaterializationError::Custom(message.into())
    }

    /// Attach the source ordinal to a value conversion error that lacks one.
    pub(crate) fn at_ordinal(self, at: usize) -> Self {
        match self {
            MaterializationError::IncompatibleValue {
                expected,
                found,
                ordinal: None,
            } => MaterializationError::IncompatibleValue {
                expected,
                found,
                ordinal: Some(at),
            },
            MaterializationError::OutOfRange {
                expected,
                value,
                ordinal: None,
            } => MaterializationError::OutOfRange {
                expected,
                value,
                ordinal: Some(at),
            },
            other => other,
        }
    }
}
