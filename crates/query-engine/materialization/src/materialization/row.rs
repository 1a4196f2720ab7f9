//! Access to the values of the row currently under a cursor.

use query_engine_metadata::metadata::Value;

use super::error::MaterializationError;

/// The values of one row, read by ordinal.
///
/// Backends implement this over their native row type. Reads may fail, e.g.
/// when a value cannot be decoded, and a failed read fails the row.
pub trait RowValues {
    fn field_count(&self) -> usize;

    fn is_null(&self, ordinal: usize) -> Result<bool, MaterializationError>;

    fn value(&self, ordinal: usize) -> Result<Value, MaterializationError>;
}

impl RowValues for [Value] {
    fn field_count(&self) -> usize {
        self.len()
    }

    fn is_null(&self, ordinal: usize) -> Result<bool, MaterializationError> {
        self.get(ordinal)
            .map(Value::is_null)
            .ok_or_else(|| out_of_range(ordinal, self.len()))
    }

    fn value(&self, ordinal: usize) -> Result<Value, MaterializationError> {
        self.get(ordinal)
            .cloned()
            .ok_or_else(|| out_of_range(ordinal, self.len()))
    }
}

impl RowValues for Vec<Value> {
    fn field_count(&self) -> usize {
        self.as_slice().field_count()
    }

    fn is_null(&self, ordinal: usize) -> Result<bool, MaterializationError> {
        self.as_slice().is_null(ordinal)
    }

    fn value(&self, ordinal: usize) -> Result<Value, MaterializationError> {
        self.as_slice().value(ordinal)
    }
}

fn out_of_range(ordinal: usize, field_count: usize) -> MaterializationError {
    MaterializationError::Read {
        ordinal,
        message: format!("the row has only {field_count} fields"),
    }
}
