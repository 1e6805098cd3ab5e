//! Typed column access over Arrow record batches
//!
//! Correlator and VEV tables arrive as [`RecordBatch`]es whose index columns
//! may use any Arrow integer width and whose internal labels may be integers
//! or strings. The helpers here normalise them into plain Rust values
//! (`i64`, `f64`, [`Label`]) and implement the lexicographic sort used
//! before reshaping.

use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, LargeStringArray, StringArray};
use arrow::compute::{self, CastOptions, SortColumn};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use std::fmt;

/// Element kind a schema column is allowed to hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Any Arrow integer type
    Integer,
    /// Any Arrow floating point type
    Real,
    /// Internal-structure label: integer or string
    Label,
}

impl ColumnKind {
    /// Whether a column of data type `data_type` satisfies this kind
    #[must_use]
    pub fn accepts(self, data_type: &DataType) -> bool {
        match self {
            Self::Integer => data_type.is_integer(),
            Self::Real => data_type.is_floating(),
            Self::Label => data_type.is_integer() || is_string(data_type),
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Real => write!(f, "real"),
            Self::Label => write!(f, "label (integer or string)"),
        }
    }
}

/// Internal-structure label (operator, smearing or blocking index)
///
/// Integers order numerically and strings lexicographically. A single table
/// never mixes the two variants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Label {
    /// Integer label, normally 1-based
    Int(i64),
    /// Free-form string label
    Text(String),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value:?}"),
        }
    }
}

/// Label kinds are "same" when both are integer or both are string typed
#[must_use]
pub fn same_label_kind(a: &DataType, b: &DataType) -> bool {
    (a.is_integer() && b.is_integer()) || (is_string(a) && is_string(b))
}

fn is_string(data_type: &DataType) -> bool {
    matches!(data_type, DataType::Utf8 | DataType::LargeUtf8)
}

/// Look up a column by name
///
/// # Errors
/// Returns [`Error::MissingData`] if the column is not present
pub fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| Error::MissingData(format!("column '{name}' is not present")))
}

/// Integer column values widened to `i64`
///
/// # Errors
/// Returns error if the column is missing, not integer typed or has nulls
pub fn int_values(batch: &RecordBatch, name: &str) -> Result<Vec<i64>> {
    let array = column(batch, name)?;
    if !array.data_type().is_integer() {
        return Err(kind_error(name, ColumnKind::Integer, array.data_type()));
    }
    let options = CastOptions {
        safe: false,
        ..CastOptions::default()
    };
    let widened = compute::cast_with_options(array.as_ref(), &DataType::Int64, &options)
        .map_err(|e| {
            Error::schema("table", name, format!("values do not fit a 64-bit signed index: {e}"))
        })?;
    let values = widened
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| Error::StorageError(format!("Failed to downcast '{name}' to Int64Array")))?;
    values
        .iter()
        .map(|v| v.ok_or_else(|| null_error(name)))
        .collect()
}

/// Real column values widened to `f64`
///
/// # Errors
/// Returns error if the column is missing, not floating point or has nulls
pub fn real_values(batch: &RecordBatch, name: &str) -> Result<Vec<f64>> {
    let array = column(batch, name)?;
    if !array.data_type().is_floating() {
        return Err(kind_error(name, ColumnKind::Real, array.data_type()));
    }
    f64_values(array, name)
}

/// Label column values
///
/// # Errors
/// Returns error if the column is missing, neither integer nor string typed,
/// or has nulls
pub fn label_values(batch: &RecordBatch, name: &str) -> Result<Vec<Label>> {
    let array = column(batch, name)?;
    match array.data_type() {
        dt if dt.is_integer() => Ok(int_values(batch, name)?
            .into_iter()
            .map(Label::Int)
            .collect()),
        DataType::Utf8 => {
            let strings = array
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| {
                    Error::StorageError(format!("Failed to downcast '{name}' to StringArray"))
                })?;
            strings
                .iter()
                .map(|v| v.map(|s| Label::Text(s.to_string())).ok_or_else(|| null_error(name)))
                .collect()
        }
        DataType::LargeUtf8 => {
            let strings = array
                .as_any()
                .downcast_ref::<LargeStringArray>()
                .ok_or_else(|| {
                    Error::StorageError(format!("Failed to downcast '{name}' to LargeStringArray"))
                })?;
            strings
                .iter()
                .map(|v| v.map(|s| Label::Text(s.to_string())).ok_or_else(|| null_error(name)))
                .collect()
        }
        dt => Err(kind_error(name, ColumnKind::Label, dt)),
    }
}

/// Values of `value` after sorting rows lexicographically by `keys`
///
/// All keys sort ascending. The result does not depend on input row order as
/// long as the key tuples are unique.
///
/// # Errors
/// Returns error if any column is missing or the sort kernel rejects a key type
pub fn sorted_values(batch: &RecordBatch, keys: &[&str], value: &str) -> Result<Vec<f64>> {
    let sort_columns = keys
        .iter()
        .map(|key| {
            Ok(SortColumn {
                values: column(batch, key)?.clone(),
                options: None,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let indices = compute::lexsort_to_indices(&sort_columns, None)?;
    let values = column(batch, value)?;
    if !values.data_type().is_floating() {
        return Err(kind_error(value, ColumnKind::Real, values.data_type()));
    }
    let sorted = compute::take(values.as_ref(), &indices, None)?;
    f64_values(&sorted, value)
}

fn f64_values(array: &ArrayRef, name: &str) -> Result<Vec<f64>> {
    let widened = compute::cast(array.as_ref(), &DataType::Float64)?;
    let values = widened
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| {
            Error::StorageError(format!("Failed to downcast '{name}' to Float64Array"))
        })?;
    values
        .iter()
        .map(|v| v.ok_or_else(|| null_error(name)))
        .collect()
}

fn kind_error(name: &str, expected: ColumnKind, found: &DataType) -> Error {
    Error::schema(
        "table",
        name,
        format!("expected {expected} column, found {found:?}"),
    )
}

fn null_error(name: &str) -> Error {
    Error::schema("table", name, "column must not contain null entries")
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float32Array, Int32Array, UInt64Array};
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    fn mixed_batch() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("a", DataType::Int32, false),
            Field::new("b", DataType::Utf8, false),
            Field::new("v", DataType::Float32, false),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int32Array::from(vec![2, 1, 2, 1])),
                Arc::new(StringArray::from(vec!["y", "y", "x", "x"])),
                Arc::new(Float32Array::from(vec![3.0, 1.0, 2.0, 0.0])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_int_values_widens_narrow_integers() {
        let batch = mixed_batch();
        assert_eq!(int_values(&batch, "a").unwrap(), vec![2, 1, 2, 1]);
    }

    #[test]
    fn test_int_values_rejects_out_of_range_unsigned() {
        let schema = Schema::new(vec![Field::new("MC_Time", DataType::UInt64, false)]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(UInt64Array::from(vec![1, u64::MAX]))],
        )
        .unwrap();
        let err = int_values(&batch, "MC_Time").unwrap_err();
        assert!(err.to_string().contains("64-bit signed index"));
        assert!(!err.to_string().contains("null"));
    }

    #[test]
    fn test_int_values_rejects_float_column() {
        let batch = mixed_batch();
        let err = int_values(&batch, "v").unwrap_err();
        assert!(err.to_string().contains("expected integer column"));
    }

    #[test]
    fn test_label_values_reads_strings() {
        let batch = mixed_batch();
        let labels = label_values(&batch, "b").unwrap();
        assert_eq!(labels[0], Label::Text("y".to_string()));
        assert!(Label::Text("x".to_string()) < Label::Text("y".to_string()));
    }

    #[test]
    fn test_sorted_values_is_lexicographic() {
        let batch = mixed_batch();
        let sorted = sorted_values(&batch, &["a", "b"], "v").unwrap();
        assert_eq!(sorted, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_missing_column_is_reported_by_name() {
        let batch = mixed_batch();
        let err = column(&batch, "nope").unwrap_err();
        assert!(err.to_string().contains("'nope'"));
    }

    #[test]
    fn test_column_kind_accepts() {
        assert!(ColumnKind::Integer.accepts(&DataType::UInt16));
        assert!(!ColumnKind::Integer.accepts(&DataType::Float64));
        assert!(ColumnKind::Real.accepts(&DataType::Float32));
        assert!(ColumnKind::Label.accepts(&DataType::LargeUtf8));
        assert!(!ColumnKind::Label.accepts(&DataType::Boolean));
    }
}
