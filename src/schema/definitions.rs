//! Correlator and VEV table schemas

use super::columns::{CORRELATION, INTERNAL, INTERNAL1, INTERNAL2, MC_TIME, TIME, VAC_EXP};
use super::{Check, ColumnSpec, TableSchema};
use crate::table::{int_values, label_values, ColumnKind, Label};
use crate::Result;
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashSet;

/// Composite key of a correlator record, in sort order
pub const CORRELATOR_KEY: [&str; 4] = [MC_TIME, TIME, INTERNAL1, INTERNAL2];

/// Composite key of a VEV record, in sort order
pub const VEV_KEY: [&str; 2] = [MC_TIME, INTERNAL];

const MC_TIME_DESCRIPTION: &str = "Index enumerating the Monte Carlo samples.";
const TIME_DESCRIPTION: &str =
    "Physical euclidean time coordinate along which correlation is measured.";
const INTERNAL_DESCRIPTION: &str = "Any further internal structure, e.g., an index enumerating \
     interpolating operators, a blocking or smearing level, or any combination thereof.";
const CORRELATION_DESCRIPTION: &str = "Measured values of the correlators.";
const VAC_EXP_DESCRIPTION: &str = "Measured values of the vacuum expectation values (VEVs).";
const INTERNALS_EQUAL_DESCRIPTION: &str = "Internal1 and Internal2 are supposed to form a \
     square matrix, so they must be identical up to reordering.";
const UNIQUE_INDEXING_DESCRIPTION: &str =
    "The index columns are supposed to make for a unique index.";

/// Schema of correlator tables
#[must_use]
pub fn correlator_schema() -> TableSchema {
    TableSchema::new(
        "CorrelatorData",
        vec![
            ColumnSpec {
                name: MC_TIME,
                kind: ColumnKind::Integer,
                description: MC_TIME_DESCRIPTION,
            },
            ColumnSpec {
                name: TIME,
                kind: ColumnKind::Integer,
                description: TIME_DESCRIPTION,
            },
            ColumnSpec {
                name: INTERNAL1,
                kind: ColumnKind::Label,
                description: INTERNAL_DESCRIPTION,
            },
            ColumnSpec {
                name: INTERNAL2,
                kind: ColumnKind::Label,
                description: INTERNAL_DESCRIPTION,
            },
            ColumnSpec {
                name: CORRELATION,
                kind: ColumnKind::Real,
                description: CORRELATION_DESCRIPTION,
            },
        ],
    )
    .same_kind(INTERNAL1, INTERNAL2)
    .check(Check::new(
        "Check_Internals_equal",
        INTERNALS_EQUAL_DESCRIPTION,
        internals_equal,
    ))
    .check(Check::new(
        "Check_unique_indexing",
        UNIQUE_INDEXING_DESCRIPTION,
        unique_correlator_index,
    ))
}

/// Schema of VEV tables
#[must_use]
pub fn vev_schema() -> TableSchema {
    TableSchema::new(
        "VEVData",
        vec![
            ColumnSpec {
                name: MC_TIME,
                kind: ColumnKind::Integer,
                description: MC_TIME_DESCRIPTION,
            },
            ColumnSpec {
                name: INTERNAL,
                kind: ColumnKind::Label,
                description: INTERNAL_DESCRIPTION,
            },
            ColumnSpec {
                name: VAC_EXP,
                kind: ColumnKind::Real,
                description: VAC_EXP_DESCRIPTION,
            },
        ],
    )
    .check(Check::new(
        "Check_unique_indexing",
        UNIQUE_INDEXING_DESCRIPTION,
        unique_vev_index,
    ))
}

fn internals_equal(batch: &RecordBatch) -> Result<bool> {
    let mut first = label_values(batch, INTERNAL1)?;
    let mut second = label_values(batch, INTERNAL2)?;
    first.sort_unstable();
    second.sort_unstable();
    Ok(first == second)
}

fn unique_correlator_index(batch: &RecordBatch) -> Result<bool> {
    let mc_time = int_values(batch, MC_TIME)?;
    let time = int_values(batch, TIME)?;
    let first = label_values(batch, INTERNAL1)?;
    let second = label_values(batch, INTERNAL2)?;

    let mut seen: FxHashSet<(i64, i64, &Label, &Label)> = FxHashSet::default();
    seen.reserve(mc_time.len());
    Ok(mc_time
        .iter()
        .zip(&time)
        .zip(first.iter().zip(&second))
        .all(|((&m, &t), (a, b))| seen.insert((m, t, a, b))))
}

fn unique_vev_index(batch: &RecordBatch) -> Result<bool> {
    let mc_time = int_values(batch, MC_TIME)?;
    let internal = label_values(batch, INTERNAL)?;

    let mut seen: FxHashSet<(i64, &Label)> = FxHashSet::default();
    seen.reserve(mc_time.len());
    Ok(mc_time
        .iter()
        .zip(&internal)
        .all(|(&m, label)| seen.insert((m, label))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn vev_batch(mc_time: Vec<i64>, internal: Vec<&str>) -> RecordBatch {
        let n = mc_time.len();
        let schema = Schema::new(vec![
            Field::new(MC_TIME, DataType::Int64, false),
            Field::new(INTERNAL, DataType::Utf8, false),
            Field::new(VAC_EXP, DataType::Float64, false),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int64Array::from(mc_time)),
                Arc::new(StringArray::from(internal)),
                Arc::new(Float64Array::from(vec![0.5; n])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_vev_schema_accepts_string_labels() {
        let batch = vev_batch(vec![1, 1, 2, 2], vec!["a", "b", "a", "b"]);
        vev_schema().validate(&batch).unwrap();
    }

    #[test]
    fn test_vev_schema_rejects_duplicate_key() {
        let batch = vev_batch(vec![1, 1, 2, 1], vec!["a", "b", "a", "b"]);
        let err = vev_schema().validate(&batch).unwrap_err();
        assert!(err.to_string().contains("Check_unique_indexing"));
    }

    #[test]
    fn test_correlator_schema_lists_five_columns() {
        let schema = correlator_schema();
        assert_eq!(schema.name(), "CorrelatorData");
        assert_eq!(schema.columns().len(), 5);
        assert_eq!(schema.checks().len(), 2);
    }
}
