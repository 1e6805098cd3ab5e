//! Validated correlator and VEV tables, derived extents and reshaping

use crate::dense::{element_count, DenseArray};
use crate::schema::columns::{CORRELATION, INTERNAL, INTERNAL1, INTERNAL2, MC_TIME, TIME, VAC_EXP};
use crate::schema::{correlator_schema, vev_schema, CORRELATOR_KEY, VEV_KEY};
use crate::table::{int_values, label_values, sorted_values, Label};
use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashSet;
use tracing::debug;

/// Correlator table that passed schema validation
#[derive(Debug, Clone)]
pub struct CorrelatorTable {
    batch: RecordBatch,
}

impl CorrelatorTable {
    /// Validate a batch against the correlator schema
    ///
    /// # Errors
    /// Returns [`Error::Schema`] on the first violated rule
    pub fn try_new(batch: RecordBatch) -> Result<Self> {
        correlator_schema().validate(&batch)?;
        Ok(Self { batch })
    }

    /// Underlying record batch
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }
}

/// VEV table that passed schema validation
#[derive(Debug, Clone)]
pub struct VevTable {
    batch: RecordBatch,
}

impl VevTable {
    /// Validate a batch against the VEV schema
    ///
    /// # Errors
    /// Returns [`Error::Schema`] on the first violated rule
    pub fn try_new(batch: RecordBatch) -> Result<Self> {
        vev_schema().validate(&batch)?;
        Ok(Self { batch })
    }

    /// Underlying record batch
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }
}

/// Largest value of a 1-based index column
pub(crate) fn max_index(batch: &RecordBatch, name: &str) -> Result<usize> {
    let max = int_values(batch, name)?
        .into_iter()
        .max()
        .ok_or_else(|| Error::MissingData(format!("column '{name}' has no rows")))?;
    usize::try_from(max)
        .map_err(|_| Error::NotDense(format!("largest {name} is {max}, expected a 1-based index")))
}

/// Extent of the internal-label axis
///
/// Integer labels are 1-based indices, so the extent is the largest label.
/// String labels have no numeric range; the extent is their distinct count.
pub(crate) fn label_extent(batch: &RecordBatch, name: &str) -> Result<usize> {
    let labels = label_values(batch, name)?;
    let Some(max) = labels.iter().max() else {
        return Err(Error::MissingData(format!("column '{name}' has no rows")));
    };
    match max {
        Label::Int(max) => usize::try_from(*max).map_err(|_| {
            Error::NotDense(format!("largest {name} is {max}, expected a 1-based index"))
        }),
        Label::Text(_) => Ok(labels.iter().collect::<FxHashSet<_>>().len()),
    }
}

/// Extents of a correlator table: (samples, time slices, internal labels)
pub(crate) fn correlator_extents(batch: &RecordBatch) -> Result<(usize, usize, usize)> {
    Ok((
        max_index(batch, MC_TIME)?,
        max_index(batch, TIME)?,
        label_extent(batch, INTERNAL1)?,
    ))
}

/// Check that a correlator table covers its index grid exactly once
///
/// Assumes the unique-indexing check already passed: unique keys that all
/// lie inside the grid and match its size in number fill it completely.
pub(crate) fn check_correlator_density(batch: &RecordBatch) -> Result<()> {
    let (samples, times, internals) = correlator_extents(batch)?;
    check_positive(batch, MC_TIME)?;
    check_positive(batch, TIME)?;
    check_positive_labels(batch, INTERNAL1)?;
    check_positive_labels(batch, INTERNAL2)?;

    let expected = element_count(&[samples, times, internals, internals]).ok_or_else(|| {
        Error::NotDense(format!(
            "correlators span {samples} samples x {times} times x {internals}^2 internals, \
             more entries than can be addressed"
        ))
    })?;
    if batch.num_rows() != expected {
        return Err(Error::NotDense(format!(
            "correlators span {samples} samples x {times} times x {internals}^2 internals \
             = {expected} entries, but {} rows are present",
            batch.num_rows()
        )));
    }
    Ok(())
}

/// Check that a VEV table covers `samples x internals` exactly once
pub(crate) fn check_vev_density(
    batch: &RecordBatch,
    samples: usize,
    internals: usize,
) -> Result<()> {
    check_positive(batch, MC_TIME)?;
    check_positive_labels(batch, INTERNAL)?;
    let expected = element_count(&[samples, internals]).ok_or_else(|| {
        Error::NotDense(format!(
            "VEVs span {samples} samples x {internals} internals, \
             more entries than can be addressed"
        ))
    })?;
    if batch.num_rows() != expected {
        return Err(Error::NotDense(format!(
            "VEVs span {samples} samples x {internals} internals = {expected} entries, \
             but {} rows are present",
            batch.num_rows()
        )));
    }
    Ok(())
}

fn check_positive(batch: &RecordBatch, name: &str) -> Result<()> {
    if let Some(min) = int_values(batch, name)?.into_iter().min() {
        if min < 1 {
            return Err(Error::NotDense(format!(
                "smallest {name} is {min}, indices start at 1"
            )));
        }
    }
    Ok(())
}

fn check_positive_labels(batch: &RecordBatch, name: &str) -> Result<()> {
    if let Some(Label::Int(min)) = label_values(batch, name)?.into_iter().min() {
        if min < 1 {
            return Err(Error::NotDense(format!(
                "smallest {name} is {min}, indices start at 1"
            )));
        }
    }
    Ok(())
}

/// Correlation values as `[samples, time, internal1, internal2]`
pub(crate) fn correlator_array(batch: &RecordBatch) -> Result<DenseArray<f64>> {
    let (samples, times, internals) = correlator_extents(batch)?;
    let values = sorted_values(batch, &CORRELATOR_KEY, CORRELATION)?;
    debug!(samples, times, internals, "reshaping correlators");
    DenseArray::from_shape_vec(vec![samples, times, internals, internals], values)
}

/// VEV values as `[samples, internal]`
pub(crate) fn vev_array(
    batch: &RecordBatch,
    samples: usize,
    internals: usize,
) -> Result<DenseArray<f64>> {
    let values = sorted_values(batch, &VEV_KEY, VAC_EXP)?;
    debug!(samples, internals, "reshaping VEVs");
    DenseArray::from_shape_vec(vec![samples, internals], values)
}
