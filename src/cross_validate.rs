//! Referential consistency between correlator and VEV tables
//!
//! Every (Time, Internal2) slice of the correlator table must cover exactly
//! the (MC_Time, Internal) pairs of the VEV table, read as (MC_Time,
//! Internal1). This ties the sampling and internal-index spaces of both
//! tables together.

use crate::schema::columns::{INTERNAL, INTERNAL1, INTERNAL2, MC_TIME, TIME};
use crate::table::{int_values, label_values, Label};
use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use std::collections::BTreeMap;
use tracing::debug;

/// Check that correlators and VEVs share one index space
///
/// Both tables are expected to have passed their schema validation already.
///
/// # Errors
/// Returns [`Error::DataInconsistency`] naming the first (Time, Internal2)
/// group whose (MC_Time, Internal1) pairs differ from the VEV pairs
pub fn cross_validate(correlators: &RecordBatch, vevs: &RecordBatch) -> Result<()> {
    let mc_time = int_values(correlators, MC_TIME)?;
    let time = int_values(correlators, TIME)?;
    let first = label_values(correlators, INTERNAL1)?;
    let second = label_values(correlators, INTERNAL2)?;

    let mut groups: BTreeMap<(i64, &Label), Vec<(i64, &Label)>> = BTreeMap::new();
    for (((&m, &t), a), b) in mc_time.iter().zip(&time).zip(&first).zip(&second) {
        groups.entry((t, b)).or_default().push((m, a));
    }

    let vev_mc_time = int_values(vevs, MC_TIME)?;
    let vev_internal = label_values(vevs, INTERNAL)?;
    let mut expected: Vec<(i64, &Label)> = vev_mc_time.iter().copied().zip(&vev_internal).collect();
    expected.sort_unstable();

    for ((t, label), mut pairs) in groups {
        pairs.sort_unstable();
        if pairs != expected {
            return Err(Error::DataInconsistency(format!(
                "group (Time={t}, Internal2={label}) holds {} (MC_Time, Internal1) pairs \
                 that do not match the {} (MC_Time, Internal) pairs of the VEV table",
                pairs.len(),
                expected.len()
            )));
        }
    }

    debug!(
        correlator_rows = correlators.num_rows(),
        vev_rows = vevs.num_rows(),
        "correlators and VEVs are consistent"
    );
    Ok(())
}
