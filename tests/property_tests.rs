//! Property-based tests for glue-analysis
//!
//! - Reshaping does not depend on row order
//! - Every densely indexed table freezes
//! - Frozen ensembles reject all mutation
//! - Observable means agree with plain sample means

use arrow::array::{ArrayRef, Float64Array, Int64Array, UInt32Array};
use arrow::compute;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use glue_analysis::observable::{to_obs_array, MIN_SAMPLES};
use glue_analysis::{CorrelatorEnsemble, DenseArray, Error};
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Grid extents: (samples, time slices, internal labels)
fn arb_extents() -> impl Strategy<Value = (usize, usize, usize)> {
    (MIN_SAMPLES..9, 1usize..4, 1usize..4)
}

/// Dense correlator and VEV tables plus a row permutation for each
fn arb_tables() -> impl Strategy<Value = (RecordBatch, RecordBatch, Vec<u32>, Vec<u32>)> {
    arb_extents().prop_flat_map(|(samples, times, internals)| {
        let corr_rows = samples * times * internals * internals;
        let vev_rows = samples * internals;
        (
            proptest::collection::vec(-1.0e3f64..1.0e3, corr_rows),
            proptest::collection::vec(-1.0e3f64..1.0e3, vev_rows),
            Just((0..u32::try_from(corr_rows).unwrap()).collect::<Vec<_>>()).prop_shuffle(),
            Just((0..u32::try_from(vev_rows).unwrap()).collect::<Vec<_>>()).prop_shuffle(),
        )
            .prop_map(move |(corr_values, vev_values, corr_perm, vev_perm)| {
                (
                    correlator_table(samples, times, internals, corr_values),
                    vev_table(samples, internals, vev_values),
                    corr_perm,
                    vev_perm,
                )
            })
    })
}

#[allow(clippy::cast_possible_wrap)]
fn correlator_table(samples: usize, times: usize, internals: usize, values: Vec<f64>) -> RecordBatch {
    let mut keys: [Vec<i64>; 4] = Default::default();
    for m in 1..=samples {
        for t in 1..=times {
            for a in 1..=internals {
                for b in 1..=internals {
                    for (key, v) in keys.iter_mut().zip([m, t, a, b]) {
                        key.push(v as i64);
                    }
                }
            }
        }
    }
    let [mc, t, i1, i2] = keys;
    let schema = Schema::new(vec![
        Field::new("MC_Time", DataType::Int64, false),
        Field::new("Time", DataType::Int64, false),
        Field::new("Internal1", DataType::Int64, false),
        Field::new("Internal2", DataType::Int64, false),
        Field::new("Correlation", DataType::Float64, false),
    ]);
    RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(Int64Array::from(mc)),
            Arc::new(Int64Array::from(t)),
            Arc::new(Int64Array::from(i1)),
            Arc::new(Int64Array::from(i2)),
            Arc::new(Float64Array::from(values)),
        ],
    )
    .unwrap()
}

#[allow(clippy::cast_possible_wrap)]
fn vev_table(samples: usize, internals: usize, values: Vec<f64>) -> RecordBatch {
    let (mut mc, mut internal) = (vec![], vec![]);
    for m in 1..=samples {
        for a in 1..=internals {
            mc.push(m as i64);
            internal.push(a as i64);
        }
    }
    let schema = Schema::new(vec![
        Field::new("MC_Time", DataType::Int64, false),
        Field::new("Internal", DataType::Int64, false),
        Field::new("Vac_exp", DataType::Float64, false),
    ]);
    RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(Int64Array::from(mc)),
            Arc::new(Int64Array::from(internal)),
            Arc::new(Float64Array::from(values)),
        ],
    )
    .unwrap()
}

fn permuted(batch: &RecordBatch, permutation: Vec<u32>) -> RecordBatch {
    let indices = UInt32Array::from(permutation);
    let columns: Vec<ArrayRef> = batch
        .columns()
        .iter()
        .map(|c| compute::take(c.as_ref(), &indices, None).unwrap())
        .collect();
    RecordBatch::try_new(batch.schema(), columns).unwrap()
}

fn frozen(correlators: RecordBatch, vevs: RecordBatch) -> CorrelatorEnsemble {
    let mut ensemble = CorrelatorEnsemble::builder("prop")
        .correlators(correlators)
        .vevs(vevs)
        .build();
    ensemble.freeze().unwrap();
    ensemble
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: dense tables in any row order freeze
    #[test]
    fn prop_dense_tables_freeze((corr, vevs, corr_perm, vev_perm) in arb_tables()) {
        let mut ensemble = CorrelatorEnsemble::builder("prop")
            .correlators(permuted(&corr, corr_perm))
            .vevs(permuted(&vevs, vev_perm))
            .build();
        prop_assert!(ensemble.freeze().is_ok());
        prop_assert!(ensemble.is_frozen());
    }

    /// Property: dense arrays are independent of row order
    #[test]
    fn prop_dense_arrays_ignore_row_order((corr, vevs, corr_perm, vev_perm) in arb_tables()) {
        let sorted = frozen(corr.clone(), vevs.clone());
        let shuffled = frozen(permuted(&corr, corr_perm), permuted(&vevs, vev_perm));

        prop_assert_eq!(sorted.to_dense().unwrap(), shuffled.to_dense().unwrap());
        prop_assert_eq!(sorted.to_dense_vevs().unwrap(), shuffled.to_dense_vevs().unwrap());
        prop_assert_eq!(sorted.nt().unwrap(), shuffled.nt().unwrap());
        prop_assert_eq!(sorted.num_internal().unwrap(), shuffled.num_internal().unwrap());
        prop_assert_eq!(sorted.num_samples().unwrap(), shuffled.num_samples().unwrap());
    }

    /// Property: dense shape equals the derived extents
    #[test]
    fn prop_dense_shape_matches_extents((corr, vevs, _, _) in arb_tables()) {
        let ensemble = frozen(corr, vevs);
        let (s, t, n) = (
            ensemble.num_samples().unwrap(),
            ensemble.nt().unwrap(),
            ensemble.num_internal().unwrap(),
        );
        let dense = ensemble.to_dense().unwrap();
        let dense_vevs = ensemble.to_dense_vevs().unwrap();
        prop_assert_eq!(dense.shape(), &[s, t, n, n]);
        prop_assert_eq!(dense_vevs.shape(), &[s, n]);
    }

    /// Property: every setter fails after freezing
    #[test]
    fn prop_frozen_rejects_mutation((corr, vevs, _, _) in arb_tables()) {
        let mut ensemble = frozen(corr.clone(), vevs.clone());
        let rejected = matches!(ensemble.set_correlators(corr), Err(Error::Frozen { .. }))
            && matches!(ensemble.set_vevs(vevs), Err(Error::Frozen { .. }))
            && matches!(ensemble.clear_vevs(), Err(Error::Frozen { .. }));
        prop_assert!(rejected);
    }

    /// Property: observable values are sample means along axis 0
    #[test]
    fn prop_obs_values_are_sample_means(
        samples in proptest::collection::vec(-1.0e3f64..1.0e3, MIN_SAMPLES * 6)
    ) {
        let array = DenseArray::from_shape_vec(vec![MIN_SAMPLES, 3, 2], samples).unwrap();
        let means = array.mean_axis0().unwrap();
        let observables = to_obs_array(&array, "prop").unwrap();

        prop_assert_eq!(observables.shape(), means.shape());
        for (obs, mean) in observables.data().iter().zip(means.data()) {
            prop_assert!((obs.value() - mean).abs() < 1e-9);
            prop_assert!(obs.error() >= 0.0);
        }
    }
}
