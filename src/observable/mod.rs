//! Resampled observables
//!
//! An [`Obs`] wraps the samples of one Monte Carlo ensemble: it keeps the
//! sample mean and the per-sample fluctuations around it, tagged with the
//! ensemble name. Arithmetic propagates the fluctuations linearly, so the
//! value of a product is the product of the values and errors follow from
//! first-order derivatives.
//!
//! ## Usage
//!
//! ```rust
//! use glue_analysis::observable::Obs;
//!
//! # fn main() -> glue_analysis::Result<()> {
//! let a = Obs::new(&[1.0, 2.0, 3.0, 4.0, 5.0], "glue_bins")?;
//! let b = a.checked_mul(&a)?;
//! assert_eq!(b.value(), 9.0);
//! # Ok(())
//! # }
//! ```

mod construct;
mod corr;

pub use construct::{build_leaves, outer, subtract_trailing, to_obs_array};
pub use corr::{Corr, Plottable};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fewest samples an observable can be built from
pub const MIN_SAMPLES: usize = 5;

/// Observable with per-ensemble sample fluctuations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obs {
    value: f64,
    deltas: BTreeMap<String, Vec<f64>>,
}

impl Obs {
    /// Build an observable from the samples of one ensemble
    ///
    /// # Errors
    /// Returns [`Error::TooFewSamples`] for fewer than [`MIN_SAMPLES`] samples
    #[allow(clippy::cast_precision_loss)]
    pub fn new(samples: &[f64], ensemble_name: impl Into<String>) -> Result<Self> {
        if samples.len() < MIN_SAMPLES {
            return Err(Error::TooFewSamples {
                found: samples.len(),
                required: MIN_SAMPLES,
            });
        }
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let deltas = samples.iter().map(|s| s - mean).collect();
        Ok(Self {
            value: mean,
            deltas: BTreeMap::from([(ensemble_name.into(), deltas)]),
        })
    }

    /// Central value
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Names of the ensembles this observable depends on
    #[must_use]
    pub fn ensemble_names(&self) -> Vec<&str> {
        self.deltas.keys().map(String::as_str).collect()
    }

    /// Fluctuations for one ensemble
    #[must_use]
    pub fn deltas(&self, ensemble_name: &str) -> Option<&[f64]> {
        self.deltas.get(ensemble_name).map(Vec::as_slice)
    }

    /// Standard error of the mean, ignoring autocorrelation
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn error(&self) -> f64 {
        self.deltas
            .values()
            .filter(|d| d.len() > 1)
            .map(|d| {
                let n = d.len() as f64;
                d.iter().map(|x| x * x).sum::<f64>() / (n * (n - 1.0))
            })
            .sum::<f64>()
            .sqrt()
    }

    /// `self + other`
    ///
    /// # Errors
    /// Returns [`Error::IncompatibleEnsembles`] if a shared ensemble has
    /// different sample counts
    pub fn checked_add(&self, other: &Self) -> Result<Self> {
        self.propagate(other, self.value + other.value, 1.0, 1.0)
    }

    /// `self - other`
    ///
    /// # Errors
    /// Returns [`Error::IncompatibleEnsembles`] if a shared ensemble has
    /// different sample counts
    pub fn checked_sub(&self, other: &Self) -> Result<Self> {
        self.propagate(other, self.value - other.value, 1.0, -1.0)
    }

    /// `self * other`
    ///
    /// # Errors
    /// Returns [`Error::IncompatibleEnsembles`] if a shared ensemble has
    /// different sample counts
    pub fn checked_mul(&self, other: &Self) -> Result<Self> {
        self.propagate(other, self.value * other.value, other.value, self.value)
    }

    /// `self * factor`
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            value: self.value * factor,
            deltas: self
                .deltas
                .iter()
                .map(|(name, d)| (name.clone(), d.iter().map(|x| x * factor).collect()))
                .collect(),
        }
    }

    /// `self / divisor`
    #[must_use]
    pub fn div_scalar(&self, divisor: f64) -> Self {
        Self {
            value: self.value / divisor,
            deltas: self
                .deltas
                .iter()
                .map(|(name, d)| (name.clone(), d.iter().map(|x| x / divisor).collect()))
                .collect(),
        }
    }

    /// Combine with `other` given the result value and both partial derivatives
    fn propagate(&self, other: &Self, value: f64, d_self: f64, d_other: f64) -> Result<Self> {
        let mut deltas = BTreeMap::new();
        for (name, d) in &self.deltas {
            let combined = match other.deltas.get(name) {
                Some(o) if o.len() != d.len() => {
                    return Err(Error::IncompatibleEnsembles(format!(
                        "ensemble '{name}' has {} samples on one side and {} on the other",
                        d.len(),
                        o.len()
                    )));
                }
                Some(o) => d
                    .iter()
                    .zip(o)
                    .map(|(a, b)| d_self * a + d_other * b)
                    .collect(),
                None => d.iter().map(|a| d_self * a).collect(),
            };
            deltas.insert(name.clone(), combined);
        }
        for (name, o) in &other.deltas {
            if !self.deltas.contains_key(name) {
                deltas.insert(name.clone(), o.iter().map(|b| d_other * b).collect());
            }
        }
        Ok(Self { value, deltas })
    }
}
