//! Correlator ensembles
//!
//! A [`CorrelatorEnsemble`] owns one Monte Carlo ensemble of gluonic
//! correlation functions plus, optionally, the vacuum expectation values
//! measured on the same samples.
//!
//! ## Lifecycle
//!
//! ```text
//! staged (any value settable) ──freeze()──> frozen (validated, immutable)
//! ```
//!
//! Staged data is not type-checked when it is set. [`CorrelatorEnsemble::freeze`]
//! checks that the staged values are record batches, validates them against
//! their schemas, cross-validates correlators against VEVs and, unless
//! disabled in the [`EnsembleConfig`], checks that the indices form a dense
//! grid. There is no way back from frozen.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use glue_analysis::CorrelatorEnsemble;
//!
//! # fn main() -> glue_analysis::Result<()> {
//! let mut ensemble = CorrelatorEnsemble::from_parquet(
//!     "out_corr",
//!     "data/correlators.parquet",
//!     Some("data/vevs.parquet"),
//! )?;
//! ensemble.freeze()?;
//!
//! let corr = ensemble.to_corr(true)?;
//! println!("{:?}", corr.item(0, 0)?.plottable()?);
//! # Ok(())
//! # }
//! ```

mod staged;
mod tables;

pub use staged::StagedValue;
pub use tables::{CorrelatorTable, VevTable};

use crate::config::EnsembleConfig;
use crate::cross_validate::cross_validate;
use crate::dense::DenseArray;
use crate::observable::{outer, subtract_trailing, to_obs_array, Corr};
use crate::schema::columns::{INTERNAL1, MC_TIME, TIME};
use crate::storage::TableStore;
use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Free-form annotations attached to an ensemble
pub type Metadata = BTreeMap<String, serde_json::Value>;

enum State {
    Staged {
        correlators: Option<StagedValue>,
        vevs: Option<StagedValue>,
    },
    Frozen {
        correlators: CorrelatorTable,
        vevs: Option<VevTable>,
    },
}

/// A full ensemble of gluonic correlation functions
pub struct CorrelatorEnsemble {
    filename: String,
    config: EnsembleConfig,
    metadata: Metadata,
    state: State,
}

impl CorrelatorEnsemble {
    /// Create an empty, unfrozen ensemble with the default configuration
    #[must_use]
    pub fn new(filename: impl Into<String>) -> Self {
        Self::builder(filename).build()
    }

    /// Create a builder for an ensemble with optional settings
    #[must_use]
    pub fn builder(filename: impl Into<String>) -> CorrelatorEnsembleBuilder {
        CorrelatorEnsembleBuilder::new(filename)
    }

    /// Create an unfrozen ensemble from Parquet tables
    ///
    /// # Errors
    /// Returns error if either file cannot be read
    pub fn from_parquet<P: AsRef<Path>>(
        filename: impl Into<String>,
        correlator_path: P,
        vev_path: Option<P>,
    ) -> Result<Self> {
        let mut builder = Self::builder(filename)
            .correlators(TableStore::load_parquet(correlator_path)?.to_table()?);
        if let Some(path) = vev_path {
            builder = builder.vevs(TableStore::load_parquet(path)?.to_table()?);
        }
        Ok(builder.build())
    }

    /// Provenance of the data
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Label attached to every observable built from this ensemble
    #[must_use]
    pub fn ensemble_name(&self) -> &str {
        &self.config.ensemble_name
    }

    /// Configuration in effect
    #[must_use]
    pub const fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    /// Annotations
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Add one annotation
    ///
    /// # Errors
    /// Returns [`Error::MetadataConflict`] if `key` is already present
    pub fn insert_metadata(
        &mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Result<()> {
        let key = key.into();
        if self.metadata.contains_key(&key) {
            return Err(Error::MetadataConflict(key));
        }
        self.metadata.insert(key, value.into());
        Ok(())
    }

    /// Add several annotations, all or none
    ///
    /// # Errors
    /// Returns [`Error::MetadataConflict`] naming the first key that is
    /// already present; nothing is inserted in that case
    pub fn merge_metadata(&mut self, other: Metadata) -> Result<()> {
        if let Some(key) = other.keys().find(|k| self.metadata.contains_key(*k)) {
            return Err(Error::MetadataConflict(key.clone()));
        }
        self.metadata.extend(other);
        Ok(())
    }

    /// Whether the ensemble has been frozen
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        matches!(self.state, State::Frozen { .. })
    }

    /// Whether VEV data is present
    #[must_use]
    pub const fn has_vevs(&self) -> bool {
        match &self.state {
            State::Staged { vevs, .. } => vevs.is_some(),
            State::Frozen { vevs, .. } => vevs.is_some(),
        }
    }

    /// Stage correlator data
    ///
    /// Any value is accepted; it must be a correlator [`RecordBatch`] by the
    /// time the ensemble is frozen.
    ///
    /// # Errors
    /// Returns [`Error::Frozen`] once the ensemble is frozen
    pub fn set_correlators<T: Any + Send + Sync>(&mut self, value: T) -> Result<()> {
        match &mut self.state {
            State::Staged { correlators, .. } => {
                *correlators = Some(StagedValue::new(value));
                Ok(())
            }
            State::Frozen { .. } => Err(Error::Frozen {
                field: "correlators",
            }),
        }
    }

    /// Stage VEV data
    ///
    /// # Errors
    /// Returns [`Error::Frozen`] once the ensemble is frozen
    pub fn set_vevs<T: Any + Send + Sync>(&mut self, value: T) -> Result<()> {
        match &mut self.state {
            State::Staged { vevs, .. } => {
                *vevs = Some(StagedValue::new(value));
                Ok(())
            }
            State::Frozen { .. } => Err(Error::Frozen { field: "vevs" }),
        }
    }

    /// Drop staged VEV data
    ///
    /// # Errors
    /// Returns [`Error::Frozen`] once the ensemble is frozen
    pub fn clear_vevs(&mut self) -> Result<()> {
        match &mut self.state {
            State::Staged { vevs, .. } => {
                *vevs = None;
                Ok(())
            }
            State::Frozen { .. } => Err(Error::Frozen { field: "vevs" }),
        }
    }

    /// Current correlator table
    ///
    /// # Errors
    /// Returns [`Error::MissingData`] if never set, or [`Error::NotATable`] if
    /// the staged value is not a record batch
    pub fn correlators(&self) -> Result<&RecordBatch> {
        match &self.state {
            State::Staged { correlators, .. } => correlators
                .as_ref()
                .ok_or_else(|| Error::MissingData("Correlators are not set for this instance.".into()))?
                .table("correlators"),
            State::Frozen { correlators, .. } => Ok(correlators.batch()),
        }
    }

    /// Current VEV table
    ///
    /// # Errors
    /// Returns [`Error::MissingData`] if never set, or [`Error::NotATable`] if
    /// the staged value is not a record batch
    pub fn vevs(&self) -> Result<&RecordBatch> {
        let missing = || Error::MissingData("Vevs is not set for this instance.".into());
        match &self.state {
            State::Staged { vevs, .. } => vevs.as_ref().ok_or_else(missing)?.table("vevs"),
            State::Frozen { vevs, .. } => vevs.as_ref().map(VevTable::batch).ok_or_else(missing),
        }
    }

    /// Validate the staged data and freeze the ensemble
    ///
    /// On failure the ensemble stays unfrozen with its staged data untouched.
    /// Freezing a frozen ensemble is a no-op.
    ///
    /// # Errors
    /// Returns the first violation found:
    /// - [`Error::MissingData`] if no correlators were staged
    /// - [`Error::NotATable`] if a staged value is not a record batch
    /// - [`Error::Schema`] if a table breaks its schema
    /// - [`Error::DataInconsistency`] if correlators and VEVs disagree
    /// - [`Error::NotDense`] if the density check is enabled and fails
    pub fn freeze(&mut self) -> Result<&mut Self> {
        let State::Staged { correlators, vevs } = &self.state else {
            debug!(filename = %self.filename, "ensemble already frozen");
            return Ok(self);
        };

        let correlators = correlators
            .as_ref()
            .ok_or_else(|| Error::MissingData("Correlators are not set for this instance.".into()))?
            .table("correlators")?
            .clone();
        let vevs = vevs
            .as_ref()
            .map(|staged| staged.table("vevs").cloned())
            .transpose()?;

        let correlators = CorrelatorTable::try_new(correlators)?;
        let vevs = vevs.map(VevTable::try_new).transpose()?;
        if let Some(vevs) = &vevs {
            cross_validate(correlators.batch(), vevs.batch())?;
        }

        if self.config.check_density {
            tables::check_correlator_density(correlators.batch())?;
            if let Some(vevs) = &vevs {
                let (samples, _, internals) = tables::correlator_extents(correlators.batch())?;
                tables::check_vev_density(vevs.batch(), samples, internals)?;
            }
        }

        info!(
            filename = %self.filename,
            ensemble_name = %self.config.ensemble_name,
            rows = correlators.batch().num_rows(),
            has_vevs = vevs.is_some(),
            "ensemble frozen"
        );
        self.state = State::Frozen { correlators, vevs };
        Ok(self)
    }

    /// Number of time slices: the largest `Time`
    ///
    /// # Errors
    /// Returns error if the correlator table is unavailable or malformed
    pub fn nt(&self) -> Result<usize> {
        tables::max_index(self.correlators()?, TIME)
    }

    /// Size of the internal index space: the largest `Internal1`
    ///
    /// For string labels this is the number of distinct labels.
    ///
    /// # Errors
    /// Returns error if the correlator table is unavailable or malformed
    pub fn num_internal(&self) -> Result<usize> {
        tables::label_extent(self.correlators()?, INTERNAL1)
    }

    /// Number of Monte Carlo samples: the largest `MC_Time`
    ///
    /// # Errors
    /// Returns error if the correlator table is unavailable or malformed
    pub fn num_samples(&self) -> Result<usize> {
        tables::max_index(self.correlators()?, MC_TIME)
    }

    /// Correlators as a dense `[num_samples, nt, num_internal, num_internal]` array
    ///
    /// Rows are sorted by (MC_Time, Time, Internal1, Internal2) first, so the
    /// result does not depend on row order.
    ///
    /// # Errors
    /// Returns error if the table is unavailable, malformed, or its row count
    /// does not fill the derived extents
    pub fn to_dense(&self) -> Result<DenseArray<f64>> {
        tables::correlator_array(self.correlators()?)
    }

    /// VEVs as a dense `[num_samples, num_internal]` array
    ///
    /// # Errors
    /// Returns error if either table is unavailable, malformed, or the VEV row
    /// count does not fill the derived extents
    pub fn to_dense_vevs(&self) -> Result<DenseArray<f64>> {
        tables::vev_array(self.vevs()?, self.num_samples()?, self.num_internal()?)
    }

    /// Correlator matrix of observables, optionally VEV-subtracted
    ///
    /// With `subtract`, the outer product of the VEV observables with
    /// themselves, divided by `nt²`, is subtracted from every time slice.
    ///
    /// # Errors
    /// Returns [`Error::MissingData`] if `subtract` is requested without VEVs,
    /// or any error from reshaping and observable construction
    #[allow(clippy::cast_precision_loss)]
    pub fn to_corr(&self, subtract: bool) -> Result<Corr> {
        if subtract && !self.has_vevs() {
            return Err(Error::MissingData(
                "Can't subtract vevs that have not been read.".into(),
            ));
        }

        let name = self.ensemble_name();
        let correlators = to_obs_array(&self.to_dense()?, name)?;
        let content = if subtract {
            let vevs = to_obs_array(&self.to_dense_vevs()?, name)?;
            let nt = self.nt()? as f64;
            let disconnected = outer(&vevs, &vevs)?.map(|o| o.div_scalar(nt * nt));
            subtract_trailing(&correlators, &disconnected)?
        } else {
            correlators
        };

        debug!(
            ensemble_name = name,
            subtract,
            shape = ?content.shape(),
            "built correlator observables"
        );
        Corr::new(content)
    }

    /// Serializable overview of the ensemble
    ///
    /// Extents that cannot be derived from the current data are `None`.
    #[must_use]
    pub fn summary(&self) -> EnsembleSummary {
        EnsembleSummary {
            filename: self.filename.clone(),
            ensemble_name: self.config.ensemble_name.clone(),
            frozen: self.is_frozen(),
            has_vevs: self.has_vevs(),
            nt: self.nt().ok(),
            num_internal: self.num_internal().ok(),
            num_samples: self.num_samples().ok(),
            metadata: self.metadata.clone(),
        }
    }
}

impl std::fmt::Debug for CorrelatorEnsemble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelatorEnsemble")
            .field("filename", &self.filename)
            .field("ensemble_name", &self.config.ensemble_name)
            .field("frozen", &self.is_frozen())
            .field("has_vevs", &self.has_vevs())
            .finish_non_exhaustive()
    }
}

/// Overview of an ensemble for logs and reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleSummary {
    /// Provenance of the data
    pub filename: String,
    /// Observable label
    pub ensemble_name: String,
    /// Whether the ensemble is frozen
    pub frozen: bool,
    /// Whether VEV data is present
    pub has_vevs: bool,
    /// Number of time slices
    pub nt: Option<usize>,
    /// Size of the internal index space
    pub num_internal: Option<usize>,
    /// Number of Monte Carlo samples
    pub num_samples: Option<usize>,
    /// Annotations
    pub metadata: Metadata,
}

/// Builder for `CorrelatorEnsemble`
#[derive(Debug)]
pub struct CorrelatorEnsembleBuilder {
    filename: String,
    config: EnsembleConfig,
    metadata: Metadata,
    correlators: Option<StagedValue>,
    vevs: Option<StagedValue>,
}

impl CorrelatorEnsembleBuilder {
    /// Create a builder with the default configuration
    #[must_use]
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            config: EnsembleConfig::default(),
            metadata: Metadata::new(),
            correlators: None,
            vevs: None,
        }
    }

    /// Set the ensemble name
    #[must_use]
    pub fn ensemble_name(mut self, name: impl Into<String>) -> Self {
        self.config.ensemble_name = name.into();
        self
    }

    /// Replace the whole configuration
    #[must_use]
    pub fn config(mut self, config: EnsembleConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the annotations
    #[must_use]
    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Stage correlator data
    #[must_use]
    pub fn correlators<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.correlators = Some(StagedValue::new(value));
        self
    }

    /// Stage VEV data
    #[must_use]
    pub fn vevs<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.vevs = Some(StagedValue::new(value));
        self
    }

    /// Build the unfrozen ensemble
    #[must_use]
    pub fn build(self) -> CorrelatorEnsemble {
        CorrelatorEnsemble {
            filename: self.filename,
            config: self.config,
            metadata: self.metadata,
            state: State::Staged {
                correlators: self.correlators,
                vevs: self.vevs,
            },
        }
    }
}

/// Freeze independent ensembles in parallel, one result per ensemble
#[cfg(feature = "rayon")]
pub fn freeze_all(ensembles: &mut [CorrelatorEnsemble]) -> Vec<Result<()>> {
    use rayon::prelude::*;
    ensembles
        .par_iter_mut()
        .map(|ensemble| ensemble.freeze().map(|_| ()))
        .collect()
}

/// Freeze independent ensembles, one result per ensemble
#[cfg(not(feature = "rayon"))]
pub fn freeze_all(ensembles: &mut [CorrelatorEnsemble]) -> Vec<Result<()>> {
    ensembles
        .iter_mut()
        .map(|ensemble| ensemble.freeze().map(|_| ()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stores_filename() {
        assert_eq!(CorrelatorEnsemble::new("filename").filename(), "filename");
    }

    #[test]
    fn test_defaults_to_glue_bins() {
        assert_eq!(CorrelatorEnsemble::new("f").ensemble_name(), "glue_bins");
    }

    #[test]
    fn test_allows_garbage_before_freezing() {
        let mut ensemble = CorrelatorEnsemble::new("filename");
        ensemble
            .set_correlators("garbage that will be forbidden later")
            .unwrap();
        ensemble.set_vevs(42_i64).unwrap();
        assert!(ensemble.has_vevs());
        assert!(matches!(
            ensemble.correlators(),
            Err(Error::NotATable {
                field: "correlators",
                ..
            })
        ));
    }

    #[test]
    fn test_freeze_without_correlators_fails() {
        let mut ensemble = CorrelatorEnsemble::new("filename");
        assert!(matches!(ensemble.freeze(), Err(Error::MissingData(_))));
        assert!(!ensemble.is_frozen());
    }

    #[test]
    fn test_vevs_missing_is_reported() {
        let ensemble = CorrelatorEnsemble::new("filename");
        assert!(!ensemble.has_vevs());
        let err = ensemble.vevs().unwrap_err();
        assert!(err.to_string().contains("Vevs is not set"));
    }

    #[test]
    fn test_metadata_conflicts_are_rejected() {
        let mut ensemble = CorrelatorEnsemble::new("filename");
        ensemble.insert_metadata("NT", 16).unwrap();
        assert!(matches!(
            ensemble.insert_metadata("NT", 16),
            Err(Error::MetadataConflict(key)) if key == "NT"
        ));

        let mut more = Metadata::new();
        more.insert("beta".into(), serde_json::json!(5.7));
        more.insert("NT".into(), serde_json::json!("conflict"));
        assert!(ensemble.merge_metadata(more).is_err());
        assert!(!ensemble.metadata().contains_key("beta"));
    }

    #[test]
    fn test_summary_of_empty_ensemble() {
        let summary = CorrelatorEnsemble::builder("f")
            .ensemble_name("other")
            .build()
            .summary();
        assert_eq!(summary.ensemble_name, "other");
        assert!(!summary.frozen);
        assert_eq!(summary.nt, None);
    }
}
