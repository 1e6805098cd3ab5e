//! # glue-analysis: Gluonic Correlator Ensembles
//!
//! glue-analysis takes lattice correlator measurements held as Arrow tables,
//! validates them against strict schemas, reshapes them into dense arrays and
//! turns them into resampled observables for error propagation.
//!
//! ## Pipeline
//!
//! ```text
//! tables ──freeze()──> schema validation ──> cross-validation ──> density check
//!        ──to_dense()──> [sample, time, internal1, internal2]
//!        ──to_corr()───> Corr of observables (optionally VEV-subtracted)
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use arrow::array::{Float64Array, Int64Array, RecordBatch};
//! use arrow::datatypes::{DataType, Field, Schema};
//! use glue_analysis::CorrelatorEnsemble;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // 5 samples, 1 time slice, a single internal label
//! let schema = Arc::new(Schema::new(vec![
//!     Field::new("MC_Time", DataType::Int64, false),
//!     Field::new("Time", DataType::Int64, false),
//!     Field::new("Internal1", DataType::Int64, false),
//!     Field::new("Internal2", DataType::Int64, false),
//!     Field::new("Correlation", DataType::Float64, false),
//! ]));
//! let correlators = RecordBatch::try_new(
//!     schema,
//!     vec![
//!         Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5])),
//!         Arc::new(Int64Array::from(vec![1; 5])),
//!         Arc::new(Int64Array::from(vec![1; 5])),
//!         Arc::new(Int64Array::from(vec![1; 5])),
//!         Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0, 4.0, 5.0])),
//!     ],
//! )?;
//!
//! let mut ensemble = CorrelatorEnsemble::new("run_b5.7");
//! ensemble.set_correlators(correlators)?;
//! ensemble.freeze()?;
//!
//! let corr = ensemble.to_corr(false)?;
//! assert_eq!(corr.item(0, 0)?.plottable()?.y, vec![3.0]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod cross_validate;
pub mod dense;
pub mod ensemble;
pub mod error;
pub mod observable;
pub mod schema;
pub mod storage;
pub mod table;

pub use config::{EnsembleConfig, DEFAULT_ENSEMBLE_NAME};
pub use dense::DenseArray;
pub use ensemble::{freeze_all, CorrelatorEnsemble, CorrelatorEnsembleBuilder, EnsembleSummary};
pub use error::{Error, Result};
pub use observable::{Corr, Obs};
