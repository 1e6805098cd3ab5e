//! Error types for glue-analysis
//!
//! Every violation is raised where it is detected; nothing is retried or
//! silently corrected.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// glue-analysis error types
#[derive(Error, Debug)]
pub enum Error {
    /// A table does not conform to its schema
    #[error("Schema violation in {schema} ({rule}): {description}")]
    Schema {
        /// Name of the schema that was checked
        schema: &'static str,
        /// Column or check that failed
        rule: String,
        /// Human-readable description of the violated rule
        description: String,
    },

    /// Correlator and VEV tables disagree on their index spaces
    #[error("Data inconsistency between correlators and VEVs: {0}")]
    DataInconsistency(String),

    /// Staged data is not a record batch
    #[error("{field} data is expected to be an Arrow RecordBatch but {found} was found")]
    NotATable {
        /// Which table was staged (`correlators` or `vevs`)
        field: &'static str,
        /// Type name of the staged value
        found: &'static str,
    },

    /// Mutation attempted on a frozen ensemble
    #[error("This instance is frozen. You are not allowed to modify {field} anymore.")]
    Frozen {
        /// Which table the caller tried to replace
        field: &'static str,
    },

    /// Requested data was never provided
    #[error("Missing data: {0}")]
    MissingData(String),

    /// Index columns do not cover a dense 1-based grid
    #[error("Table is not densely indexed: {0}")]
    NotDense(String),

    /// Array extents do not fit the requested operation
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Resampled observables need a minimum number of samples
    #[error("Samples have to have at least {required} entries, found {found}")]
    TooFewSamples {
        /// Number of samples supplied
        found: usize,
        /// Minimum accepted
        required: usize,
    },

    /// Arithmetic between observables with incompatible sampling
    #[error("Incompatible ensembles: {0}")]
    IncompatibleEnsembles(String),

    /// A metadata key was specified twice
    #[error("Metadata key specified more than once: {0}")]
    MetadataConflict(String),

    /// Storage error (Parquet/Arrow)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow/Parquet error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl Error {
    /// Schema violation helper used by the declarative validators
    pub(crate) fn schema(
        schema: &'static str,
        rule: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::Schema {
            schema,
            rule: rule.into(),
            description: description.into(),
        }
    }
}
