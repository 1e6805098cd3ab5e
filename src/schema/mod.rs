//! Declarative table schemas
//!
//! A [`TableSchema`] lists the columns a record batch must carry, the element
//! kind of each column and a set of named row-level [`Check`]s. Validation:
//! - All required columns are present
//! - Column element kinds match (no implicit coercion from other kinds)
//! - Columns contain no null entries
//! - Paired label columns share one label kind
//! - Every check holds
//!
//! Validation never mutates the batch and stops at the first violation.

mod definitions;

pub use definitions::{correlator_schema, vev_schema, CORRELATOR_KEY, VEV_KEY};

use crate::table::{same_label_kind, ColumnKind};
use crate::{Error, Result};
use arrow::array::Array;
use arrow::record_batch::RecordBatch;
use tracing::debug;

/// Column names shared by correlator and VEV tables
pub mod columns {
    /// Monte Carlo sample index
    pub const MC_TIME: &str = "MC_Time";
    /// Euclidean time coordinate
    pub const TIME: &str = "Time";
    /// Row label of the correlation matrix
    pub const INTERNAL1: &str = "Internal1";
    /// Column label of the correlation matrix
    pub const INTERNAL2: &str = "Internal2";
    /// Label of a VEV record
    pub const INTERNAL: &str = "Internal";
    /// Measured correlator value
    pub const CORRELATION: &str = "Correlation";
    /// Measured vacuum expectation value
    pub const VAC_EXP: &str = "Vac_exp";
}

/// A required column
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    /// Column name
    pub name: &'static str,
    /// Accepted element kind
    pub kind: ColumnKind,
    /// What the column holds
    pub description: &'static str,
}

/// Row-level predicate over a whole table
pub type CheckFn = fn(&RecordBatch) -> Result<bool>;

/// A named table-level check
#[derive(Clone, Copy)]
pub struct Check {
    /// Check name reported on failure
    pub name: &'static str,
    /// Rule description reported on failure
    pub description: &'static str,
    predicate: CheckFn,
}

impl Check {
    /// Create a named check
    #[must_use]
    pub const fn new(name: &'static str, description: &'static str, predicate: CheckFn) -> Self {
        Self {
            name,
            description,
            predicate,
        }
    }

    /// Evaluate the check against a batch
    ///
    /// # Errors
    /// Returns error if the predicate cannot read the columns it needs
    pub fn holds(&self, batch: &RecordBatch) -> Result<bool> {
        (self.predicate)(batch)
    }
}

impl std::fmt::Debug for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Check")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Schema for one kind of table
#[derive(Debug, Clone)]
pub struct TableSchema {
    name: &'static str,
    columns: Vec<ColumnSpec>,
    same_kind: Vec<(&'static str, &'static str)>,
    checks: Vec<Check>,
}

impl TableSchema {
    /// Create a schema without checks
    #[must_use]
    pub fn new(name: &'static str, columns: Vec<ColumnSpec>) -> Self {
        Self {
            name,
            columns,
            same_kind: Vec::new(),
            checks: Vec::new(),
        }
    }

    /// Require two label columns to share a label kind
    #[must_use]
    pub fn same_kind(mut self, a: &'static str, b: &'static str) -> Self {
        self.same_kind.push((a, b));
        self
    }

    /// Add a table-level check
    #[must_use]
    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Schema name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Required columns
    #[must_use]
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Table-level checks
    #[must_use]
    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// Validate a batch against this schema
    ///
    /// # Errors
    /// Returns [`Error::Schema`] naming the first column or check that fails
    pub fn validate(&self, batch: &RecordBatch) -> Result<()> {
        for spec in &self.columns {
            let array = batch.column_by_name(spec.name).ok_or_else(|| {
                Error::schema(
                    self.name,
                    spec.name,
                    format!("required column is missing ({})", spec.description),
                )
            })?;

            if !spec.kind.accepts(array.data_type()) {
                return Err(Error::schema(
                    self.name,
                    spec.name,
                    format!(
                        "expected {} column, found {:?}",
                        spec.kind,
                        array.data_type()
                    ),
                ));
            }

            if array.null_count() > 0 {
                return Err(Error::schema(
                    self.name,
                    spec.name,
                    format!("{} null entries found", array.null_count()),
                ));
            }
        }

        for &(a, b) in &self.same_kind {
            let (left, right) = (
                crate::table::column(batch, a)?.data_type(),
                crate::table::column(batch, b)?.data_type(),
            );
            if !same_label_kind(left, right) {
                return Err(Error::schema(
                    self.name,
                    b,
                    format!("{a} is {left:?} but {b} is {right:?}; both must be the same kind"),
                ));
            }
        }

        for check in &self.checks {
            if !check.holds(batch)? {
                return Err(Error::schema(self.name, check.name, check.description));
            }
        }

        debug!(
            schema = self.name,
            rows = batch.num_rows(),
            "table passed schema validation"
        );
        Ok(())
    }
}
