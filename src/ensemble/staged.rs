//! Unvalidated values held by an ensemble before it is frozen

use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use std::any::{self, Any};
use std::fmt;

/// A value staged as correlator or VEV data
///
/// Anything can be staged; whether it is a table is only checked when the
/// ensemble is frozen.
pub struct StagedValue {
    value: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl StagedValue {
    /// Stage any value
    #[must_use]
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_name: any::type_name::<T>(),
        }
    }

    /// Type name of the staged value
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The staged value, if it is a record batch
    #[must_use]
    pub fn as_table(&self) -> Option<&RecordBatch> {
        self.value.downcast_ref::<RecordBatch>()
    }

    /// The staged value as a record batch
    ///
    /// # Errors
    /// Returns [`Error::NotATable`] naming `field` and the staged type
    pub fn table(&self, field: &'static str) -> Result<&RecordBatch> {
        self.as_table().ok_or(Error::NotATable {
            field,
            found: self.type_name,
        })
    }
}

impl fmt::Debug for StagedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagedValue")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}
