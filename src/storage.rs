//! Table storage (Arrow/Parquet)
//!
//! Correlator and VEV tables can be persisted as Parquet files. A file may
//! hold several row groups; [`TableStore`] collects them as record batches
//! and concatenates them into the single table an ensemble works on.

use crate::{Error, Result};
use arrow::compute;
use arrow::record_batch::RecordBatch;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Rows per record batch when reading Parquet
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Append-only collection of record batches sharing one schema
#[derive(Debug, Default)]
pub struct TableStore {
    batches: Vec<RecordBatch>,
}

impl TableStore {
    /// Create a store from existing batches
    #[must_use]
    pub fn new(batches: Vec<RecordBatch>) -> Self {
        Self { batches }
    }

    /// Load a table from a Parquet file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_parquet_with_batch_size(path, DEFAULT_BATCH_SIZE)
    }

    /// Load a table from a Parquet file, reading at most `batch_size` rows
    /// per record batch
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed, or its batches
    /// disagree on the schema
    pub fn load_parquet_with_batch_size<P: AsRef<Path>>(path: P, batch_size: usize) -> Result<Self> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let file = File::open(path.as_ref()).map_err(|e| {
            Error::StorageError(format!("Failed to open Parquet file: {e}"))
        })?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| {
            Error::StorageError(format!("Failed to parse Parquet file: {e}"))
        })?;
        let row_groups = builder.metadata().num_row_groups();

        let reader = builder.with_batch_size(batch_size).build().map_err(|e| {
            Error::StorageError(format!("Failed to create Parquet reader: {e}"))
        })?;

        let mut store = Self::default();
        for batch in reader {
            let batch = batch.map_err(|e| {
                Error::StorageError(format!("Failed to read record batch: {e}"))
            })?;
            store.append_batch(batch)?;
        }

        debug!(
            path = %path.as_ref().display(),
            row_groups,
            batches = store.batches.len(),
            "loaded Parquet table"
        );
        Ok(store)
    }

    /// All record batches
    #[must_use]
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Total number of rows across batches
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Append a batch
    ///
    /// # Errors
    /// Returns error if the batch schema doesn't match existing batches
    pub fn append_batch(&mut self, batch: RecordBatch) -> Result<()> {
        if let Some(first) = self.batches.first() {
            let existing_schema = first.schema();
            if batch.schema() != existing_schema {
                return Err(Error::StorageError(format!(
                    "Schema mismatch: expected {:?}, got {:?}",
                    existing_schema,
                    batch.schema()
                )));
            }
        }

        self.batches.push(batch);
        Ok(())
    }

    /// Concatenate all batches into one table
    ///
    /// # Errors
    /// Returns error if the store is empty or batches cannot be combined
    pub fn to_table(&self) -> Result<RecordBatch> {
        let first = self
            .batches
            .first()
            .ok_or_else(|| Error::MissingData("No data in storage".to_string()))?;
        if self.batches.len() == 1 {
            return Ok(first.clone());
        }

        compute::concat_batches(&first.schema(), &self.batches)
            .map_err(|e| Error::StorageError(format!("Failed to combine batches: {e}")))
    }
}

/// Write a table to a Parquet file
///
/// # Errors
/// Returns error if the file cannot be created or written
pub fn write_parquet<P: AsRef<Path>>(path: P, table: &RecordBatch) -> Result<()> {
    use parquet::arrow::ArrowWriter;

    let file = File::create(path.as_ref())?;
    let mut writer = ArrowWriter::try_new(file, table.schema(), None)
        .map_err(|e| Error::StorageError(format!("Failed to create Parquet writer: {e}")))?;
    writer
        .write(table)
        .map_err(|e| Error::StorageError(format!("Failed to write record batch: {e}")))?;
    writer
        .close()
        .map_err(|e| Error::StorageError(format!("Failed to finish Parquet file: {e}")))?;
    Ok(())
}
