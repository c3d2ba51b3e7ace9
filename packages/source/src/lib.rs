#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Taxi trip batch sources and record normalization.
//!
//! A [`BatchSource`] hands back one raw batch at a time as header names plus
//! string-keyed JSON records. A [`source_def::SourceDefinition`] maps those
//! source columns onto the canonical trip schema, so the same generic code
//! handles every export layout.

pub mod csv_batch;
pub mod parsing;
pub mod progress;
pub mod registry;
pub mod source_def;

use std::collections::BTreeMap;

/// Errors that can occur while reading batches.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    /// No batch with this id exists in the source.
    #[error("Batch '{batch}' not found")]
    MissingBatch {
        /// The requested batch id.
        batch: String,
    },

    /// A source definition is malformed.
    #[error("Invalid source definition: {message}")]
    Definition {
        /// Description of what went wrong.
        message: String,
    },
}

/// One raw batch as read from a source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBatch {
    /// Batch identifier (e.g. `"2015-01"`).
    pub id: String,
    /// Column names in source order.
    pub columns: Vec<String>,
    /// One JSON object per row, keyed by column name.
    pub records: Vec<serde_json::Value>,
}

impl RawBatch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Trait implemented by everything that can supply raw trip batches.
///
/// Implementations must be `Send + Sync` so that independent batches can be
/// loaded in parallel.
pub trait BatchSource: Send + Sync {
    /// Returns a short label for log messages.
    fn label(&self) -> &str;

    /// Loads one batch.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingBatch`] if the batch does not exist, or
    /// another [`SourceError`] if reading or parsing fails.
    fn load(&self, batch_id: &str) -> Result<RawBatch, SourceError>;
}

/// An in-memory [`BatchSource`], mostly useful for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryBatchSource {
    batches: BTreeMap<String, RawBatch>,
}

impl MemoryBatchSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a batch, deriving its columns from the first record's keys
    /// unless `columns` is given.
    #[must_use]
    pub fn with_batch(
        mut self,
        batch_id: &str,
        columns: Option<Vec<String>>,
        records: Vec<serde_json::Value>,
    ) -> Self {
        let columns = columns.unwrap_or_else(|| {
            records
                .first()
                .and_then(serde_json::Value::as_object)
                .map(|obj| obj.keys().cloned().collect())
                .unwrap_or_default()
        });

        self.batches.insert(
            batch_id.to_string(),
            RawBatch {
                id: batch_id.to_string(),
                columns,
                records,
            },
        );
        self
    }
}

impl BatchSource for MemoryBatchSource {
    fn label(&self) -> &str {
        "memory"
    }

    fn load(&self, batch_id: &str) -> Result<RawBatch, SourceError> {
        self.batches
            .get(batch_id)
            .cloned()
            .ok_or_else(|| SourceError::MissingBatch {
                batch: batch_id.to_string(),
            })
    }
}
