//! Batch ingestion and schema normalization.
//!
//! Loads every requested batch, resolves the source definition's field
//! mapping against the batch's columns, renames rows into the canonical
//! schema and tags them with their season. Any batch failure aborts the
//! whole ingestion.

use std::sync::Arc;

use rayon::prelude::*;
use taxi_map_source::progress::ProgressCallback;
use taxi_map_source::source_def::{CanonicalField, SourceDefinition};
use taxi_map_source::{BatchSource, SourceError};
use taxi_map_trip_models::TripRecord;
use thiserror::Error;

use crate::config::BatchRequest;

/// Fatal ingestion failures. No partial dataset is produced.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// No batches were requested.
    #[error("No batches requested")]
    NoBatches,

    /// A requested batch does not exist in the source.
    #[error("Batch '{batch}' not found in source '{source_label}'")]
    MissingBatch {
        batch: String,
        source_label: String,
    },

    /// A batch exists but holds no rows.
    #[error("Batch '{batch}' is empty")]
    EmptyBatch { batch: String },

    /// A batch lacks a column for a required field.
    #[error("Batch '{batch}' has no column for '{field}' (tried {candidates:?})")]
    MissingField {
        batch: String,
        field: CanonicalField,
        candidates: Vec<String>,
    },

    /// Reading or parsing a batch failed.
    #[error("Failed to read batch '{batch}': {source}")]
    Source {
        batch: String,
        #[source]
        source: SourceError,
    },
}

fn ingest_one(
    source: &dyn BatchSource,
    definition: &SourceDefinition,
    request: &BatchRequest,
) -> Result<Vec<TripRecord>, IngestionError> {
    let batch_id = &request.batch_id;

    let batch = source.load(batch_id).map_err(|e| match e {
        SourceError::MissingBatch { batch } => IngestionError::MissingBatch {
            batch,
            source_label: source.label().to_string(),
        },
        other => IngestionError::Source {
            batch: batch_id.clone(),
            source: other,
        },
    })?;

    if batch.is_empty() {
        return Err(IngestionError::EmptyBatch {
            batch: batch_id.clone(),
        });
    }

    let projection =
        definition
            .fields
            .resolve(&batch.columns)
            .map_err(|e| IngestionError::MissingField {
                batch: batch_id.clone(),
                field: e.field,
                candidates: e.candidates,
            })?;

    log::debug!(
        "[{}] Batch {batch_id}: {} rows, season '{}'",
        source.label(),
        batch.len(),
        request.season
    );

    Ok(projection.normalize_batch(&batch.records, batch_id, &request.season))
}

/// Loads and normalizes every requested batch.
///
/// Batches load in parallel; the output concatenates them in request order.
///
/// # Errors
///
/// Returns [`IngestionError`] if no batch is requested or if any batch is
/// missing, empty, lacks a required field, or cannot be read.
pub fn ingest(
    source: &dyn BatchSource,
    definition: &SourceDefinition,
    requests: &[BatchRequest],
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Vec<TripRecord>, IngestionError> {
    if requests.is_empty() {
        return Err(IngestionError::NoBatches);
    }

    progress.set_total(requests.len() as u64);

    let batches: Vec<Vec<TripRecord>> = requests
        .par_iter()
        .map(|request| {
            let result = ingest_one(source, definition, request);
            progress.inc(1);
            result
        })
        .collect::<Result<_, _>>()?;

    let records: Vec<TripRecord> = batches.into_iter().flatten().collect();

    progress.finish(format!(
        "Ingested {} records from {} batches",
        records.len(),
        requests.len()
    ));

    Ok(records)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use taxi_map_source::MemoryBatchSource;
    use taxi_map_source::progress::null_progress;
    use taxi_map_source::registry::{DEFAULT_SOURCE, find_source};

    use super::*;

    fn row(pickup: &str) -> serde_json::Value {
        json!({
            "tpep_pickup_datetime": pickup,
            "tpep_dropoff_datetime": "2015-01-15 19:23:42",
            "passenger_count": "1",
            "trip_distance": "1.59",
            "pickup_longitude": "-73.99",
            "pickup_latitude": "40.75",
            "RateCodeID": "1",
            "dropoff_longitude": "-73.97",
            "dropoff_latitude": "40.75",
            "payment_type": "1",
            "tip_amount": "3.25",
            "total_amount": "17.05"
        })
    }

    fn renamed(value: serde_json::Value, from: &str, to: &str) -> serde_json::Value {
        let mut obj = value.as_object().cloned().unwrap();
        let v = obj.remove(from).unwrap();
        obj.insert(to.to_string(), v);
        serde_json::Value::Object(obj)
    }

    fn definition() -> SourceDefinition {
        find_source(DEFAULT_SOURCE).unwrap()
    }

    #[test]
    fn concatenates_batches_in_request_order() {
        let source = MemoryBatchSource::new()
            .with_batch(
                "2015-07",
                None,
                vec![renamed(row("2015-07-01 10:00:00"), "RateCodeID", "RatecodeID")],
            )
            .with_batch(
                "2015-01",
                None,
                vec![row("2015-01-01 10:00:00"), row("2015-01-02 10:00:00")],
            );

        let records = ingest(
            &source,
            &definition(),
            &[
                BatchRequest::new("2015-07", "summer"),
                BatchRequest::new("2015-01", "winter"),
            ],
            &null_progress(),
        )
        .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].season, "summer");
        assert_eq!(records[0].rate_code, Some(1));
        assert_eq!(records[1].batch_id, "2015-01");
        assert_eq!(
            records[2].pickup_datetime.as_deref(),
            Some("2015-01-02 10:00:00")
        );
    }

    #[test]
    fn missing_batch_is_fatal() {
        let source = MemoryBatchSource::new().with_batch("2015-01", None, vec![row("x")]);
        let err = ingest(
            &source,
            &definition(),
            &[
                BatchRequest::new("2015-01", "winter"),
                BatchRequest::new("2015-02", "winter"),
            ],
            &null_progress(),
        )
        .unwrap_err();
        assert!(
            matches!(&err, IngestionError::MissingBatch { batch, .. } if batch == "2015-02"),
            "{err}"
        );
    }

    #[test]
    fn empty_batch_is_fatal() {
        let columns = row("x").as_object().unwrap().keys().cloned().collect();
        let source = MemoryBatchSource::new().with_batch("2015-01", Some(columns), vec![]);
        let err = ingest(
            &source,
            &definition(),
            &[BatchRequest::new("2015-01", "winter")],
            &null_progress(),
        )
        .unwrap_err();
        assert!(matches!(err, IngestionError::EmptyBatch { .. }), "{err}");
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let mut obj = row("x").as_object().cloned().unwrap();
        obj.remove("tip_amount");
        let source = MemoryBatchSource::new().with_batch(
            "2015-01",
            None,
            vec![serde_json::Value::Object(obj)],
        );
        let err = ingest(
            &source,
            &definition(),
            &[BatchRequest::new("2015-01", "winter")],
            &null_progress(),
        )
        .unwrap_err();
        assert!(
            matches!(
                &err,
                IngestionError::MissingField {
                    field: CanonicalField::TipAmount,
                    ..
                }
            ),
            "{err}"
        );
    }

    #[test]
    fn no_requests_is_an_error() {
        let err = ingest(
            &MemoryBatchSource::new(),
            &definition(),
            &[],
            &null_progress(),
        )
        .unwrap_err();
        assert!(matches!(err, IngestionError::NoBatches));
    }
}
