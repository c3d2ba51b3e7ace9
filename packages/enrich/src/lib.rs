#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Taxi trip enrichment pipeline.
//!
//! Turns raw trip batches plus taxi zone polygons into an analysis-ready
//! table. Stages run strictly in order:
//!
//! 1. [`ingest`]: load batches and normalize them into the canonical schema
//! 2. [`temporal`]: parse timestamps and derive duration, weekday, hour
//! 3. [`validate`]: drop records failing any inclusion bound
//! 4. [`assign`]: resolve pickup and dropoff zones, drop unresolved trips
//! 5. [`classify`]: flag airport trips
//!
//! Only ingestion failures abort a run. Every other per-record outcome is
//! counted in the [`report::PipelineReport`].

pub mod assign;
pub mod classify;
pub mod config;
pub mod ingest;
pub mod report;
pub mod table;
pub mod temporal;
pub mod validate;

use std::sync::Arc;

use taxi_map_source::BatchSource;
use taxi_map_source::progress::{ProgressCallback, null_progress};
use taxi_map_source::source_def::SourceDefinition;
use taxi_map_spatial::GeometryIndex;
use taxi_map_trip_models::TripRecord;
use thiserror::Error;

use crate::config::{BatchRequest, PipelineConfig};
use crate::report::{PipelineReport, Stage};
use crate::table::EnrichedTable;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// Loading batches failed.
    #[error(transparent)]
    Ingestion(#[from] ingest::IngestionError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

/// The result of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub table: EnrichedTable,
    pub report: PipelineReport,
}

/// Runs the enrichment stages with a fixed configuration and zone index.
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    index: &'a GeometryIndex,
    ingest_progress: Arc<dyn ProgressCallback>,
    stage_progress: Arc<dyn ProgressCallback>,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(config: &'a PipelineConfig, index: &'a GeometryIndex) -> Self {
        Self {
            config,
            index,
            ingest_progress: null_progress(),
            stage_progress: null_progress(),
        }
    }

    /// Reports batch loading progress (one unit per batch).
    #[must_use]
    pub fn with_ingest_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.ingest_progress = progress;
        self
    }

    /// Reports stage progress (one unit per stage).
    #[must_use]
    pub fn with_stage_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.stage_progress = progress;
        self
    }

    /// Ingests the config's season batches and runs every stage.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError`] if the configuration is invalid or ingestion
    /// fails.
    pub fn run(
        &self,
        source: &dyn BatchSource,
        definition: &SourceDefinition,
    ) -> Result<PipelineOutput, EnrichError> {
        self.run_requests(source, definition, &self.config.batch_requests())
    }

    /// Ingests the given batches and runs every stage.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError`] if the configuration is invalid or ingestion
    /// fails.
    pub fn run_requests(
        &self,
        source: &dyn BatchSource,
        definition: &SourceDefinition,
        requests: &[BatchRequest],
    ) -> Result<PipelineOutput, EnrichError> {
        self.config.validate()?;

        self.stage_progress.set_total(Stage::all().len() as u64);
        self.stage_progress.set_message(Stage::Ingestion.to_string());

        log::info!(
            "Ingesting {} batches from source '{}'",
            requests.len(),
            definition.id()
        );
        let records = ingest::ingest(source, definition, requests, &self.ingest_progress)?;
        self.stage_progress.inc(1);

        let ingested = records.len();
        let mut output = self.enrich_records(records);
        output.report.stages.insert(
            0,
            report::StageReport {
                stage: Stage::Ingestion,
                entered: ingested,
                survived: ingested,
            },
        );

        output.report.log();
        Ok(output)
    }

    /// Runs every stage after ingestion on already-normalized records.
    ///
    /// Pure with respect to its inputs: the same records, configuration and
    /// zones always produce the same table.
    #[must_use]
    pub fn enrich_records(&self, mut records: Vec<TripRecord>) -> PipelineOutput {
        let mut report = PipelineReport::default();

        self.stage_progress.set_message(Stage::Temporal.to_string());
        let entered = records.len();
        report.timestamp_parse_failures =
            temporal::derive_all(&mut records, &self.config.day_period);
        report.push(Stage::Temporal, entered, records.len());
        self.stage_progress.inc(1);

        self.stage_progress.set_message(Stage::Validation.to_string());
        let entered = records.len();
        let (records, rejections) = validate::validate(records, &self.config.bounds);
        report.rejections = rejections;
        report.push(Stage::Validation, entered, records.len());
        self.stage_progress.inc(1);

        self.stage_progress.set_message(Stage::Assignment.to_string());
        let entered = records.len();
        let (mut records, unresolved) = assign::assign_zones(records, self.index);
        report.unresolved = unresolved;
        report.push(Stage::Assignment, entered, records.len());
        self.stage_progress.inc(1);

        self.stage_progress.set_message(Stage::Classification.to_string());
        let entered = records.len();
        report.airport_trips =
            classify::classify(&mut records, self.index, &self.config.airport_rate_codes);
        let table = EnrichedTable::from_records(records);
        report.push(Stage::Classification, entered, table.len());
        self.stage_progress.inc(1);

        self.stage_progress
            .finish(format!("Enriched {} trips", table.len()));

        PipelineOutput { table, report }
    }
}
