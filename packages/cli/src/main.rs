#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line runner for the taxi trip enrichment pipeline.
//!
//! Loads a zone boundary file, ingests the configured trip batches from a
//! data directory, and writes the enriched table as CSV. Log output is
//! routed through [`progress::init_logger`] so log lines and progress bars
//! share the terminal.

mod progress;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use taxi_map_enrich::Pipeline;
use taxi_map_enrich::config::{BatchRequest, PipelineConfig};
use taxi_map_source::csv_batch::CsvBatchSource;
use taxi_map_spatial::GeometryIndex;
use taxi_map_zone::registry::DEFAULT_ZONE_SOURCE;
use taxi_map_zone_models::ServiceCategory;

use crate::progress::{IndicatifProgress, init_logger};

#[derive(Parser)]
#[command(name = "taxi_map", about = "Taxi trip enrichment tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest trip batches, enrich them and write the result as CSV
    Run {
        /// Directory holding one trip file per batch
        #[arg(long)]
        data_dir: PathBuf,
        /// `GeoJSON` zone boundary file
        #[arg(long)]
        zones: PathBuf,
        /// Output CSV path for the enriched table
        #[arg(long)]
        output: PathBuf,
        /// TOML pipeline configuration. Built-in defaults are used if omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Batch to ingest as `season=batch` (repeatable). Overrides the
        /// config's seasons.
        #[arg(long = "batch", value_parser = parse_batch_request)]
        batches: Vec<BatchRequest>,
        /// Trip source identifier (see `sources`)
        #[arg(long, default_value = taxi_map_source::registry::DEFAULT_SOURCE)]
        source: String,
        /// Zone source identifier (see `zones`)
        #[arg(long, default_value = DEFAULT_ZONE_SOURCE)]
        zone_source: String,
        /// Write the per-stage report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
        /// Write per-pickup-zone aggregates as CSV to this path
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// List all configured trip sources
    Sources,
    /// List zone sources, or the zones in a boundary file
    Zones {
        /// `GeoJSON` zone boundary file to inspect
        #[arg(long)]
        file: Option<PathBuf>,
        /// Zone source identifier used to read the file
        #[arg(long, default_value = DEFAULT_ZONE_SOURCE)]
        zone_source: String,
    },
}

/// Parses a `season=batch` pair.
fn parse_batch_request(arg: &str) -> Result<BatchRequest, String> {
    let (season, batch) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected season=batch, got '{arg}'"))?;
    let (season, batch) = (season.trim(), batch.trim());
    if season.is_empty() || batch.is_empty() {
        return Err(format!("expected season=batch, got '{arg}'"));
    }
    Ok(BatchRequest::new(batch, season))
}

fn load_index(
    path: &Path,
    zone_source: &str,
) -> Result<GeometryIndex, Box<dyn std::error::Error>> {
    let definition = taxi_map_zone::registry::find_source(zone_source)
        .ok_or_else(|| format!("Unknown zone source: {zone_source}"))?;
    let zones = taxi_map_zone::load_zones_from_path(path, &definition)?;
    Ok(GeometryIndex::build(&zones, definition.crs))
}

#[allow(clippy::too_many_arguments)]
fn run(
    data_dir: PathBuf,
    zones: &Path,
    output: &Path,
    config: Option<&Path>,
    batches: Vec<BatchRequest>,
    source: &str,
    zone_source: &str,
    report_path: Option<&Path>,
    summary_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let multi = init_logger();
    let start = Instant::now();

    let config = match config {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };
    let requests = if batches.is_empty() {
        config.batch_requests()
    } else {
        batches
    };

    let definition = taxi_map_source::registry::find_source(source)
        .ok_or_else(|| format!("Unknown source: {source}"))?;

    let index = load_index(zones, zone_source)?;
    log::info!("Indexed {} zones", index.len());

    let batch_source = CsvBatchSource::new(data_dir, definition.clone());

    let stages = IndicatifProgress::stages_bar(&multi);
    let output_table = Pipeline::new(&config, &index)
        .with_ingest_progress(IndicatifProgress::batches_bar(&multi, "Loading batches"))
        .with_stage_progress(stages)
        .run_requests(&batch_source, &definition, &requests)?;

    let writer = BufWriter::new(File::create(output)?);
    output_table.table.write_csv(writer)?;
    log::info!(
        "Wrote {} enriched trips to {}",
        output_table.table.len(),
        output.display()
    );

    if let Some(path) = report_path {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &output_table.report)?;
        log::info!("Wrote report to {}", path.display());
    }

    if let Some(path) = summary_path {
        let mut writer = csv::Writer::from_path(path)?;
        for summary in output_table.table.zone_summaries().values() {
            writer.serialize(summary)?;
        }
        writer.flush()?;
        log::info!("Wrote zone summaries to {}", path.display());
    }

    log::info!("Done in {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            data_dir,
            zones,
            output,
            config,
            batches,
            source,
            zone_source,
            report,
            summary,
        } => run(
            data_dir,
            &zones,
            &output,
            config.as_deref(),
            batches,
            &source,
            &zone_source,
            report.as_deref(),
            summary.as_deref(),
        )?,
        Commands::Sources => {
            let sources = taxi_map_source::registry::all_sources();
            println!("{:<20} NAME", "ID");
            println!("{}", "-".repeat(50));
            for source in &sources {
                println!("{:<20} {}", source.id(), source.name());
            }
        }
        Commands::Zones { file, zone_source } => {
            if let Some(path) = file {
                let _multi = init_logger();
                let index = load_index(&path, &zone_source)?;
                println!("{:<6} {:<14} {:<16} NAME", "ID", "BOROUGH", "CATEGORY");
                println!("{}", "-".repeat(70));
                for zone_id in index.zone_ids() {
                    let Some(info) = index.zone(zone_id) else {
                        continue;
                    };
                    println!(
                        "{:<6} {:<14} {:<16} {}",
                        zone_id,
                        info.borough,
                        info.service_category.as_ref(),
                        info.zone_name
                    );
                }
                let airports = index
                    .zone_ids()
                    .filter(|id| index.service_category(*id).is_some_and(ServiceCategory::is_airport))
                    .count();
                println!("\n{} zones, {airports} airport zones", index.len());
            } else {
                let sources = taxi_map_zone::registry::all_sources();
                println!("{:<24} {:<18} NAME", "ID", "CRS");
                println!("{}", "-".repeat(70));
                for source in &sources {
                    println!(
                        "{:<24} {:<18} {}",
                        source.id(),
                        source.crs.as_ref(),
                        source.name()
                    );
                }
            }
        }
    }

    Ok(())
}
