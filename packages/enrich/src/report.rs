//! Per-stage accounting for a pipeline run.

use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::assign::UnresolvedCounts;
use crate::validate::RejectionCounts;

/// Pipeline stages in execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Ingestion,
    Temporal,
    Validation,
    Assignment,
    Classification,
}

impl Stage {
    /// Returns all variants of this enum, in execution order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Ingestion,
            Self::Temporal,
            Self::Validation,
            Self::Assignment,
            Self::Classification,
        ]
    }
}

/// Records entering and surviving one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub entered: usize,
    pub survived: usize,
}

impl StageReport {
    #[must_use]
    pub const fn removed(&self) -> usize {
        self.entered.saturating_sub(self.survived)
    }
}

/// Summary of a complete run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
    /// Timestamps that failed to parse during temporal derivation.
    pub timestamp_parse_failures: usize,
    pub rejections: RejectionCounts,
    pub unresolved: UnresolvedCounts,
    pub airport_trips: usize,
}

impl PipelineReport {
    pub(crate) fn push(&mut self, stage: Stage, entered: usize, survived: usize) {
        self.stages.push(StageReport {
            stage,
            entered,
            survived,
        });
    }

    /// Looks up the report for one stage.
    #[must_use]
    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// Records removed by the validator.
    #[must_use]
    pub fn removed_by_validation(&self) -> usize {
        self.stage(Stage::Validation).map_or(0, StageReport::removed)
    }

    /// Records read from every batch.
    #[must_use]
    pub fn ingested(&self) -> usize {
        self.stage(Stage::Ingestion).map_or(0, |s| s.survived)
    }

    /// Records in the final table.
    #[must_use]
    pub fn output(&self) -> usize {
        self.stages.last().map_or(0, |s| s.survived)
    }

    /// Writes the report to the log at `info`.
    pub fn log(&self) {
        for s in &self.stages {
            log::info!(
                "{:<14} {:>10} in {:>10} out {:>10} removed",
                s.stage.as_ref(),
                s.entered,
                s.survived,
                s.removed()
            );
        }
        if self.timestamp_parse_failures > 0 {
            log::info!(
                "Unparsable timestamps: {}",
                self.timestamp_parse_failures
            );
        }
        for (reason, count) in &self.rejections {
            log::info!("Rejected {reason}: {count}");
        }
        log::info!(
            "Unresolved zones: {} pickups, {} dropoffs",
            self.unresolved.pickups,
            self.unresolved.dropoffs
        );
        log::info!(
            "Airport trips: {} of {}",
            self.airport_trips,
            self.output()
        );
    }
}
