//! Pipeline configuration.
//!
//! Every setting has a default matching the standard TLC cleaning rules, so
//! an empty TOML document is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use taxi_map_trip_models::{DayPeriod, PaymentType, RateCode};

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading the config file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML document is malformed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The document parsed but holds inconsistent values.
    #[error("Invalid configuration: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

/// A numeric range with independently inclusive or exclusive ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
    #[serde(default = "inclusive")]
    pub min_inclusive: bool,
    #[serde(default = "inclusive")]
    pub max_inclusive: bool,
}

const fn inclusive() -> bool {
    true
}

impl Interval {
    /// `[min, max]`
    #[must_use]
    pub const fn closed(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            min_inclusive: true,
            max_inclusive: true,
        }
    }

    /// `(min, max)`
    #[must_use]
    pub const fn open(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            min_inclusive: false,
            max_inclusive: false,
        }
    }

    /// `(min, max]`
    #[must_use]
    pub const fn left_open(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            min_inclusive: false,
            max_inclusive: true,
        }
    }

    /// Whether `value` lies in the interval. `NaN` never does.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        let above = if self.min_inclusive {
            value >= self.min
        } else {
            value > self.min
        };
        let below = if self.max_inclusive {
            value <= self.max
        } else {
            value < self.max
        };
        above && below
    }

    /// Integer convenience wrapper around [`Self::contains`].
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn contains_int(&self, value: i64) -> bool {
        self.contains(value as f64)
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let open = if self.min_inclusive { '[' } else { '(' };
        let close = if self.max_inclusive { ']' } else { ')' };
        write!(f, "{open}{}, {}{close}", self.min, self.max)
    }
}

/// Inclusion bounds applied by the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationBounds {
    pub passenger_count: Interval,
    pub latitude: Interval,
    pub longitude: Interval,
    pub tip_amount: Interval,
    pub total_amount: Interval,
    /// Minutes.
    pub trip_duration: Interval,
    /// Miles.
    pub trip_distance: Interval,
    /// Allowed payment type codes.
    pub payment_types: Vec<i64>,
}

impl Default for ValidationBounds {
    fn default() -> Self {
        Self {
            passenger_count: Interval::closed(1.0, 7.0),
            latitude: Interval::open(39.0, 42.0),
            longitude: Interval::open(-76.0, -72.0),
            tip_amount: Interval::closed(0.0, 200.0),
            total_amount: Interval::left_open(0.0, 300.0),
            trip_duration: Interval::closed(1.0, 720.0),
            trip_distance: Interval::left_open(0.0, 100.0),
            payment_types: vec![PaymentType::CreditCard.code(), PaymentType::Cash.code()],
        }
    }
}

/// Hour boundaries separating daytime from nighttime pickups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DayPeriodBoundary {
    /// First daytime hour (inclusive).
    pub day_start_hour: u32,
    /// First nighttime hour.
    pub night_start_hour: u32,
}

impl Default for DayPeriodBoundary {
    fn default() -> Self {
        Self {
            day_start_hour: 6,
            night_start_hour: 18,
        }
    }
}

impl DayPeriodBoundary {
    /// Buckets a pickup hour.
    #[must_use]
    pub const fn classify(&self, hour: u32) -> DayPeriod {
        if hour >= self.day_start_hour && hour < self.night_start_hour {
            DayPeriod::Daytime
        } else {
            DayPeriod::Nighttime
        }
    }
}

/// A caller-chosen label applied to a group of batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonBatches {
    pub label: String,
    pub batches: Vec<String>,
}

/// One batch to ingest and the season tag its rows receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub batch_id: String,
    pub season: String,
}

impl BatchRequest {
    #[must_use]
    pub fn new(batch_id: impl Into<String>, season: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            season: season.into(),
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub bounds: ValidationBounds,
    pub day_period: DayPeriodBoundary,
    /// Rate codes that mark a trip as an airport trip on their own.
    pub airport_rate_codes: Vec<i64>,
    /// Batches to ingest, in request order.
    pub seasons: Vec<SeasonBatches>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bounds: ValidationBounds::default(),
            day_period: DayPeriodBoundary::default(),
            airport_rate_codes: RateCode::airport_codes()
                .iter()
                .map(|code| code.code())
                .collect(),
            seasons: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is malformed or inconsistent.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or is invalid.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Checks cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid { message });

        let DayPeriodBoundary {
            day_start_hour,
            night_start_hour,
        } = self.day_period;
        if day_start_hour >= night_start_hour || night_start_hour > 24 {
            return invalid(format!(
                "day_period requires day_start_hour < night_start_hour <= 24, got {day_start_hour} and {night_start_hour}"
            ));
        }

        let b = &self.bounds;
        for (name, interval) in [
            ("passenger_count", b.passenger_count),
            ("latitude", b.latitude),
            ("longitude", b.longitude),
            ("tip_amount", b.tip_amount),
            ("total_amount", b.total_amount),
            ("trip_duration", b.trip_duration),
            ("trip_distance", b.trip_distance),
        ] {
            if interval.min.is_nan() || interval.max.is_nan() || interval.min > interval.max {
                return invalid(format!("bounds.{name} is empty: {interval}"));
            }
        }

        if b.payment_types.is_empty() {
            return invalid("bounds.payment_types must not be empty".to_string());
        }

        for season in &self.seasons {
            if season.batches.is_empty() {
                return invalid(format!("season '{}' lists no batches", season.label));
            }
        }

        Ok(())
    }

    /// Flattens the season table into batch requests, in listing order.
    #[must_use]
    pub fn batch_requests(&self) -> Vec<BatchRequest> {
        self.seasons
            .iter()
            .flat_map(|season| {
                season
                    .batches
                    .iter()
                    .map(|batch| BatchRequest::new(batch.clone(), season.label.clone()))
            })
            .collect()
    }
}
