//! Config-driven trip source definition.
//!
//! [`SourceDefinition`] captures everything unique about a trip export in a
//! serializable config struct: where batch files live, how they are
//! compressed, and which source column feeds each canonical field. A single
//! generic implementation handles every export layout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};
use taxi_map_trip_models::{LatLng, ParseError, TripRecord};

use crate::SourceError;
use crate::parsing::{parse_f64, parse_i64, value_text};

/// Placeholder in [`SourceDefinition::file_pattern`] replaced by the batch id.
pub const BATCH_PLACEHOLDER: &str = "{batch}";

// ── Top-level source definition ──────────────────────────────────────────

/// A complete, config-driven trip source definition.
///
/// Loaded from TOML files embedded at compile time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDefinition {
    /// Unique identifier (e.g., `"yellow_taxi"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Batch file name with a `{batch}` placeholder
    /// (e.g., `"yellow_tripdata_{batch}.csv"`).
    pub file_pattern: String,
    /// Compression of batch files.
    #[serde(default)]
    pub compression: Compression,
    /// Field delimiter. Defaults to a comma.
    #[serde(default)]
    pub delimiter: Option<char>,
    /// Source column names for each canonical field.
    pub fields: FieldMapping,
}

impl SourceDefinition {
    /// Returns the source identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the human-readable source name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the file name holding `batch_id`.
    #[must_use]
    pub fn file_name(&self, batch_id: &str) -> String {
        self.file_pattern.replace(BATCH_PLACEHOLDER, batch_id)
    }
}

/// Batch file compression.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Compression {
    #[default]
    None,
    Gzip,
}

// ── Field mapping ────────────────────────────────────────────────────────

/// The canonical trip fields every batch must provide.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum CanonicalField {
    PickupDatetime,
    DropoffDatetime,
    PassengerCount,
    TripDistance,
    PickupLongitude,
    PickupLatitude,
    RateCode,
    PaymentType,
    TipAmount,
    TotalAmount,
    DropoffLongitude,
    DropoffLatitude,
}

impl CanonicalField {
    /// Returns all variants of this enum, in projection order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::PickupDatetime,
            Self::DropoffDatetime,
            Self::PassengerCount,
            Self::TripDistance,
            Self::PickupLongitude,
            Self::PickupLatitude,
            Self::RateCode,
            Self::PaymentType,
            Self::TipAmount,
            Self::TotalAmount,
            Self::DropoffLongitude,
            Self::DropoffLatitude,
        ]
    }

    /// Returns the canonical field name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// One or more source column names for a canonical field.
///
/// Written in TOML either as a single string or as a list of alternatives,
/// tried in order (first present column wins).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnName {
    One(String),
    AnyOf(Vec<String>),
}

impl ColumnName {
    /// Returns the candidate column names in preference order.
    #[must_use]
    pub fn candidates(&self) -> &[String] {
        match self {
            Self::One(name) => std::slice::from_ref(name),
            Self::AnyOf(names) => names,
        }
    }

    /// Finds the first candidate present in `columns`.
    ///
    /// Exact matches are preferred; a case-insensitive match is accepted
    /// when no candidate matches exactly.
    #[must_use]
    pub fn resolve(&self, columns: &[String]) -> Option<String> {
        let candidates = self.candidates();

        candidates
            .iter()
            .find(|c| columns.iter().any(|col| col == *c))
            .cloned()
            .or_else(|| {
                candidates.iter().find_map(|c| {
                    columns
                        .iter()
                        .find(|col| col.eq_ignore_ascii_case(c))
                        .cloned()
                })
            })
    }
}

/// Maps source column names to canonical trip fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    pub pickup_datetime: ColumnName,
    pub dropoff_datetime: ColumnName,
    pub passenger_count: ColumnName,
    pub trip_distance: ColumnName,
    pub pickup_longitude: ColumnName,
    pub pickup_latitude: ColumnName,
    pub rate_code: ColumnName,
    pub payment_type: ColumnName,
    pub tip_amount: ColumnName,
    pub total_amount: ColumnName,
    pub dropoff_longitude: ColumnName,
    pub dropoff_latitude: ColumnName,
}

impl FieldMapping {
    /// Returns the configured column name(s) for a canonical field.
    #[must_use]
    pub const fn column(&self, field: CanonicalField) -> &ColumnName {
        match field {
            CanonicalField::PickupDatetime => &self.pickup_datetime,
            CanonicalField::DropoffDatetime => &self.dropoff_datetime,
            CanonicalField::PassengerCount => &self.passenger_count,
            CanonicalField::TripDistance => &self.trip_distance,
            CanonicalField::PickupLongitude => &self.pickup_longitude,
            CanonicalField::PickupLatitude => &self.pickup_latitude,
            CanonicalField::RateCode => &self.rate_code,
            CanonicalField::PaymentType => &self.payment_type,
            CanonicalField::TipAmount => &self.tip_amount,
            CanonicalField::TotalAmount => &self.total_amount,
            CanonicalField::DropoffLongitude => &self.dropoff_longitude,
            CanonicalField::DropoffLatitude => &self.dropoff_latitude,
        }
    }

    /// Resolves every canonical field against a batch's column names.
    ///
    /// # Errors
    ///
    /// Returns [`MissingColumnError`] naming the first canonical field with
    /// no matching column.
    pub fn resolve(&self, columns: &[String]) -> Result<ResolvedProjection, MissingColumnError> {
        let mut resolved = BTreeMap::new();

        for &field in CanonicalField::all() {
            let column = self.column(field);
            let Some(name) = column.resolve(columns) else {
                return Err(MissingColumnError {
                    field,
                    candidates: column.candidates().to_vec(),
                });
            };
            resolved.insert(field, name);
        }

        Ok(ResolvedProjection { columns: resolved })
    }
}

/// A canonical field that no batch column satisfies.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no column for '{field}' (tried {candidates:?})")]
pub struct MissingColumnError {
    pub field: CanonicalField,
    pub candidates: Vec<String>,
}

// ── Resolved projection ──────────────────────────────────────────────────

/// A [`FieldMapping`] bound to one batch's actual column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProjection {
    columns: BTreeMap<CanonicalField, String>,
}

impl ResolvedProjection {
    /// Returns the source column chosen for a canonical field.
    #[must_use]
    pub fn column(&self, field: CanonicalField) -> Option<&str> {
        self.columns.get(&field).map(String::as_str)
    }

    fn get<'a>(
        &self,
        record: &'a serde_json::Value,
        field: CanonicalField,
    ) -> Option<&'a serde_json::Value> {
        record.get(self.column(field)?)
    }

    fn float(
        &self,
        record: &serde_json::Value,
        field: CanonicalField,
        trip: &mut TripRecord,
    ) -> Option<f64> {
        parse_f64(self.get(record, field)).unwrap_or_else(|value| {
            trip.mark_parse_error(ParseError::InvalidNumber {
                field: field.name(),
                value,
            });
            None
        })
    }

    fn integer(
        &self,
        record: &serde_json::Value,
        field: CanonicalField,
        trip: &mut TripRecord,
    ) -> Option<i64> {
        parse_i64(self.get(record, field)).unwrap_or_else(|value| {
            trip.mark_parse_error(ParseError::InvalidNumber {
                field: field.name(),
                value,
            });
            None
        })
    }

    /// Renames one raw record into the canonical schema.
    ///
    /// Empty values become `None`. Unparsable numbers set the record's
    /// parse error instead of failing.
    #[must_use]
    pub fn normalize_record(
        &self,
        record: &serde_json::Value,
        batch_id: &str,
        season: &str,
    ) -> TripRecord {
        use CanonicalField as F;

        let mut trip = TripRecord::new(batch_id, season);

        trip.pickup_datetime = value_text(self.get(record, F::PickupDatetime));
        trip.dropoff_datetime = value_text(self.get(record, F::DropoffDatetime));

        trip.passenger_count = self.integer(record, F::PassengerCount, &mut trip);
        trip.trip_distance = self.float(record, F::TripDistance, &mut trip);

        let pickup_lng = self.float(record, F::PickupLongitude, &mut trip);
        let pickup_lat = self.float(record, F::PickupLatitude, &mut trip);
        trip.pickup = lat_lng(pickup_lat, pickup_lng);

        trip.rate_code = self.integer(record, F::RateCode, &mut trip);
        trip.payment_type = self.integer(record, F::PaymentType, &mut trip);
        trip.tip_amount = self.float(record, F::TipAmount, &mut trip);
        trip.total_amount = self.float(record, F::TotalAmount, &mut trip);

        let dropoff_lng = self.float(record, F::DropoffLongitude, &mut trip);
        let dropoff_lat = self.float(record, F::DropoffLatitude, &mut trip);
        trip.dropoff = lat_lng(dropoff_lat, dropoff_lng);

        trip
    }

    /// Normalizes every record in a batch, preserving order.
    #[must_use]
    pub fn normalize_batch(
        &self,
        records: &[serde_json::Value],
        batch_id: &str,
        season: &str,
    ) -> Vec<TripRecord> {
        records
            .iter()
            .map(|record| self.normalize_record(record, batch_id, season))
            .collect()
    }
}

const fn lat_lng(lat: Option<f64>, lng: Option<f64>) -> Option<LatLng> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(LatLng::new(lat, lng)),
        _ => None,
    }
}

/// Parses a [`SourceDefinition`] from a TOML string.
///
/// # Errors
///
/// Returns [`SourceError::Definition`] if the TOML is malformed, missing
/// required fields, or the file pattern lacks a `{batch}` placeholder.
pub fn parse_source_toml(toml_str: &str) -> Result<SourceDefinition, SourceError> {
    let def: SourceDefinition =
        toml::de::from_str(toml_str).map_err(|e| SourceError::Definition {
            message: e.to_string(),
        })?;

    if !def.file_pattern.contains(BATCH_PLACEHOLDER) {
        return Err(SourceError::Definition {
            message: format!(
                "{}: file_pattern '{}' has no {BATCH_PLACEHOLDER} placeholder",
                def.id, def.file_pattern
            ),
        });
    }

    Ok(def)
}
