#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical taxi trip record and enrichment output types.
//!
//! Every batch source normalizes its source-specific column names into a
//! [`TripRecord`]. Each enrichment stage fills in one of the optional derived
//! fields, and records that survive every stage are flattened into an
//! [`EnrichedTrip`] for downstream consumers.

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Payment type codes used by the TLC trip record encoding.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    /// Code 1
    CreditCard = 1,
    /// Code 2
    Cash = 2,
    /// Code 3
    NoCharge = 3,
    /// Code 4
    Dispute = 4,
    /// Code 5
    Unknown = 5,
    /// Code 6
    VoidedTrip = 6,
}

impl PaymentType {
    /// Returns the numeric source code.
    #[must_use]
    pub const fn code(self) -> i64 {
        self as i64
    }
}

/// Final rate code in effect at the end of the trip.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RateCode {
    /// Code 1
    Standard = 1,
    /// Code 2, flat fare to or from JFK
    Jfk = 2,
    /// Code 3
    Newark = 3,
    /// Code 4
    NassauWestchester = 4,
    /// Code 5
    Negotiated = 5,
    /// Code 6
    GroupRide = 6,
}

impl RateCode {
    /// Returns the numeric source code.
    #[must_use]
    pub const fn code(self) -> i64 {
        self as i64
    }

    /// Rate codes reserved for airport trips.
    #[must_use]
    pub const fn airport_codes() -> &'static [Self] {
        &[Self::Jfk, Self::Newark]
    }
}

/// Day/night split of trips by pickup hour.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum DayPeriod {
    /// Pickup hour within the configured daytime window.
    Daytime,
    /// Every other hour.
    Nighttime,
}

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A field on a single record that could not be parsed.
///
/// Parse failures never abort a run. The record carries the error until the
/// validator drops it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A timestamp did not match any accepted format.
    InvalidTimestamp {
        /// Canonical field name.
        field: &'static str,
        /// The offending source text.
        value: String,
    },
    /// A numeric field was neither a number nor a numeric string.
    InvalidNumber {
        /// Canonical field name.
        field: &'static str,
        /// The offending source text.
        value: String,
    },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTimestamp { field, value } => {
                write!(f, "invalid timestamp in {field}: {value:?}")
            }
            Self::InvalidNumber { field, value } => {
                write!(f, "invalid number in {field}: {value:?}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Why the validator dropped a record.
///
/// Reasons are checked in declaration order and the first failing predicate
/// is reported.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    /// A timestamp or numeric field failed to parse.
    ParseFailure,
    /// A required field was absent or empty.
    MissingField,
    /// Passenger count outside the allowed range.
    PassengerCount,
    /// Pickup latitude or longitude outside the service area.
    PickupCoordinates,
    /// Dropoff latitude or longitude outside the service area.
    DropoffCoordinates,
    /// Tip amount outside the allowed range.
    TipAmount,
    /// Total amount outside the allowed range.
    TotalAmount,
    /// Trip duration outside the allowed range.
    TripDuration,
    /// Trip distance outside the allowed range.
    TripDistance,
    /// Payment type other than cash or credit card.
    PaymentType,
}

impl RejectionReason {
    /// Returns all variants of this enum, in check order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::ParseFailure,
            Self::MissingField,
            Self::PassengerCount,
            Self::PickupCoordinates,
            Self::DropoffCoordinates,
            Self::TipAmount,
            Self::TotalAmount,
            Self::TripDuration,
            Self::TripDistance,
            Self::PaymentType,
        ]
    }
}

/// Features derived from a record's own pickup and dropoff timestamps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalFeatures {
    /// Parsed pickup instant.
    pub pickup_at: NaiveDateTime,
    /// Parsed dropoff instant.
    pub dropoff_at: NaiveDateTime,
    /// Minutes from pickup to dropoff, rounded to one decimal place.
    pub trip_duration: f64,
    /// Day of week of the pickup.
    pub weekday: Weekday,
    /// Hour of day of the pickup (0-23).
    pub pickup_hour: u32,
    /// Pickup timestamp truncated to its date.
    pub pickup_date: NaiveDate,
    /// Day/night bucket of the pickup hour.
    pub day_period: DayPeriod,
}

/// Resolved taxi zones for both ends of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneAssignment {
    /// Zone containing the pickup coordinate.
    pub pickup_zone: u32,
    /// Zone containing the dropoff coordinate.
    pub dropoff_zone: u32,
}

/// One taxi trip in the working table.
///
/// Source fields are optional because raw rows may omit them; the validator
/// rejects any record with a missing field. Derived fields stay `None` until
/// the stage that populates them runs.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRecord {
    /// Batch the record was read from (e.g. `"2015-01"`).
    pub batch_id: String,
    /// Season label supplied by the caller at ingestion.
    pub season: String,
    /// Pickup timestamp as it appeared in the source.
    pub pickup_datetime: Option<String>,
    /// Dropoff timestamp as it appeared in the source.
    pub dropoff_datetime: Option<String>,
    pub pickup: Option<LatLng>,
    pub dropoff: Option<LatLng>,
    /// Miles.
    pub trip_distance: Option<f64>,
    pub tip_amount: Option<f64>,
    pub total_amount: Option<f64>,
    pub passenger_count: Option<i64>,
    pub payment_type: Option<i64>,
    pub rate_code: Option<i64>,
    /// First field that failed to parse, if any.
    pub parse_error: Option<ParseError>,
    /// Set by the temporal stage.
    pub temporal: Option<TemporalFeatures>,
    /// Set by the spatial zone assigner.
    pub zones: Option<ZoneAssignment>,
    /// Set by the classifier.
    pub airport_trip: Option<bool>,
}

impl TripRecord {
    /// Creates an empty record tagged with its batch and season.
    #[must_use]
    pub fn new(batch_id: impl Into<String>, season: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            season: season.into(),
            pickup_datetime: None,
            dropoff_datetime: None,
            pickup: None,
            dropoff: None,
            trip_distance: None,
            tip_amount: None,
            total_amount: None,
            passenger_count: None,
            payment_type: None,
            rate_code: None,
            parse_error: None,
            temporal: None,
            zones: None,
            airport_trip: None,
        }
    }

    /// Records a parse failure, keeping the first one seen.
    pub fn mark_parse_error(&mut self, error: ParseError) {
        if self.parse_error.is_none() {
            self.parse_error = Some(error);
        }
    }
}

/// Returns the English name of a weekday.
#[must_use]
pub const fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// A fully enriched, analysis-ready trip.
///
/// Only records that passed validation, zone assignment, and classification
/// can be converted into this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedTrip {
    pub season: String,
    pub batch_id: String,
    pub pickup_datetime: NaiveDateTime,
    pub dropoff_datetime: NaiveDateTime,
    pub pickup_date: NaiveDate,
    pub pickup_hour: u32,
    pub weekday: String,
    pub day_period: DayPeriod,
    /// Minutes, one decimal place.
    pub trip_duration: f64,
    pub trip_distance: f64,
    pub tip_amount: f64,
    pub total_amount: f64,
    pub passenger_count: i64,
    pub payment_type: i64,
    pub rate_code: i64,
    pub pickup_latitude: f64,
    pub pickup_longitude: f64,
    pub dropoff_latitude: f64,
    pub dropoff_longitude: f64,
    pub pickup_zone: u32,
    pub dropoff_zone: u32,
    pub airport_trip: bool,
}

/// Error returned when converting a [`TripRecord`] that has not been through
/// every enrichment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncompleteRecordError {
    /// The first field found missing.
    pub missing: &'static str,
}

impl std::fmt::Display for IncompleteRecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "trip record is missing {}", self.missing)
    }
}

impl std::error::Error for IncompleteRecordError {}

impl TryFrom<TripRecord> for EnrichedTrip {
    type Error = IncompleteRecordError;

    fn try_from(record: TripRecord) -> Result<Self, Self::Error> {
        const fn missing(field: &'static str) -> IncompleteRecordError {
            IncompleteRecordError { missing: field }
        }

        let temporal = record.temporal.ok_or(missing("temporal features"))?;
        let zones = record.zones.ok_or(missing("zone assignment"))?;
        let airport_trip = record.airport_trip.ok_or(missing("airport_trip"))?;
        let pickup = record.pickup.ok_or(missing("pickup coordinate"))?;
        let dropoff = record.dropoff.ok_or(missing("dropoff coordinate"))?;

        Ok(Self {
            season: record.season,
            batch_id: record.batch_id,
            pickup_datetime: temporal.pickup_at,
            dropoff_datetime: temporal.dropoff_at,
            pickup_date: temporal.pickup_date,
            pickup_hour: temporal.pickup_hour,
            weekday: weekday_name(temporal.weekday).to_string(),
            day_period: temporal.day_period,
            trip_duration: temporal.trip_duration,
            trip_distance: record.trip_distance.ok_or(missing("trip_distance"))?,
            tip_amount: record.tip_amount.ok_or(missing("tip_amount"))?,
            total_amount: record.total_amount.ok_or(missing("total_amount"))?,
            passenger_count: record.passenger_count.ok_or(missing("passenger_count"))?,
            payment_type: record.payment_type.ok_or(missing("payment_type"))?,
            rate_code: record.rate_code.ok_or(missing("rate_code"))?,
            pickup_latitude: pickup.latitude,
            pickup_longitude: pickup.longitude,
            dropoff_latitude: dropoff.latitude,
            dropoff_longitude: dropoff.longitude,
            pickup_zone: zones.pickup_zone,
            dropoff_zone: zones.dropoff_zone,
            airport_trip,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_record() -> TripRecord {
        let pickup_at = NaiveDate::from_ymd_opt(2015, 1, 15)
            .unwrap()
            .and_hms_opt(19, 5, 39)
            .unwrap();
        let dropoff_at = NaiveDate::from_ymd_opt(2015, 1, 15)
            .unwrap()
            .and_hms_opt(19, 23, 42)
            .unwrap();

        TripRecord {
            pickup_datetime: Some("2015-01-15 19:05:39".to_string()),
            dropoff_datetime: Some("2015-01-15 19:23:42".to_string()),
            pickup: Some(LatLng::new(40.75, -73.99)),
            dropoff: Some(LatLng::new(40.644, -73.784)),
            trip_distance: Some(15.2),
            tip_amount: Some(10.0),
            total_amount: Some(62.5),
            passenger_count: Some(1),
            payment_type: Some(1),
            rate_code: Some(2),
            temporal: Some(TemporalFeatures {
                pickup_at,
                dropoff_at,
                trip_duration: 18.1,
                weekday: Weekday::Thu,
                pickup_hour: 19,
                pickup_date: pickup_at.date(),
                day_period: DayPeriod::Nighttime,
            }),
            zones: Some(ZoneAssignment {
                pickup_zone: 161,
                dropoff_zone: 132,
            }),
            airport_trip: Some(true),
            ..TripRecord::new("2015-01", "Winter")
        }
    }

    #[test]
    fn converts_complete_record() {
        let trip = EnrichedTrip::try_from(complete_record()).unwrap();
        assert_eq!(trip.pickup_zone, 161);
        assert_eq!(trip.weekday, "Thursday");
        assert_eq!(trip.day_period, DayPeriod::Nighttime);
        assert!(trip.airport_trip);
    }

    #[test]
    fn rejects_record_without_zones() {
        let record = TripRecord {
            zones: None,
            ..complete_record()
        };
        let err = EnrichedTrip::try_from(record).unwrap_err();
        assert_eq!(err.missing, "zone assignment");
    }

    #[test]
    fn keeps_first_parse_error() {
        let mut record = TripRecord::new("2015-01", "Winter");
        record.mark_parse_error(ParseError::InvalidNumber {
            field: "tip_amount",
            value: "abc".to_string(),
        });
        record.mark_parse_error(ParseError::InvalidTimestamp {
            field: "pickup_datetime",
            value: "yesterday".to_string(),
        });
        assert!(matches!(
            record.parse_error,
            Some(ParseError::InvalidNumber { field: "tip_amount", .. })
        ));
    }

    #[test]
    fn airport_rate_codes_match_source_encoding() {
        let codes: Vec<i64> = RateCode::airport_codes()
            .iter()
            .map(|c| c.code())
            .collect();
        assert_eq!(codes, vec![2, 3]);
        assert_eq!(PaymentType::Cash.code(), 2);
    }
}
