//! Temporal feature derivation.
//!
//! Parses pickup and dropoff timestamps and derives trip duration, weekday,
//! pickup hour, pickup date and the day/night bucket. Unparsable timestamps
//! mark the record with a parse error; the validator drops it later.

use chrono::{Datelike, NaiveDateTime, Timelike};
use rayon::prelude::*;
use taxi_map_source::parsing::parse_timestamp;
use taxi_map_trip_models::{ParseError, TemporalFeatures, TripRecord};

use crate::config::DayPeriodBoundary;

const MILLIS_PER_TENTH_MINUTE: i64 = 6_000;

/// Minutes from pickup to dropoff, rounded half away from zero to one
/// decimal place. Negative when dropoff precedes pickup.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn trip_duration_minutes(pickup: NaiveDateTime, dropoff: NaiveDateTime) -> f64 {
    let millis = (dropoff - pickup).num_milliseconds();
    let tenths =
        (millis.abs() + MILLIS_PER_TENTH_MINUTE / 2) / MILLIS_PER_TENTH_MINUTE * millis.signum();
    tenths as f64 / 10.0
}

/// Derives temporal features for one record.
///
/// Records with a missing timestamp are left untouched; the validator
/// rejects them as incomplete.
pub fn derive_temporal(record: &mut TripRecord, boundary: &DayPeriodBoundary) {
    let (Some(pickup_text), Some(dropoff_text)) =
        (record.pickup_datetime.as_deref(), record.dropoff_datetime.as_deref())
    else {
        return;
    };

    let Some(pickup_at) = parse_timestamp(pickup_text) else {
        let value = pickup_text.to_string();
        record.mark_parse_error(ParseError::InvalidTimestamp {
            field: "pickup_datetime",
            value,
        });
        return;
    };

    let Some(dropoff_at) = parse_timestamp(dropoff_text) else {
        let value = dropoff_text.to_string();
        record.mark_parse_error(ParseError::InvalidTimestamp {
            field: "dropoff_datetime",
            value,
        });
        return;
    };

    let pickup_hour = pickup_at.hour();

    record.temporal = Some(TemporalFeatures {
        pickup_at,
        dropoff_at,
        trip_duration: trip_duration_minutes(pickup_at, dropoff_at),
        weekday: pickup_at.weekday(),
        pickup_hour,
        pickup_date: pickup_at.date(),
        day_period: boundary.classify(pickup_hour),
    });
}

/// Derives temporal features for every record in parallel.
///
/// Returns the number of records whose timestamps failed to parse.
pub fn derive_all(records: &mut [TripRecord], boundary: &DayPeriodBoundary) -> usize {
    records
        .par_iter_mut()
        .map(|record| {
            let had_error = record.parse_error.is_some();
            derive_temporal(record, boundary);
            usize::from(!had_error && record.parse_error.is_some())
        })
        .sum()
}
