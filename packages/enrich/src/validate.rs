//! Multi-criteria record validation.
//!
//! A record is kept only if it parsed cleanly, has every required field, and
//! satisfies every inclusion bound. Rejections are values, counted per
//! [`RejectionReason`].

use std::collections::BTreeMap;

use rayon::prelude::*;
use taxi_map_trip_models::{LatLng, RejectionReason, TripRecord};

use crate::config::ValidationBounds;

/// Rejected-record counts keyed by reason.
pub type RejectionCounts = BTreeMap<RejectionReason, usize>;

fn coordinate_ok(point: LatLng, bounds: &ValidationBounds) -> bool {
    bounds.latitude.contains(point.latitude) && bounds.longitude.contains(point.longitude)
}

/// Checks one record, returning the first failing predicate.
///
/// # Errors
///
/// Returns the [`RejectionReason`] for the first check that fails, in
/// [`RejectionReason::all`] order.
pub fn check(record: &TripRecord, bounds: &ValidationBounds) -> Result<(), RejectionReason> {
    if record.parse_error.is_some() {
        return Err(RejectionReason::ParseFailure);
    }

    let (
        Some(temporal),
        Some(passenger_count),
        Some(pickup),
        Some(dropoff),
        Some(tip_amount),
        Some(total_amount),
        Some(trip_distance),
        Some(payment_type),
        Some(_rate_code),
    ) = (
        record.temporal.as_ref(),
        record.passenger_count,
        record.pickup,
        record.dropoff,
        record.tip_amount,
        record.total_amount,
        record.trip_distance,
        record.payment_type,
        record.rate_code,
    )
    else {
        return Err(RejectionReason::MissingField);
    };

    if !bounds.passenger_count.contains_int(passenger_count) {
        return Err(RejectionReason::PassengerCount);
    }
    if !coordinate_ok(pickup, bounds) {
        return Err(RejectionReason::PickupCoordinates);
    }
    if !coordinate_ok(dropoff, bounds) {
        return Err(RejectionReason::DropoffCoordinates);
    }
    if !bounds.tip_amount.contains(tip_amount) {
        return Err(RejectionReason::TipAmount);
    }
    if !bounds.total_amount.contains(total_amount) {
        return Err(RejectionReason::TotalAmount);
    }
    if !bounds.trip_duration.contains(temporal.trip_duration) {
        return Err(RejectionReason::TripDuration);
    }
    if !bounds.trip_distance.contains(trip_distance) {
        return Err(RejectionReason::TripDistance);
    }
    if !bounds.payment_types.contains(&payment_type) {
        return Err(RejectionReason::PaymentType);
    }

    Ok(())
}

/// Keeps the records that pass every check, preserving order.
#[must_use]
pub fn validate(
    records: Vec<TripRecord>,
    bounds: &ValidationBounds,
) -> (Vec<TripRecord>, RejectionCounts) {
    let verdicts: Vec<Option<RejectionReason>> = records
        .par_iter()
        .map(|record| check(record, bounds).err())
        .collect();

    let mut kept = Vec::with_capacity(records.len());
    let mut rejected = RejectionCounts::new();

    for (record, verdict) in records.into_iter().zip(verdicts) {
        match verdict {
            None => kept.push(record),
            Some(reason) => *rejected.entry(reason).or_default() += 1,
        }
    }

    (kept, rejected)
}
