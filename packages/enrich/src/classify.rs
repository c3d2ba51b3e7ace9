//! Airport trip classification.

use rayon::prelude::*;
use taxi_map_spatial::GeometryIndex;
use taxi_map_trip_models::TripRecord;
use taxi_map_zone_models::ServiceCategory;

/// A trip is an airport trip if its rate code is an airport rate or it ends
/// in an airport zone.
#[must_use]
pub fn is_airport_trip(
    rate_code: i64,
    dropoff_category: Option<ServiceCategory>,
    airport_rate_codes: &[i64],
) -> bool {
    airport_rate_codes.contains(&rate_code)
        || dropoff_category.is_some_and(ServiceCategory::is_airport)
}

/// Sets `airport_trip` on every record. Returns how many are airport trips.
///
/// Records must already carry a zone assignment and a rate code; records
/// without one are left unclassified and are dropped when the table is
/// built.
pub fn classify(
    records: &mut [TripRecord],
    index: &GeometryIndex,
    airport_rate_codes: &[i64],
) -> usize {
    records
        .par_iter_mut()
        .map(|record| {
            let (Some(zones), Some(rate_code)) = (record.zones, record.rate_code) else {
                log::warn!(
                    "Skipping classification of unassigned trip from batch {}",
                    record.batch_id
                );
                return 0;
            };

            let airport = is_airport_trip(
                rate_code,
                index.service_category(zones.dropoff_zone),
                airport_rate_codes,
            );
            record.airport_trip = Some(airport);
            usize::from(airport)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use taxi_map_trip_models::ZoneAssignment;

    use super::*;
    use crate::assign::tests::test_index;

    const CODES: &[i64] = &[2, 3];

    #[test]
    fn rate_code_alone_marks_airport_trip() {
        assert!(is_airport_trip(2, Some(ServiceCategory::YellowZone), CODES));
        assert!(is_airport_trip(3, Some(ServiceCategory::BoroZone), CODES));
    }

    #[test]
    fn airport_dropoff_alone_marks_airport_trip() {
        assert!(is_airport_trip(1, Some(ServiceCategory::Airports), CODES));
        assert!(is_airport_trip(1, Some(ServiceCategory::Ewr), CODES));
    }

    #[test]
    fn neither_condition_is_not_airport_trip() {
        assert!(!is_airport_trip(1, Some(ServiceCategory::YellowZone), CODES));
        assert!(!is_airport_trip(5, Some(ServiceCategory::Other), CODES));
        assert!(!is_airport_trip(1, None, CODES));
        assert!(!is_airport_trip(2, Some(ServiceCategory::YellowZone), &[]));
    }

    #[test]
    fn classifies_records_by_dropoff_zone() {
        let index = test_index();
        let mut to_jfk = TripRecord::new("2015-01", "winter");
        to_jfk.rate_code = Some(1);
        to_jfk.zones = Some(ZoneAssignment {
            pickup_zone: 161,
            dropoff_zone: 132,
        });
        let mut from_jfk = to_jfk.clone();
        from_jfk.zones = Some(ZoneAssignment {
            pickup_zone: 132,
            dropoff_zone: 161,
        });
        let unassigned = TripRecord::new("2015-01", "winter");

        let mut records = vec![to_jfk, from_jfk, unassigned];
        let airport = classify(&mut records, &index, CODES);

        assert_eq!(airport, 1);
        assert_eq!(records[0].airport_trip, Some(true));
        assert_eq!(records[1].airport_trip, Some(false));
        assert_eq!(records[2].airport_trip, None);
    }
}
