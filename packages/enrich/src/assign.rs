//! Spatial zone assignment.
//!
//! Resolves each trip's pickup and dropoff coordinates to taxi zone ids via
//! the shared [`GeometryIndex`]. Trips are kept only when both ends resolve.

use rayon::prelude::*;
use serde::Serialize;
use taxi_map_spatial::GeometryIndex;
use taxi_map_trip_models::{LatLng, TripRecord, ZoneAssignment};

/// Counts of coordinates that fell outside every zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UnresolvedCounts {
    pub pickups: usize,
    pub dropoffs: usize,
}

fn resolve(index: &GeometryIndex, point: Option<LatLng>) -> Option<u32> {
    point.and_then(|p| index.resolve(p.longitude, p.latitude))
}

/// Assigns zones and drops trips with an unresolved end, preserving order.
#[must_use]
pub fn assign_zones(
    records: Vec<TripRecord>,
    index: &GeometryIndex,
) -> (Vec<TripRecord>, UnresolvedCounts) {
    let resolved: Vec<(Option<u32>, Option<u32>)> = records
        .par_iter()
        .map(|r| (resolve(index, r.pickup), resolve(index, r.dropoff)))
        .collect();

    let mut counts = UnresolvedCounts::default();
    let mut kept = Vec::with_capacity(records.len());

    for (mut record, (pickup_zone, dropoff_zone)) in records.into_iter().zip(resolved) {
        counts.pickups += usize::from(pickup_zone.is_none());
        counts.dropoffs += usize::from(dropoff_zone.is_none());

        if let (Some(pickup_zone), Some(dropoff_zone)) = (pickup_zone, dropoff_zone) {
            record.zones = Some(ZoneAssignment {
                pickup_zone,
                dropoff_zone,
            });
            kept.push(record);
        }
    }

    (kept, counts)
}

#[cfg(test)]
pub(crate) mod tests {
    use geo::{Coord, LineString, MultiPolygon, Polygon};
    use taxi_map_zone_models::{Crs, ServiceCategory, ZonePolygon};

    use super::*;

    pub(crate) fn square_zone(
        zone_id: u32,
        category: ServiceCategory,
        center: (f64, f64),
        half: f64,
    ) -> ZonePolygon {
        let (lng, lat) = center;
        let ring = LineString::from(vec![
            Coord {
                x: lng - half,
                y: lat - half,
            },
            Coord {
                x: lng + half,
                y: lat - half,
            },
            Coord {
                x: lng + half,
                y: lat + half,
            },
            Coord {
                x: lng - half,
                y: lat + half,
            },
            Coord {
                x: lng - half,
                y: lat - half,
            },
        ]);
        ZonePolygon {
            zone_id,
            zone_name: format!("Zone {zone_id}"),
            borough: "Test".to_string(),
            service_category: category,
            geometry: MultiPolygon(vec![Polygon::new(ring, vec![])]),
        }
    }

    /// An L-shaped zone filling the box from `min` to `min + size`, except
    /// for the top-right quadrant.
    pub(crate) fn l_shaped_zone(zone_id: u32, min: (f64, f64), size: f64) -> ZonePolygon {
        let (x, y) = min;
        let half = size / 2.0;
        let ring = LineString::from(vec![
            Coord { x, y },
            Coord { x: x + size, y },
            Coord {
                x: x + size,
                y: y + half,
            },
            Coord {
                x: x + half,
                y: y + half,
            },
            Coord {
                x: x + half,
                y: y + size,
            },
            Coord { x, y: y + size },
            Coord { x, y },
        ]);
        ZonePolygon {
            zone_id,
            zone_name: format!("Zone {zone_id}"),
            borough: "Test".to_string(),
            service_category: ServiceCategory::BoroZone,
            geometry: MultiPolygon(vec![Polygon::new(ring, vec![])]),
        }
    }

    /// Midtown (161) and JFK (132), as small squares in WGS84.
    pub(crate) fn test_index() -> GeometryIndex {
        GeometryIndex::build(
            &[
                square_zone(161, ServiceCategory::YellowZone, (-73.99, 40.75), 0.01),
                square_zone(132, ServiceCategory::Airports, (-73.784, 40.644), 0.01),
            ],
            Crs::Wgs84,
        )
    }

    fn trip(pickup: LatLng, dropoff: LatLng) -> TripRecord {
        let mut r = TripRecord::new("2015-01", "winter");
        r.pickup = Some(pickup);
        r.dropoff = Some(dropoff);
        r
    }

    #[test]
    fn keeps_only_fully_resolved_trips() {
        let midtown = LatLng::new(40.75, -73.99);
        let jfk = LatLng::new(40.644, -73.784);
        let nowhere = LatLng::new(40.9, -73.5);

        let (kept, counts) = assign_zones(
            vec![
                trip(midtown, jfk),
                trip(nowhere, jfk),
                trip(midtown, nowhere),
                trip(jfk, midtown),
            ],
            &test_index(),
        );

        assert_eq!(kept.len(), 2);
        assert_eq!(
            kept[0].zones,
            Some(ZoneAssignment {
                pickup_zone: 161,
                dropoff_zone: 132
            })
        );
        assert_eq!(
            kept[1].zones,
            Some(ZoneAssignment {
                pickup_zone: 132,
                dropoff_zone: 161
            })
        );
        assert_eq!(
            counts,
            UnresolvedCounts {
                pickups: 1,
                dropoffs: 1
            }
        );
    }

    #[test]
    fn assignment_is_deterministic() {
        let records: Vec<TripRecord> = (0..50)
            .map(|i| {
                let offset = f64::from(i) * 0.0005;
                trip(
                    LatLng::new(40.74 + offset, -74.0 + offset),
                    LatLng::new(40.644, -73.784),
                )
            })
            .collect();

        let index = test_index();
        let (first, first_counts) = assign_zones(records.clone(), &index);
        let (second, second_counts) = assign_zones(records, &test_index());
        assert_eq!(first, second);
        assert_eq!(first_counts, second_counts);
    }
}
