//! The enriched, analysis-ready trip table.
//!
//! Rows are immutable once built. Summaries are computed into separate
//! tables keyed by zone id and never touch zone geometry.

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;
use taxi_map_trip_models::{EnrichedTrip, TripRecord};

/// Ordered collection of [`EnrichedTrip`] rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedTable {
    rows: Vec<EnrichedTrip>,
}

impl EnrichedTable {
    #[must_use]
    pub const fn from_rows(rows: Vec<EnrichedTrip>) -> Self {
        Self { rows }
    }

    /// Converts fully enriched records into rows, dropping (and logging)
    /// any that skipped a stage.
    #[must_use]
    pub fn from_records(records: Vec<TripRecord>) -> Self {
        let rows = records
            .into_iter()
            .filter_map(|record| {
                EnrichedTrip::try_from(record)
                    .map_err(|e| log::warn!("Dropping incomplete record: {e}"))
                    .ok()
            })
            .collect();
        Self { rows }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EnrichedTrip> {
        self.rows.iter()
    }

    #[must_use]
    pub fn rows(&self) -> &[EnrichedTrip] {
        &self.rows
    }

    /// Projects one column.
    pub fn column<T>(&self, f: impl Fn(&EnrichedTrip) -> T) -> Vec<T> {
        self.rows.iter().map(f).collect()
    }

    /// Groups rows by key, preserving row order within each group.
    pub fn group_by<K: Ord>(
        &self,
        key: impl Fn(&EnrichedTrip) -> K,
    ) -> BTreeMap<K, Vec<&EnrichedTrip>> {
        let mut groups: BTreeMap<K, Vec<&EnrichedTrip>> = BTreeMap::new();
        for row in &self.rows {
            groups.entry(key(row)).or_default().push(row);
        }
        groups
    }

    /// Per-pickup-zone aggregates.
    #[must_use]
    pub fn zone_summaries(&self) -> BTreeMap<u32, ZoneSummary> {
        self.group_by(|row| row.pickup_zone)
            .into_iter()
            .map(|(zone_id, rows)| (zone_id, ZoneSummary::from_rows(zone_id, &rows)))
            .collect()
    }

    /// Writes the table as CSV with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`csv::Error`] if serialization or the underlying write
    /// fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a EnrichedTable {
    type Item = &'a EnrichedTrip;
    type IntoIter = std::slice::Iter<'a, EnrichedTrip>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Aggregates over the trips picked up in one zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoneSummary {
    pub zone_id: u32,
    pub trip_count: usize,
    pub airport_trip_count: usize,
    pub mean_duration: f64,
    pub mean_distance: f64,
    pub mean_tip: f64,
    pub mean_total: f64,
}

impl ZoneSummary {
    #[allow(clippy::cast_precision_loss)]
    fn from_rows(zone_id: u32, rows: &[&EnrichedTrip]) -> Self {
        let n = rows.len() as f64;
        let mean = |f: fn(&EnrichedTrip) -> f64| rows.iter().map(|r| f(r)).sum::<f64>() / n;

        Self {
            zone_id,
            trip_count: rows.len(),
            airport_trip_count: rows.iter().filter(|r| r.airport_trip).count(),
            mean_duration: mean(|r| r.trip_duration),
            mean_distance: mean(|r| r.trip_distance),
            mean_tip: mean(|r| r.tip_amount),
            mean_total: mean(|r| r.total_amount),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use taxi_map_trip_models::DayPeriod;

    use super::*;

    fn row(pickup_zone: u32, duration: f64, tip: f64, airport_trip: bool) -> EnrichedTrip {
        let pickup = NaiveDate::from_ymd_opt(2015, 1, 15)
            .unwrap()
            .and_hms_opt(19, 5, 39)
            .unwrap();
        EnrichedTrip {
            season: "winter".to_string(),
            batch_id: "2015-01".to_string(),
            pickup_datetime: pickup,
            dropoff_datetime: pickup,
            pickup_date: pickup.date(),
            pickup_hour: 19,
            weekday: "Thursday".to_string(),
            day_period: DayPeriod::Nighttime,
            trip_duration: duration,
            trip_distance: 2.0,
            tip_amount: tip,
            total_amount: 20.0,
            passenger_count: 1,
            payment_type: 1,
            rate_code: 1,
            pickup_latitude: 40.75,
            pickup_longitude: -73.99,
            dropoff_latitude: 40.644,
            dropoff_longitude: -73.784,
            pickup_zone,
            dropoff_zone: 132,
            airport_trip,
        }
    }

    fn table() -> EnrichedTable {
        EnrichedTable::from_rows(vec![
            row(161, 10.0, 1.0, false),
            row(132, 30.0, 5.0, true),
            row(161, 20.0, 3.0, true),
        ])
    }

    #[test]
    fn projects_and_groups() {
        let t = table();
        assert_eq!(t.column(|r| r.pickup_zone), vec![161, 132, 161]);

        let groups = t.group_by(|r| r.pickup_zone);
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec![132, 161]);
        assert_eq!(groups[&161].len(), 2);
        assert!((groups[&161][1].trip_duration - 20.0).abs() < f64::EPSILON);
        assert_eq!((&t).into_iter().count(), 3);
    }

    #[test]
    fn summarizes_by_pickup_zone() {
        let summaries = table().zone_summaries();
        let midtown = summaries[&161];
        assert_eq!(midtown.trip_count, 2);
        assert_eq!(midtown.airport_trip_count, 1);
        assert!((midtown.mean_duration - 15.0).abs() < 1e-9);
        assert!((midtown.mean_tip - 2.0).abs() < 1e-9);
        assert!((midtown.mean_total - 20.0).abs() < 1e-9);
        assert_eq!(summaries[&132].trip_count, 1);
    }

    #[test]
    fn writes_csv_with_header() {
        let mut out = Vec::new();
        table().write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        let header = lines.next().unwrap();
        assert!(header.starts_with("season,batch_id,pickup_datetime,dropoff_datetime"));
        assert!(header.ends_with("pickup_zone,dropoff_zone,airport_trip"));
        let first = lines.next().unwrap();
        assert!(first.starts_with("winter,2015-01,2015-01-15T19:05:39,"), "{first}");
        assert!(first.contains(",Nighttime,"), "{first}");
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn drops_incomplete_records() {
        let t = EnrichedTable::from_records(vec![TripRecord::new("2015-01", "winter")]);
        assert!(t.is_empty());
    }
}
