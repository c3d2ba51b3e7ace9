//! Normalizes `GeoJSON` features into [`ZonePolygon`] values.
//!
//! Uses the source's [`ZoneFieldMapping`] to pull the zone id, name,
//! borough and service category out of each feature's properties,
//! regardless of how a particular export names them.

use std::collections::BTreeMap;

use geo::{Geometry, MultiPolygon, Polygon};
use geojson::Feature;
use taxi_map_zone_models::{ServiceCategory, ZoneFieldMapping, ZonePolygon};

/// Normalizes features into zones, ordered by zone id.
///
/// Skips features with a missing or invalid id or with non-polygonal
/// geometry. Features sharing an id are merged into one multipolygon; the
/// first feature's attributes win.
#[must_use]
pub fn normalize_features(features: &[Feature], fields: &ZoneFieldMapping) -> Vec<ZonePolygon> {
    let mut zones: BTreeMap<u32, ZonePolygon> = BTreeMap::new();

    for (index, feature) in features.iter().enumerate() {
        let Some(zone) = normalize_feature(feature, fields) else {
            log::warn!("Skipping zone feature #{index}: missing id or polygon geometry");
            continue;
        };

        if let Some(existing) = zones.get_mut(&zone.zone_id) {
            log::debug!(
                "Merging additional geometry into zone {} ({})",
                zone.zone_id,
                existing.zone_name
            );
            existing.geometry.0.extend(zone.geometry.0);
        } else {
            zones.insert(zone.zone_id, zone);
        }
    }

    zones.into_values().collect()
}

/// Normalizes a single feature.
fn normalize_feature(feature: &Feature, fields: &ZoneFieldMapping) -> Option<ZonePolygon> {
    let zone_id = feature.property(&fields.zone_id).and_then(parse_zone_id)?;

    let geometry = feature.geometry.clone()?;
    let geometry = Geometry::<f64>::try_from(geometry).ok()?;
    let geometry = to_multipolygon(geometry)?;

    Some(ZonePolygon {
        zone_id,
        zone_name: property_text(feature, &fields.zone_name),
        borough: property_text(feature, &fields.borough),
        service_category: ServiceCategory::from_label(&property_text(
            feature,
            &fields.service_zone,
        )),
        geometry,
    })
}

/// Accepts ids as JSON integers, integral floats, or numeric strings.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]
fn parse_zone_id(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))
                    .map(|f| f as u64)
            })
            .and_then(|id| u32::try_from(id).ok()),
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            trimmed.parse::<u32>().ok().or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))
                    .map(|f| f as u32)
            })
        }
        _ => None,
    }
}

fn property_text(feature: &Feature, key: &str) -> String {
    match feature.property(key) {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Collects the polygonal parts of a geometry. Returns `None` when there
/// are none.
fn to_multipolygon(geometry: Geometry<f64>) -> Option<MultiPolygon<f64>> {
    let mut polygons: Vec<Polygon<f64>> = Vec::new();
    collect_polygons(geometry, &mut polygons);
    if polygons.is_empty() {
        None
    } else {
        Some(MultiPolygon(polygons))
    }
}

fn collect_polygons(geometry: Geometry<f64>, out: &mut Vec<Polygon<f64>>) {
    match geometry {
        Geometry::Polygon(p) => out.push(p),
        Geometry::MultiPolygon(mp) => out.extend(mp.0),
        Geometry::GeometryCollection(gc) => {
            for g in gc.0 {
                collect_polygons(g, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> ZoneFieldMapping {
        ZoneFieldMapping {
            zone_id: "LocationID".to_string(),
            zone_name: "zone".to_string(),
            borough: "borough".to_string(),
            service_zone: "service_zone".to_string(),
        }
    }

    fn feature(value: serde_json::Value) -> Feature {
        Feature::from_json_value(value).unwrap()
    }

    fn square_feature(id: serde_json::Value, x: f64, name: &str) -> Feature {
        feature(serde_json::json!({
            "type": "Feature",
            "properties": {
                "LocationID": id,
                "zone": name,
                "borough": "Queens",
                "service_zone": "Boro Zone"
            },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[x, 40.0], [x + 1.0, 40.0], [x + 1.0, 41.0], [x, 41.0], [x, 40.0]]]
            }
        }))
    }

    #[test]
    fn merges_features_sharing_an_id() {
        let features = vec![
            square_feature(serde_json::json!(103), -74.0, "Governor's Island"),
            square_feature(serde_json::json!(103), -72.0, "Ellis Island"),
            square_feature(serde_json::json!(56), -70.0, "Corona"),
        ];

        let zones = normalize_features(&features, &fields());
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].zone_id, 56);
        assert_eq!(zones[1].zone_id, 103);
        assert_eq!(zones[1].geometry.0.len(), 2);
        assert_eq!(zones[1].zone_name, "Governor's Island");
    }

    #[test]
    fn accepts_string_and_float_ids() {
        let features = vec![
            square_feature(serde_json::json!("7"), -74.0, "Astoria"),
            square_feature(serde_json::json!(8.0), -72.0, "Astoria Park"),
        ];
        let ids: Vec<u32> = normalize_features(&features, &fields())
            .iter()
            .map(|z| z.zone_id)
            .collect();
        assert_eq!(ids, vec![7, 8]);
    }

    #[test]
    fn skips_features_without_id_or_polygon() {
        let features = vec![
            square_feature(serde_json::json!(null), -74.0, "No id"),
            square_feature(serde_json::json!(-3), -74.0, "Negative id"),
            feature(serde_json::json!({
                "type": "Feature",
                "properties": { "LocationID": 9 },
                "geometry": { "type": "Point", "coordinates": [-73.9, 40.7] }
            })),
            feature(serde_json::json!({
                "type": "Feature",
                "properties": { "LocationID": 10 },
                "geometry": null
            })),
        ];
        assert!(normalize_features(&features, &fields()).is_empty());
    }

    #[test]
    fn missing_service_label_falls_back_to_other() {
        let f = feature(serde_json::json!({
            "type": "Feature",
            "properties": { "LocationID": 264, "zone": "NV", "borough": "Unknown" },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
            }
        }));
        let zones = normalize_features(&[f], &fields());
        assert_eq!(zones[0].service_category, ServiceCategory::Other);
        assert_eq!(zones[0].borough, "Unknown");
    }
}
