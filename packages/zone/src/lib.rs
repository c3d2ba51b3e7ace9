#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Taxi zone loading.
//!
//! Reads zone boundaries from a `GeoJSON` `FeatureCollection`, maps feature
//! properties through a [`ZoneSourceDefinition`], and produces one
//! [`ZonePolygon`] per zone id. Zone sources are defined as TOML files
//! embedded at compile time (see [`registry`]).

pub mod normalize;
pub mod registry;

use std::path::Path;

use geojson::GeoJson;
use taxi_map_zone_models::{ZonePolygon, ZoneSourceDefinition};
use thiserror::Error;

/// Errors that can occur while loading zones.
#[derive(Debug, Error)]
pub enum ZoneError {
    /// Reading the zone file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The input parsed but is not a `FeatureCollection`.
    #[error("Expected a GeoJSON FeatureCollection, found a {found}")]
    NotFeatureCollection {
        /// The top-level `GeoJSON` object kind that was found.
        found: &'static str,
    },

    /// Every feature was skipped.
    #[error("No usable zones in source '{source_id}'")]
    NoZones {
        /// The zone source definition id.
        source_id: String,
    },
}

/// Parses a `GeoJSON` document into zone polygons, ordered by zone id.
///
/// # Errors
///
/// Returns [`ZoneError`] if the document is not a `FeatureCollection` or if
/// no feature yields a usable zone.
pub fn load_zones(
    geojson_str: &str,
    source: &ZoneSourceDefinition,
) -> Result<Vec<ZonePolygon>, ZoneError> {
    let geojson: GeoJson = geojson_str.parse()?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        GeoJson::Feature(_) => return Err(ZoneError::NotFeatureCollection { found: "Feature" }),
        GeoJson::Geometry(_) => {
            return Err(ZoneError::NotFeatureCollection { found: "Geometry" });
        }
    };

    let zones = normalize::normalize_features(&collection.features, &source.fields);

    if zones.is_empty() {
        return Err(ZoneError::NoZones {
            source_id: source.id.clone(),
        });
    }

    log::info!(
        "Loaded {} zones from {} features ({})",
        zones.len(),
        collection.features.len(),
        source.name()
    );

    Ok(zones)
}

/// Reads and parses a `GeoJSON` zone file.
///
/// # Errors
///
/// Returns [`ZoneError::Io`] if the file cannot be read, otherwise the same
/// errors as [`load_zones`].
pub fn load_zones_from_path(
    path: &Path,
    source: &ZoneSourceDefinition,
) -> Result<Vec<ZonePolygon>, ZoneError> {
    log::debug!("Reading zones from {}", path.display());
    let contents = std::fs::read_to_string(path)?;
    load_zones(&contents, source)
}

#[cfg(test)]
mod tests {
    use taxi_map_zone_models::{Crs, ServiceCategory, ZoneFieldMapping};

    use super::*;

    fn definition() -> ZoneSourceDefinition {
        ZoneSourceDefinition {
            id: "test".to_string(),
            name: "Test zones".to_string(),
            crs: Crs::Wgs84,
            fields: ZoneFieldMapping {
                zone_id: "LocationID".to_string(),
                zone_name: "zone".to_string(),
                borough: "borough".to_string(),
                service_zone: "service_zone".to_string(),
            },
        }
    }

    #[test]
    fn loads_feature_collection() {
        let doc = serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {
                    "LocationID": 132,
                    "zone": "JFK Airport",
                    "borough": "Queens",
                    "service_zone": "Airports"
                },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-73.8, 40.63], [-73.77, 40.63], [-73.77, 40.66], [-73.8, 40.63]]]
                }
            }]
        });

        let zones = load_zones(&doc.to_string(), &definition()).unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].zone_id, 132);
        assert_eq!(zones[0].service_category, ServiceCategory::Airports);
    }

    #[test]
    fn rejects_bare_geometry() {
        let doc = r#"{"type": "Point", "coordinates": [-73.9, 40.7]}"#;
        let err = load_zones(doc, &definition()).unwrap_err();
        assert!(
            matches!(err, ZoneError::NotFeatureCollection { found: "Geometry" }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn rejects_collection_without_usable_zones() {
        let doc = r#"{"type": "FeatureCollection", "features": []}"#;
        let err = load_zones(doc, &definition()).unwrap_err();
        assert!(matches!(err, ZoneError::NoZones { .. }));
    }

    #[test]
    fn reports_missing_file() {
        let err = load_zones_from_path(Path::new("/nonexistent/zones.geojson"), &definition())
            .unwrap_err();
        assert!(matches!(err, ZoneError::Io(_)));
    }
}
