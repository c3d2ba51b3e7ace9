#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Taxi zone definition types.
//!
//! Defines the TOML schema for zone geometry sources, the coordinate
//! reference systems zone datasets are published in, and the [`ZonePolygon`]
//! produced after loading.

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Coordinate reference systems zone datasets may be published in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Crs {
    /// EPSG:4326, longitude/latitude in decimal degrees.
    Wgs84,
    /// EPSG:2263, NAD83 / New York Long Island in US survey feet.
    NyLongIslandFt,
}

/// The TLC service category a zone belongs to.
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
pub enum ServiceCategory {
    /// Manhattan core, served primarily by yellow cabs.
    #[strum(serialize = "Yellow Zone")]
    YellowZone,
    /// Outer borough zones.
    #[strum(serialize = "Boro Zone")]
    BoroZone,
    /// JFK and `LaGuardia`.
    #[strum(serialize = "Airports")]
    Airports,
    /// Newark Liberty International.
    #[strum(serialize = "EWR")]
    Ewr,
    /// Anything unlabeled or unrecognized.
    #[strum(serialize = "Other")]
    Other,
}

impl ServiceCategory {
    /// Parses a source label, falling back to [`ServiceCategory::Other`] for
    /// unknown or empty values. Matching ignores case and surrounding
    /// whitespace.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        Self::all()
            .iter()
            .copied()
            .find(|category| category.as_ref().eq_ignore_ascii_case(trimmed))
            .unwrap_or(Self::Other)
    }

    /// Whether trips ending in this category count as airport trips.
    #[must_use]
    pub const fn is_airport(self) -> bool {
        matches!(self, Self::Airports | Self::Ewr)
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::YellowZone,
            Self::BoroZone,
            Self::Airports,
            Self::Ewr,
            Self::Other,
        ]
    }
}

/// One named taxi zone.
///
/// Geometry is kept in whatever CRS the zone source declares until the
/// spatial index reprojects it.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonePolygon {
    /// Unique, stable zone identifier (TLC `LocationID`).
    pub zone_id: u32,
    /// Human-readable zone name (e.g. "Midtown Center").
    pub zone_name: String,
    /// Borough name.
    pub borough: String,
    pub service_category: ServiceCategory,
    pub geometry: MultiPolygon<f64>,
}

/// A zone geometry source, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneSourceDefinition {
    /// Unique source identifier (e.g. `"tlc_taxi_zones"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// CRS the feature geometries are published in.
    pub crs: Crs,
    /// Property names for each zone attribute.
    pub fields: ZoneFieldMapping,
}

impl ZoneSourceDefinition {
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
}

/// Maps `GeoJSON` feature property names to zone attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneFieldMapping {
    /// Property holding the integer zone id.
    pub zone_id: String,
    /// Property holding the zone name.
    pub zone_name: String,
    /// Property holding the borough name.
    pub borough: String,
    /// Property holding the service category label.
    pub service_zone: String,
}
