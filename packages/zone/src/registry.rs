//! Compile-time registry of zone geometry sources.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! Adding a new zone export requires creating a TOML file in `sources/` and
//! adding a corresponding entry here.

use taxi_map_zone_models::ZoneSourceDefinition;

/// Number of registered zone sources. Enforced by a test.
#[cfg(test)]
const EXPECTED_SOURCE_COUNT: usize = 2;

/// Id of the source used when none is specified.
pub const DEFAULT_ZONE_SOURCE: &str = "tlc_taxi_zones";

/// Embedded TOML source definitions.
const SOURCE_TOMLS: &[(&str, &str)] = &[
    (
        "tlc_taxi_zones",
        include_str!("../sources/tlc_taxi_zones.toml"),
    ),
    (
        "tlc_taxi_zones_wgs84",
        include_str!("../sources/tlc_taxi_zones_wgs84.toml"),
    ),
];

/// Returns all registered zone sources.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. These are compile-time
/// constants, so a parse failure is a development error caught by tests.
#[must_use]
pub fn all_sources() -> Vec<ZoneSourceDefinition> {
    SOURCE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse zone source '{name}': {e}"))
        })
        .collect()
}

/// Looks up a registered zone source by id.
#[must_use]
pub fn find_source(id: &str) -> Option<ZoneSourceDefinition> {
    all_sources().into_iter().find(|s| s.id == id)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use taxi_map_zone_models::Crs;

    use super::*;

    #[test]
    fn loads_all_sources() {
        let sources = all_sources();
        assert_eq!(
            sources.len(),
            EXPECTED_SOURCE_COUNT,
            "Expected {EXPECTED_SOURCE_COUNT} zone sources, found {}. \
             Update EXPECTED_SOURCE_COUNT after adding/removing sources.",
            sources.len()
        );
    }

    #[test]
    fn source_ids_are_unique_and_match_registry_names() {
        let mut seen = BTreeSet::new();
        for ((name, _), source) in SOURCE_TOMLS.iter().zip(all_sources()) {
            assert_eq!(*name, source.id, "Registry name and TOML id disagree");
            assert!(seen.insert(source.id.clone()), "Duplicate zone source ID: {}", source.id);
        }
    }

    #[test]
    fn default_source_is_state_plane() {
        let source = find_source(DEFAULT_ZONE_SOURCE).expect("default source registered");
        assert_eq!(source.crs, Crs::NyLongIslandFt);
        assert_eq!(source.fields.zone_id, "LocationID");
        assert!(find_source("missing").is_none());
    }
}
