//! Source registry: loads trip source definitions from embedded TOML.
//!
//! Each `.toml` file in `packages/source/sources/` is baked into the binary
//! at compile time via [`include_str!`]. Adding an export layout means
//! creating a TOML file and adding it to the list below.

use crate::source_def::{SourceDefinition, parse_source_toml};

/// Id of the source used when none is specified.
pub const DEFAULT_SOURCE: &str = "yellow_taxi";

/// TOML configs embedded at compile time.
const SOURCE_TOMLS: &[(&str, &str)] = &[
    ("yellow_taxi", include_str!("../sources/yellow_taxi.toml")),
    (
        "yellow_taxi_gz",
        include_str!("../sources/yellow_taxi_gz.toml"),
    ),
];

/// Number of registered sources. Enforced by a test.
#[cfg(test)]
const EXPECTED_SOURCE_COUNT: usize = 2;

/// Returns all registered source definitions.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_sources() -> Vec<SourceDefinition> {
    SOURCE_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_source_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up a registered source by id.
#[must_use]
pub fn find_source(id: &str) -> Option<SourceDefinition> {
    all_sources().into_iter().find(|s| s.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_def::{CanonicalField, Compression};

    #[test]
    fn loads_all_sources() {
        let sources = all_sources();
        assert_eq!(sources.len(), EXPECTED_SOURCE_COUNT);
    }

    #[test]
    fn source_ids_are_unique() {
        let sources = all_sources();
        let mut ids: Vec<&str> = sources.iter().map(|s| s.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), EXPECTED_SOURCE_COUNT);
    }

    #[test]
    fn every_source_maps_every_canonical_field() {
        for source in &all_sources() {
            for &field in CanonicalField::all() {
                assert!(
                    !source.fields.column(field).candidates().is_empty(),
                    "{}: no column for {field}",
                    source.id
                );
            }
        }
    }

    #[test]
    fn default_source_accepts_both_rate_code_spellings() {
        let source = find_source(DEFAULT_SOURCE).expect("default source registered");
        assert_eq!(source.compression, Compression::None);
        assert_eq!(
            source.fields.rate_code.candidates(),
            ["RateCodeID".to_string(), "RatecodeID".to_string()]
        );
        assert_eq!(
            find_source("yellow_taxi_gz").map(|s| s.compression),
            Some(Compression::Gzip)
        );
    }
}
