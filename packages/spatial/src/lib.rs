#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index for taxi zone attribution.
//!
//! Zone polygons are reprojected to WGS84 once, then bulk-loaded into an
//! R-tree keyed on their bounding boxes. Lookups filter candidates by
//! envelope and confirm with an exact point-in-polygon test.

pub mod projection;

use std::collections::BTreeMap;

use geo::{BoundingRect, Intersects, MultiPolygon, Point};
use rstar::{AABB, RTree, RTreeObject};
use taxi_map_zone_models::{Crs, ServiceCategory, ZonePolygon};

/// A zone polygon stored in the R-tree.
struct ZoneEntry {
    zone_id: u32,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for ZoneEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Attributes of an indexed zone, looked up by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneInfo {
    pub zone_name: String,
    pub borough: String,
    pub service_category: ServiceCategory,
}

/// Read-only point-to-zone index.
///
/// Built once from an immutable zone set and shared across worker threads.
/// Points on a shared boundary or inside overlapping zones resolve to the
/// lowest matching zone id, so the answer never depends on R-tree layout.
pub struct GeometryIndex {
    tree: RTree<ZoneEntry>,
    zones: BTreeMap<u32, ZoneInfo>,
}

impl GeometryIndex {
    /// Reprojects `zones` from `crs` into WGS84 and builds the R-tree.
    ///
    /// Zones with empty geometry are kept as attributes but are never
    /// returned by [`Self::resolve`].
    #[must_use]
    pub fn build(zones: &[ZonePolygon], crs: Crs) -> Self {
        let mut entries = Vec::with_capacity(zones.len());
        let mut info = BTreeMap::new();

        for zone in zones {
            let polygon = projection::reproject_to_wgs84(&zone.geometry, crs);

            if let Some(envelope) = compute_envelope(&polygon) {
                entries.push(ZoneEntry {
                    zone_id: zone.zone_id,
                    envelope,
                    polygon,
                });
            } else {
                log::warn!("Zone {} has no geometry, skipping index entry", zone.zone_id);
            }

            info.insert(
                zone.zone_id,
                ZoneInfo {
                    zone_name: zone.zone_name.clone(),
                    borough: zone.borough.clone(),
                    service_category: zone.service_category,
                },
            );
        }

        log::info!(
            "Built zone index with {} polygons ({} zones, source crs {crs})",
            entries.len(),
            info.len()
        );

        Self {
            tree: RTree::bulk_load(entries),
            zones: info,
        }
    }

    /// Returns the id of the zone containing the WGS84 point, if any.
    ///
    /// Boundary points count as inside. Non-finite coordinates resolve to
    /// `None`.
    #[must_use]
    pub fn resolve(&self, lng: f64, lat: f64) -> Option<u32> {
        if !lng.is_finite() || !lat.is_finite() {
            return None;
        }

        let point = Point::new(lng, lat);
        let query_env = AABB::from_point([lng, lat]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.intersects(&point))
            .map(|entry| entry.zone_id)
            .min()
    }

    /// Looks up the attributes of a zone.
    #[must_use]
    pub fn zone(&self, zone_id: u32) -> Option<&ZoneInfo> {
        self.zones.get(&zone_id)
    }

    /// Looks up the service category of a zone.
    #[must_use]
    pub fn service_category(&self, zone_id: u32) -> Option<ServiceCategory> {
        self.zones.get(&zone_id).map(|z| z.service_category)
    }

    /// Iterates indexed zone ids in ascending order.
    pub fn zone_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.zones.keys().copied()
    }

    /// Number of zones known to the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}
