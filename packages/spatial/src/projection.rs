//! Reprojection of zone geometry into WGS84.
//!
//! Trip coordinates arrive as WGS84 longitude/latitude, while the TLC zone
//! dataset is published in EPSG:2263 (NAD83 / New York Long Island, US survey
//! feet). Zone geometry is converted once, before the spatial index is built,
//! so that no per-trip transform is needed.

use std::f64::consts::FRAC_PI_2;

use geo::{Coord, MapCoords, MultiPolygon};
use taxi_map_zone_models::Crs;

/// Semi-major axis of the GRS80 ellipsoid in meters.
const GRS80_A: f64 = 6_378_137.0;
/// Inverse flattening of the GRS80 ellipsoid.
const GRS80_INV_F: f64 = 298.257_222_101;
/// One US survey foot in meters.
const US_SURVEY_FOOT: f64 = 1200.0 / 3937.0;

const MAX_LATITUDE_ITERATIONS: usize = 15;
const LATITUDE_TOLERANCE: f64 = 1e-12;

/// Lambert Conformal Conic (two standard parallels) on an ellipsoid.
///
/// Formulas follow Snyder, *Map Projections: A Working Manual*, pp. 107-109.
#[derive(Debug, Clone, Copy)]
struct LambertConformalConic {
    a: f64,
    e: f64,
    n: f64,
    big_f: f64,
    rho0: f64,
    lon0: f64,
    false_easting: f64,
    false_northing: f64,
    /// Meters per projected unit.
    unit: f64,
}

impl LambertConformalConic {
    /// EPSG:2263 parameters.
    fn ny_long_island_ft() -> Self {
        Self::new(
            dms(41.0, 2.0),
            dms(40.0, 40.0),
            dms(40.0, 10.0),
            -74.0,
            300_000.0,
            0.0,
            US_SURVEY_FOOT,
        )
    }

    fn new(
        parallel_1: f64,
        parallel_2: f64,
        origin_lat: f64,
        origin_lon: f64,
        false_easting: f64,
        false_northing: f64,
        unit: f64,
    ) -> Self {
        let f = 1.0 / GRS80_INV_F;
        let e = f.mul_add(-f, 2.0 * f).sqrt();

        let phi1 = parallel_1.to_radians();
        let phi2 = parallel_2.to_radians();
        let phi0 = origin_lat.to_radians();

        let m1 = m(e, phi1);
        let m2 = m(e, phi2);
        let t1 = t(e, phi1);
        let t2 = t(e, phi2);
        let t0 = t(e, phi0);

        let n = (m1.ln() - m2.ln()) / (t1.ln() - t2.ln());
        let big_f = m1 / (n * t1.powf(n));
        let rho0 = GRS80_A * big_f * t0.powf(n);

        Self {
            a: GRS80_A,
            e,
            n,
            big_f,
            rho0,
            lon0: origin_lon.to_radians(),
            false_easting,
            false_northing,
            unit,
        }
    }

    /// Projected `(x, y)` in native units to `(longitude, latitude)` degrees.
    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x.mul_add(self.unit, -self.false_easting);
        let dy = self.rho0 - y.mul_add(self.unit, -self.false_northing);

        let rho = self.n.signum() * dx.hypot(dy);
        let theta = if self.n > 0.0 {
            dx.atan2(dy)
        } else {
            (-dx).atan2(-dy)
        };
        let t = (rho / (self.a * self.big_f)).powf(1.0 / self.n);

        let mut phi = 2.0f64.mul_add(-t.atan(), FRAC_PI_2);
        for _ in 0..MAX_LATITUDE_ITERATIONS {
            let es = self.e * phi.sin();
            let next = 2.0f64.mul_add(
                -(t * ((1.0 - es) / (1.0 + es)).powf(self.e / 2.0)).atan(),
                FRAC_PI_2,
            );
            let converged = (next - phi).abs() < LATITUDE_TOLERANCE;
            phi = next;
            if converged {
                break;
            }
        }

        let lambda = theta / self.n + self.lon0;
        (lambda.to_degrees(), phi.to_degrees())
    }

    /// `(longitude, latitude)` degrees to projected `(x, y)` in native units.
    fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let rho = self.a * self.big_f * t(self.e, lat.to_radians()).powf(self.n);
        let theta = self.n * (lon.to_radians() - self.lon0);

        let x = rho.mul_add(theta.sin(), self.false_easting);
        let y = rho.mul_add(-theta.cos(), self.false_northing + self.rho0);
        (x / self.unit, y / self.unit)
    }
}

fn dms(degrees: f64, minutes: f64) -> f64 {
    degrees + minutes / 60.0
}

fn m(e: f64, phi: f64) -> f64 {
    let es = e * phi.sin();
    phi.cos() / es.mul_add(-es, 1.0).sqrt()
}

fn t(e: f64, phi: f64) -> f64 {
    let es = e * phi.sin();
    (std::f64::consts::FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

/// Converts a native coordinate to WGS84 `(longitude, latitude)`.
#[must_use]
pub fn to_wgs84(crs: Crs, x: f64, y: f64) -> (f64, f64) {
    match crs {
        Crs::Wgs84 => (x, y),
        Crs::NyLongIslandFt => LambertConformalConic::ny_long_island_ft().inverse(x, y),
    }
}

/// Converts a WGS84 `(longitude, latitude)` to native coordinates.
#[must_use]
pub fn from_wgs84(crs: Crs, lon: f64, lat: f64) -> (f64, f64) {
    match crs {
        Crs::Wgs84 => (lon, lat),
        Crs::NyLongIslandFt => LambertConformalConic::ny_long_island_ft().forward(lon, lat),
    }
}

/// Reprojects a multipolygon from `crs` into WGS84.
///
/// Returns an unchanged copy when the geometry is already WGS84.
#[must_use]
pub fn reproject_to_wgs84(geometry: &MultiPolygon<f64>, crs: Crs) -> MultiPolygon<f64> {
    match crs {
        Crs::Wgs84 => geometry.clone(),
        Crs::NyLongIslandFt => {
            let projection = LambertConformalConic::ny_long_island_ft();
            geometry.map_coords(|Coord { x, y }| {
                let (lon, lat) = projection.inverse(x, y);
                Coord { x: lon, y: lat }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn origin_maps_to_false_easting() {
        let (x, y) = from_wgs84(Crs::NyLongIslandFt, -74.0, dms(40.0, 10.0));
        assert!((x - 984_250.0).abs() < 1e-3, "x = {x}");
        assert!(y.abs() < 1e-3, "y = {y}");

        let (lon, lat) = to_wgs84(Crs::NyLongIslandFt, 984_250.0, 0.0);
        assert!((lon - -74.0).abs() < 1e-9);
        assert!((lat - dms(40.0, 10.0)).abs() < 1e-9);
    }

    #[test]
    fn round_trips_midtown_and_jfk() {
        for (lon, lat) in [(-73.99, 40.75), (-73.784, 40.644), (-74.17, 40.69)] {
            let (x, y) = from_wgs84(Crs::NyLongIslandFt, lon, lat);
            let (lon2, lat2) = to_wgs84(Crs::NyLongIslandFt, x, y);
            assert!((lon - lon2).abs() < 1e-9, "{lon} vs {lon2}");
            assert!((lat - lat2).abs() < 1e-9, "{lat} vs {lat2}");
        }
    }

    #[test]
    fn midtown_lands_in_expected_state_plane_range() {
        let (x, y) = from_wgs84(Crs::NyLongIslandFt, -73.99, 40.75);
        assert!((980_000.0..1_000_000.0).contains(&x), "x = {x}");
        assert!((200_000.0..230_000.0).contains(&y), "y = {y}");
    }

    #[test]
    fn wgs84_reprojection_is_identity() {
        let polygon = geo::polygon![
            (x: -74.0, y: 40.7),
            (x: -73.9, y: 40.7),
            (x: -73.9, y: 40.8),
            (x: -74.0, y: 40.7),
        ];
        let mp = MultiPolygon(vec![polygon]);
        assert_eq!(reproject_to_wgs84(&mp, Crs::Wgs84), mp);
    }
}
