//! Geographic points, great-circle distance and rectangular search regions.

use serde::{Deserialize, Serialize};

/// Approximate length of one degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A WGS84 coordinate. Longitude first, matching GeoJSON and KML ordering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Finite and inside the WGS84 coordinate ranges.
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// Haversine distance in meters.
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lon = (other.lon - self.lon).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().min(1.0).asin();

        EARTH_RADIUS_METERS * c
    }
}

/// Axis-aligned search rectangle in degrees.
///
/// Built by converting a radius in meters into degree offsets rather than by
/// geodesic buffering. Adequate for sub-kilometer radii away from the poles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Rectangle centered on `center` extending `radius_m` in each direction.
    ///
    /// The longitude offset is widened by `1 / |cos(lat)|` to compensate for
    /// meridian convergence; it is capped at 180 degrees near the poles.
    pub fn around(center: GeoPoint, radius_m: f64) -> Self {
        let delta_lat = radius_m / METERS_PER_DEGREE;
        let cos_lat = center.lat.to_radians().cos().abs();
        let delta_lon = if cos_lat > f64::EPSILON {
            (radius_m / (METERS_PER_DEGREE * cos_lat)).min(180.0)
        } else {
            180.0
        };

        Self {
            min_lat: center.lat - delta_lat,
            min_lon: center.lon - delta_lon,
            max_lat: center.lat + delta_lat,
            max_lon: center.lon + delta_lon,
        }
    }

    pub fn lat_delta(&self) -> f64 {
        (self.max_lat - self.min_lat) / 2.0
    }

    pub fn lon_delta(&self) -> f64 {
        (self.max_lon - self.min_lon) / 2.0
    }

    pub fn contains(&self, p: &GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&p.lat)
            && (self.min_lon..=self.max_lon).contains(&p.lon)
    }

    /// Overpass QL bbox filter order: `(south, west, north, east)`.
    pub fn to_overpass(&self) -> String {
        format!(
            "({:.7},{:.7},{:.7},{:.7})",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }
}
