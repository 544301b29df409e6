//! Great-circle geometry for vehicle positions.
//!
//! Positions are WGS84 degrees. Distances use the haversine formula on a
//! spherical Earth, which is accurate to well under a percent at city scale.
//!
//! [`distance_km`] is deliberately unrounded so it composes; call sites that
//! display or compare distances round with [`round_km`].

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Degrees to radians conversion factor.
const DEG_TO_RAD: f64 = PI / 180.0;

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees (-90 to 90).
    pub lat: f64,
    /// Longitude in degrees (-180 to 180).
    pub lng: f64,
}

impl GeoPoint {
    /// Create a point from latitude and longitude in degrees.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Haversine distance to another point in kilometres (unrounded).
    #[inline]
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        distance_km(self.lat, self.lng, other.lat, other.lng)
    }

    /// Check that both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lng)
    }
}

/// Calculate the great-circle distance between two coordinates.
///
/// # Arguments
///
/// * `lat1`, `lon1` - First position in degrees
/// * `lat2`, `lon2` - Second position in degrees
///
/// # Returns
///
/// Distance in kilometres. NaN inputs yield NaN.
///
/// # Example
///
/// ```
/// use fleetlink::geo::distance_km;
///
/// // One degree of latitude is ~111 km
/// let dist = distance_km(0.0, 0.0, 1.0, 0.0);
/// assert!((dist - 111.19).abs() < 0.01);
/// ```
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1 * DEG_TO_RAD;
    let lat2_rad = lat2 * DEG_TO_RAD;
    let delta_lat = (lat2 - lat1) * DEG_TO_RAD;
    let delta_lon = (lon2 - lon1) * DEG_TO_RAD;

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Round a distance to two decimal places (10 m resolution).
#[inline]
pub fn round_km(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_zero() {
        for x in [-80.0, -12.5, 0.0, 12.9716, 45.0, 77.5946] {
            assert_eq!(distance_km(x, x, x, x), 0.0);
        }
    }

    #[test]
    fn test_distance_symmetry() {
        let ab = distance_km(45.0, -122.0, 46.0, -121.0);
        let ba = distance_km(46.0, -121.0, 45.0, -122.0);
        assert!((ab - ba).abs() < 1e-9, "Distance should be symmetric");
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        let dist = distance_km(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111.195).abs() < 0.01, "got {}", dist);
    }

    #[test]
    fn test_distance_bangalore_pair() {
        // MG Road to Indiranagar, reference haversine value 1.6403 km
        let dist = distance_km(12.9716, 77.5946, 12.9747, 77.6094);
        assert!((dist - 1.6403).abs() < 0.001, "got {}", dist);
        assert_eq!(round_km(dist), 1.64);
    }

    #[test]
    fn test_distance_nan_propagates() {
        assert!(distance_km(f64::NAN, 0.0, 1.0, 1.0).is_nan());
    }

    #[test]
    fn test_geopoint_distance_matches_free_function() {
        let a = GeoPoint::new(43.6, 1.4);
        let b = GeoPoint::new(49.0, 2.5);
        assert_eq!(a.distance_km(&b), distance_km(43.6, 1.4, 49.0, 2.5));
        assert!((a.distance_km(&b) - 606.35).abs() < 0.1);
    }

    #[test]
    fn test_round_km() {
        assert_eq!(round_km(1.234), 1.23);
        assert_eq!(round_km(1.235_1), 1.24);
        assert_eq!(round_km(0.0), 0.0);
    }

    #[test]
    fn test_geopoint_is_finite() {
        assert!(GeoPoint::new(1.0, 2.0).is_finite());
        assert!(!GeoPoint::new(f64::NAN, 2.0).is_finite());
        assert!(!GeoPoint::new(1.0, f64::INFINITY).is_finite());
    }
}
