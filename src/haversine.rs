//! Great-circle geometry helpers.
//!
//! Straight-line distance is used to tag place candidates with their distance
//! from the request center and to approximate viewport extents; it ignores
//! the road network, which is fine for those purposes.

use crate::models::{LatLng, Viewport};

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points in kilometers.
pub fn distance_km(from: LatLng, to: LatLng) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Approximate viewport area in square kilometers, measured along its edges.
pub fn viewport_area_km2(viewport: &Viewport) -> f64 {
    let width_km = distance_km(
        viewport.low,
        LatLng::new(viewport.low.lat, viewport.high.lng),
    );
    let height_km = distance_km(
        viewport.low,
        LatLng::new(viewport.high.lat, viewport.low.lng),
    );
    width_km * height_km
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_is_zero() {
        let p = LatLng::new(1.2834, 103.8607);
        assert!(distance_km(p, p) < 0.001);
    }

    #[test]
    fn known_distance() {
        // Marina Bay to Changi Airport, roughly 17 km.
        let marina = LatLng::new(1.2834, 103.8607);
        let changi = LatLng::new(1.3644, 103.9915);
        let d = distance_km(marina, changi);
        assert!(d > 15.0 && d < 20.0, "expected ~17km, got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = LatLng::new(1.30, 103.80);
        let b = LatLng::new(1.35, 103.90);
        assert!((distance_km(a, b) - distance_km(b, a)).abs() < 1e-9);
    }

    #[test]
    fn viewport_area_positive() {
        let viewport = Viewport {
            low: LatLng::new(1.28, 103.84),
            high: LatLng::new(1.30, 103.88),
        };
        let area = viewport_area_km2(&viewport);
        assert!(area > 0.0 && area < 50.0);
    }
}
