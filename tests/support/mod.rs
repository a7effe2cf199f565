//! Shared mock oracles for integration tests.
//!
//! The mocks are deterministic: the same center and category always produce
//! the same places, and the directions mock derives its geometry from the
//! actual waypoint coordinates, so viewport and polyline assertions are
//! meaningful.

use std::collections::HashMap;
use std::sync::Mutex;

use trail_planner::error::OracleError;
use trail_planner::models::{LatLng, PlaceCandidate, RouteGeometry, Viewport};
use trail_planner::traits::{Directions, PlaceSearch};
use trail_planner::{haversine, polyline};

/// Deterministic spread of places for one category around a center.
pub fn seeded_places(center: LatLng, category: &str, count: usize) -> Vec<PlaceCandidate> {
    let category_offset = category.len() as f64 * 0.0007;
    (0..count)
        .map(|i| {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            let location = LatLng::new(
                center.lat + sign * (0.001 + 0.0004 * i as f64),
                center.lng + category_offset + sign * 0.0003 * i as f64,
            );
            PlaceCandidate {
                place_id: format!("{category}_{i}"),
                name: format!("{category} place {i}"),
                category: category.to_string(),
                search_category: category.to_string(),
                location,
                rating: 3.5 + (i % 4) as f64 * 0.5,
                distance_km: haversine::distance_km(center, location),
            }
        })
        .collect()
}

/// Place-search mock backed by `seeded_places`, recording every place it
/// has served so the directions mock can resolve ids back to coordinates.
#[derive(Default)]
pub struct MockPlaces {
    pub per_category: HashMap<String, usize>,
    pub served: Mutex<HashMap<String, LatLng>>,
}

impl MockPlaces {
    pub fn with_categories(per_category: &[(&str, usize)]) -> Self {
        Self {
            per_category: per_category
                .iter()
                .map(|(c, n)| (c.to_string(), *n))
                .collect(),
            served: Mutex::new(HashMap::new()),
        }
    }
}

impl PlaceSearch for MockPlaces {
    fn find_nearby(
        &self,
        center: LatLng,
        _radius_km: f64,
        category: &str,
        max_results: usize,
    ) -> Result<Vec<PlaceCandidate>, OracleError> {
        let count = self.per_category.get(category).copied().unwrap_or(0);
        let places = seeded_places(center, category, count.min(max_results));
        let mut served = self.served.lock().unwrap();
        for place in &places {
            served.insert(place.place_id.clone(), place.location);
        }
        Ok(places)
    }
}

/// Directions mock that builds a loop geometry through the actual waypoint
/// coordinates previously served by `MockPlaces`.
pub struct MockDirections<'a> {
    pub places: &'a MockPlaces,
}

impl Directions for MockDirections<'_> {
    fn loop_route(
        &self,
        center: LatLng,
        waypoint_ids: &[String],
    ) -> Result<RouteGeometry, OracleError> {
        let served = self.places.served.lock().unwrap();
        let mut points = vec![center];
        for id in waypoint_ids {
            let location = served.get(id).ok_or(OracleError::EmptyResponse)?;
            points.push(*location);
        }
        points.push(center);

        let mut distance_km = 0.0;
        for pair in points.windows(2) {
            distance_km += haversine::distance_km(pair[0], pair[1]);
        }
        let distance_m = (distance_km * 1000.0).round() as u32;
        let viewport = polyline::bounding_viewport(&points).ok_or(OracleError::EmptyResponse)?;

        Ok(RouteGeometry {
            polyline: polyline::encode(&points),
            distance_m,
            // Walking pace of roughly 1.4 m/s.
            duration_s: (distance_m as f64 / 1.4).round() as u32,
            viewport,
        })
    }
}

/// Directions mock that fails every attempt.
pub struct BrokenDirections;

impl Directions for BrokenDirections {
    fn loop_route(
        &self,
        _center: LatLng,
        _waypoint_ids: &[String],
    ) -> Result<RouteGeometry, OracleError> {
        Err(OracleError::EmptyResponse)
    }
}
