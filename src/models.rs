//! Core domain types for the route-recommendation pipeline.
//!
//! `RouteCriteria` arrives from the external query parser and is treated as
//! read-only for the lifetime of a request. Everything else is per-request
//! ephemeral state, except the model artifacts which live in `ranking` and
//! `cluster`.

use serde::{Deserialize, Serialize};

use crate::error::PlannerError;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Loop vs point-to-point. The pipeline only generates loops today; the
/// variant is kept explicit so criteria echo back exactly what was asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteType {
    Loop,
    PointToPoint,
}

/// Search criteria produced by the query parser.
///
/// Immutable throughout the pipeline and echoed into the response so the
/// client can correlate feedback with the request that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCriteria {
    pub center: LatLng,
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
    #[serde(default)]
    pub duration_min: Option<u32>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub include_categories: Vec<String>,
    #[serde(default)]
    pub avoid_categories: Vec<String>,
    #[serde(default)]
    pub pet_friendly: bool,
    #[serde(default)]
    pub elevation_gain_min_m: Option<u32>,
    #[serde(default = "default_route_type")]
    pub route_type: RouteType,
    /// Time-of-day hint, e.g. "morning" or "evening".
    #[serde(default)]
    pub time_window: Option<String>,
}

fn default_radius_km() -> f64 {
    5.0
}

fn default_route_type() -> RouteType {
    RouteType::Loop
}

impl RouteCriteria {
    pub fn new(center: LatLng) -> Self {
        Self {
            center,
            radius_km: default_radius_km(),
            duration_min: Some(30),
            distance_km: None,
            include_categories: Vec::new(),
            avoid_categories: Vec::new(),
            pet_friendly: false,
            elevation_gain_min_m: None,
            route_type: RouteType::Loop,
            time_window: None,
        }
    }

    /// Rejects malformed criteria before recall spends any oracle quota.
    ///
    /// This is the only check in the pipeline allowed to fail a request hard.
    pub fn validate(&self) -> Result<(), PlannerError> {
        if !(-90.0..=90.0).contains(&self.center.lat)
            || !(-180.0..=180.0).contains(&self.center.lng)
        {
            return Err(PlannerError::InvalidCriteria(format!(
                "center ({}, {}) is not a valid coordinate",
                self.center.lat, self.center.lng
            )));
        }
        if !self.radius_km.is_finite() || self.radius_km <= 0.0 {
            return Err(PlannerError::InvalidCriteria(format!(
                "radius_km must be positive, got {}",
                self.radius_km
            )));
        }
        if let Some(d) = self.distance_km {
            if !d.is_finite() || d <= 0.0 {
                return Err(PlannerError::InvalidCriteria(format!(
                    "distance_km must be positive, got {d}"
                )));
            }
        }
        Ok(())
    }
}

/// A point of interest returned by the place-search oracle, tagged with the
/// category it was searched under and its straight-line distance from the
/// request center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub place_id: String,
    pub name: String,
    /// Category derived from the provider's own type tags.
    pub category: String,
    /// Category the search was issued under.
    pub search_category: String,
    pub location: LatLng,
    pub rating: f64,
    pub distance_km: f64,
}

/// Bounding box for map display, as low/high corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub low: LatLng,
    pub high: LatLng,
}

impl Viewport {
    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.low.lat
            && point.lat <= self.high.lat
            && point.lng >= self.low.lng
            && point.lng <= self.high.lng
    }

    /// Approximate area in squared degrees, used as a compactness proxy.
    pub fn area_deg2(&self) -> f64 {
        (self.high.lat - self.low.lat).abs() * (self.high.lng - self.low.lng).abs()
    }
}

/// Geometry returned by the directions oracle for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteGeometry {
    /// Encoded polyline (Google polyline5 format).
    pub polyline: String,
    pub distance_m: u32,
    pub duration_s: u32,
    pub viewport: Viewport,
}

/// Provenance recorded on every candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteMetadata {
    pub center: LatLng,
    pub search_radius_km: f64,
    pub route_type: RouteType,
    /// Distinct search categories of the waypoints actually used.
    pub categories_used: Vec<String>,
}

/// A fully-geometried route proposal. Created per request, scored and
/// cluster-labelled in place, discarded after the response is assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCandidate {
    pub id: String,
    /// Ordered waypoints; always 2 or 3, unique place ids.
    pub waypoints: Vec<PlaceCandidate>,
    pub geometry: RouteGeometry,
    pub metadata: RouteMetadata,
    pub score: f64,
    pub cluster: Option<usize>,
}

/// One labeled record of the append-only training dataset.
///
/// `label` is the feedback signal: 1.0 when the user selected the route,
/// 0.0 otherwise. Feature vectors are stored pre-extracted together with the
/// schema versions they were extracted under, so the trainer can skip stale
/// records after a layout change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub ranking_features: Vec<f64>,
    pub cluster_features: Vec<f64>,
    pub label: f64,
    pub ranking_schema: u32,
    pub cluster_schema: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_defaults() {
        let criteria = RouteCriteria::new(LatLng::new(1.2834, 103.8607));
        assert!(criteria.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_coordinates() {
        let criteria = RouteCriteria::new(LatLng::new(91.0, 0.0));
        assert!(criteria.validate().is_err());
    }

    #[test]
    fn validate_rejects_nonpositive_radius() {
        let mut criteria = RouteCriteria::new(LatLng::new(1.0, 103.0));
        criteria.radius_km = 0.0;
        assert!(criteria.validate().is_err());
    }

    #[test]
    fn viewport_contains_corners() {
        let viewport = Viewport {
            low: LatLng::new(1.0, 103.0),
            high: LatLng::new(2.0, 104.0),
        };
        assert!(viewport.contains(LatLng::new(1.0, 103.0)));
        assert!(viewport.contains(LatLng::new(2.0, 104.0)));
        assert!(!viewport.contains(LatLng::new(2.1, 103.5)));
    }

    #[test]
    fn criteria_round_trips_through_json() {
        let criteria = RouteCriteria {
            include_categories: vec!["park".into(), "restaurant".into()],
            pet_friendly: true,
            ..RouteCriteria::new(LatLng::new(1.2834, 103.8607))
        };
        let json = serde_json::to_string(&criteria).unwrap();
        let back: RouteCriteria = serde_json::from_str(&json).unwrap();
        assert_eq!(criteria, back);
    }
}
