//! Google Maps HTTP adapter for the place-search and directions oracles.
//!
//! Talks to the Places API (New) v1 nearby-search endpoint and the Routes
//! API v2 compute-routes endpoint. Both are POST + JSON with field masks.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::OracleError;
use crate::haversine;
use crate::models::{LatLng, PlaceCandidate, RouteGeometry, Viewport};
use crate::traits::{Directions, PlaceSearch};

/// Search category to Places API included types. Unknown categories fall
/// through to a type-less (any-place) search.
const CATEGORY_TYPES: &[(&str, &[&str])] = &[
    ("park", &["park", "national_park"]),
    ("nature", &["hiking_area", "park"]),
    ("attraction", &["tourist_attraction", "zoo", "aquarium"]),
    ("restaurant", &["restaurant"]),
    ("cafe", &["cafe", "coffee_shop"]),
    ("culture", &["museum", "art_gallery", "library"]),
    ("waterfront", &["marina", "tourist_attraction"]),
];

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub api_key: String,
    pub places_url: String,
    pub routes_url: String,
    pub timeout_secs: u64,
}

impl GoogleConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            places_url: "https://places.googleapis.com/v1/places:searchNearby".to_string(),
            routes_url: "https://routes.googleapis.com/directions/v2:computeRoutes"
                .to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoogleClient {
    config: GoogleConfig,
    client: reqwest::blocking::Client,
}

impl GoogleClient {
    pub fn new(config: GoogleConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        field_mask: &str,
        body: &B,
    ) -> Result<R, OracleError> {
        let response = self
            .client
            .post(url)
            .header("X-Goog-Api-Key", &self.config.api_key)
            .header("X-Goog-FieldMask", field_mask)
            .json(body)
            .send()?;

        match response.status().as_u16() {
            429 => return Err(OracleError::RateLimited),
            401 | 403 => return Err(OracleError::InvalidCredentials),
            _ => {}
        }
        let response = response.error_for_status()?;
        Ok(response.json()?)
    }

    fn types_for(category: &str) -> Vec<String> {
        CATEGORY_TYPES
            .iter()
            .find(|(name, _)| *name == category)
            .map(|(_, types)| types.iter().map(|t| t.to_string()).collect())
            .unwrap_or_default()
    }

    /// Collapses the provider's type tags back into one of our categories.
    fn category_for(types: &[String]) -> String {
        for tag in types {
            for (category, mapped) in CATEGORY_TYPES {
                if mapped.contains(&tag.as_str()) {
                    return (*category).to_string();
                }
            }
        }
        "other".to_string()
    }
}

impl PlaceSearch for GoogleClient {
    fn find_nearby(
        &self,
        center: LatLng,
        radius_km: f64,
        category: &str,
        max_results: usize,
    ) -> Result<Vec<PlaceCandidate>, OracleError> {
        let body = NearbySearchRequest {
            max_result_count: max_results,
            included_types: Self::types_for(category),
            location_restriction: LocationRestriction {
                circle: Circle {
                    center: ApiLatLng { latitude: center.lat, longitude: center.lng },
                    radius: radius_km * 1000.0,
                },
            },
        };

        debug!(category, radius_km, "places: nearby search");
        let response: NearbySearchResponse = self.post(
            &self.config.places_url,
            "places.displayName,places.location,places.rating,places.id,places.types",
            &body,
        )?;

        let places = response
            .places
            .into_iter()
            .map(|place| {
                let location = LatLng::new(place.location.latitude, place.location.longitude);
                PlaceCandidate {
                    place_id: place.id,
                    name: place.display_name.text,
                    category: Self::category_for(&place.types),
                    search_category: category.to_string(),
                    location,
                    rating: place.rating.unwrap_or(0.0),
                    distance_km: haversine::distance_km(center, location),
                }
            })
            .collect();
        Ok(places)
    }
}

impl Directions for GoogleClient {
    fn loop_route(
        &self,
        center: LatLng,
        waypoint_ids: &[String],
    ) -> Result<RouteGeometry, OracleError> {
        let origin = RouteEndpoint::Location {
            location: LocationWrapper {
                lat_lng: ApiLatLng { latitude: center.lat, longitude: center.lng },
            },
        };
        let body = ComputeRoutesRequest {
            origin: origin.clone(),
            destination: origin,
            intermediates: waypoint_ids
                .iter()
                .map(|id| RouteEndpoint::Place { place_id: id.clone() })
                .collect(),
            travel_mode: "WALK",
        };

        debug!(waypoints = waypoint_ids.len(), "routes: compute loop");
        let response: ComputeRoutesResponse = self.post(
            &self.config.routes_url,
            "routes.duration,routes.distanceMeters,routes.polyline.encodedPolyline,routes.viewport",
            &body,
        )?;

        let route = response
            .routes
            .into_iter()
            .next()
            .ok_or(OracleError::EmptyResponse)?;

        Ok(RouteGeometry {
            polyline: route.polyline.encoded_polyline,
            distance_m: route.distance_meters,
            duration_s: parse_duration_s(&route.duration),
            viewport: Viewport {
                low: LatLng::new(route.viewport.low.latitude, route.viewport.low.longitude),
                high: LatLng::new(route.viewport.high.latitude, route.viewport.high.longitude),
            },
        })
    }
}

/// Parses the API's "8752s"-style duration strings.
fn parse_duration_s(duration: &str) -> u32 {
    duration
        .trim()
        .trim_end_matches('s')
        .parse::<f64>()
        .map(|s| s.round() as u32)
        .unwrap_or(0)
}

// Wire types, request side.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NearbySearchRequest {
    max_result_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    included_types: Vec<String>,
    location_restriction: LocationRestriction,
}

#[derive(Debug, Serialize)]
struct LocationRestriction {
    circle: Circle,
}

#[derive(Debug, Serialize)]
struct Circle {
    center: ApiLatLng,
    radius: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiLatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum RouteEndpoint {
    Place {
        #[serde(rename = "placeId")]
        place_id: String,
    },
    Location {
        location: LocationWrapper,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct LocationWrapper {
    lat_lng: ApiLatLng,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ComputeRoutesRequest {
    origin: RouteEndpoint,
    destination: RouteEndpoint,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    intermediates: Vec<RouteEndpoint>,
    travel_mode: &'static str,
}

// Wire types, response side.

#[derive(Debug, Deserialize)]
struct NearbySearchResponse {
    #[serde(default)]
    places: Vec<ApiPlace>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPlace {
    id: String,
    display_name: DisplayName,
    location: ApiLatLng,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DisplayName {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ComputeRoutesResponse {
    #[serde(default)]
    routes: Vec<ApiRoute>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiRoute {
    duration: String,
    distance_meters: u32,
    polyline: ApiPolyline,
    viewport: ApiViewport,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPolyline {
    encoded_polyline: String,
}

#[derive(Debug, Deserialize)]
struct ApiViewport {
    low: ApiLatLng,
    high: ApiLatLng,
}
