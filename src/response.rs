//! Response assembly: the final, purely deterministic pipeline stage.

use serde::{Deserialize, Serialize};

use crate::models::{RouteCandidate, RouteCriteria};

/// Outward payload for one route-suggestion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    pub success: bool,
    pub message: String,
    pub routes: Vec<NamedRoute>,
    pub total_count: usize,
    /// Criteria echo for downstream feedback correlation.
    pub criteria: Option<RouteCriteria>,
}

/// A candidate plus its presentation name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRoute {
    pub name: String,
    #[serde(flatten)]
    pub route: RouteCandidate,
}

/// Orders, truncates and names the diversified candidates. No external
/// calls; empty input becomes an explanatory `success = false` payload.
pub fn build_response(
    candidates: Vec<RouteCandidate>,
    criteria: &RouteCriteria,
    max_routes: usize,
) -> RouteResponse {
    if candidates.is_empty() {
        return RouteResponse {
            success: false,
            message: "No routes could be generated for the given criteria".to_string(),
            routes: Vec::new(),
            total_count: 0,
            criteria: Some(criteria.clone()),
        };
    }

    let routes: Vec<NamedRoute> = candidates
        .into_iter()
        .take(max_routes)
        .map(|route| NamedRoute { name: route_name(&route), route })
        .collect();

    RouteResponse {
        success: true,
        message: format!("Successfully generated {} routes", routes.len()),
        total_count: routes.len(),
        routes,
        criteria: Some(criteria.clone()),
    }
}

/// Human-readable name from the first two waypoints.
fn route_name(route: &RouteCandidate) -> String {
    let names: Vec<&str> = route.waypoints.iter().map(|w| w.name.as_str()).collect();
    match names.as_slice() {
        [] => route.id.clone(),
        [a] => format!("Via {a}"),
        [a, b] => format!("Via {a} & {b}"),
        [a, b, rest @ ..] => format!("Via {a}, {b} +{} more", rest.len()),
    }
}
