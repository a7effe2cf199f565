//! Feature extraction for the ranking and clustering models.
//!
//! Both layouts are fixed-order vectors guarded by a schema version. A
//! persisted artifact is only usable when its recorded version matches the
//! extractor it will be applied with; anything else is treated as a missing
//! artifact.

use crate::config::{DEFAULT_CATEGORIES, PET_FRIENDLY_CATEGORIES};
use crate::haversine;
use crate::models::{RouteCandidate, RouteCriteria};

/// Version tag for the ranking feature layout below.
pub const RANKING_SCHEMA_VERSION: u32 = 3;

/// Ranking vector length: 6 route signals, 3 compliance indicators, 3
/// neutral proxies (safety, crowd, lighting) for which no data source exists
/// yet.
pub const RANKING_FEATURE_LEN: usize = 12;

/// Version tag for the cluster feature layout below.
pub const CLUSTER_SCHEMA_VERSION: u32 = 2;

/// Cluster vector length: 6 geometry/pace signals plus one composition ratio
/// per default category.
pub const CLUSTER_FEATURE_LEN: usize = 6 + DEFAULT_CATEGORIES.len();

const NEUTRAL: f64 = 0.5;

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

fn mean_rating(candidate: &RouteCandidate) -> f64 {
    let ratings: Vec<f64> = candidate
        .waypoints
        .iter()
        .map(|w| w.rating)
        .filter(|r| r.is_finite() && *r > 0.0)
        .collect();
    if ratings.is_empty() {
        return 0.0;
    }
    ratings.iter().sum::<f64>() / ratings.len() as f64
}

fn distinct_search_categories(candidate: &RouteCandidate) -> usize {
    let mut cats: Vec<&str> = candidate
        .waypoints
        .iter()
        .map(|w| w.search_category.as_str())
        .collect();
    cats.sort_unstable();
    cats.dedup();
    cats.len()
}

/// Extracts the ranking feature vector for one candidate under the request
/// criteria. Deterministic; every component lands in [0, 1].
pub fn ranking_features(candidate: &RouteCandidate, criteria: &RouteCriteria) -> Vec<f64> {
    let count = candidate.waypoints.len() as f64;
    let distance_km = candidate.geometry.distance_m as f64 / 1000.0;
    let duration_min = candidate.geometry.duration_s as f64 / 60.0;

    // Normalized against twice the search radius: a loop through the search
    // area tops out around there.
    let norm_distance = clamp01(distance_km / (2.0 * criteria.radius_km));

    let (norm_duration, duration_ok) = match criteria.duration_min {
        Some(target) if target > 0 => {
            let target = target as f64;
            (
                clamp01(duration_min / (2.0 * target)),
                if (duration_min - target).abs() <= target * 0.5 { 1.0 } else { 0.0 },
            )
        }
        _ => (NEUTRAL, 1.0),
    };

    let diversity = if count > 0.0 {
        distinct_search_categories(candidate) as f64 / count
    } else {
        0.0
    };

    let pet_match = if !criteria.pet_friendly {
        1.0
    } else if count > 0.0 {
        let friendly = candidate
            .waypoints
            .iter()
            .filter(|w| PET_FRIENDLY_CATEGORIES.contains(&w.search_category.as_str()))
            .count();
        friendly as f64 / count
    } else {
        0.0
    };

    let distance_ok = if distance_km <= 2.0 * criteria.radius_km { 1.0 } else { 0.0 };

    let avoid_ok = if candidate.waypoints.iter().any(|w| {
        criteria.avoid_categories.iter().any(|a| {
            a.eq_ignore_ascii_case(&w.search_category) || a.eq_ignore_ascii_case(&w.category)
        })
    }) {
        0.0
    } else {
        1.0
    };

    vec![
        norm_distance,
        norm_duration,
        clamp01(count / 3.0),
        clamp01(mean_rating(candidate) / 5.0),
        clamp01(diversity),
        clamp01(pet_match),
        distance_ok,
        duration_ok,
        avoid_ok,
        NEUTRAL, // safety proxy
        NEUTRAL, // crowd proxy
        NEUTRAL, // lighting proxy
    ]
}

/// Extracts the geography/composition vector the cluster model operates on.
pub fn cluster_features(candidate: &RouteCandidate) -> Vec<f64> {
    let count = candidate.waypoints.len() as f64;
    let distance_km = candidate.geometry.distance_m as f64 / 1000.0;
    let duration_min = candidate.geometry.duration_s as f64 / 60.0;
    let pace_s_per_km = if distance_km > 0.0 {
        candidate.geometry.duration_s as f64 / distance_km
    } else {
        0.0
    };
    let mut features = vec![
        distance_km,
        duration_min,
        count,
        mean_rating(candidate),
        haversine::viewport_area_km2(&candidate.geometry.viewport),
        pace_s_per_km / 1000.0,
    ];

    for category in DEFAULT_CATEGORIES {
        let matching = candidate
            .waypoints
            .iter()
            .filter(|w| w.search_category == category)
            .count();
        features.push(if count > 0.0 { matching as f64 / count } else { 0.0 });
    }

    debug_assert_eq!(features.len(), CLUSTER_FEATURE_LEN);
    features
}
