//! Candidate recall: nearby-place search plus randomized loop sampling.
//!
//! Recall never fails on partial oracle trouble. Each failed search or
//! directions call is absorbed and the stage simply yields fewer candidates;
//! an empty pool yields an empty list. All external calls go through the
//! caller's `CallQuota`.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::config::PlannerConfig;
use crate::haversine;
use crate::models::{PlaceCandidate, RouteCandidate, RouteCriteria, RouteMetadata};
use crate::traits::{CallQuota, Directions, PlaceSearch};

pub struct CandidateRecall<'a, P, D> {
    config: &'a PlannerConfig,
    places: &'a P,
    directions: &'a D,
    rng: SmallRng,
}

impl<'a, P, D> CandidateRecall<'a, P, D>
where
    P: PlaceSearch,
    D: Directions,
{
    pub fn new(config: &'a PlannerConfig, places: &'a P, directions: &'a D) -> Self {
        Self { config, places, directions, rng: SmallRng::from_entropy() }
    }

    /// Fixed-seed variant so tests can pin the sampling order.
    pub fn with_seed(
        config: &'a PlannerConfig,
        places: &'a P,
        directions: &'a D,
        seed: u64,
    ) -> Self {
        Self { config, places, directions, rng: SmallRng::seed_from_u64(seed) }
    }

    /// Generates up to `max_routes` loop candidates. Returning fewer, or
    /// none, is a valid outcome; this never errors.
    pub fn generate_candidates(
        &mut self,
        criteria: &RouteCriteria,
        max_routes: usize,
        quota: &CallQuota,
    ) -> Vec<RouteCandidate> {
        let search_radius_km = criteria.radius_km / 2.0;
        let categories = self.config.categories_for(&criteria.include_categories);

        let pool = self.collect_pool(criteria, search_radius_km, &categories, quota);
        if pool.is_empty() {
            warn!("recall: no waypoint candidates found");
            return Vec::new();
        }
        debug!(pool = pool.len(), "recall: waypoint pool assembled");

        // Finite sampling plan: the attempt budget bounds oracle usage even
        // when every directions call fails.
        let budget = categories.len() + max_routes * self.config.retry_factor;
        let mut candidates = Vec::new();

        for _ in 0..budget {
            if candidates.len() >= max_routes {
                break;
            }

            let waypoints = self.sample_waypoints(&pool);
            if waypoints.len() < 2 {
                break; // pool too small for any valid route
            }
            let waypoint_ids: Vec<String> =
                waypoints.iter().map(|w| w.place_id.clone()).collect();

            if let Err(err) = quota.acquire() {
                debug!(error = %err, "recall: stopping early");
                break;
            }

            match self.directions.loop_route(criteria.center, &waypoint_ids) {
                Ok(geometry) => {
                    let mut categories_used: Vec<String> = waypoints
                        .iter()
                        .map(|w| w.search_category.clone())
                        .collect();
                    categories_used.sort();
                    categories_used.dedup();

                    candidates.push(RouteCandidate {
                        id: format!("route_{}", candidates.len() + 1),
                        waypoints,
                        geometry,
                        metadata: RouteMetadata {
                            center: criteria.center,
                            search_radius_km,
                            route_type: criteria.route_type,
                            categories_used,
                        },
                        score: 0.0,
                        cluster: None,
                    });
                }
                Err(err) => {
                    warn!(error = %err, "recall: directions attempt discarded");
                }
            }
        }

        debug!(candidates = candidates.len(), "recall finished");
        candidates
    }

    fn collect_pool(
        &self,
        criteria: &RouteCriteria,
        search_radius_km: f64,
        categories: &[&str],
        quota: &CallQuota,
    ) -> Vec<PlaceCandidate> {
        let mut pool: Vec<PlaceCandidate> = Vec::new();

        for category in categories {
            if let Err(err) = quota.acquire() {
                debug!(error = %err, "recall: place search skipped");
                break;
            }
            match self.places.find_nearby(
                criteria.center,
                search_radius_km,
                category,
                self.config.per_category_limit,
            ) {
                Ok(mut places) => {
                    for place in &mut places {
                        place.search_category = category.to_string();
                        place.distance_km =
                            haversine::distance_km(criteria.center, place.location);
                    }
                    debug!(category, found = places.len(), "recall: place search");
                    pool.extend(places);
                }
                Err(err) => {
                    warn!(category, error = %err, "recall: place search failed");
                }
            }
        }

        // A place can show up under several search categories; keep the
        // first occurrence so sampled ids stay unique.
        let mut seen: Vec<&str> = Vec::new();
        let mut unique = Vec::with_capacity(pool.len());
        for place in &pool {
            if seen.contains(&place.place_id.as_str()) {
                continue;
            }
            seen.push(&place.place_id);
            unique.push(place.clone());
        }
        unique
    }

    /// Samples 2-3 distinct waypoints, preferring category variety when the
    /// pool offers alternatives, then shuffles presentation order. No
    /// route-order optimization on purpose: variety between requests beats a
    /// marginally shorter walk.
    fn sample_waypoints(&mut self, pool: &[PlaceCandidate]) -> Vec<PlaceCandidate> {
        let want = self.rng.gen_range(2..=3usize).min(pool.len());
        let mut picked: Vec<PlaceCandidate> = Vec::with_capacity(want);

        while picked.len() < want {
            let fresh: Vec<&PlaceCandidate> = pool
                .iter()
                .filter(|p| !picked.iter().any(|q| q.place_id == p.place_id))
                .filter(|p| {
                    !picked.iter().any(|q| q.search_category == p.search_category)
                })
                .collect();

            let next = if fresh.is_empty() {
                // Every unused place repeats a picked category; fall back to
                // any unused place.
                pool.iter()
                    .filter(|p| !picked.iter().any(|q| q.place_id == p.place_id))
                    .collect::<Vec<_>>()
                    .choose(&mut self.rng)
                    .copied()
                    .cloned()
            } else {
                fresh.choose(&mut self.rng).copied().cloned()
            };

            match next {
                Some(place) => picked.push(place),
                None => break,
            }
        }

        picked.shuffle(&mut self.rng);
        picked
    }
}
