//! Diversity re-ranking over a k-means cluster model.
//!
//! Candidates are labelled with their nearest centroid, then selected
//! round-robin across clusters: each round takes every populated cluster's
//! best unpicked candidate, so no cluster repeats before all clusters have
//! contributed once. Peak score is deliberately traded for topical spread.

use std::path::Path;
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::seq::index;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::features::{self, CLUSTER_FEATURE_LEN, CLUSTER_SCHEMA_VERSION};
use crate::models::{RouteCandidate, TrainingSample};
use crate::store::Artifact;

const MAX_KMEANS_ITERATIONS: usize = 100;

/// Persisted centroid set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterModel {
    pub centroids: Vec<Vec<f64>>,
    pub schema_version: u32,
}

impl ClusterModel {
    /// Index of the nearest centroid by Euclidean distance.
    pub fn assign(&self, features: &[f64]) -> usize {
        self.centroids
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                squared_distance(a, features).total_cmp(&squared_distance(b, features))
            })
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

impl Artifact for ClusterModel {
    const NAME: &'static str = "cluster";

    fn current_schema() -> u32 {
        CLUSTER_SCHEMA_VERSION
    }

    fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn load(path: &Path) -> Result<Self, PlannerError> {
        let file = std::fs::File::open(path)?;
        let model: ClusterModel = serde_json::from_reader(file)?;
        if model.centroids.is_empty()
            || model.centroids.iter().any(|c| c.len() != CLUSTER_FEATURE_LEN)
        {
            return Err(PlannerError::ModelUnavailable(
                "cluster artifact centroids do not match the feature layout".to_string(),
            ));
        }
        Ok(model)
    }

    fn train(
        samples: &[TrainingSample],
        config: &PlannerConfig,
        deadline: Instant,
    ) -> Result<Self, PlannerError> {
        fit_kmeans(samples, config.cluster_count, deadline)
    }
}

/// Labels every candidate with its cluster id, then returns a
/// diversity-maximizing ordered subset of at most `target_count`.
pub fn diversify(
    mut candidates: Vec<RouteCandidate>,
    target_count: usize,
    model: &ClusterModel,
) -> Vec<RouteCandidate> {
    for candidate in &mut candidates {
        let features = features::cluster_features(candidate);
        candidate.cluster = Some(model.assign(&features));
    }
    select_round_robin(candidates, target_count)
}

/// Capacitated top-1-per-cluster round-robin selection. Candidates must
/// already carry scores; cluster ids default to a single shared bucket when
/// absent.
pub fn select_round_robin(
    mut pool: Vec<RouteCandidate>,
    target_count: usize,
) -> Vec<RouteCandidate> {
    // Best-first within each cluster; overall order inside a round follows
    // score as well, so the output stays ranked.
    pool.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut picked: Vec<RouteCandidate> = Vec::with_capacity(target_count.min(pool.len()));
    while picked.len() < target_count && !pool.is_empty() {
        let mut round_clusters: Vec<Option<usize>> = Vec::new();
        let mut remaining: Vec<RouteCandidate> = Vec::with_capacity(pool.len());

        for candidate in pool {
            if picked.len() < target_count && !round_clusters.contains(&candidate.cluster) {
                round_clusters.push(candidate.cluster);
                picked.push(candidate);
            } else {
                remaining.push(candidate);
            }
        }
        pool = remaining;
    }
    picked
}

/// Lloyd's algorithm over the cluster feature space of the dataset.
pub fn fit_kmeans(
    samples: &[TrainingSample],
    k: usize,
    deadline: Instant,
) -> Result<ClusterModel, PlannerError> {
    let points: Vec<&[f64]> = samples
        .iter()
        .filter(|s| {
            s.cluster_schema == CLUSTER_SCHEMA_VERSION
                && s.cluster_features.len() == CLUSTER_FEATURE_LEN
        })
        .map(|s| s.cluster_features.as_slice())
        .collect();
    if points.is_empty() {
        return Err(PlannerError::ModelUnavailable(
            "no training samples match the current cluster schema".to_string(),
        ));
    }

    let k = k.max(1).min(points.len());
    // Deterministic init: sampling is seeded so reruns on the same dataset
    // publish the same artifact.
    let mut rng = SmallRng::seed_from_u64(42);
    let mut centroids: Vec<Vec<f64>> = index::sample(&mut rng, points.len(), k)
        .into_iter()
        .map(|i| points[i].to_vec())
        .collect();

    let mut assignments = vec![0usize; points.len()];
    for _ in 0..MAX_KMEANS_ITERATIONS {
        if Instant::now() >= deadline {
            return Err(PlannerError::ModelUnavailable(
                "cluster retrain exceeded its deadline".to_string(),
            ));
        }

        let next: Vec<usize> = points
            .par_iter()
            .map(|p| nearest(&centroids, p))
            .collect();
        let converged = next == assignments;
        assignments = next;

        let mut sums = vec![vec![0.0f64; CLUSTER_FEATURE_LEN]; k];
        let mut counts = vec![0usize; k];
        for (point, &cluster) in points.iter().zip(&assignments) {
            counts[cluster] += 1;
            for (axis, value) in point.iter().enumerate() {
                sums[cluster][axis] += value;
            }
        }
        for cluster in 0..k {
            if counts[cluster] == 0 {
                continue; // empty cluster keeps its previous centroid
            }
            for axis in 0..CLUSTER_FEATURE_LEN {
                centroids[cluster][axis] = sums[cluster][axis] / counts[cluster] as f64;
            }
        }

        if converged {
            break;
        }
    }

    info!(k, samples = points.len(), "fitted cluster model");
    Ok(ClusterModel { centroids, schema_version: CLUSTER_SCHEMA_VERSION })
}

fn nearest(centroids: &[Vec<f64>], point: &[f64]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let dist = squared_distance(centroid, point);
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        LatLng, RouteGeometry, RouteMetadata, RouteType, Viewport,
    };
    use std::time::Duration;

    fn scored(id: &str, score: f64, cluster: usize) -> RouteCandidate {
        RouteCandidate {
            id: id.to_string(),
            waypoints: Vec::new(),
            geometry: RouteGeometry {
                polyline: String::new(),
                distance_m: 1000,
                duration_s: 600,
                viewport: Viewport {
                    low: LatLng::new(1.28, 103.84),
                    high: LatLng::new(1.30, 103.87),
                },
            },
            metadata: RouteMetadata {
                center: LatLng::new(1.2834, 103.8607),
                search_radius_km: 1.25,
                route_type: RouteType::Loop,
                categories_used: Vec::new(),
            },
            score,
            cluster: Some(cluster),
        }
    }

    #[test]
    fn round_robin_spreads_across_clusters_first() {
        let pool = vec![
            scored("a", 0.9, 0),
            scored("b", 0.8, 0),
            scored("c", 0.7, 1),
            scored("d", 0.6, 2),
        ];
        let picked = select_round_robin(pool, 3);
        let clusters: Vec<usize> = picked.iter().map(|c| c.cluster.unwrap()).collect();
        assert_eq!(picked.len(), 3);
        // Three distinct clusters before any repeat.
        let mut unique = clusters.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 3);
        // Within the round the best score still goes first.
        assert_eq!(picked[0].id, "a");
    }

    #[test]
    fn round_robin_repeats_only_after_every_cluster_contributed() {
        let pool = vec![
            scored("a", 0.9, 0),
            scored("b", 0.8, 0),
            scored("c", 0.7, 1),
        ];
        let picked = select_round_robin(pool, 3);
        assert_eq!(picked.len(), 3);
        assert_eq!(picked[0].cluster, Some(0));
        assert_eq!(picked[1].cluster, Some(1));
        // Second member of cluster 0 only in the second round.
        assert_eq!(picked[2].id, "b");
    }

    #[test]
    fn round_robin_handles_small_pool() {
        let pool = vec![scored("a", 0.5, 0)];
        assert_eq!(select_round_robin(pool, 5).len(), 1);
    }

    #[test]
    fn kmeans_separates_obvious_groups() {
        let mut samples = Vec::new();
        for i in 0..20 {
            let offset = if i % 2 == 0 { 0.0 } else { 50.0 };
            let mut features = vec![offset; CLUSTER_FEATURE_LEN];
            features[0] += (i as f64) * 0.01;
            samples.push(TrainingSample {
                ranking_features: vec![0.5; crate::features::RANKING_FEATURE_LEN],
                cluster_features: features,
                label: 1.0,
                ranking_schema: crate::features::RANKING_SCHEMA_VERSION,
                cluster_schema: CLUSTER_SCHEMA_VERSION,
            });
        }

        let deadline = Instant::now() + Duration::from_secs(30);
        let model = fit_kmeans(&samples, 2, deadline).unwrap();
        assert_eq!(model.centroids.len(), 2);

        let near = model.assign(&vec![0.0; CLUSTER_FEATURE_LEN]);
        let far = model.assign(&vec![50.0; CLUSTER_FEATURE_LEN]);
        assert_ne!(near, far);
    }

    #[test]
    fn kmeans_is_deterministic_for_a_fixed_dataset() {
        let samples: Vec<TrainingSample> = (0..12)
            .map(|i| TrainingSample {
                ranking_features: vec![0.5; crate::features::RANKING_FEATURE_LEN],
                cluster_features: vec![i as f64; CLUSTER_FEATURE_LEN],
                label: 0.0,
                ranking_schema: crate::features::RANKING_SCHEMA_VERSION,
                cluster_schema: CLUSTER_SCHEMA_VERSION,
            })
            .collect();

        let deadline = Instant::now() + Duration::from_secs(30);
        let a = fit_kmeans(&samples, 3, deadline).unwrap();
        let b = fit_kmeans(&samples, 3, deadline).unwrap();
        assert_eq!(a, b);
    }
}
