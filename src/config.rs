//! Pipeline configuration.
//!
//! One immutable value injected into each component at construction; there is
//! no ambient global state. Defaults match the behavior of the production
//! deployment (Singapore walking routes).

use std::path::PathBuf;
use std::time::Duration;

/// Categories searched when the criteria do not name any.
pub const DEFAULT_CATEGORIES: [&str; 4] = ["park", "nature", "attraction", "restaurant"];

/// Categories considered safe for dogs when matching pet-friendly requests.
pub const PET_FRIENDLY_CATEGORIES: [&str; 2] = ["park", "nature"];

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Cap on results per nearby-search query.
    pub per_category_limit: usize,
    /// Attempt budget multiplier: budget = categories + max_routes * retry_factor.
    pub retry_factor: usize,
    /// Candidates recall aims for before ranking narrows them down.
    pub max_candidate_routes: usize,
    /// Routes kept in the final response.
    pub max_response_routes: usize,
    /// Cluster count for the diversity model.
    pub cluster_count: usize,
    /// Whether a missing/incompatible artifact may be rebuilt from the dataset
    /// inside a serving request.
    pub fallback_training: bool,
    /// Deadline for such an in-request rebuild.
    pub retrain_timeout: Duration,
    /// Ranking model artifact location.
    pub ranking_model_path: PathBuf,
    /// Cluster model artifact location.
    pub cluster_model_path: PathBuf,
    /// Append-only labeled dataset (JSON lines).
    pub dataset_path: PathBuf,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            per_category_limit: 20,
            retry_factor: 3,
            max_candidate_routes: 20,
            max_response_routes: 5,
            cluster_count: 5,
            fallback_training: true,
            retrain_timeout: Duration::from_secs(5),
            ranking_model_path: PathBuf::from("artifacts/ranking_model.json"),
            cluster_model_path: PathBuf::from("artifacts/cluster_model.json"),
            dataset_path: PathBuf::from("artifacts/training_samples.jsonl"),
        }
    }
}

impl PlannerConfig {
    /// Effective category set for a request: the criteria's include list, or
    /// the default set when empty.
    pub fn categories_for<'a>(&self, include: &'a [String]) -> Vec<&'a str> {
        if include.is_empty() {
            DEFAULT_CATEGORIES.to_vec()
        } else {
            include.iter().map(String::as_str).collect()
        }
    }
}
