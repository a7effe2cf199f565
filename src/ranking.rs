//! Linear ranking model: scoring and offline fitting.
//!
//! Scoring is deterministic and side-effect-free for a fixed model and
//! candidate set. The model itself is a persisted artifact produced by the
//! offline trainer (or rebuilt on demand through the artifact store).

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::features::{self, RANKING_FEATURE_LEN, RANKING_SCHEMA_VERSION};
use crate::models::{RouteCandidate, RouteCriteria, TrainingSample};
use crate::store::Artifact;

/// Persisted linear scoring model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingModel {
    pub weights: Vec<f64>,
    pub bias: f64,
    pub schema_version: u32,
}

impl RankingModel {
    /// Uniform neutral model used when no artifact and no dataset exist.
    pub fn neutral() -> Self {
        Self {
            weights: vec![0.0; RANKING_FEATURE_LEN],
            bias: 0.5,
            schema_version: RANKING_SCHEMA_VERSION,
        }
    }

    /// Applies the model to one feature vector, clipped into [0, 1].
    pub fn predict(&self, features: &[f64]) -> f64 {
        let dot: f64 = self
            .weights
            .iter()
            .zip(features)
            .map(|(w, f)| w * f)
            .sum();
        (dot + self.bias).clamp(0.0, 1.0)
    }
}

impl Artifact for RankingModel {
    const NAME: &'static str = "ranking";

    fn current_schema() -> u32 {
        RANKING_SCHEMA_VERSION
    }

    fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn load(path: &Path) -> Result<Self, PlannerError> {
        let file = std::fs::File::open(path)?;
        let model: RankingModel = serde_json::from_reader(file)?;
        if model.weights.len() != RANKING_FEATURE_LEN {
            return Err(PlannerError::ModelUnavailable(format!(
                "ranking artifact has {} weights, expected {}",
                model.weights.len(),
                RANKING_FEATURE_LEN
            )));
        }
        Ok(model)
    }

    fn train(
        samples: &[TrainingSample],
        _config: &PlannerConfig,
        deadline: Instant,
    ) -> Result<Self, PlannerError> {
        fit_regression(samples, deadline)
    }
}

/// Annotates every candidate with its model score. Order is preserved;
/// sorting happens later, after diversity selection.
pub fn score_candidates(
    candidates: &mut [RouteCandidate],
    criteria: &RouteCriteria,
    model: &RankingModel,
) {
    candidates.par_iter_mut().for_each(|candidate| {
        let features = features::ranking_features(candidate, criteria);
        candidate.score = model.predict(&features);
    });
}

/// Ordinary least squares on the labeled dataset, solved through the normal
/// equations with a small ridge term for numerical stability.
pub fn fit_regression(
    samples: &[TrainingSample],
    deadline: Instant,
) -> Result<RankingModel, PlannerError> {
    let usable: Vec<&TrainingSample> = samples
        .iter()
        .filter(|s| {
            s.ranking_schema == RANKING_SCHEMA_VERSION
                && s.ranking_features.len() == RANKING_FEATURE_LEN
        })
        .collect();
    if usable.is_empty() {
        return Err(PlannerError::ModelUnavailable(
            "no training samples match the current ranking schema".to_string(),
        ));
    }

    // Bias handled as an extra always-1 column.
    let dim = RANKING_FEATURE_LEN + 1;
    let mut xtx = vec![vec![0.0f64; dim]; dim];
    let mut xty = vec![0.0f64; dim];

    for sample in &usable {
        if Instant::now() >= deadline {
            return Err(PlannerError::ModelUnavailable(
                "ranking retrain exceeded its deadline".to_string(),
            ));
        }
        let mut row = sample.ranking_features.clone();
        row.push(1.0);
        for i in 0..dim {
            xty[i] += row[i] * sample.label;
            for j in 0..dim {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }

    const RIDGE: f64 = 1e-6;
    for (i, row) in xtx.iter_mut().enumerate() {
        row[i] += RIDGE;
    }

    let solution = solve_linear_system(xtx, xty).ok_or_else(|| {
        PlannerError::ModelUnavailable("ranking normal equations are singular".to_string())
    })?;

    let bias = solution[RANKING_FEATURE_LEN];
    let weights = solution[..RANKING_FEATURE_LEN].to_vec();
    info!(samples = usable.len(), "fitted ranking model");

    Ok(RankingModel { weights, bias, schema_version: RANKING_SCHEMA_VERSION })
}

/// Gaussian elimination with partial pivoting.
fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for col in row + 1..n {
            sum -= a[row][col] * x[col];
        }
        x[row] = sum / a[row][row];
    }
    Some(x)
}
