//! Offline trainer: dataset I/O and artifact publication.
//!
//! The trainer runs out-of-band from serving. One run reads the full labeled
//! dataset, fits the ranking regression and the cluster partition, and
//! publishes both artifacts atomically. Reruns replace artifacts wholesale.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::cluster;
use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::models::TrainingSample;
use crate::ranking;

/// Reads the JSONL dataset. Unparseable lines are skipped with a warning so
/// one bad append cannot poison training.
pub fn load_samples(path: &Path) -> Result<Vec<TrainingSample>, PlannerError> {
    let file = File::open(path).map_err(|err| {
        PlannerError::ModelUnavailable(format!(
            "training dataset {} unavailable: {err}",
            path.display()
        ))
    })?;

    let mut samples = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<TrainingSample>(&line) {
            Ok(sample) => samples.push(sample),
            Err(err) => warn!(lineno, error = %err, "skipping malformed dataset line"),
        }
    }
    Ok(samples)
}

/// Appends one labeled sample to the dataset, creating it if needed.
pub fn append_sample(path: &Path, sample: &TrainingSample) -> Result<(), PlannerError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut line = serde_json::to_string(sample)?;
    line.push('\n');
    file.write_all(line.as_bytes())?;
    Ok(())
}

/// Atomically replaces the artifact at `path`: the JSON is written to a
/// temporary file in the same directory and renamed over the target, so a
/// concurrent reader never observes a partial write.
pub fn publish_artifact<T: Serialize>(path: &Path, artifact: &T) -> Result<(), PlannerError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(artifact)?;
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    info!(path = %path.display(), "published artifact");
    Ok(())
}

/// Summary of one trainer run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    pub samples: usize,
    pub clusters: usize,
}

/// Batch job that rebuilds both serving artifacts from the dataset.
pub struct OfflineTrainer {
    config: PlannerConfig,
    /// Budget for a full offline fit; far looser than the serving-path
    /// fallback deadline.
    pub train_timeout: Duration,
}

impl OfflineTrainer {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config, train_timeout: Duration::from_secs(300) }
    }

    /// Fits and publishes both models in one pass. Idempotent.
    pub fn run(&self) -> Result<TrainReport, PlannerError> {
        let samples = load_samples(&self.config.dataset_path)?;
        info!(samples = samples.len(), "offline training started");

        let deadline = Instant::now() + self.train_timeout;
        let ranking_model = ranking::fit_regression(&samples, deadline)?;
        let cluster_model =
            cluster::fit_kmeans(&samples, self.config.cluster_count, deadline)?;

        publish_artifact(&self.config.ranking_model_path, &ranking_model)?;
        publish_artifact(&self.config.cluster_model_path, &cluster_model)?;

        Ok(TrainReport {
            samples: samples.len(),
            clusters: cluster_model.centroids.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{
        CLUSTER_FEATURE_LEN, CLUSTER_SCHEMA_VERSION, RANKING_FEATURE_LEN,
        RANKING_SCHEMA_VERSION,
    };
    use crate::ranking::RankingModel;
    use crate::store::Artifact;

    fn sample(i: usize) -> TrainingSample {
        TrainingSample {
            ranking_features: vec![(i % 10) as f64 / 10.0; RANKING_FEATURE_LEN],
            cluster_features: vec![(i % 3) as f64 * 10.0; CLUSTER_FEATURE_LEN],
            label: if i % 2 == 0 { 1.0 } else { 0.0 },
            ranking_schema: RANKING_SCHEMA_VERSION,
            cluster_schema: CLUSTER_SCHEMA_VERSION,
        }
    }

    #[test]
    fn dataset_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.jsonl");
        for i in 0..5 {
            append_sample(&path, &sample(i)).unwrap();
        }
        let loaded = load_samples(&path).unwrap();
        assert_eq!(loaded.len(), 5);
        assert_eq!(loaded[2], sample(2));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.jsonl");
        append_sample(&path, &sample(0)).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();
        append_sample(&path, &sample(1)).unwrap();

        assert_eq!(load_samples(&path).unwrap().len(), 2);
    }

    #[test]
    fn run_publishes_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PlannerConfig::default();
        config.dataset_path = dir.path().join("samples.jsonl");
        config.ranking_model_path = dir.path().join("ranking_model.json");
        config.cluster_model_path = dir.path().join("cluster_model.json");
        for i in 0..20 {
            append_sample(&config.dataset_path, &sample(i)).unwrap();
        }

        let trainer = OfflineTrainer::new(config.clone());
        let report = trainer.run().unwrap();
        assert_eq!(report.samples, 20);
        assert!(config.ranking_model_path.exists());
        assert!(config.cluster_model_path.exists());

        // Rerun replaces artifacts wholesale with identical content.
        let first = RankingModel::load(&config.ranking_model_path).unwrap();
        trainer.run().unwrap();
        let second = RankingModel::load(&config.ranking_model_path).unwrap();
        assert_eq!(first, second);
    }
}
