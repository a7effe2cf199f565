//! Model artifact stores.
//!
//! Each store owns one persisted artifact and walks it through
//! Unloaded -> Training -> Ready. Readers take a cheap read-lock path once
//! the artifact is Ready; the fallback-training path is single-flight (one
//! mutex holder trains, latecomers reuse the result) and bounded by the
//! configured deadline. Publication is temp-write + rename, so a concurrent
//! reader sees either the old file or the new one, never a torn artifact.

use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::models::TrainingSample;
use crate::trainer;

/// A persisted model artifact with a versioned feature schema.
pub trait Artifact: Serialize + Send + Sync + Sized + 'static {
    const NAME: &'static str;

    fn current_schema() -> u32;
    fn schema_version(&self) -> u32;
    fn load(path: &Path) -> Result<Self, PlannerError>;
    fn train(
        samples: &[TrainingSample],
        config: &PlannerConfig,
        deadline: Instant,
    ) -> Result<Self, PlannerError>;
}

pub struct ArtifactStore<M> {
    config: PlannerConfig,
    path: std::path::PathBuf,
    slot: RwLock<Option<Arc<M>>>,
    train_lock: Mutex<()>,
}

impl<M: Artifact> ArtifactStore<M> {
    pub fn new(config: &PlannerConfig, path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            config: config.clone(),
            path: path.into(),
            slot: RwLock::new(None),
            train_lock: Mutex::new(()),
        }
    }

    /// Returns the Ready artifact, loading or rebuilding it first if needed.
    ///
    /// Lock poisoning is unrecoverable state corruption, so the store
    /// propagates it as a panic rather than serving a half-built model.
    pub fn get(&self) -> Result<Arc<M>, PlannerError> {
        if let Some(model) = self.slot.read().expect("store lock poisoned").clone() {
            return Ok(model);
        }

        // Single-flight: only one caller loads or trains; the rest block
        // here and pick up the published result.
        let _guard = self.train_lock.lock().expect("train lock poisoned");
        if let Some(model) = self.slot.read().expect("store lock poisoned").clone() {
            return Ok(model);
        }

        let model = self.load_or_train()?;
        let model = Arc::new(model);
        *self.slot.write().expect("store lock poisoned") = Some(model.clone());
        Ok(model)
    }

    /// Drops the in-memory artifact so the next reader re-reads the file.
    /// Called after an out-of-band trainer run publishes new artifacts.
    pub fn reload(&self) {
        *self.slot.write().expect("store lock poisoned") = None;
    }

    fn load_or_train(&self) -> Result<M, PlannerError> {
        match M::load(&self.path) {
            Ok(model) if model.schema_version() == M::current_schema() => {
                info!(artifact = M::NAME, "loaded model artifact");
                return Ok(model);
            }
            Ok(model) => {
                warn!(
                    artifact = M::NAME,
                    found = model.schema_version(),
                    expected = M::current_schema(),
                    "artifact schema mismatch"
                );
            }
            Err(err) => {
                warn!(artifact = M::NAME, error = %err, "artifact load failed");
            }
        }

        if !self.config.fallback_training {
            return Err(PlannerError::ModelUnavailable(format!(
                "{} artifact unusable and fallback training is disabled",
                M::NAME
            )));
        }

        info!(artifact = M::NAME, "fallback training from dataset snapshot");
        let samples = trainer::load_samples(&self.config.dataset_path)?;
        let deadline = Instant::now() + self.config.retrain_timeout;
        let model = M::train(&samples, &self.config, deadline)?;
        trainer::publish_artifact(&self.path, &model)?;
        Ok(model)
    }
}
