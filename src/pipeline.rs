//! Request pipeline: recall -> ranking -> diversity -> response.
//!
//! Every internal failure past criteria validation is caught here and turned
//! into either a degraded stage or a well-formed `success = false` response.

use tracing::{debug, warn};

use crate::cluster::{self, ClusterModel};
use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::models::RouteCriteria;
use crate::ranking::{self, RankingModel};
use crate::recall::CandidateRecall;
use crate::response::{self, RouteResponse};
use crate::store::ArtifactStore;
use crate::traits::{CallQuota, Directions, PlaceSearch};

/// Stateless-per-request route suggestion service. One instance serves many
/// concurrent requests; the only shared state is the read-mostly model
/// stores.
pub struct RoutePlanner<P, D> {
    config: PlannerConfig,
    places: P,
    directions: D,
    ranking_store: ArtifactStore<RankingModel>,
    cluster_store: ArtifactStore<ClusterModel>,
}

impl<P, D> RoutePlanner<P, D>
where
    P: PlaceSearch,
    D: Directions,
{
    pub fn new(config: PlannerConfig, places: P, directions: D) -> Self {
        let ranking_store = ArtifactStore::new(&config, config.ranking_model_path.clone());
        let cluster_store = ArtifactStore::new(&config, config.cluster_model_path.clone());
        Self { config, places, directions, ranking_store, cluster_store }
    }

    /// Runs the full pipeline for one request.
    ///
    /// The only `Err` this returns is `InvalidCriteria`; every downstream
    /// failure degrades or becomes a `success = false` response.
    pub fn suggest(
        &self,
        criteria: &RouteCriteria,
        quota: &CallQuota,
    ) -> Result<RouteResponse, PlannerError> {
        self.suggest_inner(criteria, quota, None)
    }

    /// `suggest` with a pinned sampling seed, for reproducible tests.
    pub fn suggest_with_seed(
        &self,
        criteria: &RouteCriteria,
        quota: &CallQuota,
        seed: u64,
    ) -> Result<RouteResponse, PlannerError> {
        self.suggest_inner(criteria, quota, Some(seed))
    }

    fn suggest_inner(
        &self,
        criteria: &RouteCriteria,
        quota: &CallQuota,
        seed: Option<u64>,
    ) -> Result<RouteResponse, PlannerError> {
        criteria.validate()?;

        let mut recall = match seed {
            Some(seed) => {
                CandidateRecall::with_seed(&self.config, &self.places, &self.directions, seed)
            }
            None => CandidateRecall::new(&self.config, &self.places, &self.directions),
        };
        let mut candidates =
            recall.generate_candidates(criteria, self.config.max_candidate_routes, quota);
        if candidates.is_empty() {
            let err = PlannerError::InsufficientCandidates;
            warn!(error = %err, "translated into an empty soft-failure response");
            return Ok(response::build_response(
                Vec::new(),
                criteria,
                self.config.max_response_routes,
            ));
        }
        debug!(candidates = candidates.len(), "recall produced candidates");

        match self.ranking_store.get() {
            Ok(model) => ranking::score_candidates(&mut candidates, criteria, &model),
            Err(err) => {
                warn!(error = %err, "ranking degraded to neutral scoring");
                let neutral = RankingModel::neutral();
                ranking::score_candidates(&mut candidates, criteria, &neutral);
            }
        }

        let target = self.config.max_response_routes;
        let selected = match self.cluster_store.get() {
            Ok(model) => cluster::diversify(candidates, target, &model),
            Err(err) => {
                warn!(error = %err, "diversity degraded to score-only ordering");
                candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
                candidates.truncate(target);
                candidates
            }
        };

        Ok(response::build_response(selected, criteria, target))
    }

    /// Picks up artifacts published by an out-of-band trainer run.
    pub fn reload_models(&self) {
        self.ranking_store.reload();
        self.cluster_store.reload();
    }
}
