//! Error taxonomy for the pipeline.
//!
//! Oracle failures are absorbed inside recall's attempt budget and model
//! failures degrade the affected stage; only criteria validation is allowed
//! to fail a request outright. The pipeline translates everything else into
//! a well-formed `success = false` response.

use thiserror::Error;

/// Failures at the place-search or directions oracle boundary.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("external call quota exhausted")]
    QuotaExhausted,
    #[error("oracle rate limit exceeded")]
    RateLimited,
    #[error("oracle rejected credentials")]
    InvalidCredentials,
    #[error("oracle returned no usable result")]
    EmptyResponse,
    #[error("oracle request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Pipeline-level failures.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Malformed criteria. The only error class that short-circuits a request.
    #[error("invalid criteria: {0}")]
    InvalidCriteria(String),

    /// A model artifact is missing or incompatible and could not be rebuilt.
    /// Stages catch this and degrade rather than failing the request.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Recall produced no usable candidates. Translated into a
    /// `success = false` response, never surfaced as a transport error.
    #[error("no route candidates could be generated")]
    InsufficientCandidates,

    #[error("artifact io: {0}")]
    ArtifactIo(#[from] std::io::Error),

    #[error("artifact format: {0}")]
    ArtifactFormat(#[from] serde_json::Error),
}
