pub mod embedding;
pub mod evidence;
pub mod generator;
pub mod orchestrator;
pub mod outcome;
pub mod toxicity;

use thiserror::Error;

use crate::config::ConfigError;
use evidence::EvidenceError;
use outcome::OutcomeError;

/// Request-level failures. Per-candidate failures are absorbed into plan
/// diagnostics instead; only whole-request conditions surface here.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid engine configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("insufficient patient features: {0}")]
    InsufficientFeatures(String),

    #[error("all {attempted} candidates failed scoring")]
    AllCandidatesFailed { attempted: usize },

    #[error(transparent)]
    Evidence(#[from] EvidenceError),

    #[error("request cancelled")]
    Cancelled,

    #[error("scoring task failed: {0}")]
    TaskFailed(String),
}

impl From<OutcomeError> for EngineError {
    fn from(error: OutcomeError) -> Self {
        match error {
            OutcomeError::InsufficientFeatures(detail) => {
                EngineError::InsufficientFeatures(detail)
            }
        }
    }
}
