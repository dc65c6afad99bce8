use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("embedding_dimension must be nonzero")]
    ZeroEmbeddingDimension,

    #[error("max_candidates must be nonzero")]
    ZeroCandidateCap,

    #[error("{0} must be non-negative")]
    NegativeWeight(&'static str),

    #[error("min_citation_similarity must be within 0.0..=1.0, got {0}")]
    SimilarityOutOfRange(f32),

    #[error("call_timeout_ms must be nonzero")]
    ZeroCallTimeout,
}

/// Engine configuration, supplied once at orchestrator construction.
///
/// Ranking weights and safety thresholds are configuration, not code; every
/// field has a default so partial configs deserialize cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cap on enumerated candidate regimens per request.
    pub max_candidates: usize,
    /// Rank penalty applied to CAUTION-flagged candidates.
    pub caution_penalty_weight: f64,
    /// Citations below this similarity are not counted as support.
    pub min_citation_similarity: f32,
    /// System-wide embedding dimensionality for evidence passages.
    pub embedding_dimension: usize,
    /// Weight of the outcome point estimate in the rank score.
    pub outcome_weight: f64,
    /// Weight of aggregate evidence support in the rank score.
    pub evidence_weight: f64,
    /// Accumulated soft interaction risk above this flags CAUTION.
    pub soft_risk_threshold: f32,
    /// Per external call (predictor, retrieval) timeout.
    pub call_timeout_ms: u64,
    /// Citations retrieved per candidate.
    pub citation_top_k: usize,
    /// Floor on interval width when patient features are incomplete.
    pub min_interval_width: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_candidates: 8,
            caution_penalty_weight: 0.15,
            min_citation_similarity: 0.35,
            embedding_dimension: 384,
            outcome_weight: 0.6,
            evidence_weight: 0.4,
            soft_risk_threshold: 0.5,
            call_timeout_ms: 2_000,
            citation_top_k: 3,
            min_interval_width: 0.2,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding_dimension == 0 {
            return Err(ConfigError::ZeroEmbeddingDimension);
        }
        if self.max_candidates == 0 {
            return Err(ConfigError::ZeroCandidateCap);
        }
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::ZeroCallTimeout);
        }
        if self.caution_penalty_weight < 0.0 {
            return Err(ConfigError::NegativeWeight("caution_penalty_weight"));
        }
        if self.outcome_weight < 0.0 {
            return Err(ConfigError::NegativeWeight("outcome_weight"));
        }
        if self.evidence_weight < 0.0 {
            return Err(ConfigError::NegativeWeight("evidence_weight"));
        }
        if !(0.0..=1.0).contains(&self.min_citation_similarity) {
            return Err(ConfigError::SimilarityOutOfRange(
                self.min_citation_similarity,
            ));
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_dimension_rejected() {
        let config = EngineConfig {
            embedding_dimension: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroEmbeddingDimension));
    }

    #[test]
    fn zero_candidate_cap_rejected() {
        let config = EngineConfig {
            max_candidates: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroCandidateCap));
    }

    #[test]
    fn negative_weight_rejected() {
        let config = EngineConfig {
            evidence_weight: -0.1,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::NegativeWeight("evidence_weight"))
        );
    }

    #[test]
    fn similarity_above_one_rejected() {
        let config = EngineConfig {
            min_citation_similarity: 1.5,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::SimilarityOutOfRange(1.5))
        );
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"max_candidates": 4, "embedding_dimension": 64}"#).unwrap();
        assert_eq!(config.max_candidates, 4);
        assert_eq!(config.embedding_dimension, 64);
        assert_eq!(config.citation_top_k, 3);
        assert!(config.validate().is_ok());
    }
}
