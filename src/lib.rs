//! Treatment recommendation engine.
//!
//! Takes an assembled [`models::PatientFeatureBundle`] (imaging findings,
//! genomic variants, pathology grade, organ function, allergies, prior
//! lines), enumerates candidate regimens from a versioned template table,
//! scores each candidate with an outcome predictor and an evidence index,
//! filters out contraindicated combinations with the toxicity rule set,
//! and emits a ranked, cited [`models::TreatmentPlan`].
//!
//! Decision support only: every plan carries full traceability (rule set
//! version, per-citation source metadata, an explicit diagnostic for every
//! dropped candidate) so a clinician can audit why something was or was
//! not recommended.

pub mod config;
pub mod engine;
pub mod models;

pub use config::{ConfigError, EngineConfig};
pub use engine::embedding::{FeatureHashEmbedder, QueryEmbedder};
pub use engine::evidence::{EvidenceSearch, InMemoryEvidenceIndex};
pub use engine::generator::{standard_templates, PlanGenerator, RegimenTemplate};
pub use engine::orchestrator::{CancelToken, RecommendationOrchestrator};
pub use engine::outcome::{OutcomePredictor, RiskAdjustedModel};
pub use engine::toxicity::{InteractionRuleSet, ToxicityChecker};
pub use engine::EngineError;
pub use models::{PatientFeatureBundle, TreatmentPlan};

/// Install the process-wide tracing subscriber. Call once at startup;
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
