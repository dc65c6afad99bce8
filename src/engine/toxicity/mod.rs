pub mod checker;
pub mod rules;

use thiserror::Error;

pub use checker::{LinearRiskModel, RiskScoreModel, ToxicityChecker};
pub use rules::{InteractionRule, InteractionRuleSet, OrganThresholdRule};

#[derive(Error, Debug)]
pub enum ToxicityError {
    #[error("failed to read rule set {0}: {1}")]
    RuleSetLoad(String, String),

    #[error("failed to parse rule set {0}: {1}")]
    RuleSetParse(String, String),
}
