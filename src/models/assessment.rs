use serde::{Deserialize, Serialize};

use super::enums::{RuleSeverity, ToxicityOutcome};

/// A rule that fired during a toxicity check, kept for auditability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTrigger {
    pub rule_id: String,
    pub description: String,
    pub severity: RuleSeverity,
}

/// Result of checking one candidate regimen against the rule set and the
/// patient's contraindications. Attached to exactly one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToxicityVerdict {
    pub outcome: ToxicityOutcome,
    /// Every rule that fired. All hard matches are reported, not just the
    /// first, so the audit trail is complete.
    pub triggers: Vec<RuleTrigger>,
    pub confidence: f32,
}

impl ToxicityVerdict {
    pub fn is_contraindicated(&self) -> bool {
        self.outcome == ToxicityOutcome::Contraindicated
    }

    pub fn hard_triggers(&self) -> impl Iterator<Item = &RuleTrigger> {
        self.triggers
            .iter()
            .filter(|t| t.severity == RuleSeverity::Hard)
    }
}

/// A documented negative risk factor contributing to an outcome estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub code: String,
    pub description: String,
}

/// Two-sided confidence interval around a point estimate, clamped to [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f32,
    pub upper: f32,
}

impl ConfidenceInterval {
    pub fn width(&self) -> f32 {
        self.upper - self.lower
    }
}

/// Predicted likelihood of treatment success for one candidate regimen.
/// Attached to exactly one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeEstimate {
    /// Point estimate in 0.0..=1.0.
    pub success_probability: f32,
    pub interval: ConfidenceInterval,
    pub risk_factors: Vec<RiskFactor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_width() {
        let interval = ConfidenceInterval {
            lower: 0.4,
            upper: 0.72,
        };
        assert!((interval.width() - 0.32).abs() < 1e-6);
    }

    #[test]
    fn hard_triggers_filtered_from_mixed_verdict() {
        let verdict = ToxicityVerdict {
            outcome: ToxicityOutcome::Contraindicated,
            triggers: vec![
                RuleTrigger {
                    rule_id: "HARD-001".into(),
                    description: "compounding cardiotoxicity".into(),
                    severity: RuleSeverity::Hard,
                },
                RuleTrigger {
                    rule_id: "SOFT-001".into(),
                    description: "additive myelosuppression".into(),
                    severity: RuleSeverity::Soft,
                },
            ],
            confidence: 1.0,
        };

        assert!(verdict.is_contraindicated());
        assert_eq!(verdict.hard_triggers().count(), 1);
    }
}
