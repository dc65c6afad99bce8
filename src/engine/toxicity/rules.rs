use serde::{Deserialize, Serialize};

use super::ToxicityError;
use crate::models::enums::RuleSeverity;

/// A drug-combination interaction rule. Pairwise when `drugs` has two
/// entries, n-ary when more; the rule fires when every listed drug is
/// present in the regimen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRule {
    pub id: String,
    /// Generic drug names, lowercase.
    pub drugs: Vec<String>,
    pub severity: RuleSeverity,
    /// Contribution to accumulated soft risk; unused for hard rules.
    #[serde(default)]
    pub risk_weight: f32,
    pub description: String,
}

impl InteractionRule {
    pub fn fires_on<'a>(&self, regimen_drugs: impl Iterator<Item = &'a str> + Clone) -> bool {
        self.drugs.iter().all(|rule_drug| {
            regimen_drugs
                .clone()
                .any(|d| d.eq_ignore_ascii_case(rule_drug))
        })
    }
}

/// A patient-specific organ-function floor for one drug. Firing is a hard
/// contraindication. A missing patient value never fires the rule; absent
/// data widens the outcome interval instead of inventing a contraindication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganThresholdRule {
    pub id: String,
    pub drug: String,
    #[serde(default)]
    pub min_creatinine_clearance_ml_min: Option<f32>,
    #[serde(default)]
    pub min_ejection_fraction_pct: Option<f32>,
    pub description: String,
}

/// Versioned, process-wide immutable rule set, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRuleSet {
    pub version: String,
    pub interactions: Vec<InteractionRule>,
    pub organ_thresholds: Vec<OrganThresholdRule>,
    /// The drug universe the rule set covers. A regimen drug outside this
    /// list has an unknown interaction profile and defaults to CAUTION.
    pub known_drugs: Vec<String>,
}

impl InteractionRuleSet {
    /// Load a rule set from a JSON file.
    pub fn load(path: &std::path::Path) -> Result<Self, ToxicityError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ToxicityError::RuleSetLoad(path.display().to_string(), e.to_string())
        })?;
        let rules: InteractionRuleSet = serde_json::from_str(&json).map_err(|e| {
            ToxicityError::RuleSetParse(path.display().to_string(), e.to_string())
        })?;
        Ok(rules)
    }

    pub fn knows(&self, drug: &str) -> bool {
        self.known_drugs.iter().any(|d| d.eq_ignore_ascii_case(drug))
    }

    /// Built-in rule set for tests (no file I/O).
    pub fn load_test() -> Self {
        Self {
            version: "2026.1-test".into(),
            interactions: vec![
                InteractionRule {
                    id: "HARD-001".into(),
                    drugs: vec!["doxorubicin".into(), "trastuzumab".into()],
                    severity: RuleSeverity::Hard,
                    risk_weight: 0.0,
                    description: "Concurrent anthracycline and HER2 antibody: compounding cardiotoxicity".into(),
                },
                InteractionRule {
                    id: "HARD-002".into(),
                    drugs: vec!["cisplatin".into(), "carboplatin".into()],
                    severity: RuleSeverity::Hard,
                    risk_weight: 0.0,
                    description: "Double platinum agents: cumulative nephro- and ototoxicity".into(),
                },
                InteractionRule {
                    id: "HARD-003".into(),
                    drugs: vec![
                        "cisplatin".into(),
                        "doxorubicin".into(),
                        "cyclophosphamide".into(),
                    ],
                    severity: RuleSeverity::Hard,
                    risk_weight: 0.0,
                    description: "Triple cytotoxic combination exceeds tolerable myelosuppression".into(),
                },
                InteractionRule {
                    id: "SOFT-001".into(),
                    drugs: vec!["carboplatin".into(), "paclitaxel".into()],
                    severity: RuleSeverity::Soft,
                    risk_weight: 0.3,
                    description: "Additive myelosuppression".into(),
                },
                InteractionRule {
                    id: "SOFT-002".into(),
                    drugs: vec!["cisplatin".into(), "pembrolizumab".into()],
                    severity: RuleSeverity::Soft,
                    risk_weight: 0.25,
                    description: "Immune-related adverse events with platinum backbone".into(),
                },
                InteractionRule {
                    id: "SOFT-003".into(),
                    drugs: vec!["doxorubicin".into(), "cyclophosphamide".into()],
                    severity: RuleSeverity::Soft,
                    risk_weight: 0.3,
                    description: "Additive cardiac and marrow toxicity".into(),
                },
            ],
            organ_thresholds: vec![
                OrganThresholdRule {
                    id: "ORGAN-001".into(),
                    drug: "cisplatin".into(),
                    min_creatinine_clearance_ml_min: Some(60.0),
                    min_ejection_fraction_pct: None,
                    description: "Cisplatin requires creatinine clearance >= 60 mL/min".into(),
                },
                OrganThresholdRule {
                    id: "ORGAN-002".into(),
                    drug: "doxorubicin".into(),
                    min_creatinine_clearance_ml_min: None,
                    min_ejection_fraction_pct: Some(50.0),
                    description: "Doxorubicin requires ejection fraction >= 50%".into(),
                },
                OrganThresholdRule {
                    id: "ORGAN-003".into(),
                    drug: "carboplatin".into(),
                    min_creatinine_clearance_ml_min: Some(30.0),
                    min_ejection_fraction_pct: None,
                    description: "Carboplatin requires creatinine clearance >= 30 mL/min".into(),
                },
            ],
            known_drugs: vec![
                "cisplatin".into(),
                "carboplatin".into(),
                "paclitaxel".into(),
                "doxorubicin".into(),
                "cyclophosphamide".into(),
                "5-fluorouracil".into(),
                "trastuzumab".into(),
                "pembrolizumab".into(),
                "erlotinib".into(),
                "tamoxifen".into(),
            ],
        }
    }
}
