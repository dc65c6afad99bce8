use serde::{Deserialize, Serialize};

/// Patient sex as recorded in the feature bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Female,
    Male,
    Other,
}

/// Tumor stage from imaging findings (simplified AJCC grouping).
///
/// Ordered: later stages compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TumorStage {
    I,
    II,
    III,
    IV,
}

impl TumorStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TumorStage::I => "I",
            TumorStage::II => "II",
            TumorStage::III => "III",
            TumorStage::IV => "IV",
        }
    }

    /// Metastatic disease favors systemic over local regimens.
    pub fn is_metastatic(&self) -> bool {
        matches!(self, TumorStage::IV)
    }
}

/// Histopathology grade (differentiation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathologyGrade {
    G1,
    G2,
    G3,
    G4,
}

impl PathologyGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathologyGrade::G1 => "G1",
            PathologyGrade::G2 => "G2",
            PathologyGrade::G3 => "G3",
            PathologyGrade::G4 => "G4",
        }
    }
}

/// ACMG-style pathogenicity classification for a genomic variant.
///
/// Ordered: more pathogenic compares greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pathogenicity {
    Benign,
    LikelyBenign,
    Uncertain,
    LikelyPathogenic,
    Pathogenic,
}

impl Pathogenicity {
    pub fn is_actionable(&self) -> bool {
        matches!(self, Pathogenicity::LikelyPathogenic | Pathogenicity::Pathogenic)
    }
}

/// Treatment modality making up a regimen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Surgery,
    Radiation,
    Chemotherapy,
    TargetedTherapy,
    Immunotherapy,
    HormoneTherapy,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Surgery => "surgery",
            Modality::Radiation => "radiation",
            Modality::Chemotherapy => "chemotherapy",
            Modality::TargetedTherapy => "targeted_therapy",
            Modality::Immunotherapy => "immunotherapy",
            Modality::HormoneTherapy => "hormone_therapy",
        }
    }

    /// Local modalities treat a site; systemic ones treat the whole patient.
    pub fn is_systemic(&self) -> bool {
        !matches!(self, Modality::Surgery | Modality::Radiation)
    }
}

/// Study design behind an evidence passage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyType {
    MetaAnalysis,
    RandomizedControlled,
    Cohort,
    CaseSeries,
    Preclinical,
}

/// Evidence confidence tier assigned at ingestion.
///
/// Ordered: higher tiers compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    Low,
    Moderate,
    High,
}

/// Outcome of a toxicity check on a candidate regimen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToxicityOutcome {
    Safe,
    Caution,
    Contraindicated,
}

impl ToxicityOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToxicityOutcome::Safe => "SAFE",
            ToxicityOutcome::Caution => "CAUTION",
            ToxicityOutcome::Contraindicated => "CONTRAINDICATED",
        }
    }
}

/// Severity class of an interaction rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSeverity {
    /// Any match contraindicates the regimen outright.
    Hard,
    /// Matches accumulate risk; past the threshold the regimen is flagged CAUTION.
    Soft,
}

/// Documented response to a prior treatment line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorOutcome {
    CompleteResponse,
    PartialResponse,
    StableDisease,
    Progression,
}
