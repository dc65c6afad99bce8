use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::enums::{Pathogenicity, PathologyGrade, PriorOutcome, Sex, TumorStage};

#[derive(Error, Debug, PartialEq)]
pub enum FeatureValidationError {
    #[error("at least one staged lesion finding is required")]
    MissingLesionFindings,

    #[error("lesion confidence must be within 0.0..=1.0, got {0}")]
    ConfidenceOutOfRange(f32),

    #[error("lesion type must not be empty")]
    EmptyLesionType,
}

/// Basic demographics from the registration collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demographics {
    pub age_years: u8,
    pub sex: Sex,
}

/// A lesion finding produced by the upstream imaging feature extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LesionFinding {
    /// Histology label, e.g. "lung carcinoma" (pre-normalized, lowercase).
    pub lesion_type: String,
    pub stage: TumorStage,
    pub location: String,
    /// Detector confidence in 0.0..=1.0.
    pub confidence: f32,
}

/// A genomic variant from the sequencing collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomicVariant {
    pub gene: String,
    pub mutation: String,
    pub pathogenicity: Pathogenicity,
}

/// Organ-function values relevant to regimen contraindications.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganFunction {
    pub creatinine_clearance_ml_min: Option<f32>,
    pub ejection_fraction_pct: Option<f32>,
}

/// A prior treatment line and its documented response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorTreatment {
    pub regimen_name: String,
    pub drugs: Vec<String>,
    pub outcome: PriorOutcome,
}

/// Immutable per-request snapshot of everything the engine knows about a
/// patient. Assembled once by the orchestrator's caller and never mutated;
/// the minimum-required-field contract is checked at construction, not at
/// each consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientFeatureBundle {
    pub id: Uuid,
    pub demographics: Demographics,
    pub lesions: Vec<LesionFinding>,
    pub variants: Vec<GenomicVariant>,
    pub pathology_grade: Option<PathologyGrade>,
    /// Known allergen names, pre-normalized to lowercase.
    pub allergies: Vec<String>,
    pub organ_function: OrganFunction,
    pub prior_treatments: Vec<PriorTreatment>,
    pub assembled_at: NaiveDateTime,
}

impl PatientFeatureBundle {
    pub fn builder(demographics: Demographics) -> PatientBundleBuilder {
        PatientBundleBuilder {
            demographics,
            lesions: Vec::new(),
            variants: Vec::new(),
            pathology_grade: None,
            allergies: Vec::new(),
            organ_function: OrganFunction::default(),
            prior_treatments: Vec::new(),
        }
    }

    /// The most advanced stage across all lesion findings.
    pub fn max_stage(&self) -> TumorStage {
        self.lesions
            .iter()
            .map(|l| l.stage)
            .max()
            .unwrap_or(TumorStage::I)
    }

    pub fn has_genomic_data(&self) -> bool {
        !self.variants.is_empty()
    }

    /// Variants classified pathogenic or likely pathogenic.
    pub fn actionable_variants(&self) -> impl Iterator<Item = &GenomicVariant> {
        self.variants
            .iter()
            .filter(|v| v.pathogenicity.is_actionable())
    }

    pub fn has_actionable_variant_in(&self, gene: &str) -> bool {
        self.actionable_variants()
            .any(|v| v.gene.eq_ignore_ascii_case(gene))
    }

    pub fn is_allergic_to(&self, drug: &str) -> bool {
        self.allergies
            .iter()
            .any(|a| a.eq_ignore_ascii_case(drug))
    }
}

/// Builder for [`PatientFeatureBundle`]; `build()` runs validation once.
pub struct PatientBundleBuilder {
    demographics: Demographics,
    lesions: Vec<LesionFinding>,
    variants: Vec<GenomicVariant>,
    pathology_grade: Option<PathologyGrade>,
    allergies: Vec<String>,
    organ_function: OrganFunction,
    prior_treatments: Vec<PriorTreatment>,
}

impl PatientBundleBuilder {
    pub fn lesion(mut self, finding: LesionFinding) -> Self {
        self.lesions.push(finding);
        self
    }

    pub fn variant(mut self, variant: GenomicVariant) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn pathology_grade(mut self, grade: PathologyGrade) -> Self {
        self.pathology_grade = Some(grade);
        self
    }

    pub fn allergy(mut self, allergen: &str) -> Self {
        self.allergies.push(allergen.to_lowercase());
        self
    }

    pub fn organ_function(mut self, organ_function: OrganFunction) -> Self {
        self.organ_function = organ_function;
        self
    }

    pub fn prior_treatment(mut self, treatment: PriorTreatment) -> Self {
        self.prior_treatments.push(treatment);
        self
    }

    pub fn build(self) -> Result<PatientFeatureBundle, FeatureValidationError> {
        if self.lesions.is_empty() {
            return Err(FeatureValidationError::MissingLesionFindings);
        }
        for lesion in &self.lesions {
            if !(0.0..=1.0).contains(&lesion.confidence) {
                return Err(FeatureValidationError::ConfidenceOutOfRange(
                    lesion.confidence,
                ));
            }
            if lesion.lesion_type.trim().is_empty() {
                return Err(FeatureValidationError::EmptyLesionType);
            }
        }

        Ok(PatientFeatureBundle {
            id: Uuid::new_v4(),
            demographics: self.demographics,
            lesions: self.lesions,
            variants: self.variants,
            pathology_grade: self.pathology_grade,
            allergies: self.allergies,
            organ_function: self.organ_function,
            prior_treatments: self.prior_treatments,
            assembled_at: chrono::Local::now().naive_local(),
        })
    }
}
