pub mod assessment;
pub mod enums;
pub mod evidence;
pub mod patient;
pub mod plan;
pub mod regimen;

pub use assessment::{ConfidenceInterval, OutcomeEstimate, RiskFactor, RuleTrigger, ToxicityVerdict};
pub use evidence::{EvidencePassage, QueryFilters, ScoredPassage};
pub use patient::{
    Demographics, FeatureValidationError, GenomicVariant, LesionFinding, OrganFunction,
    PatientFeatureBundle, PriorTreatment,
};
pub use plan::{
    CandidateDiagnostic, CitationRef, DropReason, EvidenceNote, PlanEntry, PlanStatus,
    TreatmentPlan,
};
pub use regimen::{CandidateRegimen, DrugDose};
