use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::assessment::{OutcomeEstimate, RuleTrigger, ToxicityVerdict};
use super::enums::StudyType;
use super::regimen::CandidateRegimen;

/// How a completed request resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// At least one candidate survived scoring and filtering.
    Completed,
    /// The generator found no regimen applicable to the patient's findings.
    NoApplicableRegimen,
    /// Candidates were generated but none survived the safety filter.
    NoSafeRegimen,
}

/// A traceable reference to a supporting evidence passage.
///
/// The passage id plus source metadata are always carried together so a
/// citation can never be surfaced without its source identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationRef {
    pub passage_id: Uuid,
    pub source_id: String,
    pub study_type: StudyType,
    pub published: NaiveDate,
    pub similarity: f32,
}

/// Evidence annotation for a plan entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceNote {
    Cited,
    /// Retrieval found nothing at or above the similarity floor. Explicit
    /// marker, never an empty list pretending to be support.
    NoSupportingEvidenceFound,
}

/// One ranked candidate in the final plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanEntry {
    pub regimen: CandidateRegimen,
    pub verdict: ToxicityVerdict,
    pub estimate: OutcomeEstimate,
    pub citations: Vec<CitationRef>,
    pub evidence_note: EvidenceNote,
    /// Aggregate similarity of qualifying citations (0.0 when uncited).
    pub evidence_support: f32,
    pub rank_score: f64,
}

/// Why a candidate was dropped before the final plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropReason {
    PredictorFailed { message: String },
    RetrievalFailed { message: String },
    TimedOut,
    Contraindicated { triggers: Vec<RuleTrigger> },
}

/// Diagnostic record for a dropped candidate. Absence of a candidate from
/// the plan is always explicit and attributable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDiagnostic {
    pub regimen_id: Uuid,
    pub regimen_name: String,
    pub enumeration_order: usize,
    pub reason: DropReason,
}

/// Final artifact of a recommendation request.
///
/// Immutable once emitted; regeneration supersedes, never mutates.
/// Invariant: no entry's verdict is CONTRAINDICATED.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentPlan {
    pub id: Uuid,
    /// Back-reference to the feature bundle the plan was derived from.
    pub patient_id: Uuid,
    pub rule_set_version: String,
    pub generated_at: NaiveDateTime,
    pub status: PlanStatus,
    /// Entries in rank order, best first.
    pub entries: Vec<PlanEntry>,
    pub diagnostics: Vec<CandidateDiagnostic>,
}
