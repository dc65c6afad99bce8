use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Modality;

/// A single drug with its dosing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugDose {
    /// Generic drug name, lowercase.
    pub drug: String,
    pub dose_mg: f32,
    /// Dosing schedule, e.g. "q3w", "weekly", "daily".
    pub schedule: String,
}

/// A proposed treatment combination enumerated by the plan generator.
///
/// Transient: a candidate exists only for the lifetime of one request and
/// is never persisted except inside a resulting `TreatmentPlan`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRegimen {
    /// Deterministic per (patient, template): UUIDv5 of the template name
    /// in the patient-id namespace, so repeated generation is reproducible.
    pub id: Uuid,
    pub name: String,
    pub modalities: Vec<Modality>,
    pub drugs: Vec<DrugDose>,
    /// Position in the generator's deterministic enumeration; used as the
    /// final ranking tie-break.
    pub enumeration_order: usize,
}

impl CandidateRegimen {
    pub fn drug_names(&self) -> impl Iterator<Item = &str> + Clone {
        self.drugs.iter().map(|d| d.drug.as_str())
    }

    /// Text form used to derive the retrieval query embedding.
    pub fn description(&self) -> String {
        let modalities: Vec<&str> = self.modalities.iter().map(|m| m.as_str()).collect();
        let drugs: Vec<&str> = self.drug_names().collect();
        if drugs.is_empty() {
            format!("{} {}", self.name, modalities.join(" "))
        } else {
            format!("{} {} {}", self.name, modalities.join(" "), drugs.join(" "))
        }
    }
}
