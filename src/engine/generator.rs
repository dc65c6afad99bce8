use std::sync::Arc;

use uuid::Uuid;

use super::embedding::{regimen_query_text, QueryEmbedder};
use super::evidence::{EvidenceError, EvidenceSearch};
use crate::models::enums::{Modality, TumorStage};
use crate::models::{CandidateRegimen, DrugDose, PatientFeatureBundle, QueryFilters};

/// Passages consulted per candidate when computing the pre-score that
/// decides which candidates survive the cap.
const PRESCORE_TOP_K: usize = 5;

/// A regimen template in the applicable-modality table.
#[derive(Debug, Clone)]
pub struct RegimenTemplate {
    pub name: String,
    pub modalities: Vec<Modality>,
    pub drugs: Vec<DrugDose>,
    /// Stages this template applies to.
    pub stages: Vec<TumorStage>,
    /// If set, at least one lesion type must contain one of these keywords.
    pub lesion_keywords: Option<Vec<String>>,
    /// If set, the patient must carry an actionable variant in this gene.
    pub requires_gene: Option<String>,
}

impl RegimenTemplate {
    fn applies_to(&self, patient: &PatientFeatureBundle) -> bool {
        let stage_and_type_match = patient.lesions.iter().any(|lesion| {
            let stage_ok = self.stages.contains(&lesion.stage);
            let type_ok = match &self.lesion_keywords {
                None => true,
                Some(keywords) => {
                    let lesion_type = lesion.lesion_type.to_lowercase();
                    keywords.iter().any(|k| lesion_type.contains(k.as_str()))
                }
            };
            stage_ok && type_ok
        });
        if !stage_and_type_match {
            return false;
        }

        match &self.requires_gene {
            None => true,
            Some(gene) => patient.has_actionable_variant_in(gene),
        }
    }
}

/// Enumerates candidate regimens for a patient bundle.
///
/// Pure given (patient, template table version, cap, index contents):
/// enumeration order is the fixed template table order and candidate ids
/// are UUIDv5 of the template name in the patient-id namespace, so
/// repeated calls return the same ordered sequence.
pub struct PlanGenerator {
    templates: Vec<RegimenTemplate>,
    table_version: String,
    embedder: Arc<dyn QueryEmbedder>,
    evidence: Arc<dyn EvidenceSearch>,
}

impl PlanGenerator {
    pub fn new(
        templates: Vec<RegimenTemplate>,
        table_version: &str,
        embedder: Arc<dyn QueryEmbedder>,
        evidence: Arc<dyn EvidenceSearch>,
    ) -> Self {
        Self {
            templates,
            table_version: table_version.to_string(),
            embedder,
            evidence,
        }
    }

    pub fn with_standard_templates(
        embedder: Arc<dyn QueryEmbedder>,
        evidence: Arc<dyn EvidenceSearch>,
    ) -> Self {
        Self::new(standard_templates(), "templates-2026.1", embedder, evidence)
    }

    pub fn table_version(&self) -> &str {
        &self.table_version
    }

    /// Enumerate applicable candidates, capped at `max_candidates`.
    ///
    /// When the applicable space exceeds the cap, candidates are ranked by
    /// evidence-support pre-score and the strongest are retained, never an
    /// arbitrary truncation. The retained set is re-emitted in enumeration
    /// order.
    pub fn generate(
        &self,
        patient: &PatientFeatureBundle,
        max_candidates: usize,
    ) -> Result<Vec<CandidateRegimen>, EvidenceError> {
        let mut candidates: Vec<CandidateRegimen> = self
            .templates
            .iter()
            .enumerate()
            .filter(|(_, t)| t.applies_to(patient))
            .map(|(order, t)| CandidateRegimen {
                id: Uuid::new_v5(&patient.id, t.name.as_bytes()),
                name: t.name.clone(),
                modalities: t.modalities.clone(),
                drugs: t.drugs.clone(),
                enumeration_order: order,
            })
            .collect();

        tracing::debug!(
            applicable = candidates.len(),
            cap = max_candidates,
            table_version = %self.table_version,
            "Candidate enumeration"
        );

        if candidates.len() <= max_candidates {
            return Ok(candidates);
        }

        // Rank by prior-evidence support before truncating.
        let mut prescored: Vec<(f32, CandidateRegimen)> = Vec::with_capacity(candidates.len());
        for candidate in candidates.drain(..) {
            let query = self.embedder.embed(&regimen_query_text(&candidate, patient))?;
            let hits = self
                .evidence
                .query(&query, PRESCORE_TOP_K, &QueryFilters::none())?;
            let score = if hits.is_empty() {
                0.0
            } else {
                hits.iter().map(|h| h.similarity).sum::<f32>() / hits.len() as f32
            };
            prescored.push((score, candidate));
        }

        prescored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.enumeration_order.cmp(&b.1.enumeration_order))
        });
        prescored.truncate(max_candidates);

        let mut retained: Vec<CandidateRegimen> =
            prescored.into_iter().map(|(_, c)| c).collect();
        retained.sort_by_key(|c| c.enumeration_order);
        Ok(retained)
    }
}

fn drug(name: &str, dose_mg: f32, schedule: &str) -> DrugDose {
    DrugDose {
        drug: name.into(),
        dose_mg,
        schedule: schedule.into(),
    }
}

/// The built-in applicable-modality table. Order is the enumeration order.
pub fn standard_templates() -> Vec<RegimenTemplate> {
    vec![
        RegimenTemplate {
            name: "Surgical resection".into(),
            modalities: vec![Modality::Surgery],
            drugs: vec![],
            stages: vec![TumorStage::I, TumorStage::II],
            lesion_keywords: None,
            requires_gene: None,
        },
        RegimenTemplate {
            name: "Resection with adjuvant chemotherapy".into(),
            modalities: vec![Modality::Surgery, Modality::Chemotherapy],
            drugs: vec![drug("cisplatin", 75.0, "q3w"), drug("5-fluorouracil", 400.0, "weekly")],
            stages: vec![TumorStage::II, TumorStage::III],
            lesion_keywords: None,
            requires_gene: None,
        },
        RegimenTemplate {
            name: "Concurrent chemoradiation".into(),
            modalities: vec![Modality::Radiation, Modality::Chemotherapy],
            drugs: vec![drug("cisplatin", 100.0, "q3w")],
            stages: vec![TumorStage::II, TumorStage::III],
            lesion_keywords: None,
            requires_gene: None,
        },
        RegimenTemplate {
            name: "Platinum doublet".into(),
            modalities: vec![Modality::Chemotherapy],
            drugs: vec![drug("carboplatin", 300.0, "q3w"), drug("paclitaxel", 175.0, "q3w")],
            stages: vec![TumorStage::III, TumorStage::IV],
            lesion_keywords: None,
            requires_gene: None,
        },
        RegimenTemplate {
            name: "Anthracycline combination".into(),
            modalities: vec![Modality::Chemotherapy],
            drugs: vec![drug("doxorubicin", 60.0, "q3w"), drug("cyclophosphamide", 600.0, "q3w")],
            stages: vec![TumorStage::II, TumorStage::III, TumorStage::IV],
            lesion_keywords: None,
            requires_gene: None,
        },
        RegimenTemplate {
            name: "Immune checkpoint monotherapy".into(),
            modalities: vec![Modality::Immunotherapy],
            drugs: vec![drug("pembrolizumab", 200.0, "q3w")],
            stages: vec![TumorStage::III, TumorStage::IV],
            lesion_keywords: None,
            requires_gene: None,
        },
        RegimenTemplate {
            name: "Chemo-immunotherapy".into(),
            modalities: vec![Modality::Chemotherapy, Modality::Immunotherapy],
            drugs: vec![drug("cisplatin", 75.0, "q3w"), drug("pembrolizumab", 200.0, "q3w")],
            stages: vec![TumorStage::IV],
            lesion_keywords: None,
            requires_gene: None,
        },
        RegimenTemplate {
            name: "EGFR-targeted therapy".into(),
            modalities: vec![Modality::TargetedTherapy],
            drugs: vec![drug("erlotinib", 150.0, "daily")],
            stages: vec![TumorStage::III, TumorStage::IV],
            lesion_keywords: Some(vec!["carcinoma".into()]),
            requires_gene: Some("EGFR".into()),
        },
        RegimenTemplate {
            name: "HER2-targeted combination".into(),
            modalities: vec![Modality::TargetedTherapy, Modality::Chemotherapy],
            drugs: vec![drug("trastuzumab", 8.0, "q3w"), drug("paclitaxel", 80.0, "weekly")],
            stages: vec![TumorStage::II, TumorStage::III, TumorStage::IV],
            lesion_keywords: Some(vec!["carcinoma".into()]),
            requires_gene: Some("ERBB2".into()),
        },
        RegimenTemplate {
            name: "Hormone therapy".into(),
            modalities: vec![Modality::HormoneTherapy],
            drugs: vec![drug("tamoxifen", 20.0, "daily")],
            stages: vec![TumorStage::I, TumorStage::II, TumorStage::III, TumorStage::IV],
            lesion_keywords: Some(vec!["breast".into()]),
            requires_gene: None,
        },
    ]
}
