use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ConfidenceTier, StudyType};

/// A unit of retrievable evidence text with its pre-computed embedding.
///
/// Produced by the ingestion collaborator; immutable once indexed. The
/// embedding dimensionality must match the index's configured dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidencePassage {
    pub id: Uuid,
    /// Source document identifier (e.g. registry id or DOI).
    pub source_id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub published: NaiveDate,
    pub study_type: StudyType,
    pub confidence_tier: ConfidenceTier,
}

/// A passage with its similarity to a query embedding.
#[derive(Debug, Clone)]
pub struct ScoredPassage {
    pub passage: EvidencePassage,
    pub similarity: f32,
}

/// Optional retrieval filters applied before ranking.
#[derive(Debug, Clone, Default)]
pub struct QueryFilters {
    /// Keep only passages at or above this tier.
    pub min_confidence_tier: Option<ConfidenceTier>,
    /// Keep only passages of these study types.
    pub study_types: Option<Vec<StudyType>>,
}

impl QueryFilters {
    /// No filtering: every indexed passage is a retrieval candidate.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn accepts(&self, passage: &EvidencePassage) -> bool {
        if let Some(min_tier) = self.min_confidence_tier {
            if passage.confidence_tier < min_tier {
                return false;
            }
        }
        if let Some(types) = &self.study_types {
            if !types.contains(&passage.study_type) {
                return false;
            }
        }
        true
    }
}
