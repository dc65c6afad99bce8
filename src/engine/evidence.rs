use std::sync::RwLock;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{EvidencePassage, QueryFilters, ScoredPassage};

#[derive(Error, Debug)]
pub enum EvidenceError {
    #[error("embedding dimension mismatch: index is {expected}, passage has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid query embedding: {0}")]
    InvalidEmbedding(String),

    #[error("embedding generation failed: {0}")]
    EmbeddingFailed(String),
}

/// Read side of the evidence index, injected wherever retrieval is needed.
pub trait EvidenceSearch: Send + Sync {
    /// Top-k passages by cosine similarity, ties broken by more recent
    /// publication date, then by higher confidence tier. An empty index
    /// yields an empty result, never an error.
    fn query(
        &self,
        embedding: &[f32],
        k: usize,
        filters: &QueryFilters,
    ) -> Result<Vec<ScoredPassage>, EvidenceError>;

    /// Whether a passage id resolves to an indexed passage. Used to keep
    /// every emitted citation traceable.
    fn contains(&self, passage_id: &Uuid) -> bool;
}

/// Process-wide in-memory evidence index.
///
/// Read-heavy at request time; writes happen only on the ingestion path.
/// A successful `index` is visible to every subsequent `query` in-process.
pub struct InMemoryEvidenceIndex {
    dimension: usize,
    passages: RwLock<Vec<EvidencePassage>>,
}

impl InMemoryEvidenceIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            passages: RwLock::new(Vec::new()),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.passages.read().expect("evidence index lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ingestion path. Rejects passages whose embedding does not match the
    /// configured dimensionality.
    pub fn index(&self, passage: EvidencePassage) -> Result<(), EvidenceError> {
        if passage.embedding.len() != self.dimension {
            return Err(EvidenceError::DimensionMismatch {
                expected: self.dimension,
                actual: passage.embedding.len(),
            });
        }
        let mut passages = self.passages.write().expect("evidence index lock poisoned");
        passages.push(passage);
        Ok(())
    }

    fn validate_query(&self, embedding: &[f32]) -> Result<(), EvidenceError> {
        if embedding.len() != self.dimension {
            return Err(EvidenceError::InvalidEmbedding(format!(
                "expected dimension {}, got {}",
                self.dimension,
                embedding.len()
            )));
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(EvidenceError::InvalidEmbedding(
                "embedding contains non-finite values".into(),
            ));
        }
        Ok(())
    }
}

impl EvidenceSearch for InMemoryEvidenceIndex {
    fn query(
        &self,
        embedding: &[f32],
        k: usize,
        filters: &QueryFilters,
    ) -> Result<Vec<ScoredPassage>, EvidenceError> {
        self.validate_query(embedding)?;

        let passages = self.passages.read().expect("evidence index lock poisoned");
        let mut scored: Vec<ScoredPassage> = passages
            .iter()
            .filter(|p| filters.accepts(p))
            .map(|p| ScoredPassage {
                similarity: cosine_similarity(embedding, &p.embedding),
                passage: p.clone(),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.passage.published.cmp(&a.passage.published))
                .then_with(|| b.passage.confidence_tier.cmp(&a.passage.confidence_tier))
        });
        scored.truncate(k);
        Ok(scored)
    }

    fn contains(&self, passage_id: &Uuid) -> bool {
        self.passages
            .read()
            .expect("evidence index lock poisoned")
            .iter()
            .any(|p| p.id == *passage_id)
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
