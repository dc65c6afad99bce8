use super::evidence::EvidenceError;
use crate::models::{CandidateRegimen, PatientFeatureBundle};

/// Query embedding abstraction. Evidence passages arrive pre-embedded from
/// the ingestion collaborator; the engine only embeds retrieval queries.
pub trait QueryEmbedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EvidenceError>;
    fn dimension(&self) -> usize;
}

/// Deterministic token feature-hashing embedder.
///
/// Hashes lowercase alphanumeric tokens into the configured dimension with
/// a sign bit, then L2-normalizes. No model files, fully reproducible.
/// Ingestion must use the same scheme for passages it indexes.
pub struct FeatureHashEmbedder {
    dimension: usize,
}

impl FeatureHashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl QueryEmbedder for FeatureHashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EvidenceError> {
        if self.dimension == 0 {
            return Err(EvidenceError::EmbeddingFailed(
                "embedder configured with zero dimension".into(),
            ));
        }

        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(token.to_ascii_lowercase().as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Text used to derive the retrieval query embedding for a candidate:
/// regimen description plus the patient's lesion and variant context.
pub fn regimen_query_text(regimen: &CandidateRegimen, patient: &PatientFeatureBundle) -> String {
    let mut parts = vec![regimen.description()];
    for lesion in &patient.lesions {
        parts.push(format!("{} stage {}", lesion.lesion_type, lesion.stage.as_str()));
    }
    for variant in patient.actionable_variants() {
        parts.push(format!("{} {}", variant.gene, variant.mutation));
    }
    if let Some(grade) = patient.pathology_grade {
        parts.push(format!("grade {}", grade.as_str()));
    }
    parts.join(" ")
}

/// FNV-1a, 64-bit. Stable across platforms and releases, unlike the std
/// `DefaultHasher`, so stored embeddings stay comparable to fresh queries.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::evidence::cosine_similarity;

    #[test]
    fn embedding_is_deterministic() {
        let embedder = FeatureHashEmbedder::new(64);
        let a = embedder.embed("cisplatin chemoradiation stage III").unwrap();
        let b = embedder.embed("cisplatin chemoradiation stage III").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn embedding_is_l2_normalized() {
        let embedder = FeatureHashEmbedder::new(64);
        let v = embedder.embed("carboplatin paclitaxel").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_yields_zero_vector() {
        let embedder = FeatureHashEmbedder::new(16);
        let v = embedder.embed("").unwrap();
        assert_eq!(v.len(), 16);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn tokenization_ignores_case_and_punctuation() {
        let embedder = FeatureHashEmbedder::new(64);
        let a = embedder.embed("Cisplatin, 75mg!").unwrap();
        let b = embedder.embed("cisplatin 75mg").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn shared_tokens_score_higher_than_disjoint() {
        let embedder = FeatureHashEmbedder::new(128);
        let query = embedder.embed("cisplatin chemoradiation carcinoma").unwrap();
        let related = embedder
            .embed("cisplatin chemoradiation improved carcinoma survival")
            .unwrap();
        let unrelated = embedder.embed("tamoxifen hormone receptor").unwrap();

        assert!(
            cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated),
            "related text should be closer to the query"
        );
    }
}
