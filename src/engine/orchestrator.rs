use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::timeout;
use uuid::Uuid;

use super::embedding::{regimen_query_text, QueryEmbedder};
use super::evidence::EvidenceSearch;
use super::generator::PlanGenerator;
use super::outcome::{mandatory_minimum, OutcomePredictor};
use super::toxicity::ToxicityChecker;
use super::EngineError;
use crate::config::EngineConfig;
use crate::models::enums::ToxicityOutcome;
use crate::models::{
    CandidateDiagnostic, CandidateRegimen, CitationRef, DropReason, EvidenceNote, OutcomeEstimate,
    PatientFeatureBundle, PlanEntry, PlanStatus, QueryFilters, ScoredPassage, TreatmentPlan,
};

// ─────────────────────────────── Request lifecycle ───────────────────────────────

/// States a recommendation request moves through. Transitions only advance;
/// each one is logged with the patient id for auditability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Generating,
    Scoring,
    Filtering,
    Ranking,
    Completed,
    Failed,
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Received => "RECEIVED",
            RequestState::Generating => "GENERATING",
            RequestState::Scoring => "SCORING",
            RequestState::Filtering => "FILTERING",
            RequestState::Ranking => "RANKING",
            RequestState::Completed => "COMPLETED",
            RequestState::Failed => "FAILED",
        }
    }
}

fn transition(patient_id: Uuid, from: RequestState, to: RequestState) {
    tracing::info!(
        patient_id = %patient_id,
        from = from.as_str(),
        to = to.as_str(),
        "Request state transition"
    );
}

/// Cooperative cancellation handle. Cancelling is observed at stage
/// boundaries; a cancelled request yields no partial plan.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ─────────────────────────────── Orchestrator ───────────────────────────────

/// Per-candidate scoring output, before filtering and ranking.
struct ScoredCandidate {
    regimen: CandidateRegimen,
    estimate: OutcomeEstimate,
    retrieved: Vec<ScoredPassage>,
}

/// Drives one request through generation, scoring, filtering, and ranking.
///
/// Candidates are scored concurrently; a single candidate's failure or
/// timeout is absorbed into diagnostics and never aborts the request
/// unless every candidate fails.
pub struct RecommendationOrchestrator {
    config: EngineConfig,
    generator: PlanGenerator,
    predictor: Arc<dyn OutcomePredictor>,
    embedder: Arc<dyn QueryEmbedder>,
    evidence: Arc<dyn EvidenceSearch>,
    checker: Arc<ToxicityChecker>,
}

impl RecommendationOrchestrator {
    pub fn new(
        config: EngineConfig,
        generator: PlanGenerator,
        predictor: Arc<dyn OutcomePredictor>,
        embedder: Arc<dyn QueryEmbedder>,
        evidence: Arc<dyn EvidenceSearch>,
        checker: Arc<ToxicityChecker>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            generator,
            predictor,
            embedder,
            evidence,
            checker,
        })
    }

    pub async fn recommend(
        &self,
        patient: &PatientFeatureBundle,
    ) -> Result<TreatmentPlan, EngineError> {
        self.recommend_cancellable(patient, &CancelToken::new())
            .await
    }

    pub async fn recommend_cancellable(
        &self,
        patient: &PatientFeatureBundle,
        cancel: &CancelToken,
    ) -> Result<TreatmentPlan, EngineError> {
        let patient_id = patient.id;
        transition(patient_id, RequestState::Received, RequestState::Generating);

        mandatory_minimum(patient)?;

        let candidates = self
            .generator
            .generate(patient, self.config.max_candidates)?;
        if candidates.is_empty() {
            tracing::info!(patient_id = %patient_id, "No applicable regimen for findings");
            transition(patient_id, RequestState::Generating, RequestState::Completed);
            return Ok(self.assemble(patient_id, PlanStatus::NoApplicableRegimen, vec![], vec![]));
        }

        transition(patient_id, RequestState::Generating, RequestState::Scoring);
        let attempted = candidates.len();
        let mut diagnostics: Vec<CandidateDiagnostic> = Vec::new();
        let mut scored: Vec<ScoredCandidate> = Vec::new();

        let mut handles = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            handles.push(self.spawn_candidate(candidate, patient.clone()));
        }

        for handle in handles {
            let (regimen, outcome) = match handle.await {
                Ok(result) => result,
                Err(join_error) => {
                    // Panicked scoring task; the candidate identity is gone
                    // with the closure, so this aborts the request.
                    return Err(EngineError::TaskFailed(join_error.to_string()));
                }
            };
            match outcome {
                Ok((estimate, retrieved)) => scored.push(ScoredCandidate {
                    regimen,
                    estimate,
                    retrieved,
                }),
                Err(reason) => {
                    tracing::warn!(
                        patient_id = %patient_id,
                        regimen = %regimen.name,
                        reason = ?reason,
                        "Candidate dropped during scoring"
                    );
                    diagnostics.push(diagnostic(&regimen, reason));
                }
            }
        }

        if scored.is_empty() {
            transition(patient_id, RequestState::Scoring, RequestState::Failed);
            return Err(EngineError::AllCandidatesFailed { attempted });
        }

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        transition(patient_id, RequestState::Scoring, RequestState::Filtering);
        let mut surviving: Vec<(ScoredCandidate, crate::models::ToxicityVerdict)> = Vec::new();
        for candidate in scored {
            let verdict = self.checker.check(&candidate.regimen, patient);
            if verdict.outcome == ToxicityOutcome::Contraindicated {
                diagnostics.push(diagnostic(
                    &candidate.regimen,
                    DropReason::Contraindicated {
                        triggers: verdict.triggers,
                    },
                ));
            } else {
                surviving.push((candidate, verdict));
            }
        }

        if surviving.is_empty() {
            tracing::info!(patient_id = %patient_id, "Every scored candidate was contraindicated");
            transition(patient_id, RequestState::Filtering, RequestState::Completed);
            return Ok(self.assemble(patient_id, PlanStatus::NoSafeRegimen, vec![], diagnostics));
        }

        transition(patient_id, RequestState::Filtering, RequestState::Ranking);
        let mut entries: Vec<PlanEntry> = surviving
            .into_iter()
            .map(|(candidate, verdict)| self.rank_entry(candidate, verdict))
            .collect();

        entries.sort_by(|a, b| {
            b.rank_score
                .partial_cmp(&a.rank_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.regimen.enumeration_order.cmp(&b.regimen.enumeration_order))
        });

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        transition(patient_id, RequestState::Ranking, RequestState::Completed);
        Ok(self.assemble(patient_id, PlanStatus::Completed, entries, diagnostics))
    }

    /// Concurrent per-candidate work: outcome prediction and evidence
    /// retrieval, each under the configured call timeout.
    fn spawn_candidate(
        &self,
        candidate: CandidateRegimen,
        patient: PatientFeatureBundle,
    ) -> tokio::task::JoinHandle<(
        CandidateRegimen,
        Result<(OutcomeEstimate, Vec<ScoredPassage>), DropReason>,
    )> {
        let predictor = Arc::clone(&self.predictor);
        let embedder = Arc::clone(&self.embedder);
        let evidence = Arc::clone(&self.evidence);
        let call_timeout = self.config.call_timeout();
        let top_k = self.config.citation_top_k;

        tokio::spawn(async move {
            let predict_regimen = candidate.clone();
            let predict_patient = patient.clone();
            let predict = timeout(
                call_timeout,
                tokio::task::spawn_blocking(move || {
                    predictor.predict(&predict_regimen, &predict_patient)
                }),
            );

            let query_text = regimen_query_text(&candidate, &patient);
            let retrieve = timeout(
                call_timeout,
                tokio::task::spawn_blocking(move || {
                    let query = embedder.embed(&query_text)?;
                    evidence.query(&query, top_k, &QueryFilters::none())
                }),
            );

            let (predict_result, retrieve_result) = tokio::join!(predict, retrieve);

            let estimate = match predict_result {
                Err(_) => return (candidate, Err(DropReason::TimedOut)),
                Ok(Err(join_error)) => {
                    return (
                        candidate,
                        Err(DropReason::PredictorFailed {
                            message: join_error.to_string(),
                        }),
                    )
                }
                Ok(Ok(Err(error))) => {
                    return (
                        candidate,
                        Err(DropReason::PredictorFailed {
                            message: error.to_string(),
                        }),
                    )
                }
                Ok(Ok(Ok(estimate))) => estimate,
            };

            let retrieved = match retrieve_result {
                Err(_) => return (candidate, Err(DropReason::TimedOut)),
                Ok(Err(join_error)) => {
                    return (
                        candidate,
                        Err(DropReason::RetrievalFailed {
                            message: join_error.to_string(),
                        }),
                    )
                }
                Ok(Ok(Err(error))) => {
                    return (
                        candidate,
                        Err(DropReason::RetrievalFailed {
                            message: error.to_string(),
                        }),
                    )
                }
                Ok(Ok(Ok(retrieved))) => retrieved,
            };

            (candidate, Ok((estimate, retrieved)))
        })
    }

    /// Citation qualification and composite rank score for one survivor.
    fn rank_entry(
        &self,
        candidate: ScoredCandidate,
        verdict: crate::models::ToxicityVerdict,
    ) -> PlanEntry {
        let citations: Vec<CitationRef> = candidate
            .retrieved
            .iter()
            .filter(|hit| hit.similarity >= self.config.min_citation_similarity)
            .filter(|hit| self.evidence.contains(&hit.passage.id))
            .map(|hit| CitationRef {
                passage_id: hit.passage.id,
                source_id: hit.passage.source_id.clone(),
                study_type: hit.passage.study_type,
                published: hit.passage.published,
                similarity: hit.similarity,
            })
            .collect();

        let (evidence_note, evidence_support) = if citations.is_empty() {
            (EvidenceNote::NoSupportingEvidenceFound, 0.0f32)
        } else {
            let mean =
                citations.iter().map(|c| c.similarity).sum::<f32>() / citations.len() as f32;
            (EvidenceNote::Cited, mean)
        };

        let caution_penalty = if verdict.outcome == ToxicityOutcome::Caution {
            self.config.caution_penalty_weight
        } else {
            0.0
        };
        let rank_score = self.config.outcome_weight * candidate.estimate.success_probability as f64
            + self.config.evidence_weight * evidence_support as f64
            - caution_penalty;

        PlanEntry {
            regimen: candidate.regimen,
            verdict,
            estimate: candidate.estimate,
            citations,
            evidence_note,
            evidence_support,
            rank_score,
        }
    }

    fn assemble(
        &self,
        patient_id: Uuid,
        status: PlanStatus,
        entries: Vec<PlanEntry>,
        diagnostics: Vec<CandidateDiagnostic>,
    ) -> TreatmentPlan {
        TreatmentPlan {
            id: Uuid::new_v4(),
            patient_id,
            rule_set_version: self.checker.rule_set_version().to_string(),
            generated_at: chrono::Local::now().naive_local(),
            status,
            entries,
            diagnostics,
        }
    }
}

fn diagnostic(regimen: &CandidateRegimen, reason: DropReason) -> CandidateDiagnostic {
    CandidateDiagnostic {
        regimen_id: regimen.id,
        regimen_name: regimen.name.clone(),
        enumeration_order: regimen.enumeration_order,
        reason,
    }
}
