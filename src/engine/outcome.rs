use thiserror::Error;

use crate::models::enums::{PathologyGrade, PriorOutcome, TumorStage};
use crate::models::{
    CandidateRegimen, ConfidenceInterval, OutcomeEstimate, PatientFeatureBundle, RiskFactor,
};

#[derive(Error, Debug)]
pub enum OutcomeError {
    #[error("insufficient patient features: {0}")]
    InsufficientFeatures(String),
}

/// Success-likelihood estimation for one candidate regimen.
pub trait OutcomePredictor: Send + Sync {
    fn predict(
        &self,
        regimen: &CandidateRegimen,
        patient: &PatientFeatureBundle,
    ) -> Result<OutcomeEstimate, OutcomeError>;
}

/// The mandatory minimum feature set: lesion staging plus at least one of
/// genomic profile or pathology grade. Below this, prediction fails rather
/// than silently defaulting to population averages.
pub fn mandatory_minimum(patient: &PatientFeatureBundle) -> Result<(), OutcomeError> {
    if patient.lesions.is_empty() {
        return Err(OutcomeError::InsufficientFeatures(
            "no staged lesion finding".into(),
        ));
    }
    if !patient.has_genomic_data() && patient.pathology_grade.is_none() {
        return Err(OutcomeError::InsufficientFeatures(
            "neither genomic profile nor pathology grade present".into(),
        ));
    }
    Ok(())
}

/// Stage-anchored model with multiplicative risk-factor penalties.
///
/// Every documented risk factor multiplies the point estimate by a factor
/// <= 1.0, so adding a factor can never raise the estimate. Missing
/// feature groups widen the confidence interval instead of being papered
/// over.
pub struct RiskAdjustedModel {
    min_interval_width: f32,
}

impl RiskAdjustedModel {
    pub fn new(min_interval_width: f32) -> Self {
        Self { min_interval_width }
    }

    fn base_probability(stage: TumorStage) -> f32 {
        match stage {
            TumorStage::I => 0.82,
            TumorStage::II => 0.68,
            TumorStage::III => 0.48,
            TumorStage::IV => 0.27,
        }
    }

    /// Local-only regimens underperform on metastatic disease; systemic-only
    /// regimens are conservative for early-stage disease. Independent of the
    /// risk factors, so it does not disturb monotonicity.
    fn modality_fit(regimen: &CandidateRegimen, stage: TumorStage) -> f32 {
        let any_systemic = regimen.modalities.iter().any(|m| m.is_systemic());
        let any_local = regimen.modalities.iter().any(|m| !m.is_systemic());

        if stage.is_metastatic() && !any_systemic {
            0.8
        } else if stage == TumorStage::I && !any_local {
            0.95
        } else {
            1.0
        }
    }

    /// Documented risk factors with their penalty multipliers, in a fixed
    /// deterministic order.
    fn collect_risk_factors(patient: &PatientFeatureBundle) -> Vec<(RiskFactor, f32)> {
        let mut factors = Vec::new();

        for variant in patient.actionable_variants() {
            factors.push((
                RiskFactor {
                    code: format!("variant:{}", variant.gene.to_uppercase()),
                    description: format!(
                        "pathogenic variant {} {}",
                        variant.gene, variant.mutation
                    ),
                },
                0.93,
            ));
        }

        if let Some(grade) = patient.pathology_grade {
            if grade >= PathologyGrade::G3 {
                factors.push((
                    RiskFactor {
                        code: format!("grade:{}", grade.as_str()),
                        description: format!("high pathology grade {}", grade.as_str()),
                    },
                    0.9,
                ));
            }
        }

        for prior in &patient.prior_treatments {
            if prior.outcome == PriorOutcome::Progression {
                factors.push((
                    RiskFactor {
                        code: format!("prior_progression:{}", prior.regimen_name),
                        description: format!("progression on prior line {}", prior.regimen_name),
                    },
                    0.88,
                ));
            }
        }

        if let Some(crcl) = patient.organ_function.creatinine_clearance_ml_min {
            if crcl < 60.0 {
                factors.push((
                    RiskFactor {
                        code: "organ:renal".into(),
                        description: "reduced creatinine clearance".into(),
                    },
                    0.92,
                ));
            }
        }
        if let Some(ef) = patient.organ_function.ejection_fraction_pct {
            if ef < 50.0 {
                factors.push((
                    RiskFactor {
                        code: "organ:cardiac".into(),
                        description: "reduced ejection fraction".into(),
                    },
                    0.92,
                ));
            }
        }

        if patient.demographics.age_years >= 75 {
            factors.push((
                RiskFactor {
                    code: "age:75+".into(),
                    description: "age 75 or above".into(),
                },
                0.95,
            ));
        }

        factors
    }

    fn missing_feature_groups(patient: &PatientFeatureBundle) -> usize {
        let mut missing = 0;
        if !patient.has_genomic_data() {
            missing += 1;
        }
        if patient.pathology_grade.is_none() {
            missing += 1;
        }
        if patient.organ_function.creatinine_clearance_ml_min.is_none()
            && patient.organ_function.ejection_fraction_pct.is_none()
        {
            missing += 1;
        }
        missing
    }
}

impl OutcomePredictor for RiskAdjustedModel {
    fn predict(
        &self,
        regimen: &CandidateRegimen,
        patient: &PatientFeatureBundle,
    ) -> Result<OutcomeEstimate, OutcomeError> {
        mandatory_minimum(patient)?;

        let stage = patient.max_stage();
        let mut probability =
            Self::base_probability(stage) * Self::modality_fit(regimen, stage);

        let weighted_factors = Self::collect_risk_factors(patient);
        for (_, penalty) in &weighted_factors {
            probability *= penalty;
        }
        let probability = probability.clamp(0.01, 0.99);

        // Low feature completeness widens the interval: the caller sees a
        // less certain estimate instead of a silently averaged one.
        let missing = Self::missing_feature_groups(patient);
        let mut width = 0.1 + 0.12 * missing as f32;
        if missing > 0 {
            width = width.max(self.min_interval_width);
        }

        let interval = ConfidenceInterval {
            lower: (probability - width / 2.0).clamp(0.0, 1.0),
            upper: (probability + width / 2.0).clamp(0.0, 1.0),
        };

        Ok(OutcomeEstimate {
            success_probability: probability,
            interval,
            risk_factors: weighted_factors.into_iter().map(|(f, _)| f).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::*;
    use crate::models::{Demographics, GenomicVariant, LesionFinding, OrganFunction, PriorTreatment};
    use uuid::Uuid;

    fn regimen() -> CandidateRegimen {
        CandidateRegimen {
            id: Uuid::new_v4(),
            name: "Platinum doublet".into(),
            modalities: vec![Modality::Chemotherapy],
            drugs: vec![],
            enumeration_order: 0,
        }
    }

    fn base_builder(stage: TumorStage) -> crate::models::patient::PatientBundleBuilder {
        PatientFeatureBundle::builder(Demographics {
            age_years: 60,
            sex: Sex::Female,
        })
        .lesion(LesionFinding {
            lesion_type: "lung carcinoma".into(),
            stage,
            location: "right upper lobe".into(),
            confidence: 0.9,
        })
    }

    fn model() -> RiskAdjustedModel {
        RiskAdjustedModel::new(0.2)
    }

    #[test]
    fn insufficient_features_without_genomics_or_grade() {
        let patient = base_builder(TumorStage::II).build().unwrap();
        let result = model().predict(&regimen(), &patient);
        assert!(matches!(result, Err(OutcomeError::InsufficientFeatures(_))));
    }

    #[test]
    fn grade_alone_satisfies_mandatory_minimum() {
        let patient = base_builder(TumorStage::II)
            .pathology_grade(PathologyGrade::G2)
            .build()
            .unwrap();
        assert!(model().predict(&regimen(), &patient).is_ok());
    }

    #[test]
    fn genomics_alone_satisfies_mandatory_minimum() {
        let patient = base_builder(TumorStage::II)
            .variant(GenomicVariant {
                gene: "KRAS".into(),
                mutation: "G12C".into(),
                pathogenicity: Pathogenicity::Pathogenic,
            })
            .build()
            .unwrap();
        assert!(model().predict(&regimen(), &patient).is_ok());
    }

    #[test]
    fn later_stage_lowers_estimate() {
        let early = base_builder(TumorStage::I)
            .pathology_grade(PathologyGrade::G1)
            .build()
            .unwrap();
        let late = base_builder(TumorStage::IV)
            .pathology_grade(PathologyGrade::G1)
            .build()
            .unwrap();

        let m = model();
        let p_early = m.predict(&regimen(), &early).unwrap().success_probability;
        let p_late = m.predict(&regimen(), &late).unwrap().success_probability;
        assert!(p_late < p_early);
    }

    /// Monotonic risk sensitivity: adding one documented risk factor never
    /// raises the point estimate for the same regimen.
    #[test]
    fn adding_risk_factor_never_raises_estimate() {
        let baseline = base_builder(TumorStage::III)
            .pathology_grade(PathologyGrade::G2)
            .build()
            .unwrap();
        let riskier = base_builder(TumorStage::III)
            .pathology_grade(PathologyGrade::G2)
            .variant(GenomicVariant {
                gene: "TP53".into(),
                mutation: "R175H".into(),
                pathogenicity: Pathogenicity::Pathogenic,
            })
            .build()
            .unwrap();

        let m = model();
        let r = regimen();
        let p_base = m.predict(&r, &baseline).unwrap();
        let p_risk = m.predict(&r, &riskier).unwrap();

        assert!(p_risk.success_probability <= p_base.success_probability);
        assert_eq!(p_risk.risk_factors.len(), p_base.risk_factors.len() + 1);
    }

    #[test]
    fn each_risk_factor_kind_is_monotone() {
        let m = model();
        let r = regimen();
        let baseline = base_builder(TumorStage::II)
            .pathology_grade(PathologyGrade::G2)
            .build()
            .unwrap();
        let p_base = m.predict(&r, &baseline).unwrap().success_probability;

        let with_progression = base_builder(TumorStage::II)
            .pathology_grade(PathologyGrade::G2)
            .prior_treatment(PriorTreatment {
                regimen_name: "FOLFOX".into(),
                drugs: vec!["5-fluorouracil".into()],
                outcome: PriorOutcome::Progression,
            })
            .build()
            .unwrap();
        assert!(m.predict(&r, &with_progression).unwrap().success_probability <= p_base);

        let with_renal = base_builder(TumorStage::II)
            .pathology_grade(PathologyGrade::G2)
            .organ_function(OrganFunction {
                creatinine_clearance_ml_min: Some(40.0),
                ejection_fraction_pct: None,
            })
            .build()
            .unwrap();
        assert!(m.predict(&r, &with_renal).unwrap().success_probability <= p_base);
    }

    /// Stage II with no genomic data: prediction succeeds with an interval
    /// at least as wide as the configured minimum.
    #[test]
    fn missing_genomics_widens_interval_instead_of_failing() {
        let patient = base_builder(TumorStage::II)
            .pathology_grade(PathologyGrade::G2)
            .build()
            .unwrap();

        let estimate = model().predict(&regimen(), &patient).unwrap();
        assert!(
            estimate.interval.width() >= 0.2,
            "interval width {} should be at or above the configured minimum",
            estimate.interval.width()
        );
    }

    #[test]
    fn complete_features_give_narrower_interval() {
        let complete = base_builder(TumorStage::II)
            .pathology_grade(PathologyGrade::G2)
            .variant(GenomicVariant {
                gene: "KRAS".into(),
                mutation: "G12C".into(),
                pathogenicity: Pathogenicity::Uncertain,
            })
            .organ_function(OrganFunction {
                creatinine_clearance_ml_min: Some(95.0),
                ejection_fraction_pct: Some(60.0),
            })
            .build()
            .unwrap();
        let sparse = base_builder(TumorStage::II)
            .pathology_grade(PathologyGrade::G2)
            .build()
            .unwrap();

        let m = model();
        let w_complete = m.predict(&regimen(), &complete).unwrap().interval.width();
        let w_sparse = m.predict(&regimen(), &sparse).unwrap().interval.width();
        assert!(w_complete < w_sparse);
    }

    #[test]
    fn surgery_only_penalized_for_metastatic_disease() {
        let patient = base_builder(TumorStage::IV)
            .pathology_grade(PathologyGrade::G2)
            .build()
            .unwrap();
        let surgical = CandidateRegimen {
            id: Uuid::new_v4(),
            name: "Surgical resection".into(),
            modalities: vec![Modality::Surgery],
            drugs: vec![],
            enumeration_order: 0,
        };

        let m = model();
        let p_surgical = m.predict(&surgical, &patient).unwrap().success_probability;
        let p_systemic = m.predict(&regimen(), &patient).unwrap().success_probability;
        assert!(p_surgical < p_systemic);
    }

    #[test]
    fn prediction_is_deterministic() {
        let patient = base_builder(TumorStage::III)
            .pathology_grade(PathologyGrade::G3)
            .build()
            .unwrap();
        let m = model();
        let r = regimen();
        let a = m.predict(&r, &patient).unwrap();
        let b = m.predict(&r, &patient).unwrap();
        assert_eq!(a.success_probability, b.success_probability);
        assert_eq!(a.risk_factors, b.risk_factors);
    }
}
