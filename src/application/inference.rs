//! Inference service: scores one patient request.
//!
//! This service coordinates:
//! - Single-row feature transform with the shared fitted scaler
//! - Probability from the classifier
//! - Risk tier from the rule cascade
//!
//! It holds no per-request state, so one instance can serve concurrent callers.

use std::sync::Arc;

use super::pipeline::transform_single;
use crate::domain::{PatientRecord, RiskAssessment, ScalingTransform};
use crate::ports::Classifier;
use crate::{CardioRiskError, Result};

/// Service for per-request risk scoring.
pub struct InferenceService<C>
where
    C: Classifier + ?Sized,
{
    classifier: Arc<C>,
    scaler: Arc<ScalingTransform>,
}

impl<C> InferenceService<C>
where
    C: Classifier + ?Sized,
{
    /// Create a new inference service.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if `scaler` was fitted on a different column order.
    pub fn new(classifier: Arc<C>, scaler: Arc<ScalingTransform>) -> Result<Self> {
        scaler.verify_schema()?;
        Ok(Self { classifier, scaler })
    }

    /// The fitted transform applied to every request.
    #[must_use]
    pub fn scaler(&self) -> &Arc<ScalingTransform> {
        &self.scaler
    }

    /// Score one patient.
    ///
    /// # Errors
    /// Returns `Classifier` if the model fails or returns a value that is not
    /// a probability.
    pub fn assess(&self, record: &PatientRecord) -> Result<RiskAssessment> {
        let features = transform_single(record, &self.scaler)?;
        let probability = self.classifier.predict_proba(&features)?;

        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(CardioRiskError::Classifier(format!(
                "probability must lie in [0, 1], got {probability}"
            )));
        }

        let assessment = RiskAssessment::new(probability, record);
        tracing::debug!(
            "Assessed patient: risk level {}",
            assessment.risk_level
        );
        Ok(assessment)
    }
}
