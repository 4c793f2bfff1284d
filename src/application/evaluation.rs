//! Evaluation service: classifier quality on the held-out partition.
//!
//! Two independent reports are produced per run: one over every held-out row
//! and one over the first `sample_size` held-out rows. The scaled held-out
//! partition is derived once from the persisted cleaned dataset and cached.

use std::sync::Arc;

use super::init_once::InitOnce;
use super::pipeline::{scale_dataset, FeaturePipeline};
use crate::adapters::StorageError;
use crate::domain::{
    ConfusionMatrix, EvaluationReport, EvaluationSummary, LabeledDataset, ScalingTransform,
};
use crate::ports::{Classifier, CleanedDatasetStore};
use crate::{CardioRiskError, Result};

fn checked_predictions<C>(classifier: &C, data: &LabeledDataset) -> Result<Vec<u8>>
where
    C: Classifier + ?Sized,
{
    let predictions = classifier.predict(&data.features)?;
    if predictions.len() != data.len() {
        return Err(CardioRiskError::Classifier(format!(
            "expected {} predictions, got {}",
            data.len(),
            predictions.len()
        )));
    }
    if let Some(bad) = predictions.iter().find(|&&p| p > 1) {
        return Err(CardioRiskError::Classifier(format!(
            "predicted label must be 0 or 1, got {bad}"
        )));
    }
    Ok(predictions)
}

/// Metrics over every row of `data`.
///
/// # Errors
/// Returns `DegenerateDataset` on empty input and `Classifier` on invalid
/// predictions.
pub fn evaluate<C>(classifier: &C, data: &LabeledDataset) -> Result<EvaluationReport>
where
    C: Classifier + ?Sized,
{
    if data.is_empty() {
        return Err(CardioRiskError::DegenerateDataset(
            "held-out partition is empty".into(),
        ));
    }
    let predictions = checked_predictions(classifier, data)?;
    let matrix = ConfusionMatrix::from_labels(&data.labels, &predictions)?;
    Ok(EvaluationReport::from_matrix(matrix))
}

/// Metrics over the first `min(sample_size, len)` rows of `data`, with a
/// confusion matrix of their own.
///
/// # Errors
/// Same as [`evaluate`].
pub fn evaluate_sample<C>(
    classifier: &C,
    data: &LabeledDataset,
    sample_size: usize,
) -> Result<EvaluationReport>
where
    C: Classifier + ?Sized,
{
    evaluate(classifier, &data.head(sample_size))
}

/// Service for evaluating a classifier against the cached held-out partition.
pub struct EvaluationService<S>
where
    S: CleanedDatasetStore,
{
    store: Arc<S>,
    scaler: Arc<ScalingTransform>,
    pipeline: FeaturePipeline,
    sample_size: usize,
    held_out: InitOnce<LabeledDataset>,
}

impl<S> EvaluationService<S>
where
    S: CleanedDatasetStore,
    S::Error: Into<StorageError>,
{
    /// Create a new evaluation service.
    ///
    /// `pipeline` must carry the fraction and seed the scaler was prepared
    /// with, so the re-derived held-out rows match the original split.
    pub fn new(
        store: Arc<S>,
        scaler: Arc<ScalingTransform>,
        pipeline: FeaturePipeline,
        sample_size: usize,
    ) -> Self {
        Self {
            store,
            scaler,
            pipeline,
            sample_size,
            held_out: InitOnce::new(),
        }
    }

    /// The scaled held-out partition, built on first use.
    ///
    /// # Errors
    /// Returns `Storage` if the cleaned dataset cannot be loaded or was never
    /// saved, and propagates split and scaling failures.
    pub fn held_out(&self) -> Result<Arc<LabeledDataset>> {
        self.held_out.get_or_try_init::<CardioRiskError, _>(|| {
            let cleaned = self
                .store
                .load()
                .map_err(|e| CardioRiskError::Storage(e.into()))?
                .ok_or_else(|| StorageError::NotFound(self.store.location()))?;

            let split = self.pipeline.split(&cleaned)?;
            let held_out = scale_dataset(&split.test, &self.scaler)?;
            tracing::info!(
                "Cached {} held-out rows ({} positive) from {}",
                held_out.len(),
                held_out.positives(),
                self.store.location()
            );
            if held_out.positives() == 0 {
                tracing::warn!("Held-out rows contain no positive labels");
            }
            Ok(held_out)
        })
    }

    /// Full and sampled reports for `classifier`.
    ///
    /// # Errors
    /// See [`EvaluationService::held_out`] and [`evaluate`].
    pub fn run<C>(&self, classifier: &C) -> Result<(EvaluationReport, EvaluationReport)>
    where
        C: Classifier + ?Sized,
    {
        let held_out = self.held_out()?;
        let full = evaluate(classifier, &held_out)?;
        let sample = evaluate_sample(classifier, &held_out, self.sample_size)?;

        tracing::info!(
            "Evaluated {} held-out rows: accuracy {:.3}, precision {:.3}, recall {:.3}, f1 {:.3}",
            full.confusion_matrix.total(),
            full.accuracy,
            full.precision,
            full.recall,
            full.f1
        );
        if full.confusion_matrix.precision_checked().is_none()
            || full.confusion_matrix.recall_checked().is_none()
        {
            tracing::warn!("Precision or recall undefined on held-out rows; reported as 0");
        }
        Ok((full, sample))
    }

    /// Evaluation response payload.
    ///
    /// # Errors
    /// See [`EvaluationService::run`].
    pub fn summary<C>(&self, classifier: &C) -> Result<EvaluationSummary>
    where
        C: Classifier + ?Sized,
    {
        let (full, sample) = self.run(classifier)?;
        Ok(EvaluationSummary {
            full_dataset: full.to_full_dataset_metrics(),
            sample: sample.to_sample_metrics(),
        })
    }
}
