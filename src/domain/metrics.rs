//! Binary classification metrics and the evaluation payload shapes.
//!
//! Rates whose denominator is zero resolve to `0.0`. The `*_checked` variants
//! return `None` in those cases for callers that need to tell the difference.

use serde::{Deserialize, Serialize};

use crate::{CardioRiskError, Result};

/// Round to `decimals` places, ties to even.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

/// 2x2 confusion matrix with the negative class (0) first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tn: u64,
    pub fp: u64,
    pub fn_: u64,
    pub tp: u64,
}

impl ConfusionMatrix {
    /// Count outcomes over parallel label slices.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if the slices differ in length and `Validation`
    /// if any label is outside {0, 1}.
    pub fn from_labels(truth: &[u8], predicted: &[u8]) -> Result<Self> {
        if truth.len() != predicted.len() {
            return Err(CardioRiskError::ShapeMismatch {
                expected: format!("{} predictions", truth.len()),
                actual: format!("{} predictions", predicted.len()),
            });
        }
        let mut cm = Self::default();
        for (&t, &p) in truth.iter().zip(predicted) {
            if t > 1 || p > 1 {
                return Err(CardioRiskError::Validation(format!(
                    "binary labels must be 0 or 1, got truth={t} predicted={p}"
                )));
            }
            cm.add(t == 1, p == 1);
        }
        Ok(cm)
    }

    pub fn add(&mut self, truth: bool, predicted: bool) {
        let cell = match (truth, predicted) {
            (false, false) => &mut self.tn,
            (false, true) => &mut self.fp,
            (true, false) => &mut self.fn_,
            (true, true) => &mut self.tp,
        };
        *cell = cell.saturating_add(1);
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.tn + self.fp + self.fn_ + self.tp
    }

    /// Rows are truth, columns are prediction: `[[TN, FP], [FN, TP]]`.
    #[must_use]
    pub fn as_rows(&self) -> [[u64; 2]; 2] {
        [[self.tn, self.fp], [self.fn_, self.tp]]
    }

    #[must_use]
    pub fn accuracy_checked(&self) -> Option<f64> {
        ratio(self.tn + self.tp, self.total())
    }

    /// `TP / (TP + FP)`.
    #[must_use]
    pub fn precision_checked(&self) -> Option<f64> {
        ratio(self.tp, self.tp + self.fp)
    }

    /// `TP / (TP + FN)`.
    #[must_use]
    pub fn recall_checked(&self) -> Option<f64> {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// `2TP / (2TP + FP + FN)`.
    #[must_use]
    pub fn f1_checked(&self) -> Option<f64> {
        ratio(2 * self.tp, 2 * self.tp + self.fp + self.fn_)
    }

    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.accuracy_checked().unwrap_or(0.0)
    }

    #[must_use]
    pub fn precision(&self) -> f64 {
        self.precision_checked().unwrap_or(0.0)
    }

    #[must_use]
    pub fn recall(&self) -> f64 {
        self.recall_checked().unwrap_or(0.0)
    }

    #[must_use]
    pub fn f1(&self) -> f64 {
        self.f1_checked().unwrap_or(0.0)
    }
}

/// Unrounded metrics for one evaluated slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub confusion_matrix: ConfusionMatrix,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl EvaluationReport {
    #[must_use]
    pub fn from_matrix(confusion_matrix: ConfusionMatrix) -> Self {
        Self {
            accuracy: confusion_matrix.accuracy(),
            precision: confusion_matrix.precision(),
            recall: confusion_matrix.recall(),
            f1: confusion_matrix.f1(),
            confusion_matrix,
        }
    }

    /// Full-dataset reporting: every rate as a percentage with one decimal.
    #[must_use]
    pub fn to_full_dataset_metrics(&self) -> ReportedMetrics {
        ReportedMetrics {
            confusion_matrix: self.confusion_matrix.as_rows(),
            accuracy: round_to(self.accuracy * 100.0, 1),
            precision: round_to(self.precision * 100.0, 1),
            recall: round_to(self.recall * 100.0, 1),
            f1_score: round_to(self.f1 * 100.0, 1),
        }
    }

    /// Sample reporting: percentages with one decimal, except F1 which stays a
    /// fraction rounded to two decimals.
    #[must_use]
    pub fn to_sample_metrics(&self) -> ReportedMetrics {
        ReportedMetrics {
            confusion_matrix: self.confusion_matrix.as_rows(),
            accuracy: round_to(self.accuracy * 100.0, 1),
            precision: round_to(self.precision * 100.0, 1),
            recall: round_to(self.recall * 100.0, 1),
            f1_score: round_to(self.f1, 2),
        }
    }
}

/// Serialized metrics for one slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportedMetrics {
    pub confusion_matrix: [[u64; 2]; 2],
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

/// Evaluation response payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub full_dataset: ReportedMetrics,
    #[serde(rename = "first_50_samples")]
    pub sample: ReportedMetrics,
}
