//! Reference logistic regression classifier.
//!
//! Trained by full-batch gradient descent on the log-loss over scaled features.
//! Any other [`Classifier`] can replace it; the pipeline does not depend on the
//! algorithm.

use serde::{Deserialize, Serialize};

use crate::domain::{FeatureVector, LabeledDataset, FEATURE_COUNT};
use crate::ports::Classifier;
use crate::{CardioRiskError, Result};

/// Gradient descent settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainOptions {
    pub learning_rate: f64,
    pub epochs: usize,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            epochs: 1000,
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Binary logistic regression over the canonical feature columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LogisticRegression {
    /// Create a model from explicit parameters.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if `weights` does not have one entry per feature.
    pub fn new(weights: Vec<f64>, bias: f64) -> Result<Self> {
        let model = Self { weights, bias };
        model.validate()?;
        Ok(model)
    }

    /// Validate the model dimensions.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` on a wrong weight count and `Classifier` on
    /// non-finite parameters.
    pub fn validate(&self) -> Result<()> {
        if self.weights.len() != FEATURE_COUNT {
            return Err(CardioRiskError::ShapeMismatch {
                expected: format!("{FEATURE_COUNT} weights"),
                actual: format!("{} weights", self.weights.len()),
            });
        }
        if !self.bias.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err(CardioRiskError::Classifier(
                "model parameters must be finite".into(),
            ));
        }
        Ok(())
    }

    /// Fit weights on scaled training rows.
    ///
    /// # Errors
    /// Returns `DegenerateDataset` on empty input and `Validation` on unusable
    /// options.
    pub fn train(data: &LabeledDataset, options: &TrainOptions) -> Result<Self> {
        if data.is_empty() {
            return Err(CardioRiskError::DegenerateDataset(
                "cannot train on zero rows".into(),
            ));
        }
        if !options.learning_rate.is_finite() || options.learning_rate <= 0.0 {
            return Err(CardioRiskError::Validation(format!(
                "learning rate must be > 0, got {}",
                options.learning_rate
            )));
        }

        let n = data.len() as f64;
        let rows: Vec<[f64; FEATURE_COUNT]> =
            data.features.iter().map(FeatureVector::to_array).collect();
        let mut weights = [0.0f64; FEATURE_COUNT];
        let mut bias = 0.0f64;

        for _ in 0..options.epochs {
            let mut grad_w = [0.0f64; FEATURE_COUNT];
            let mut grad_b = 0.0f64;

            for (x, &y) in rows.iter().zip(&data.labels) {
                let z = bias + x.iter().zip(&weights).map(|(a, w)| a * w).sum::<f64>();
                let err = sigmoid(z) - f64::from(y);
                for (g, a) in grad_w.iter_mut().zip(x) {
                    *g += err * a;
                }
                grad_b += err;
            }

            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= options.learning_rate * g / n;
            }
            bias -= options.learning_rate * grad_b / n;
        }

        tracing::info!(
            "Trained logistic regression on {} rows ({} epochs, lr={})",
            data.len(),
            options.epochs,
            options.learning_rate
        );

        Self::new(weights.to_vec(), bias)
    }

    fn logit(&self, features: &FeatureVector) -> f64 {
        self.bias
            + features
                .to_array()
                .iter()
                .zip(&self.weights)
                .map(|(x, w)| x * w)
                .sum::<f64>()
    }
}

impl Classifier for LogisticRegression {
    fn predict_proba(&self, features: &FeatureVector) -> Result<f64> {
        self.validate()?;
        Ok(sigmoid(self.logit(features)))
    }
}
