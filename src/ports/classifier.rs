//! Classifier port: the trained model, treated as an opaque function.
//!
//! The pipeline never inspects which algorithm sits behind this trait. It only
//! hands over scaled feature vectors in canonical column order.

use crate::domain::FeatureVector;
use crate::Result;

/// Decision boundary used by the default hard prediction.
pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.5;

/// Trait for a trained binary classifier.
pub trait Classifier: Send + Sync {
    /// Probability of the positive class (cardiovascular disease present).
    ///
    /// # Errors
    /// Returns `Classifier` if the model cannot score the input.
    fn predict_proba(&self, features: &FeatureVector) -> Result<f64>;

    /// Hard labels (0 or 1), one per row.
    ///
    /// The default thresholds [`Classifier::predict_proba`] at
    /// [`DEFAULT_DECISION_THRESHOLD`].
    ///
    /// # Errors
    /// Returns `Classifier` if any row cannot be scored.
    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<u8>> {
        rows.iter()
            .map(|row| {
                self.predict_proba(row)
                    .map(|p| u8::from(p >= DEFAULT_DECISION_THRESHOLD))
            })
            .collect()
    }
}
