//! Per-feature standardization fitted once over the training partition.

use serde::{Deserialize, Serialize};

use super::patient::{FeatureVector, FEATURE_COLUMNS, FEATURE_COUNT};
use crate::{CardioRiskError, Result};

/// Fitted standardization parameters: `(x - mean) / scale` per column.
///
/// The column names travel with the parameters so a transform fitted against a
/// different column order is rejected instead of silently misapplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingTransform {
    pub columns: Vec<String>,
    pub mean: Vec<f64>,
    /// Population standard deviation, or 1.0 for zero-variance columns
    pub scale: Vec<f64>,
    /// Number of rows the transform was fitted on
    pub n_samples: usize,
}

impl ScalingTransform {
    /// Fit mean and standard deviation per column.
    ///
    /// # Errors
    /// Returns `DegenerateDataset` if `rows` is empty.
    pub fn fit(rows: &[FeatureVector]) -> Result<Self> {
        if rows.is_empty() {
            return Err(CardioRiskError::DegenerateDataset(
                "cannot fit scaler on zero rows".into(),
            ));
        }

        let n = rows.len() as f64;
        let mut mean = [0.0f64; FEATURE_COUNT];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row.to_array()) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut variance = [0.0f64; FEATURE_COUNT];
        for row in rows {
            for ((v, m), x) in variance.iter_mut().zip(&mean).zip(row.to_array()) {
                let d = x - m;
                *v += d * d;
            }
        }

        let scale = variance
            .iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std > 0.0 && std.is_finite() {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Ok(Self {
            columns: FEATURE_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
            mean: mean.to_vec(),
            scale,
            n_samples: rows.len(),
        })
    }

    /// Check that the parameters line up with the canonical column order.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` on any difference in column names or lengths.
    pub fn verify_schema(&self) -> Result<()> {
        if self.columns.len() != FEATURE_COUNT
            || self.mean.len() != FEATURE_COUNT
            || self.scale.len() != FEATURE_COUNT
        {
            return Err(CardioRiskError::ShapeMismatch {
                expected: format!("{FEATURE_COUNT} scaler columns"),
                actual: format!(
                    "{} columns, {} means, {} scales",
                    self.columns.len(),
                    self.mean.len(),
                    self.scale.len()
                ),
            });
        }
        if self.columns.iter().zip(FEATURE_COLUMNS).any(|(a, b)| a != b) {
            return Err(CardioRiskError::ShapeMismatch {
                expected: FEATURE_COLUMNS.join(","),
                actual: self.columns.join(","),
            });
        }
        Ok(())
    }

    /// Standardize one feature vector.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if the transform does not match the canonical schema.
    pub fn transform(&self, features: &FeatureVector) -> Result<FeatureVector> {
        self.verify_schema()?;
        let mut out = features.to_array();
        for ((x, m), s) in out.iter_mut().zip(&self.mean).zip(&self.scale) {
            *x = (*x - m) / s;
        }
        Ok(FeatureVector::from_array(out))
    }

    /// Standardize many feature vectors.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if the transform does not match the canonical schema.
    pub fn transform_all(&self, rows: &[FeatureVector]) -> Result<Vec<FeatureVector>> {
        rows.iter().map(|row| self.transform(row)).collect()
    }
}
