//! Labeled feature tables: the cleaned dataset and its train/held-out partitions.

use super::patient::FeatureVector;
use crate::{CardioRiskError, Result};

/// Feature rows with a parallel label column (1 = cardiovascular disease present).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledDataset {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<u8>,
}

impl LabeledDataset {
    /// Pair rows with labels.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if the lengths differ and `Validation` if a label
    /// is outside {0, 1}.
    pub fn new(features: Vec<FeatureVector>, labels: Vec<u8>) -> Result<Self> {
        if features.len() != labels.len() {
            return Err(CardioRiskError::ShapeMismatch {
                expected: format!("{} labels", features.len()),
                actual: format!("{} labels", labels.len()),
            });
        }
        if let Some(bad) = labels.iter().find(|&&l| l > 1) {
            return Err(CardioRiskError::Validation(format!(
                "label must be 0 or 1, got {bad}"
            )));
        }
        Ok(Self { features, labels })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Rows at `indices`, in the order given.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            features: indices.iter().map(|&i| self.features[i]).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// The first `min(n, len)` rows.
    #[must_use]
    pub fn head(&self, n: usize) -> Self {
        let n = n.min(self.len());
        Self {
            features: self.features[..n].to_vec(),
            labels: self.labels[..n].to_vec(),
        }
    }

    /// Number of rows labeled positive.
    #[must_use]
    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<FeatureVector> {
        (0..n)
            .map(|i| FeatureVector {
                age: i as f64,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_new_checks_shape_and_labels() {
        assert!(LabeledDataset::new(rows(2), vec![0]).is_err());
        assert!(LabeledDataset::new(rows(2), vec![0, 3]).is_err());
        let ds = LabeledDataset::new(rows(2), vec![0, 1]).expect("Should build");
        assert_eq!(ds.positives(), 1);
    }

    #[test]
    fn test_select_and_head() {
        let ds = LabeledDataset::new(rows(4), vec![0, 1, 1, 0]).expect("Should build");
        let picked = ds.select(&[3, 1]);
        assert_eq!(picked.labels, vec![0, 1]);
        assert!((picked.features[0].age - 3.0).abs() < f64::EPSILON);

        assert_eq!(ds.head(2).len(), 2);
        assert_eq!(ds.head(50).len(), 4);
    }
}
