//! Pipeline configuration with defaults and environment overrides.

use std::path::PathBuf;

use crate::adapters::logistic::TrainOptions;
use crate::{CardioRiskError, Result};

/// Default location of the persisted cleaned dataset.
pub const DEFAULT_CLEANED_PATH: &str = "./data/cardio_train_cleaned.csv";

/// Tunables for the feature pipeline, the reference classifier and evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Share of cleaned rows held out for evaluation, in (0, 1)
    pub holdout_fraction: f64,
    pub split_seed: u64,
    /// Number of leading held-out rows in the sampled evaluation
    pub sample_size: usize,
    pub cleaned_dataset_path: PathBuf,
    pub learning_rate: f64,
    pub epochs: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            holdout_fraction: 0.25,
            split_seed: 42,
            sample_size: 50,
            cleaned_dataset_path: PathBuf::from(DEFAULT_CLEANED_PATH),
            learning_rate: 0.01,
            epochs: 1000,
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `CARDIORISK_*` environment variables.
    #[must_use]
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns per variable name.
    ///
    /// Unparseable or out-of-range values are ignored with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("CARDIORISK_HOLDOUT_FRACTION") {
            match v.trim().parse::<f64>() {
                Ok(x) if x > 0.0 && x < 1.0 => cfg.holdout_fraction = x,
                _ => ignored("CARDIORISK_HOLDOUT_FRACTION", &v),
            }
        }

        if let Some(v) = lookup("CARDIORISK_SPLIT_SEED") {
            match v.trim().parse::<u64>() {
                Ok(x) => cfg.split_seed = x,
                Err(_) => ignored("CARDIORISK_SPLIT_SEED", &v),
            }
        }

        if let Some(v) = lookup("CARDIORISK_SAMPLE_SIZE") {
            match v.trim().parse::<usize>() {
                Ok(x) if x > 0 => cfg.sample_size = x,
                _ => ignored("CARDIORISK_SAMPLE_SIZE", &v),
            }
        }

        if let Some(v) = lookup("CARDIORISK_CLEANED_PATH") {
            if v.trim().is_empty() {
                ignored("CARDIORISK_CLEANED_PATH", &v);
            } else {
                cfg.cleaned_dataset_path = PathBuf::from(v.trim());
            }
        }

        if let Some(v) = lookup("CARDIORISK_LEARNING_RATE") {
            match v.trim().parse::<f64>() {
                Ok(x) if x.is_finite() && x > 0.0 => cfg.learning_rate = x,
                _ => ignored("CARDIORISK_LEARNING_RATE", &v),
            }
        }

        if let Some(v) = lookup("CARDIORISK_EPOCHS") {
            match v.trim().parse::<usize>() {
                Ok(x) => cfg.epochs = x,
                Err(_) => ignored("CARDIORISK_EPOCHS", &v),
            }
        }

        cfg
    }

    /// Check values set programmatically.
    ///
    /// # Errors
    /// Returns `Validation` naming the first out-of-range field.
    pub fn validate(&self) -> Result<()> {
        if !(self.holdout_fraction > 0.0 && self.holdout_fraction < 1.0) {
            return Err(CardioRiskError::Validation(format!(
                "holdout_fraction must lie in (0, 1), got {}",
                self.holdout_fraction
            )));
        }
        if self.sample_size == 0 {
            return Err(CardioRiskError::Validation(
                "sample_size must be > 0".into(),
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(CardioRiskError::Validation(format!(
                "learning_rate must be > 0, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn train_options(&self) -> TrainOptions {
        TrainOptions {
            learning_rate: self.learning_rate,
            epochs: self.epochs,
        }
    }
}

fn ignored(key: &str, value: &str) {
    tracing::warn!("Ignoring invalid {key}={value:?}; keeping default");
}
