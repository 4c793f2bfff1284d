//! # cardiorisk
//!
//! Cardiovascular risk scoring from clinical intake values.
//!
//! This crate provides:
//! - A feature pipeline that cleans raw intake rows, derives BMI and standardizes features
//! - A clinical rule overlay that turns a model probability into a LOW/MODERATE/HIGH tier
//! - An evaluation engine reporting confusion matrix, accuracy, precision, recall and F1
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core value types (patient record, feature vector, scaler, risk tiers, metrics)
//! - `ports`: Trait definitions for external collaborators (classifier, dataset store)
//! - `adapters`: Concrete implementations (delimited files, SQLite, logistic regression)
//! - `application`: Use cases orchestrating domain and ports
//! - `config`: Pipeline settings with environment overrides

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{FeatureVector, PatientRecord, RiskAssessment, RiskLevel};

/// Result type for cardiorisk operations
pub type Result<T> = std::result::Result<T, CardioRiskError>;

/// Main error type for cardiorisk
#[derive(Debug, thiserror::Error)]
pub enum CardioRiskError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Degenerate dataset: {0}")]
    DegenerateDataset(String),

    #[error("Feature shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Classifier failed: {0}")]
    Classifier(String),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
