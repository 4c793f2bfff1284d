//! Domain layer: Core value types and pure logic.
//!
//! Nothing in here performs I/O. Every type is a value, created per request or
//! per row and dropped after use.

mod dataset;
pub mod metrics;
mod patient;
mod risk;
mod scaling;

pub use dataset::LabeledDataset;
pub use metrics::{ConfusionMatrix, EvaluationReport, EvaluationSummary, ReportedMetrics};
pub use patient::{
    canonical_column, FeatureVector, PatientRecord, RawRow, FEATURE_COLUMNS, FEATURE_COUNT,
    ID_COLUMN, INTAKE_COLUMNS, LABEL_COLUMN,
};
pub use risk::{
    classify, classify_risk, InferenceResponse, RiskAssessment, RiskInputs, RiskLevel, RiskRule,
    RISK_RULES,
};
pub use scaling::ScalingTransform;
