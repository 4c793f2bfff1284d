//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the application.

mod evaluation;
mod inference;
mod init_once;
pub mod pipeline;

pub use evaluation::{evaluate, evaluate_sample, EvaluationService};
pub use inference::InferenceService;
pub use init_once::InitOnce;
pub use pipeline::{
    clean_and_engineer, fit_scaler, scale_dataset, split, transform_single, CleanedDataset,
    CleaningReport, DatasetSplit, FeaturePipeline, PreparedData,
};
