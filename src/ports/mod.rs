//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the scoring pipeline and the systems around it (the trained
//! classifier, cleaned dataset persistence).

mod classifier;
mod dataset_store;

pub use classifier::{Classifier, DEFAULT_DECISION_THRESHOLD};
pub use dataset_store::CleanedDatasetStore;
