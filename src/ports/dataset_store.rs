//! Dataset store port: persistence for the cleaned, labeled dataset.
//!
//! The cleaning stage saves its output here so the evaluation stage can rebuild
//! the held-out partition from exactly the same rows.

use crate::domain::LabeledDataset;

/// Trait for cleaned dataset persistence.
///
/// Stored rows carry the canonical feature columns (BMI included) and the label.
pub trait CleanedDatasetStore: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save the cleaned dataset, replacing any previous one.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn save(&self, dataset: &LabeledDataset) -> Result<(), Self::Error>;

    /// Load the cleaned dataset.
    ///
    /// # Returns
    /// `None` if nothing has been saved yet.
    ///
    /// # Errors
    /// Returns error if storage operation fails or stored rows are malformed.
    fn load(&self) -> Result<Option<LabeledDataset>, Self::Error>;

    /// Check if a cleaned dataset has been saved.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn exists(&self) -> Result<bool, Self::Error>;

    /// Human-readable location for log messages.
    fn location(&self) -> String;
}
