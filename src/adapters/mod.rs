//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external libraries:
//! - `delimited`: raw semicolon-delimited intake files and the cleaned CSV store (csv)
//! - `sqlite`: cleaned dataset store backed by SQLite (rusqlite)
//! - `logistic`: reference logistic regression classifier

pub mod delimited;
pub mod logistic;
pub mod sqlite;

use std::path::Path;

use crate::domain::LabeledDataset;
use crate::ports::CleanedDatasetStore;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Delimited file error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed stored data: {0}")]
    Malformed(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Cleaned dataset store chosen by file extension.
///
/// `.db`, `.sqlite` and `.sqlite3` select SQLite; anything else is written as CSV.
pub enum DatasetStore {
    Csv(delimited::CsvDatasetStore),
    Sqlite(sqlite::SqliteDatasetStore),
}

impl DatasetStore {
    /// Open the store for `path`.
    ///
    /// # Errors
    /// Returns error if the SQLite database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let is_sqlite = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| matches!(e, "db" | "sqlite" | "sqlite3"));
        if is_sqlite {
            Ok(Self::Sqlite(sqlite::SqliteDatasetStore::new(path)?))
        } else {
            Ok(Self::Csv(delimited::CsvDatasetStore::new(path)))
        }
    }
}

impl CleanedDatasetStore for DatasetStore {
    type Error = StorageError;

    fn save(&self, dataset: &LabeledDataset) -> Result<(), Self::Error> {
        match self {
            Self::Csv(s) => s.save(dataset),
            Self::Sqlite(s) => s.save(dataset),
        }
    }

    fn load(&self) -> Result<Option<LabeledDataset>, Self::Error> {
        match self {
            Self::Csv(s) => s.load(),
            Self::Sqlite(s) => s.load(),
        }
    }

    fn exists(&self) -> Result<bool, Self::Error> {
        match self {
            Self::Csv(s) => s.exists(),
            Self::Sqlite(s) => s.exists(),
        }
    }

    fn location(&self) -> String {
        match self {
            Self::Csv(s) => s.location(),
            Self::Sqlite(s) => s.location(),
        }
    }
}
