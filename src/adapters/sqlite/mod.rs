//! SQLite adapter: cleaned dataset store backed by a local database.
//!
//! Rows are kept in insertion order so a reload feeds the splitter exactly the
//! sequence the cleaning stage produced.
//!
//! # Mutex Behavior
//!
//! Database connection is protected by `Mutex`. A poisoned mutex (from panic
//! in another thread) will cause panic. This fail-fast behavior is intentional:
//! a half-written dataset must never be evaluated.
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, params_from_iter, Connection};

use super::StorageError;
use crate::domain::{
    FeatureVector, LabeledDataset, FEATURE_COLUMNS, FEATURE_COUNT, LABEL_COLUMN,
};
use crate::ports::CleanedDatasetStore;

/// SQLite storage adapter for the cleaned dataset.
pub struct SqliteDatasetStore {
    conn: Mutex<Connection>,
    location: String,
}

impl SqliteDatasetStore {
    /// Create a new SQLite store with the given database path.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&path)?;
        let store = Self {
            conn: Mutex::new(conn),
            location: path.display().to_string(),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite database (for testing).
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            location: ":memory:".to_string(),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock().expect("Lock failed");

        let feature_columns: Vec<String> = FEATURE_COLUMNS
            .iter()
            .map(|c| format!("{c} REAL NOT NULL"))
            .collect();

        conn.execute_batch(&format!(
            r"
            CREATE TABLE IF NOT EXISTS cleaned_rows (
                row_index INTEGER PRIMARY KEY,
                {},
                {LABEL_COLUMN} INTEGER NOT NULL CHECK ({LABEL_COLUMN} IN (0, 1))
            );

            CREATE TABLE IF NOT EXISTS dataset_meta (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                row_count INTEGER NOT NULL,
                saved_at TEXT NOT NULL
            );
            ",
            feature_columns.join(",\n                ")
        ))?;

        Ok(())
    }

    /// When the current dataset was saved, if any.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn saved_at(&self) -> Result<Option<chrono::DateTime<chrono::Utc>>, StorageError> {
        let conn = self.conn.lock().expect("Lock failed");
        let result = conn.query_row(
            "SELECT saved_at FROM dataset_meta WHERE id = 1",
            [],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(saved_at) => chrono::DateTime::parse_from_rfc3339(&saved_at)
                .map(|dt| Some(dt.with_timezone(&chrono::Utc)))
                .map_err(|e| StorageError::Malformed(format!("saved_at: {e}"))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl CleanedDatasetStore for SqliteDatasetStore {
    type Error = StorageError;

    fn save(&self, dataset: &LabeledDataset) -> Result<(), Self::Error> {
        let mut conn = self.conn.lock().expect("Lock failed");
        let now = chrono::Utc::now().to_rfc3339();

        let placeholders: Vec<String> =
            (1..=FEATURE_COUNT + 2).map(|i| format!("?{i}")).collect();
        let insert_sql = format!(
            "INSERT INTO cleaned_rows (row_index, {}, {LABEL_COLUMN}) VALUES ({})",
            FEATURE_COLUMNS.join(", "),
            placeholders.join(", ")
        );

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM cleaned_rows", [])?;
        {
            let mut stmt = tx.prepare(&insert_sql)?;
            let rows = dataset.features.iter().zip(&dataset.labels);
            for (i, (features, label)) in rows.enumerate() {
                let mut values: Vec<rusqlite::types::Value> =
                    Vec::with_capacity(FEATURE_COUNT + 2);
                values.push((i as i64).into());
                values.extend(features.to_array().into_iter().map(Into::into));
                values.push(i64::from(*label).into());
                stmt.execute(params_from_iter(values))?;
            }
        }
        tx.execute(
            "INSERT OR REPLACE INTO dataset_meta (id, row_count, saved_at) VALUES (1, ?1, ?2)",
            params![dataset.len() as i64, now],
        )?;
        tx.commit()?;

        tracing::info!(
            "Cleaned dataset saved to SQLite {} ({} rows)",
            self.location,
            dataset.len()
        );
        Ok(())
    }

    fn load(&self) -> Result<Option<LabeledDataset>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let expected: i64 = match conn.query_row(
            "SELECT row_count FROM dataset_meta WHERE id = 1",
            [],
            |row| row.get(0),
        ) {
            Ok(n) => n,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut stmt = conn.prepare(&format!(
            "SELECT {}, {LABEL_COLUMN} FROM cleaned_rows ORDER BY row_index",
            FEATURE_COLUMNS.join(", ")
        ))?;

        let rows = stmt
            .query_map([], |row| {
                let mut values = [0.0f64; FEATURE_COUNT];
                for (i, slot) in values.iter_mut().enumerate() {
                    *slot = row.get(i)?;
                }
                let label: i64 = row.get(FEATURE_COUNT)?;
                Ok((FeatureVector::from_array(values), label))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if rows.len() as i64 != expected {
            return Err(StorageError::Malformed(format!(
                "dataset_meta records {expected} rows, table holds {}",
                rows.len()
            )));
        }

        let mut features = Vec::with_capacity(rows.len());
        let mut labels = Vec::with_capacity(rows.len());
        for (row, label) in rows {
            features.push(row);
            labels.push(
                u8::try_from(label)
                    .map_err(|_| StorageError::Malformed(format!("label {label}")))?,
            );
        }

        Ok(Some(LabeledDataset { features, labels }))
    }

    fn exists(&self) -> Result<bool, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM dataset_meta WHERE id = 1",
            [],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    fn location(&self) -> String {
        self.location.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> LabeledDataset {
        let rows = (0..5i32)
            .map(|i| FeatureVector {
                age: 40.0 + f64::from(i),
                height: 170.0,
                weight: 70.0,
                bmi: 70.0 / (1.7 * 1.7),
                ..Default::default()
            })
            .collect();
        LabeledDataset::new(rows, vec![0, 1, 0, 1, 1]).expect("Should build")
    }

    #[test]
    fn test_dataset_roundtrip() {
        let store = SqliteDatasetStore::in_memory().expect("Should create db");

        // Nothing saved initially
        assert!(!store.exists().expect("Should check"));
        assert!(store.load().expect("Should load").is_none());
        assert!(store.saved_at().expect("Should query").is_none());

        let ds = dataset();
        store.save(&ds).expect("Should save");
        assert!(store.exists().expect("Should check"));
        assert!(store.saved_at().expect("Should query").is_some());

        let loaded = store.load().expect("Should load").expect("Should exist");
        assert_eq!(loaded, ds);
    }

    #[test]
    fn test_save_replaces_previous_dataset() {
        let store = SqliteDatasetStore::in_memory().expect("Should create db");
        store.save(&dataset()).expect("Should save");

        let smaller = dataset().head(2);
        store.save(&smaller).expect("Should save");

        let loaded = store.load().expect("Should load").expect("Should exist");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded, smaller);
    }
}
