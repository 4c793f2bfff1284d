//! Delimited file adapter.
//!
//! Reads raw intake files (semicolon-delimited, header row) into [`RawRow`]s and
//! persists the cleaned dataset as a comma-delimited CSV with the canonical
//! columns followed by the label.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};

use super::StorageError;
use crate::domain::{
    FeatureVector, LabeledDataset, RawRow, FEATURE_COLUMNS, FEATURE_COUNT, LABEL_COLUMN,
};
use crate::ports::CleanedDatasetStore;

/// Field delimiter of the raw intake file.
pub const RAW_DELIMITER: u8 = b';';

/// Read a raw intake file from disk.
///
/// # Errors
/// Returns error if the file cannot be opened or a record is malformed.
pub fn read_raw_rows(path: &Path) -> Result<Vec<RawRow>, StorageError> {
    let file = fs::File::open(path)
        .map_err(|e| StorageError::NotFound(format!("{}: {e}", path.display())))?;
    let rows = read_raw_rows_from(file, RAW_DELIMITER)?;
    tracing::info!("Read {} raw rows from {:?}", rows.len(), path);
    Ok(rows)
}

/// Read raw rows from any reader. Blank cells are left out of the row.
///
/// # Errors
/// Returns error if the header or a record cannot be parsed.
pub fn read_raw_rows_from<R: Read>(
    reader: R,
    delimiter: u8,
) -> Result<Vec<RawRow>, StorageError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = RawRow::new();
        for (column, value) in headers.iter().zip(record.iter()) {
            if !value.is_empty() {
                row.insert(column, value);
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

fn cleaned_header() -> Vec<&'static str> {
    FEATURE_COLUMNS.iter().copied().chain([LABEL_COLUMN]).collect()
}

fn parse_cleaned_record(
    record: &StringRecord,
    line: usize,
) -> Result<(FeatureVector, u8), StorageError> {
    if record.len() != FEATURE_COUNT + 1 {
        return Err(StorageError::Malformed(format!(
            "row {line}: expected {} fields, got {}",
            FEATURE_COUNT + 1,
            record.len()
        )));
    }

    let mut values = [0.0f64; FEATURE_COUNT];
    for (i, slot) in values.iter_mut().enumerate() {
        *slot = record[i].parse().map_err(|_| {
            StorageError::Malformed(format!(
                "row {line}: column '{}' is not numeric",
                FEATURE_COLUMNS[i]
            ))
        })?;
    }
    let label = match &record[FEATURE_COUNT] {
        "0" => 0,
        "1" => 1,
        other => {
            return Err(StorageError::Malformed(format!(
                "row {line}: label must be 0 or 1, got {other:?}"
            )))
        }
    };
    Ok((FeatureVector::from_array(values), label))
}

/// Cleaned dataset store writing a CSV file.
#[derive(Debug, Clone)]
pub struct CsvDatasetStore {
    path: PathBuf,
}

impl CsvDatasetStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CleanedDatasetStore for CsvDatasetStore {
    type Error = StorageError;

    fn save(&self, dataset: &LabeledDataset) -> Result<(), Self::Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = WriterBuilder::new().from_path(&self.path)?;
        writer.write_record(cleaned_header())?;
        for (features, label) in dataset.features.iter().zip(&dataset.labels) {
            let mut record: Vec<String> =
                features.to_array().iter().map(f64::to_string).collect();
            record.push(label.to_string());
            writer.write_record(&record)?;
        }
        writer.flush()?;

        tracing::info!("Cleaned dataset saved to {:?} ({} rows)", self.path, dataset.len());
        Ok(())
    }

    fn load(&self) -> Result<Option<LabeledDataset>, Self::Error> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut reader = ReaderBuilder::new().from_path(&self.path)?;
        let header = reader.headers()?.clone();
        if header.iter().ne(cleaned_header()) {
            return Err(StorageError::Malformed(format!(
                "unexpected header in {:?}: {}",
                self.path,
                header.iter().collect::<Vec<_>>().join(",")
            )));
        }

        let mut features = Vec::new();
        let mut labels = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let (row, label) = parse_cleaned_record(&record?, i + 2)?;
            features.push(row);
            labels.push(label);
        }

        tracing::debug!("Loaded {} cleaned rows from {:?}", features.len(), self.path);
        Ok(Some(LabeledDataset { features, labels }))
    }

    fn exists(&self) -> Result<bool, Self::Error> {
        Ok(self.path.is_file())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_raw_rows_semicolon() {
        let input = "id;age;sex;height;weight;ap_hi;ap_lo;cholesterol;gluc;smoke;alco;active;cardio\n\
                     0;18393;2;168;62.0;110;80;1;1;0;0;1;0\n\
                     1;20228;1;156;;140;90;3;1;0;0;1;1\n";
        let rows = read_raw_rows_from(input.as_bytes(), RAW_DELIMITER).expect("Should read");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("cholesterol"), Some("1"));
        assert_eq!(rows[0].get("weight"), Some("62.0"));
        assert!(!rows[1].contains("weight"));
    }

    #[test]
    fn test_csv_store_roundtrip() {
        let dir = tempdir().expect("Should create temp dir");
        let store = CsvDatasetStore::new(dir.path().join("data").join("cleaned.csv"));
        assert!(store.load().expect("Should load").is_none());
        assert!(!store.exists().expect("Should check"));

        let row = FeatureVector {
            age: 50.0,
            height: 168.0,
            weight: 62.0,
            bmi: 62.0 / (1.68 * 1.68),
            ..Default::default()
        };
        let dataset = LabeledDataset::new(vec![row, row], vec![0, 1]).expect("Should build");
        store.save(&dataset).expect("Should save");

        let loaded = store.load().expect("Should load").expect("Should exist");
        assert_eq!(loaded, dataset);

        let content = fs::read_to_string(store.path()).expect("Should read file");
        assert!(content
            .starts_with("age,gender,height,weight,ap_hi,ap_lo,chol,gluc,smoke,alco,active,bmi,cardio"));
    }

    #[test]
    fn test_csv_store_rejects_foreign_header() {
        let dir = tempdir().expect("Should create temp dir");
        let path = dir.path().join("cleaned.csv");
        fs::write(&path, "a,b\n1,2\n").expect("Should write");

        let store = CsvDatasetStore::new(&path);
        assert!(matches!(store.load(), Err(StorageError::Malformed(_))));
    }
}
