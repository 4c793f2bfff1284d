//! Patient intake records and the canonical feature schema.
//!
//! The column order defined here is shared by the training-time batch transform
//! and the inference-time single-row transform.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{CardioRiskError, Result};

/// Number of model features (11 intake fields + derived BMI).
pub const FEATURE_COUNT: usize = 12;

/// Canonical feature column order agreed between scaler and classifier.
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "age", "gender", "height", "weight", "ap_hi", "ap_lo", "chol", "gluc", "smoke", "alco",
    "active", "bmi",
];

/// Intake columns a raw row must carry (every feature except derived BMI).
pub const INTAKE_COLUMNS: [&str; FEATURE_COUNT - 1] = [
    "age", "gender", "height", "weight", "ap_hi", "ap_lo", "chol", "gluc", "smoke", "alco",
    "active",
];

/// Training label column.
pub const LABEL_COLUMN: &str = "cardio";

/// Row identifier column, dropped during cleaning.
pub const ID_COLUMN: &str = "id";

/// Map a header spelling onto the canonical column name.
#[must_use]
pub fn canonical_column(name: &str) -> String {
    let name = name.trim().to_ascii_lowercase();
    match name.as_str() {
        "cholesterol" => "chol".to_string(),
        "glucose" => "gluc".to_string(),
        "sex" => "gender".to_string(),
        _ => name,
    }
}

/// One raw tabular row as field/value pairs, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: BTreeMap<String, String>,
}

impl RawRow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(column.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    pub fn remove(&mut self, column: &str) -> Option<String> {
        self.fields.remove(column)
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Rename every column to its canonical spelling.
    #[must_use]
    pub fn into_canonical(self) -> Self {
        Self {
            fields: self
                .fields
                .into_iter()
                .map(|(k, v)| (canonical_column(&k), v))
                .collect(),
        }
    }

    fn required(&self, column: &str) -> Result<&str> {
        match self.get(column).map(str::trim) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(CardioRiskError::Validation(format!(
                "missing required column '{column}'"
            ))),
        }
    }

    pub(crate) fn float(&self, column: &str) -> Result<f64> {
        let raw = self.required(column)?;
        let value: f64 = raw.parse().map_err(|_| {
            CardioRiskError::Validation(format!("column '{column}' is not numeric: {raw:?}"))
        })?;
        if !value.is_finite() {
            return Err(CardioRiskError::Validation(format!(
                "column '{column}' is not finite"
            )));
        }
        Ok(value)
    }

    pub(crate) fn int(&self, column: &str) -> Result<i32> {
        let raw = self.required(column)?;
        if let Ok(v) = raw.parse::<i32>() {
            return Ok(v);
        }
        let value = self.float(column)?;
        if value.fract() != 0.0 || value < f64::from(i32::MIN) || value > f64::from(i32::MAX) {
            return Err(CardioRiskError::Validation(format!(
                "column '{column}' must be an integer, got {raw:?}"
            )));
        }
        Ok(value as i32)
    }
}

/// Clinical intake values for one patient.
///
/// Doubles as the inference request payload (no label, no id).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Age in years
    pub age: i32,
    /// Gender code (1/2 in the reference data)
    #[serde(alias = "sex")]
    pub gender: i32,
    /// Height in centimeters
    pub height: f64,
    /// Weight in kilograms
    pub weight: f64,
    /// Systolic blood pressure
    pub ap_hi: i32,
    /// Diastolic blood pressure
    pub ap_lo: i32,
    /// Cholesterol: 1 normal, 2 above normal, 3 well above normal
    #[serde(alias = "cholesterol")]
    pub chol: i32,
    /// Glucose: 1 normal, 2 above normal, 3 well above normal
    #[serde(alias = "glucose")]
    pub gluc: i32,
    pub smoke: i32,
    pub alco: i32,
    pub active: i32,
}

impl PatientRecord {
    /// Parse the intake columns of a canonical-named raw row.
    ///
    /// # Errors
    /// Returns `Validation` if a column is missing or malformed.
    pub fn from_raw(row: &RawRow) -> Result<Self> {
        Ok(Self {
            age: row.int("age")?,
            gender: row.int("gender")?,
            height: row.float("height")?,
            weight: row.float("weight")?,
            ap_hi: row.int("ap_hi")?,
            ap_lo: row.int("ap_lo")?,
            chol: row.int("chol")?,
            gluc: row.int("gluc")?,
            smoke: row.int("smoke")?,
            alco: row.int("alco")?,
            active: row.int("active")?,
        })
    }

    /// Body mass index: weight / (height in meters)^2.
    #[must_use]
    pub fn bmi(&self) -> f64 {
        let height_m = self.height / 100.0;
        self.weight / (height_m * height_m)
    }

    /// Unscaled feature vector with BMI appended.
    #[must_use]
    pub fn features(&self) -> FeatureVector {
        FeatureVector {
            age: f64::from(self.age),
            gender: f64::from(self.gender),
            height: self.height,
            weight: self.weight,
            ap_hi: f64::from(self.ap_hi),
            ap_lo: f64::from(self.ap_lo),
            chol: f64::from(self.chol),
            gluc: f64::from(self.gluc),
            smoke: f64::from(self.smoke),
            alco: f64::from(self.alco),
            active: f64::from(self.active),
            bmi: self.bmi(),
        }
    }
}

/// Numeric features of one patient in canonical column order.
///
/// Named fields keep the column order a checked contract: the only positional
/// views are [`FeatureVector::to_array`] and [`FeatureVector::from_slice`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    pub age: f64,
    pub gender: f64,
    pub height: f64,
    pub weight: f64,
    pub ap_hi: f64,
    pub ap_lo: f64,
    pub chol: f64,
    pub gluc: f64,
    pub smoke: f64,
    pub alco: f64,
    pub active: f64,
    pub bmi: f64,
}

impl FeatureVector {
    /// Values in [`FEATURE_COLUMNS`] order.
    #[must_use]
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.age,
            self.gender,
            self.height,
            self.weight,
            self.ap_hi,
            self.ap_lo,
            self.chol,
            self.gluc,
            self.smoke,
            self.alco,
            self.active,
            self.bmi,
        ]
    }

    #[must_use]
    pub fn from_array(v: [f64; FEATURE_COUNT]) -> Self {
        Self {
            age: v[0],
            gender: v[1],
            height: v[2],
            weight: v[3],
            ap_hi: v[4],
            ap_lo: v[5],
            chol: v[6],
            gluc: v[7],
            smoke: v[8],
            alco: v[9],
            active: v[10],
            bmi: v[11],
        }
    }

    /// Create features from a slice in [`FEATURE_COLUMNS`] order.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if the slice length is not [`FEATURE_COUNT`].
    pub fn from_slice(v: &[f64]) -> Result<Self> {
        let array: [f64; FEATURE_COUNT] =
            v.try_into().map_err(|_| CardioRiskError::ShapeMismatch {
                expected: format!("{FEATURE_COUNT} features"),
                actual: format!("{} features", v.len()),
            })?;
        Ok(Self::from_array(array))
    }

    /// Look up a feature by canonical column name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<f64> {
        FEATURE_COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|i| self.to_array()[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> PatientRecord {
        PatientRecord {
            age: 50,
            gender: 2,
            height: 168.0,
            weight: 62.0,
            ap_hi: 110,
            ap_lo: 80,
            chol: 1,
            gluc: 1,
            smoke: 0,
            alco: 0,
            active: 1,
        }
    }

    #[test]
    fn test_bmi() {
        let record = sample_record();
        let expected = 62.0 / (1.68 * 1.68);
        assert!((record.bmi() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_features_follow_canonical_order() {
        let features = sample_record().features();
        for (i, column) in FEATURE_COLUMNS.iter().enumerate() {
            assert_eq!(features.get(column), Some(features.to_array()[i]));
        }
        assert!((features.get("weight").expect("weight column") - 62.0).abs() < f64::EPSILON);
        assert!((features.to_array()[11] - sample_record().bmi()).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        let err = FeatureVector::from_slice(&[1.0; 11]).expect_err("11 columns must fail");
        assert!(matches!(err, CardioRiskError::ShapeMismatch { .. }));

        let v: Vec<f64> = (0..FEATURE_COUNT).map(|i| i as f64).collect();
        let features = FeatureVector::from_slice(&v).expect("Should parse");
        assert_eq!(features.to_array().to_vec(), v);
    }

    #[test]
    fn test_canonical_column_aliases() {
        assert_eq!(canonical_column("cholesterol"), "chol");
        assert_eq!(canonical_column(" Glucose "), "gluc");
        assert_eq!(canonical_column("sex"), "gender");
        assert_eq!(canonical_column("ap_hi"), "ap_hi");
    }

    #[test]
    fn test_from_raw_accepts_integral_decimals() {
        let row = RawRow::from_pairs([
            ("age", "50"),
            ("gender", "2"),
            ("height", "168"),
            ("weight", "62.0"),
            ("ap_hi", "110.0"),
            ("ap_lo", "80"),
            ("chol", "1"),
            ("gluc", "1"),
            ("smoke", "0"),
            ("alco", "0"),
            ("active", "1"),
        ]);
        let record = PatientRecord::from_raw(&row).expect("Should parse");
        assert_eq!(record, sample_record());
    }

    #[test]
    fn test_from_raw_rejects_missing_and_malformed() {
        let mut row = RawRow::from_pairs([("age", "50"), ("gender", "2")]);
        let err = PatientRecord::from_raw(&row).expect_err("missing height");
        assert!(err.to_string().contains("height"));

        row.insert("age", "50.5");
        assert!(matches!(
            PatientRecord::from_raw(&row),
            Err(CardioRiskError::Validation(_))
        ));
    }

    #[test]
    fn test_request_payload_aliases() {
        let json = r#"{"age":61,"sex":1,"height":170.0,"weight":80.0,"ap_hi":130,"ap_lo":85,
            "cholesterol":2,"glucose":1,"smoke":0,"alco":0,"active":1}"#;
        let record: PatientRecord = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(record.gender, 1);
        assert_eq!(record.chol, 2);
    }
}
