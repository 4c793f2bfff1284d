//! Feature pipeline: raw intake rows to cleaned, split and scaled feature tables.
//!
//! Cleaning applies range filters in a fixed order and logs how many rows each
//! stage drops. Scaling is fitted once on the training partition and then
//! reused for the held-out partition and every inference request.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::domain::{
    FeatureVector, LabeledDataset, PatientRecord, RawRow, ScalingTransform, ID_COLUMN,
    LABEL_COLUMN,
};

const BMI_COLUMN: &str = "bmi";
use crate::{CardioRiskError, Result};

/// Accepted height range in centimeters (inclusive).
pub const HEIGHT_RANGE: (f64, f64) = (120.0, 220.0);
/// Accepted weight range in kilograms (inclusive).
pub const WEIGHT_RANGE: (f64, f64) = (40.0, 200.0);
pub const MAX_SYSTOLIC: i32 = 250;
pub const MAX_DIASTOLIC: i32 = 150;
/// Accepted BMI range (inclusive).
pub const BMI_RANGE: (f64, f64) = (10.0, 60.0);

fn within(value: f64, (lo, hi): (f64, f64)) -> bool {
    value >= lo && value <= hi
}

/// Row counts removed by each cleaning stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub dropped_body_measurements: usize,
    pub dropped_blood_pressure: usize,
    pub dropped_bmi: usize,
    pub kept_rows: usize,
}

/// Output of [`clean_and_engineer`].
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedDataset {
    /// Unscaled features (BMI appended) with their labels
    pub data: LabeledDataset,
    pub report: CleaningReport,
}

/// Train and held-out partitions of one labeled dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSplit {
    pub train: LabeledDataset,
    pub test: LabeledDataset,
}

fn parse_row(row: RawRow, index: usize) -> Result<(PatientRecord, u8)> {
    let mut row = row.into_canonical();
    row.remove(ID_COLUMN);

    let at_row = |e: CardioRiskError| match e {
        CardioRiskError::Validation(msg) => {
            CardioRiskError::Validation(format!("row {index}: {msg}"))
        }
        other => other,
    };

    let record = PatientRecord::from_raw(&row).map_err(at_row)?;
    let label = match row.int(LABEL_COLUMN).map_err(at_row)? {
        0 => 0,
        1 => 1,
        other => {
            return Err(CardioRiskError::Validation(format!(
                "row {index}: {LABEL_COLUMN} must be 0 or 1, got {other}"
            )))
        }
    };
    Ok((record, label))
}

/// Clean raw rows and derive BMI.
///
/// Stages, in order: header normalization, drop `id`, height/weight ranges,
/// blood pressure consistency, BMI range, label separation.
///
/// # Errors
/// Returns `Validation` if a row is missing a required column or carries a
/// malformed value, and `DegenerateDataset` if no row survives.
pub fn clean_and_engineer<I>(raw_rows: I) -> Result<CleanedDataset>
where
    I: IntoIterator<Item = RawRow>,
{
    let mut report = CleaningReport::default();
    let mut features = Vec::new();
    let mut labels = Vec::new();

    for (index, row) in raw_rows.into_iter().enumerate() {
        report.input_rows += 1;
        let (record, label) = parse_row(row, index)?;

        if !within(record.height, HEIGHT_RANGE) || !within(record.weight, WEIGHT_RANGE) {
            report.dropped_body_measurements += 1;
            continue;
        }
        if record.ap_hi <= record.ap_lo
            || record.ap_hi > MAX_SYSTOLIC
            || record.ap_lo > MAX_DIASTOLIC
        {
            report.dropped_blood_pressure += 1;
            continue;
        }
        let row = record.features();
        if !within(row.bmi, BMI_RANGE) {
            report.dropped_bmi += 1;
            continue;
        }

        features.push(row);
        labels.push(label);
    }
    report.kept_rows = features.len();

    tracing::info!(
        "Cleaning: {} rows in, {} dropped (height/weight), {} dropped (blood pressure), {} dropped (bmi), {} kept",
        report.input_rows,
        report.dropped_body_measurements,
        report.dropped_blood_pressure,
        report.dropped_bmi,
        report.kept_rows
    );

    if features.is_empty() {
        return Err(CardioRiskError::DegenerateDataset(format!(
            "all {} rows were removed during cleaning",
            report.input_rows
        )));
    }
    if report.kept_rows < report.input_rows {
        tracing::warn!(
            "{} of {} rows removed during cleaning",
            report.input_rows - report.kept_rows,
            report.input_rows
        );
    }

    Ok(CleanedDataset {
        data: LabeledDataset::new(features, labels)?,
        report,
    })
}

/// Fit the standardization over a feature table.
///
/// # Errors
/// Returns `DegenerateDataset` on an empty table.
pub fn fit_scaler(features: &[FeatureVector]) -> Result<ScalingTransform> {
    let scaler = ScalingTransform::fit(features)?;
    tracing::debug!("Fitted scaler on {} rows", scaler.n_samples);
    Ok(scaler)
}

/// Partition `data` deterministically.
///
/// Row indices are shuffled with a ChaCha20 stream seeded from `seed`; the
/// first `ceil(len * holdout_fraction)` shuffled rows are held out.
///
/// # Errors
/// Returns `Validation` if `holdout_fraction` is outside (0, 1) and
/// `DegenerateDataset` if either partition would be empty.
pub fn split(data: &LabeledDataset, holdout_fraction: f64, seed: u64) -> Result<DatasetSplit> {
    if !(holdout_fraction > 0.0 && holdout_fraction < 1.0) {
        return Err(CardioRiskError::Validation(format!(
            "holdout fraction must lie in (0, 1), got {holdout_fraction}"
        )));
    }

    let n = data.len();
    let n_test = (n as f64 * holdout_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(CardioRiskError::DegenerateDataset(format!(
            "cannot split {n} rows with holdout fraction {holdout_fraction}"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    let split = DatasetSplit {
        train: data.select(train_idx),
        test: data.select(test_idx),
    };

    tracing::info!(
        "Split {} rows into {} train / {} held out (seed {seed})",
        n,
        split.train.len(),
        split.test.len()
    );
    Ok(split)
}

/// Scale every row of `data` with an already fitted transform.
///
/// # Errors
/// Returns `ShapeMismatch` if the transform does not match the canonical schema.
pub fn scale_dataset(data: &LabeledDataset, scaler: &ScalingTransform) -> Result<LabeledDataset> {
    Ok(LabeledDataset {
        features: scaler.transform_all(&data.features)?,
        labels: data.labels.clone(),
    })
}

/// Inference-time transform of one record: BMI derivation then scaling.
///
/// Out-of-range values are accepted as is. A BMI that cannot be derived (zero
/// height) takes the fitted mean, so it scales to 0.
///
/// # Errors
/// Returns `ShapeMismatch` if the transform does not match the canonical schema.
pub fn transform_single(record: &PatientRecord, scaler: &ScalingTransform) -> Result<FeatureVector> {
    let mut features = record.features();
    if !features.bmi.is_finite() {
        features.bmi = scaler
            .columns
            .iter()
            .position(|c| c == BMI_COLUMN)
            .and_then(|i| scaler.mean.get(i).copied())
            .unwrap_or(0.0);
        tracing::warn!("BMI not derivable for inference request; using fitted mean");
    }
    scaler.transform(&features)
}

/// Split, scaler and scaled partitions produced by [`FeaturePipeline::prepare`].
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub scaler: ScalingTransform,
    pub train: LabeledDataset,
    pub test: LabeledDataset,
}

/// Split and scaling settings bundled for repeated use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeaturePipeline {
    pub holdout_fraction: f64,
    pub seed: u64,
}

impl FeaturePipeline {
    #[must_use]
    pub fn new(holdout_fraction: f64, seed: u64) -> Self {
        Self {
            holdout_fraction,
            seed,
        }
    }

    /// Partition `data` with this pipeline's fraction and seed.
    ///
    /// # Errors
    /// See [`split`].
    pub fn split(&self, data: &LabeledDataset) -> Result<DatasetSplit> {
        split(data, self.holdout_fraction, self.seed)
    }

    /// Split cleaned data, fit the scaler on the training rows only and scale
    /// both partitions with it.
    ///
    /// # Errors
    /// Propagates split and scaling failures.
    pub fn prepare(&self, cleaned: &LabeledDataset) -> Result<PreparedData> {
        let DatasetSplit { train, test } = self.split(cleaned)?;
        let scaler = fit_scaler(&train.features)?;
        Ok(PreparedData {
            train: scale_dataset(&train, &scaler)?,
            test: scale_dataset(&test, &scaler)?,
            scaler,
        })
    }
}
