use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use cardiorisk::adapters::delimited::{read_raw_rows, CsvDatasetStore};
use cardiorisk::adapters::logistic::{LogisticRegression, TrainOptions};
use cardiorisk::adapters::sqlite::SqliteDatasetStore;
use cardiorisk::adapters::DatasetStore;
use cardiorisk::application::{
    clean_and_engineer, evaluate_sample, scale_dataset, split, transform_single, EvaluationService,
    FeaturePipeline, InferenceService,
};
use cardiorisk::domain::{LabeledDataset, RawRow};
use cardiorisk::ports::{Classifier, CleanedDatasetStore};
use cardiorisk::{CardioRiskError, FeatureVector, PatientRecord, RiskLevel};
use tempfile::tempdir;

const VALID_ROWS: usize = 80;

/// Semicolon-delimited intake file: valid rows first, then rows every filter drops.
fn write_raw_file(path: &Path) {
    let mut out =
        String::from("id;age;sex;height;weight;ap_hi;ap_lo;cholesterol;gluc;smoke;alco;active;cardio\n");
    for i in 0..VALID_ROWS {
        let ap_hi = 110 + (i * 3) % 60;
        writeln!(
            out,
            "{i};{};{};{};{}.5;{ap_hi};{};{};{};{};{};{};{}",
            40 + i % 25,
            1 + i % 2,
            150 + i % 40,
            55 + (i * 7) % 40,
            70 + i % 15,
            1 + i % 3,
            1 + (i / 3) % 3,
            u8::from(i % 5 == 0),
            u8::from(i % 7 == 0),
            u8::from(i % 4 != 0),
            u8::from(ap_hi >= 140),
        )
        .expect("Should format");
    }
    out.push_str("900;50;1;100;60;120;80;1;1;0;0;1;0\n");
    out.push_str("901;50;1;170;70;80;120;1;1;0;0;1;1\n");
    out.push_str("902;50;1;220;45;120;80;1;1;0;0;1;0\n");
    fs::write(path, out).expect("Should write raw file");
}

fn first_record() -> PatientRecord {
    PatientRecord {
        age: 40,
        gender: 1,
        height: 150.0,
        weight: 55.5,
        ap_hi: 110,
        ap_lo: 70,
        chol: 1,
        gluc: 1,
        smoke: 1,
        alco: 1,
        active: 0,
    }
}

fn cleaned_from(path: &Path) -> LabeledDataset {
    let rows = read_raw_rows(path).expect("Should read raw file");
    assert_eq!(rows.len(), VALID_ROWS + 3);
    let cleaned = clean_and_engineer(rows).expect("Should clean");
    assert_eq!(cleaned.report.dropped_body_measurements, 1);
    assert_eq!(cleaned.report.dropped_blood_pressure, 1);
    assert_eq!(cleaned.report.dropped_bmi, 1);
    cleaned.data
}

struct Constant(f64);

impl Classifier for Constant {
    fn predict_proba(&self, _features: &FeatureVector) -> cardiorisk::Result<f64> {
        Ok(self.0)
    }
}

#[test]
fn test_single_transform_matches_batch_scaling() {
    let dir = tempdir().expect("Should create temp dir");
    let raw = dir.path().join("cardio_train.csv");
    write_raw_file(&raw);
    let data = cleaned_from(&raw);

    let prepared = FeaturePipeline::new(0.25, 42)
        .prepare(&data)
        .expect("Should prepare");
    let batch = scale_dataset(&data, &prepared.scaler).expect("Should scale");

    let single = transform_single(&first_record(), &prepared.scaler).expect("Should transform");
    for (a, b) in single.to_array().iter().zip(batch.features[0].to_array()) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }
}

#[test]
fn test_split_is_stable_across_store_reload() {
    let dir = tempdir().expect("Should create temp dir");
    let raw = dir.path().join("cardio_train.csv");
    write_raw_file(&raw);
    let data = cleaned_from(&raw);

    let csv_store = CsvDatasetStore::new(dir.path().join("data").join("cleaned.csv"));
    let sqlite_store = SqliteDatasetStore::new(dir.path().join("data").join("cleaned.db"))
        .expect("Should open db");
    csv_store.save(&data).expect("Should save csv");
    sqlite_store.save(&data).expect("Should save sqlite");

    let from_csv = csv_store.load().expect("Should load").expect("Should exist");
    let from_sqlite = sqlite_store.load().expect("Should load").expect("Should exist");
    assert_eq!(from_csv, data);
    assert_eq!(from_sqlite, data);

    let original = split(&data, 0.25, 42).expect("Should split");
    let reloaded = split(&from_csv, 0.25, 42).expect("Should split");
    assert_eq!(original, reloaded);
    assert_eq!(original.test.len(), VALID_ROWS / 4);
}

#[test]
fn test_evaluate_end_to_end() {
    let dir = tempdir().expect("Should create temp dir");
    let raw = dir.path().join("cardio_train.csv");
    write_raw_file(&raw);
    let data = cleaned_from(&raw);

    let store = DatasetStore::open(&dir.path().join("cleaned.sqlite")).expect("Should open");
    store.save(&data).expect("Should save");

    let pipeline = FeaturePipeline::new(0.25, 42);
    let prepared = pipeline.prepare(&data).expect("Should prepare");
    let model = LogisticRegression::train(
        &prepared.train,
        &TrainOptions {
            learning_rate: 0.1,
            epochs: 300,
        },
    )
    .expect("Should train");

    let service = EvaluationService::new(
        Arc::new(store),
        Arc::new(prepared.scaler.clone()),
        pipeline,
        50,
    );
    let summary = service.summary(&model).expect("Should evaluate");

    let total: u64 = summary.full_dataset.confusion_matrix.iter().flatten().sum();
    assert_eq!(total, prepared.test.len() as u64);
    assert!((0.0..=100.0).contains(&summary.full_dataset.accuracy));
    assert!((0.0..=1.0).contains(&summary.sample.f1_score));

    let json = serde_json::to_value(summary).expect("Should serialize");
    assert!(json["first_50_samples"]["f1_score"].is_number());
}

#[test]
fn test_concurrent_first_requests_share_one_held_out_split() {
    let dir = tempdir().expect("Should create temp dir");
    let raw = dir.path().join("cardio_train.csv");
    write_raw_file(&raw);
    let data = cleaned_from(&raw);

    let store = CsvDatasetStore::new(dir.path().join("cleaned.csv"));
    store.save(&data).expect("Should save");

    let pipeline = FeaturePipeline::new(0.25, 7);
    let prepared = pipeline.prepare(&data).expect("Should prepare");
    let service = Arc::new(EvaluationService::new(
        Arc::new(store),
        Arc::new(prepared.scaler),
        pipeline,
        50,
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || service.held_out().expect("Should build held-out rows"))
        })
        .collect();
    let views: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("Thread should finish"))
        .collect();

    assert!(views.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(*views[0], prepared.test);
}

#[test]
fn test_sample_without_positives_reports_zero() {
    let features = vec![FeatureVector::default(); 60];
    let labels = vec![0; 60];
    let data = LabeledDataset::new(features, labels).expect("Should build");

    let report = evaluate_sample(&Constant(0.1), &data, 50).expect("Should evaluate");
    let metrics = report.to_sample_metrics();
    assert_eq!(metrics.confusion_matrix, [[50, 0], [0, 0]]);
    assert_eq!(metrics.precision, 0.0);
    assert_eq!(metrics.recall, 0.0);
    assert_eq!(metrics.f1_score, 0.0);
    assert!((metrics.accuracy - 100.0).abs() < 1e-9);
}

#[test]
fn test_assess_request_payload() {
    let dir = tempdir().expect("Should create temp dir");
    let raw = dir.path().join("cardio_train.csv");
    write_raw_file(&raw);
    let data = cleaned_from(&raw);
    let prepared = FeaturePipeline::new(0.25, 42)
        .prepare(&data)
        .expect("Should prepare");

    let request = r#"{"age":65,"gender":1,"height":170.0,"weight":80.0,"ap_hi":140,
        "ap_lo":85,"chol":1,"gluc":1,"smoke":1,"alco":0,"active":1}"#;
    let patient: PatientRecord = serde_json::from_str(request).expect("Should parse request");

    let service = InferenceService::new(Arc::new(Constant(0.1234)), Arc::new(prepared.scaler))
        .expect("Should build");
    let response = service.assess(&patient).expect("Should assess").to_response();
    assert_eq!(response.risk_level, RiskLevel::Moderate);
    assert!((response.probability - 12.34).abs() < 1e-9);

    let json = serde_json::to_value(response).expect("Should serialize");
    assert_eq!(json["risk_level"], "MODERATE");

    // Out-of-range request values are still scored
    let outlier = PatientRecord {
        height: 90.0,
        weight: 300.0,
        ap_hi: 300,
        ..patient
    };
    let assessment = service.assess(&outlier).expect("Should assess outlier");
    assert_eq!(assessment.risk_level, RiskLevel::High);
}

#[test]
fn test_missing_column_is_rejected() {
    let rows = vec![RawRow::from_pairs([("age", "50"), ("height", "170")])];
    assert!(matches!(
        clean_and_engineer(rows),
        Err(CardioRiskError::Validation(_))
    ));
}
