//! cardiorisk: Cardiovascular risk scoring pipeline
//!
//! Command-line entry point.
//!
//! # Usage
//!
//! ```bash
//! cardiorisk evaluate <raw.csv>
//! cardiorisk assess <raw.csv> <record.json>
//! ```
//!
//! Both commands clean the raw intake file, persist the cleaned dataset, split
//! it, fit the scaler on the training rows and train the reference classifier.
//! JSON results go to stdout; logs go to stderr or a file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cardiorisk::adapters::delimited::read_raw_rows;
use cardiorisk::adapters::logistic::LogisticRegression;
use cardiorisk::adapters::DatasetStore;
use cardiorisk::application::{
    clean_and_engineer, EvaluationService, FeaturePipeline, InferenceService,
};
use cardiorisk::config::PipelineConfig;
use cardiorisk::domain::ScalingTransform;
use cardiorisk::ports::CleanedDatasetStore;
use cardiorisk::PatientRecord;

enum Command {
    Evaluate { raw: PathBuf },
    Assess { raw: PathBuf, record: PathBuf },
}

fn usage() -> String {
    "Usage: cardiorisk evaluate <raw.csv>\n       cardiorisk assess <raw.csv> <record.json>"
        .to_string()
}

fn parse_args() -> Result<Command, String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["evaluate", raw] => Ok(Command::Evaluate {
            raw: PathBuf::from(*raw),
        }),
        ["assess", raw, record] => Ok(Command::Assess {
            raw: PathBuf::from(*raw),
            record: PathBuf::from(*record),
        }),
        _ => Err(usage()),
    }
}

fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    // stdout carries the JSON result, so logs default to stderr.
    let log_mode = std::env::var("CARDIORISK_LOG_MODE").unwrap_or_else(|_| "stderr".to_string());

    let (writer, guard) = if log_mode == "file" {
        let log_file = std::env::var("CARDIORISK_LOG_FILE")
            .unwrap_or_else(|_| "./data/cardiorisk.log".to_string());

        if let Some(parent) = Path::new(&log_file).parent() {
            // Best-effort: the open below reports the real failure.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("opening log file {log_file}"))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stderr())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .init();

    Ok(guard)
}

/// Clean, persist, split, fit and train.
fn prepare(
    raw: &Path,
    config: &PipelineConfig,
) -> Result<(DatasetStore, ScalingTransform, LogisticRegression)> {
    let rows = read_raw_rows(raw).with_context(|| format!("reading {}", raw.display()))?;
    let cleaned = clean_and_engineer(rows)?;

    let store = DatasetStore::open(&config.cleaned_dataset_path)?;
    store.save(&cleaned.data)?;

    let pipeline = FeaturePipeline::new(config.holdout_fraction, config.split_seed);
    let prepared = pipeline.prepare(&cleaned.data)?;
    let model = LogisticRegression::train(&prepared.train, &config.train_options())?;

    Ok((store, prepared.scaler, model))
}

fn main() -> Result<()> {
    let command = match parse_args() {
        Ok(c) => c,
        Err(usage) => {
            eprintln!("{usage}");
            std::process::exit(2);
        }
    };

    let _guard = init_logging()?;
    let config = PipelineConfig::from_env_or_default();
    config.validate()?;

    tracing::info!("Starting cardiorisk...");

    match command {
        Command::Evaluate { raw } => {
            let (store, scaler, model) = prepare(&raw, &config)?;
            let service = EvaluationService::new(
                Arc::new(store),
                Arc::new(scaler),
                FeaturePipeline::new(config.holdout_fraction, config.split_seed),
                config.sample_size,
            );
            let summary = service.summary(&model)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Assess { raw, record } => {
            let payload = std::fs::read_to_string(&record)
                .with_context(|| format!("reading {}", record.display()))?;
            let patient: PatientRecord =
                serde_json::from_str(&payload).context("parsing inference request")?;

            let (_store, scaler, model) = prepare(&raw, &config)?;
            let service = InferenceService::new(Arc::new(model), Arc::new(scaler))?;
            let assessment = service.assess(&patient)?;
            println!("{}", serde_json::to_string_pretty(&assessment.to_response())?);
        }
    }

    tracing::info!("cardiorisk finished.");
    Ok(())
}
