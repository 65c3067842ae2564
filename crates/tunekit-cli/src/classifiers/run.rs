//! Drive a classifier through init, train and eval.
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use tunekit_classifiers::config::ModelConfig;
use tunekit_classifiers::data_handling::{BatchLoader, Dataset};
use tunekit_classifiers::io::read_csv_dataset_with_config;
use tunekit_classifiers::models::{KNNClassifier, SVMClassifier, TrainableClassifier};
use tunekit_classifiers::report::write_search_report;
use tunekit_classifiers::synthetic::make_blobs;

use super::input::RunConfig;

/// Outcome of one experiment, printed as JSON by the binary.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub model: String,
    pub best_params: String,
    pub best_cv_score: f64,
    pub test_accuracy: f64,
    /// Rows seen by the search after pooling training and validation data.
    pub n_search_samples: usize,
    pub n_candidates: usize,
}

/// Load the three tables named by `config` and run the configured classifier.
pub fn run_experiment(config: &RunConfig) -> Result<RunSummary> {
    let load = |path: &str| -> Result<Dataset> {
        let data = read_csv_dataset_with_config(path, &config.reader_config(path))
            .with_context(|| format!("Failed to load dataset: {}", path))?;
        Ok(data.dataset)
    };
    let train = load(&config.train_data)?;
    let validate = load(&config.validation_data)?;
    let test = load(&config.test_data)?;

    let report = config.report_file.as_deref().map(Path::new);
    run_model(&config.model, train, validate, test, config.batch_size, config.shuffle_seed, report)
}

/// Run a classifier on three Gaussian clusters drawn with `seed`.
pub fn run_demo(model: &ModelConfig, seed: u64, report: Option<&Path>) -> Result<RunSummary> {
    let centers = vec![vec![0.0, 0.0], vec![4.0, 0.0], vec![2.0, 3.5]];
    let train = make_blobs(&centers, 40, 0.6, seed)?;
    let validate = make_blobs(&centers, 10, 0.6, seed.wrapping_add(1))?;
    let test = make_blobs(&centers, 20, 0.6, seed.wrapping_add(2))?;
    log::info!(
        "Generated demo blobs: {} train, {} validate, {} test samples",
        train.nrows(),
        validate.nrows(),
        test.nrows()
    );
    run_model(model, train, validate, test, 16, Some(seed), report)
}

fn run_model(
    model: &ModelConfig,
    train: Dataset,
    validate: Dataset,
    test: Dataset,
    batch_size: usize,
    shuffle_seed: Option<u64>,
    report: Option<&Path>,
) -> Result<RunSummary> {
    let mut train = BatchLoader::new(train, batch_size)?;
    if let Some(seed) = shuffle_seed {
        train = train.shuffled(seed);
    }
    let validate = BatchLoader::new(validate, batch_size)?;
    let test = BatchLoader::new(test, batch_size)?;

    match model {
        ModelConfig::KNN(cfg) => {
            run_classifier(KNNClassifier::new(cfg.clone()), train, validate, test, report)
        }
        ModelConfig::SVM(cfg) => {
            run_classifier(SVMClassifier::new(cfg.clone()), train, validate, test, report)
        }
    }
}

fn run_classifier<C: TrainableClassifier>(
    mut classifier: C,
    train: BatchLoader,
    validate: BatchLoader,
    test: BatchLoader,
    report: Option<&Path>,
) -> Result<RunSummary> {
    classifier.init()?;
    classifier.train(train, validate)?;
    let test_accuracy = classifier.eval(test)?;

    let result = classifier
        .search_result()
        .context("classifier reported success but holds no search result")?;

    if let Some(path) = report {
        write_search_report(result, Some(test_accuracy), path)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
    }

    Ok(RunSummary {
        model: result.estimator_name.clone(),
        best_params: result.best_params.to_string(),
        best_cv_score: result.best_score,
        test_accuracy,
        n_search_samples: result.n_samples,
        n_candidates: result.candidates.len(),
    })
}
