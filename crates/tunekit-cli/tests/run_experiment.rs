//! Runs experiments end to end from CSV tables on disk.

use std::fmt::Write as _;
use std::path::Path;

use tunekit_classifiers::config::{KNNConfig, ModelConfig, SVMConfig};
use tunekit_classifiers::data_handling::Dataset;
use tunekit_classifiers::synthetic::make_blobs;
use tunekit_cli::classifiers::input::{load_run_config, validate_tsv_or_csv_file, RunConfig};
use tunekit_cli::classifiers::run::{run_demo, run_experiment};

fn write_table(path: &Path, dataset: &Dataset, delimiter: char) {
    let mut out = String::new();
    writeln!(out, "id{d}f0{d}f1{d}label", d = delimiter).unwrap();
    for (i, (row, label)) in dataset.x.rows().into_iter().zip(dataset.y.iter()).enumerate() {
        writeln!(out, "{i}{d}{}{d}{}{d}{label}", row[0], row[1], d = delimiter).unwrap();
    }
    std::fs::write(path, out).unwrap();
}

fn write_tables(dir: &Path) -> (String, String, String) {
    let centers = vec![vec![-2.0, 0.0], vec![2.0, 0.0]];
    let names = ["train.csv", "validate.tsv", "test.csv"];
    let sets = [
        make_blobs(&centers, 30, 0.5, 1).unwrap(),
        make_blobs(&centers, 10, 0.5, 2).unwrap(),
        make_blobs(&centers, 15, 0.5, 3).unwrap(),
    ];
    let mut paths = Vec::new();
    for (name, set) in names.iter().zip(sets.iter()) {
        let path = dir.join(name);
        let delimiter = if name.ends_with(".tsv") { '\t' } else { ',' };
        write_table(&path, set, delimiter);
        paths.push(path.to_string_lossy().to_string());
    }
    (paths[0].clone(), paths[1].clone(), paths[2].clone())
}

#[test]
fn knn_experiment_from_tables() {
    let dir = tempfile::tempdir().unwrap();
    let (train, validate, test) = write_tables(dir.path());
    let report = dir.path().join("report.html");

    let config = RunConfig {
        train_data: train,
        validation_data: validate,
        test_data: test,
        batch_size: 7,
        shuffle_seed: Some(3),
        report_file: Some(report.to_string_lossy().to_string()),
        model: ModelConfig::KNN(KNNConfig::default()),
        ..RunConfig::default()
    };
    config.validate().unwrap();

    let summary = run_experiment(&config).unwrap();
    assert_eq!(summary.model, "knn");
    assert_eq!(summary.n_search_samples, 80);
    assert_eq!(summary.n_candidates, 16);
    assert!(summary.test_accuracy >= 0.9);
    assert!(report.exists());
}

#[test]
fn config_file_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let (train, validate, test) = write_tables(dir.path());
    let config_path = dir.path().join("run.json");
    let json = serde_json::json!({
        "train_data": train,
        "validation_data": validate,
        "test_data": test,
        "model": { "type": "svm", "n_iter": 3 }
    });
    std::fs::write(&config_path, json.to_string()).unwrap();

    let config = load_run_config(&config_path).unwrap();
    assert_eq!(config.batch_size, 64);
    assert_eq!(config.label_column, "label");
    match &config.model {
        ModelConfig::SVM(svm) => {
            assert_eq!(svm.n_iter, 3);
            assert_eq!(svm.random_state, SVMConfig::default().random_state);
        }
        other => panic!("expected svm, got {:?}", other),
    }

    let summary = run_experiment(&config).unwrap();
    assert_eq!(summary.model, "svm");
    assert_eq!(summary.n_candidates, 3);
    assert!(summary.test_accuracy >= 0.9);
}

#[test]
fn rejects_unknown_extensions_and_missing_files() {
    assert!(validate_tsv_or_csv_file("data.parquet").is_err());
    assert!(validate_tsv_or_csv_file("/definitely/not/here.csv").is_err());
    assert!(load_run_config("/definitely/not/here.json").is_err());
}

#[test]
fn demo_runs_knn() {
    let summary = run_demo(&ModelConfig::default(), 11, None).unwrap();
    assert_eq!(summary.model, "knn");
    assert_eq!(summary.n_search_samples, 150);
    assert!(summary.test_accuracy >= 0.9);
}

#[test]
fn demo_runs_svm_one_vs_rest() {
    let summary = run_demo(&ModelConfig::SVM(SVMConfig::default()), 11, None).unwrap();
    assert_eq!(summary.model, "svm");
    assert_eq!(summary.n_search_samples, 150);
    assert_eq!(summary.n_candidates, 10);
    assert!(summary.test_accuracy >= 0.9, "svm demo accuracy {}", summary.test_accuracy);
}
