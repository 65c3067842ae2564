use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};

use tunekit_classifiers::config::ModelConfig;
use tunekit_classifiers::io::CsvReaderConfig;

/// Experiment description: three labelled tables, the batching used to feed
/// them, and the classifier to tune.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub train_data: String,
    pub validation_data: String,
    pub test_data: String,
    pub batch_size: usize,
    /// Shuffle training batches with this seed when set.
    pub shuffle_seed: Option<u64>,
    pub label_column: String,
    pub ignore_columns: Vec<String>,
    /// HTML search report destination.
    pub report_file: Option<String>,
    pub model: ModelConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            train_data: String::new(),
            validation_data: String::new(),
            test_data: String::new(),
            batch_size: 64,
            shuffle_seed: None,
            label_column: String::from("label"),
            ignore_columns: vec![String::from("id")],
            report_file: None,
            model: ModelConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn from_arguments(config_path: &PathBuf, matches: &ArgMatches) -> Result<Self> {
        let mut config = load_run_config(config_path)?;

        // Apply CLI overrides
        if let Some(model) = matches.get_one::<String>("model") {
            if model.as_str() != config.model.name() {
                let search = match &config.model {
                    ModelConfig::KNN(cfg) => cfg.search.clone(),
                    ModelConfig::SVM(cfg) => cfg.search.clone(),
                };
                config.model = model.parse::<ModelConfig>().map_err(anyhow::Error::msg)?;
                *config.model.search_settings_mut() = search;
            }
        }

        if let Some(n_jobs) = matches.get_one::<usize>("n_jobs") {
            config.model.search_settings_mut().n_jobs = *n_jobs;
        }

        if let Some(report) = matches.get_one::<PathBuf>("report") {
            config.report_file = Some(report.to_string_lossy().to_string());
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that every input table exists and looks like a delimited file.
    pub fn validate(&self) -> Result<()> {
        validate_tsv_or_csv_file(&self.train_data)?;
        validate_tsv_or_csv_file(&self.validation_data)?;
        validate_tsv_or_csv_file(&self.test_data)?;
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be at least 1");
        }
        Ok(())
    }

    /// Reader settings for one of the input tables; `.tsv` files are tab separated.
    pub fn reader_config(&self, path: &str) -> CsvReaderConfig {
        let delimiter = match extension(path).as_deref() {
            Some("tsv") => b'\t',
            _ => b',',
        };
        CsvReaderConfig {
            label_column: self.label_column.clone(),
            delimiter,
            feature_columns: None,
            ignore_columns: self.ignore_columns.clone(),
        }
    }
}

/// Load a run configuration from a JSON file.
pub fn load_run_config<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: RunConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}

fn extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
}

pub fn validate_tsv_or_csv_file(path: &str) -> Result<()> {
    match extension(path).as_deref() {
        Some("tsv") | Some("csv") => {}
        _ => anyhow::bail!("File must have a .tsv or .csv extension: {}", path),
    }

    if !Path::new(path).exists() {
        anyhow::bail!("File does not exist: {}", path);
    }

    Ok(())
}
