//! Delimited text reader for labelled feature tables.
use std::collections::HashSet;
use std::path::Path;

use csv::StringRecord;
use ndarray::{Array1, Array2};

use crate::data_handling::Dataset;
use crate::error::{ClassifierError, Result};

/// Parsed table ready to be handed to a `BatchLoader`.
#[derive(Debug)]
pub struct CsvData {
    pub dataset: Dataset,
    pub feature_names: Vec<String>,
}

/// Configuration for reading feature tables.
#[derive(Debug, Clone)]
pub struct CsvReaderConfig {
    /// Column holding non-negative integer class labels.
    pub label_column: String,
    pub delimiter: u8,
    /// Optional list of feature columns to load (in order).
    /// When `None`, every column except the label and `ignore_columns` is a feature.
    pub feature_columns: Option<Vec<String>>,
    pub ignore_columns: Vec<String>,
}

impl Default for CsvReaderConfig {
    fn default() -> Self {
        Self {
            label_column: "label".to_string(),
            delimiter: b',',
            feature_columns: None,
            ignore_columns: vec!["id".to_string()],
        }
    }
}

/// Read a comma separated file with a `label` column.
pub fn read_csv_dataset<P: AsRef<Path>>(path: P) -> Result<CsvData> {
    read_csv_dataset_with_config(path, &CsvReaderConfig::default())
}

/// Read a delimited file using a custom configuration.
pub fn read_csv_dataset_with_config<P: AsRef<Path>>(path: P, config: &CsvReaderConfig) -> Result<CsvData> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();

    let label_idx = find_column(&headers, &config.label_column).ok_or_else(|| {
        ClassifierError::Parse(format!(
            "{}: missing label column '{}'",
            path.display(),
            config.label_column
        ))
    })?;

    let feature_indices = resolve_feature_indices(&headers, config, label_idx)?;
    if feature_indices.is_empty() {
        return Err(ClassifierError::Parse(format!(
            "{}: no feature columns detected in header",
            path.display()
        )));
    }

    let mut features = Vec::new();
    let mut labels = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result?;
        let line = row_idx + 2;

        let raw_label = record.get(label_idx).unwrap_or_default().trim();
        let label = raw_label.parse::<usize>().map_err(|_| {
            ClassifierError::Parse(format!(
                "{}:{}: invalid label '{}', expected a non-negative integer",
                path.display(),
                line,
                raw_label
            ))
        })?;
        labels.push(label);

        for &idx in &feature_indices {
            let value = record.get(idx).unwrap_or_default().trim();
            let parsed = value.parse::<f64>().map_err(|_| {
                ClassifierError::Parse(format!(
                    "{}:{}: invalid value '{}' for feature '{}'",
                    path.display(),
                    line,
                    value,
                    headers.get(idx).unwrap_or("")
                ))
            })?;
            features.push(parsed);
        }
    }

    let n_samples = labels.len();
    let x = Array2::from_shape_vec((n_samples, feature_indices.len()), features)
        .map_err(|e| ClassifierError::Parse(format!("{}: {}", path.display(), e)))?;
    let dataset = Dataset::new(x, Array1::from_vec(labels))?;

    let feature_names = feature_indices
        .iter()
        .map(|&idx| headers.get(idx).unwrap_or("").to_string())
        .collect();

    log::debug!(
        "Loaded {} rows x {} features from {}",
        dataset.nrows(),
        dataset.ncols(),
        path.display()
    );

    Ok(CsvData {
        dataset,
        feature_names,
    })
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.trim().eq_ignore_ascii_case(name))
}

fn resolve_feature_indices(headers: &StringRecord, config: &CsvReaderConfig, label_idx: usize) -> Result<Vec<usize>> {
    if let Some(names) = &config.feature_columns {
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            let idx = find_column(headers, name)
                .ok_or_else(|| ClassifierError::Parse(format!("missing feature column '{}'", name)))?;
            indices.push(idx);
        }
        return Ok(indices);
    }

    let ignore = config
        .ignore_columns
        .iter()
        .map(|name| name.to_ascii_lowercase())
        .collect::<HashSet<_>>();

    Ok(headers
        .iter()
        .enumerate()
        .filter(|(idx, header)| *idx != label_idx && !ignore.contains(&header.trim().to_ascii_lowercase()))
        .map(|(idx, _)| idx)
        .collect())
}
