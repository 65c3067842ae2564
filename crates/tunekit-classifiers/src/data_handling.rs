//! Data structures and helpers for turning batched input into flat datasets.
//!
//! This module defines `Batch` and `Dataset`, the `materialize` routine that
//! stacks a single-pass sequence of batches into one `Dataset`, and an
//! in-memory `BatchLoader` that plays the role of a streaming data loader.
use std::collections::BTreeMap;

use ndarray::{concatenate, Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{ClassifierError, Result};

/// One batch yielded by a data loader: a feature block and its labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    features: Array2<f64>,
    labels: Array1<usize>,
}

impl Batch {
    pub fn new(features: Array2<f64>, labels: Array1<usize>) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(ClassifierError::shape(
                features.nrows(),
                labels.len(),
                "batch label count",
            ));
        }
        Ok(Batch { features, labels })
    }

    pub fn features(&self) -> ArrayView2<'_, f64> {
        self.features.view()
    }

    pub fn labels(&self) -> ArrayView1<'_, usize> {
        self.labels.view()
    }

    pub fn nrows(&self) -> usize {
        self.labels.len()
    }

    pub fn ncols(&self) -> usize {
        self.features.ncols()
    }

    pub fn into_parts(self) -> (Array2<f64>, Array1<usize>) {
        (self.features, self.labels)
    }
}

/// A materialized dataset. Row `i` of `x` is labelled by `y[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub x: Array2<f64>,
    pub y: Array1<usize>,
}

impl Dataset {
    pub fn new(x: Array2<f64>, y: Array1<usize>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(ClassifierError::shape(x.nrows(), y.len(), "dataset label count"));
        }
        Ok(Dataset { x, y })
    }

    pub fn nrows(&self) -> usize {
        self.x.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.x.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }

    /// Number of samples per class label, ordered by label.
    pub fn class_counts(&self) -> BTreeMap<usize, usize> {
        let mut counts = BTreeMap::new();
        for &label in self.y.iter() {
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }

    /// Stack `other` below `self`. Rows of `self` come first.
    pub fn pool(self, other: Dataset) -> Result<Dataset> {
        if self.ncols() != other.ncols() {
            return Err(ClassifierError::shape(
                self.ncols(),
                other.ncols(),
                "pooled dataset attribute count",
            ));
        }
        let x = concatenate(Axis(0), &[self.x.view(), other.x.view()])
            .map_err(|e| ClassifierError::InvalidConfig(e.to_string()))?;
        let y = concatenate(Axis(0), &[self.y.view(), other.y.view()])
            .map_err(|e| ClassifierError::InvalidConfig(e.to_string()))?;
        Ok(Dataset { x, y })
    }

    /// Select a subset of rows, preserving the order of `indices`.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            x: self.x.select(Axis(0), indices),
            y: self.y.select(Axis(0), indices),
        }
    }

    pub fn log_summary(&self, name: &str) {
        let classes = self
            .class_counts()
            .iter()
            .map(|(label, count)| format!("{}:{}", label, count))
            .collect::<Vec<_>>()
            .join(", ");
        log::info!(
            "{}: {} samples x {} features, class counts [{}]",
            name,
            self.nrows(),
            self.ncols(),
            classes
        );
    }
}

/// Stack a single-pass sequence of batches into one `Dataset`.
///
/// Batch order and row order inside each batch are preserved. The feature
/// width of the first batch fixes the width every later batch must have.
///
/// # Errors
///
/// * `EmptyDataset` if the sequence yields no batches, or only empty ones.
/// * `ShapeMismatch` if a batch has a different column count.
pub fn materialize<I>(batches: I) -> Result<Dataset>
where
    I: IntoIterator<Item = Batch>,
{
    let mut feature_blocks: Vec<Array2<f64>> = Vec::new();
    let mut label_blocks: Vec<Array1<usize>> = Vec::new();

    for (idx, batch) in batches.into_iter().enumerate() {
        if let Some(first) = feature_blocks.first() {
            if batch.ncols() != first.ncols() {
                return Err(ClassifierError::shape(
                    first.ncols(),
                    batch.ncols(),
                    format!("feature columns of batch {}", idx),
                ));
            }
        }
        let (features, labels) = batch.into_parts();
        feature_blocks.push(features);
        label_blocks.push(labels);
    }

    if feature_blocks.is_empty() {
        return Err(ClassifierError::EmptyDataset(
            "data loader yielded no batches".to_string(),
        ));
    }

    let feature_views = feature_blocks.iter().map(|b| b.view()).collect::<Vec<_>>();
    let label_views = label_blocks.iter().map(|b| b.view()).collect::<Vec<_>>();
    let x = concatenate(Axis(0), &feature_views)
        .map_err(|e| ClassifierError::InvalidConfig(e.to_string()))?;
    let y = concatenate(Axis(0), &label_views)
        .map_err(|e| ClassifierError::InvalidConfig(e.to_string()))?;

    if x.nrows() == 0 {
        return Err(ClassifierError::EmptyDataset(
            "data loader yielded only empty batches".to_string(),
        ));
    }

    Ok(Dataset { x, y })
}

/// In-memory data loader that hands out a dataset in fixed-size batches.
///
/// The loader is consumed by iteration, so a given loader can only be read
/// once.
#[derive(Debug, Clone)]
pub struct BatchLoader {
    dataset: Dataset,
    batch_size: usize,
    shuffle_seed: Option<u64>,
}

impl BatchLoader {
    pub fn new(dataset: Dataset, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(ClassifierError::InvalidConfig(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(BatchLoader {
            dataset,
            batch_size,
            shuffle_seed: None,
        })
    }

    /// Yield rows in a permutation drawn from `seed` instead of file order.
    pub fn shuffled(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    pub fn num_batches(&self) -> usize {
        (self.dataset.nrows() + self.batch_size - 1) / self.batch_size
    }
}

impl IntoIterator for BatchLoader {
    type Item = Batch;
    type IntoIter = BatchIter;

    fn into_iter(self) -> Self::IntoIter {
        let mut order: Vec<usize> = (0..self.dataset.nrows()).collect();
        if let Some(seed) = self.shuffle_seed {
            let mut rng = StdRng::seed_from_u64(seed);
            order.shuffle(&mut rng);
        }
        BatchIter {
            dataset: self.dataset,
            order,
            batch_size: self.batch_size,
            cursor: 0,
        }
    }
}

/// Iterator returned by `BatchLoader::into_iter`.
#[derive(Debug)]
pub struct BatchIter {
    dataset: Dataset,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl Iterator for BatchIter {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let rows = &self.order[self.cursor..end];
        self.cursor = end;
        let subset = self.dataset.select(rows);
        Some(Batch {
            features: subset.x,
            labels: subset.y,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.order.len() - self.cursor;
        let n = (remaining + self.batch_size - 1) / self.batch_size;
        (n, Some(n))
    }
}
