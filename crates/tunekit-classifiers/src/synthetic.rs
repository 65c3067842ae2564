//! Synthetic Gaussian blobs for demos and tests.
use ndarray::{Array1, Array2};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use statrs::distribution::Normal;

use crate::data_handling::Dataset;
use crate::error::{ClassifierError, Result};

/// Draw `n_per_center` points around each center with isotropic standard
/// deviation `std`. Points of center `i` get label `i`; rows are grouped by
/// center in the order given.
pub fn make_blobs(centers: &[Vec<f64>], n_per_center: usize, std: f64, seed: u64) -> Result<Dataset> {
    let n_features = centers.first().map(|c| c.len()).ok_or_else(|| {
        ClassifierError::InvalidConfig("make_blobs needs at least one center".to_string())
    })?;
    if let Some(bad) = centers.iter().find(|c| c.len() != n_features) {
        return Err(ClassifierError::shape(n_features, bad.len(), "blob center dimension"));
    }
    let noise = Normal::new(0.0, std)
        .map_err(|e| ClassifierError::InvalidConfig(format!("invalid blob std {}: {}", std, e)))?;

    let mut rng = StdRng::seed_from_u64(seed);
    let n_samples = centers.len() * n_per_center;
    let mut data = Vec::with_capacity(n_samples * n_features);
    let mut labels = Vec::with_capacity(n_samples);
    for (label, center) in centers.iter().enumerate() {
        for _ in 0..n_per_center {
            data.extend(center.iter().map(|c| c + noise.sample(&mut rng)));
            labels.push(label);
        }
    }

    let x = Array2::from_shape_vec((n_samples, n_features), data)
        .map_err(|e| ClassifierError::InvalidConfig(e.to_string()))?;
    Dataset::new(x, Array1::from_vec(labels))
}
