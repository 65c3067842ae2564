//! Classification metrics used for scoring search candidates and test sets.
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, Result};

/// Metric used to rank candidate configurations. Higher is better.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    #[default]
    Accuracy,
}

impl Scoring {
    pub fn score(&self, y_true: ArrayView1<usize>, y_pred: ArrayView1<usize>) -> Result<f64> {
        match self {
            Scoring::Accuracy => accuracy_score(y_true, y_pred),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scoring::Accuracy => "accuracy",
        }
    }
}

/// Fraction of predictions equal to the true labels.
pub fn accuracy_score(y_true: ArrayView1<usize>, y_pred: ArrayView1<usize>) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(ClassifierError::shape(
            y_true.len(),
            y_pred.len(),
            "prediction count",
        ));
    }
    if y_true.is_empty() {
        return Err(ClassifierError::EmptyDataset(
            "cannot score an empty prediction set".to_string(),
        ));
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_accuracy() {
        let y = array![0usize, 1, 1, 0];
        let p = array![0usize, 1, 0, 0];
        assert!((accuracy_score(y.view(), p.view()).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_accuracy_length_mismatch() {
        let y = array![0usize, 1];
        let p = array![0usize];
        assert!(accuracy_score(y.view(), p.view()).is_err());
    }
}
