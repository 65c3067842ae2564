//! Stratified k-fold splitting.
use std::collections::HashMap;

use ndarray::ArrayView1;

use crate::error::{ClassifierError, Result};

/// Row indices of one cross-validation split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split `y` into `k` folds that preserve class proportions.
///
/// Deterministic: sorted labels are dealt round-robin to fix how many
/// members of each class land in each fold, then each class's samples are
/// assigned to folds in their original order. Indices inside a fold are
/// ascending.
pub fn stratified_k_fold(y: ArrayView1<usize>, k: usize) -> Result<Vec<Fold>> {
    let n = y.len();
    if k < 2 {
        return Err(ClassifierError::InvalidConfig(format!(
            "cross-validation needs at least 2 folds, got {}",
            k
        )));
    }
    if k > n {
        return Err(ClassifierError::InvalidConfig(format!(
            "cannot split {} samples into {} folds",
            n, k
        )));
    }

    // Classes coded by order of first appearance.
    let mut codes: HashMap<usize, usize> = HashMap::new();
    let encoded = y
        .iter()
        .map(|label| {
            let next = codes.len();
            *codes.entry(*label).or_insert(next)
        })
        .collect::<Vec<_>>();
    let n_classes = codes.len();

    let mut class_sizes = vec![0usize; n_classes];
    for &c in &encoded {
        class_sizes[c] += 1;
    }
    let largest = class_sizes.iter().copied().max().unwrap_or(0);
    if largest < k {
        return Err(ClassifierError::InvalidConfig(format!(
            "k={} folds exceeds the number of members in every class (largest has {})",
            k, largest
        )));
    }
    let smallest = class_sizes.iter().copied().min().unwrap_or(0);
    if smallest < k {
        log::warn!(
            "least populated class has only {} members, fewer than k={} folds",
            smallest,
            k
        );
    }

    let mut sorted = encoded.clone();
    sorted.sort_unstable();
    let mut allocation = vec![vec![0usize; n_classes]; k];
    for (pos, &c) in sorted.iter().enumerate() {
        allocation[pos % k][c] += 1;
    }

    let mut test_fold = vec![0usize; n];
    for c in 0..n_classes {
        let mut folds_for_class = (0..k).flat_map(|f| std::iter::repeat(f).take(allocation[f][c]));
        for (row, _) in encoded.iter().enumerate().filter(|&(_, &code)| code == c) {
            // allocation[_][c] sums to the class size
            test_fold[row] = folds_for_class.next().unwrap_or(k - 1);
        }
    }

    let folds = (0..k)
        .map(|f| {
            let (test, train): (Vec<usize>, Vec<usize>) = (0..n).partition(|&row| test_fold[row] == f);
            Fold { train, test }
        })
        .collect();
    Ok(folds)
}
