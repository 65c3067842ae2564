//! Integration tests for batch materialization and pooling.

use ndarray::{Array1, Array2};
use proptest::prelude::*;

use tunekit_classifiers::data_handling::{materialize, Batch, BatchLoader, Dataset};
use tunekit_classifiers::ClassifierError;

/// Batches of the given sizes whose cells encode the global row index.
fn numbered_batches(sizes: &[usize], ncols: usize) -> Vec<Batch> {
    let mut next_row = 0usize;
    sizes
        .iter()
        .map(|&n| {
            let start = next_row;
            next_row += n;
            let x = Array2::from_shape_fn((n, ncols), |(r, c)| ((start + r) * 10 + c) as f64);
            let y = Array1::from_shape_fn(n, |r| start + r);
            Batch::new(x, y).unwrap()
        })
        .collect()
}

proptest! {
    #[test]
    fn materialize_concatenates_in_order(
        sizes in prop::collection::vec(1usize..8, 1..6),
        ncols in 1usize..5,
    ) {
        let total: usize = sizes.iter().sum();
        let ds = materialize(numbered_batches(&sizes, ncols)).unwrap();

        prop_assert_eq!(ds.nrows(), total);
        prop_assert_eq!(ds.y.len(), total);
        prop_assert_eq!(ds.ncols(), ncols);
        for row in 0..total {
            prop_assert_eq!(ds.y[row], row);
            prop_assert_eq!(ds.x[(row, 0)], (row * 10) as f64);
        }
    }
}

#[test]
fn materialize_empty_sequence_fails() {
    let err = materialize(Vec::<Batch>::new()).unwrap_err();
    assert!(matches!(err, ClassifierError::EmptyDataset(_)));
}

#[test]
fn materialize_column_mismatch_fails() {
    let mut batches = numbered_batches(&[3, 2], 2);
    batches.push(numbered_batches(&[2], 3).remove(0));
    let err = materialize(batches).unwrap_err();
    match err {
        ClassifierError::ShapeMismatch {
            expected,
            found,
            context,
        } => {
            assert_eq!(expected, 2);
            assert_eq!(found, 3);
            assert!(context.contains("batch 2"));
        }
        other => panic!("expected ShapeMismatch, got {:?}", other),
    }
}

#[test]
fn materialize_consumes_lazy_iterator() {
    let batches = (0..4).map(|i| {
        Batch::new(
            Array2::from_elem((2, 1), i as f64),
            Array1::from_elem(2, i),
        )
        .unwrap()
    });
    let ds = materialize(batches).unwrap();
    assert_eq!(ds.y.to_vec(), vec![0, 0, 1, 1, 2, 2, 3, 3]);
}

#[test]
fn pool_stacks_validation_below_train() {
    let a = materialize(numbered_batches(&[3], 2)).unwrap();
    let b = Dataset::new(Array2::from_elem((2, 2), -1.0), Array1::from_elem(2, 99)).unwrap();
    let pooled = a.pool(b).unwrap();
    assert_eq!(pooled.nrows(), 5);
    assert_eq!(pooled.y.to_vec(), vec![0, 1, 2, 99, 99]);
}

#[test]
fn loader_rejects_zero_batch_size() {
    let ds = Dataset::new(Array2::zeros((2, 1)), Array1::zeros(2)).unwrap();
    assert!(matches!(
        BatchLoader::new(ds, 0),
        Err(ClassifierError::InvalidConfig(_))
    ));
}
