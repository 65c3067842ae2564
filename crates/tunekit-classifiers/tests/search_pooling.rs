//! The search sees training and validation rows together and refits the
//! winner on all of them.

use std::sync::{Arc, Mutex};

use ndarray::{Array1, ArrayView1, ArrayView2};

use tunekit_classifiers::data_handling::{Batch, Dataset};
use tunekit_classifiers::models::Lifecycle;
use tunekit_classifiers::search::{
    Estimator, ParamGrid, ParamValue, ParameterSet, Predict, SearchCv, SearchStrategy,
};
use tunekit_classifiers::ClassifierError;

/// Predicts a constant label and records the row count of every fit.
struct MajorityEstimator {
    fitted_rows: Arc<Mutex<Vec<usize>>>,
}

struct Constant(usize);

impl Predict for Constant {
    fn predict(&self, x: ArrayView2<f64>) -> tunekit_classifiers::Result<Array1<usize>> {
        Ok(Array1::from_elem(x.nrows(), self.0))
    }
}

impl Estimator for MajorityEstimator {
    type Fitted = Constant;

    fn name(&self) -> &str {
        "majority"
    }

    fn fit(
        &self,
        params: &ParameterSet,
        x: ArrayView2<f64>,
        y: ArrayView1<usize>,
    ) -> tunekit_classifiers::Result<Constant> {
        self.fitted_rows.lock().unwrap().push(x.nrows());
        let label = params.get_usize("label")?;
        if !y.iter().any(|&l| l == label) {
            return Err(ClassifierError::SearchFailure(format!("label {} unseen", label)));
        }
        Ok(Constant(label))
    }
}

fn batch(rows: usize, label: usize) -> Batch {
    Batch::new(
        ndarray::Array2::from_elem((rows, 2), label as f64),
        Array1::from_elem(rows, label),
    )
    .unwrap()
}

#[test]
fn search_refits_on_pooled_rows() {
    let fitted_rows = Arc::new(Mutex::new(Vec::new()));
    let mut grid = ParamGrid::new();
    grid.insert(
        "label".to_string(),
        vec![ParamValue::Int(1), ParamValue::Int(2)],
    );
    let search = SearchCv::new(
        MajorityEstimator {
            fitted_rows: Arc::clone(&fitted_rows),
        },
        SearchStrategy::Grid(grid),
    )
    .folds(2);

    let mut lifecycle = Lifecycle::default();
    lifecycle.initialize(search).unwrap();

    // train: 6 rows of class 2 and 2 of class 1; validate: 2 rows of class 1
    let train = vec![batch(4, 2), batch(2, 1), batch(2, 2)];
    let validate = vec![batch(2, 1)];
    lifecycle.train(train, validate).unwrap();

    let result = lifecycle.result().unwrap();
    assert_eq!(result.n_samples, 10);
    assert_eq!(result.n_folds, 2);
    // class 2 is the majority of the pooled data
    assert_eq!(result.best_params.get_usize("label").unwrap(), 2);

    let rows = fitted_rows.lock().unwrap();
    // two candidates times two folds, then one refit on everything
    assert_eq!(rows.len(), 5);
    assert_eq!(rows.last(), Some(&10));
    assert!(rows[..4].iter().all(|&n| n == 5));
}

#[test]
fn pooled_dataset_keeps_train_rows_first() {
    let train = Dataset::new(ndarray::Array2::zeros((3, 2)), Array1::from_elem(3, 0)).unwrap();
    let validate =
        Dataset::new(ndarray::Array2::ones((2, 2)), Array1::from_elem(2, 1)).unwrap();
    let pooled = train.pool(validate).unwrap();
    assert_eq!(pooled.y.to_vec(), vec![0, 0, 0, 1, 1]);
    assert_eq!(pooled.x.row(4).to_vec(), vec![1.0, 1.0]);
}
