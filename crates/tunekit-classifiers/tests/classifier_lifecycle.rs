//! End-to-end tests of the init / train / eval lifecycle on synthetic blobs.

use tunekit_classifiers::config::{KNNConfig, SVMConfig};
use tunekit_classifiers::data_handling::{Batch, BatchLoader, Dataset};
use tunekit_classifiers::models::{KNNClassifier, SVMClassifier, TrainableClassifier};
use tunekit_classifiers::synthetic::make_blobs;
use tunekit_classifiers::ClassifierError;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn centers() -> Vec<Vec<f64>> {
    vec![vec![-2.0, -2.0], vec![2.0, 2.0]]
}

/// 40 + 10 points per cluster for train and validate, 25 per cluster for test.
fn splits() -> (Dataset, Dataset, Dataset) {
    let train = make_blobs(&centers(), 40, 0.4, 1).unwrap();
    let validate = make_blobs(&centers(), 10, 0.4, 2).unwrap();
    let test = make_blobs(&centers(), 25, 0.4, 3).unwrap();
    (train, validate, test)
}

fn batches(dataset: Dataset, batch_size: usize) -> BatchLoader {
    BatchLoader::new(dataset, batch_size).unwrap()
}

// ---------------------------------------------------------------------------
// Ordering errors
// ---------------------------------------------------------------------------

#[test]
fn eval_before_train_is_not_trained() {
    let (_, _, test) = splits();

    let knn = KNNClassifier::default();
    let err = knn.eval(batches(test.clone(), 16)).unwrap_err();
    assert!(matches!(err, ClassifierError::NotTrained));

    let mut svm = SVMClassifier::default();
    svm.init().unwrap();
    let err = svm.eval(batches(test, 16)).unwrap_err();
    assert!(matches!(err, ClassifierError::NotTrained));
}

#[test]
fn train_before_init_is_not_initialized() {
    let (train, validate, _) = splits();
    let mut knn = KNNClassifier::default();
    let err = knn
        .train(batches(train, 16), batches(validate, 16))
        .unwrap_err();
    assert!(matches!(err, ClassifierError::NotInitialized));
    assert!(!knn.is_trained());
}

#[test]
fn predict_before_train_is_not_trained() {
    let (_, _, test) = splits();
    let svm = SVMClassifier::default();
    assert!(matches!(
        svm.predict(test.x.view()),
        Err(ClassifierError::NotTrained)
    ));
}

// ---------------------------------------------------------------------------
// Training and evaluation
// ---------------------------------------------------------------------------

#[test]
fn knn_separates_blobs() {
    init_logger();
    let (train, validate, test) = splits();
    let n_pooled = train.nrows() + validate.nrows();

    let mut knn = KNNClassifier::new(KNNConfig::default());
    knn.init().unwrap();
    knn.train(batches(train, 16).shuffled(7), batches(validate, 8))
        .unwrap();

    let result = knn.search_result().unwrap();
    assert_eq!(result.n_samples, n_pooled);
    assert_eq!(result.n_features, 2);
    assert_eq!(result.candidates.len(), 16);
    assert!(result.best_score >= 0.9);

    let accuracy = knn.eval(batches(test, 10)).unwrap();
    assert!(accuracy >= 0.9, "knn accuracy {}", accuracy);
}

#[test]
fn svm_separates_blobs() {
    init_logger();
    let (train, validate, test) = splits();

    let mut svm = SVMClassifier::new(SVMConfig::default());
    svm.init().unwrap();
    svm.train(batches(train, 20), batches(validate, 20)).unwrap();

    let result = svm.search_result().unwrap();
    assert_eq!(result.n_samples, 100);
    assert_eq!(result.candidates.len(), 10);
    assert_eq!(result.strategy, "randomized");

    let accuracy = svm.eval(batches(test, 10)).unwrap();
    assert!(accuracy >= 0.9, "svm accuracy {}", accuracy);
}

#[test]
fn svm_search_is_seeded() {
    let (train, validate, _) = splits();

    let run = || {
        let mut svm = SVMClassifier::default();
        svm.init().unwrap();
        svm.train(batches(train.clone(), 25), batches(validate.clone(), 25))
            .unwrap();
        let result = svm.search_result().unwrap();
        let sampled = result
            .candidates
            .iter()
            .map(|c| c.params.clone())
            .collect::<Vec<_>>();
        (result.best_params.clone(), sampled)
    };

    let (best_a, sampled_a) = run();
    let (best_b, sampled_b) = run();
    assert_eq!(sampled_a, sampled_b);
    assert_eq!(best_a, best_b);
}

#[test]
fn eval_rejects_wrong_feature_count() {
    let (train, validate, _) = splits();
    let mut knn = KNNClassifier::default();
    knn.init().unwrap();
    knn.train(batches(train, 32), batches(validate, 32)).unwrap();

    let narrow = make_blobs(&[vec![0.0], vec![3.0]], 5, 0.1, 9).unwrap();
    let err = knn.eval(batches(narrow, 4)).unwrap_err();
    assert!(matches!(
        err,
        ClassifierError::ShapeMismatch {
            expected: 2,
            found: 1,
            ..
        }
    ));
    // a failed eval does not disturb the trained model
    assert!(knn.is_trained());
}

#[test]
fn failed_train_keeps_classifier_initialized() {
    let (train, _, _) = splits();
    let mut knn = KNNClassifier::default();
    knn.init().unwrap();

    let wide = Batch::new(ndarray::Array2::zeros((4, 3)), ndarray::Array1::zeros(4)).unwrap();
    let err = knn.train(batches(train.clone(), 16), vec![wide]).unwrap_err();
    assert!(matches!(err, ClassifierError::ShapeMismatch { .. }));
    assert!(!knn.is_trained());

    // still initialized: a good second attempt succeeds without init()
    let validate = make_blobs(&centers(), 10, 0.4, 5).unwrap();
    knn.train(batches(train, 16), batches(validate, 16)).unwrap();
    assert!(knn.is_trained());
}

#[test]
fn empty_validation_source_is_rejected() {
    let (train, _, _) = splits();
    let mut svm = SVMClassifier::default();
    svm.init().unwrap();
    let err = svm
        .train(batches(train, 16), Vec::<Batch>::new())
        .unwrap_err();
    assert!(matches!(err, ClassifierError::EmptyDataset(_)));
}
