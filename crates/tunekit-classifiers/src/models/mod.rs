pub mod classifier_trait;
pub mod knn;
pub mod svm;

pub use classifier_trait::{Lifecycle, TrainableClassifier};
pub use knn::{KNNClassifier, KNNEstimator, KNNModel, KNNParams};
pub use svm::{SVMClassifier, SVMEstimator, SVMModel, SVMParams};
