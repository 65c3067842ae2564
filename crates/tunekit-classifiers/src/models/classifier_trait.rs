use ndarray::{Array1, ArrayView2};

use crate::data_handling::{materialize, Batch, Dataset};
use crate::error::{ClassifierError, Result};
use crate::metrics::accuracy_score;
use crate::search::{Estimator, Predict, SearchCv, SearchResult};

/// Lifecycle contract shared by the KNN and SVM classifiers:
/// `init` builds the search, `train` fits it, `eval` scores a test set.
pub trait TrainableClassifier {
    /// Model selected by the search.
    type Model: Predict;

    /// Build the hyperparameter search from the classifier's configuration.
    /// Calling it again discards any previous training result.
    fn init(&mut self) -> Result<()>;

    /// Pool the training and validation batches and run the search over them.
    ///
    /// Validation rows are not held out: the search cross-validates
    /// internally, so both sources are fit together.
    fn train<T, V>(&mut self, train: T, validate: V) -> Result<()>
    where
        T: IntoIterator<Item = Batch>,
        V: IntoIterator<Item = Batch>;

    /// Accuracy of the selected model on the test batches.
    fn eval<I>(&self, test: I) -> Result<f64>
    where
        I: IntoIterator<Item = Batch>;

    /// Search outcome, available once trained.
    fn search_result(&self) -> Option<&SearchResult<Self::Model>>;

    fn is_trained(&self) -> bool {
        self.search_result().is_some()
    }

    /// Labels predicted by the selected model.
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>> {
        self.search_result()
            .ok_or(ClassifierError::NotTrained)?
            .best_model
            .predict(x)
    }
}

/// State machine behind `TrainableClassifier`, generic over the estimator.
pub enum Lifecycle<E: Estimator> {
    Uninitialized,
    Initialized(SearchCv<E>),
    Trained {
        search: SearchCv<E>,
        result: SearchResult<E::Fitted>,
    },
}

impl<E: Estimator> Default for Lifecycle<E> {
    fn default() -> Self {
        Lifecycle::Uninitialized
    }
}

impl<E: Estimator> Lifecycle<E> {
    pub fn initialize(&mut self, search: SearchCv<E>) -> Result<()> {
        search.validate()?;
        *self = Lifecycle::Initialized(search);
        Ok(())
    }

    pub fn train<T, V>(&mut self, train: T, validate: V) -> Result<()>
    where
        T: IntoIterator<Item = Batch>,
        V: IntoIterator<Item = Batch>,
    {
        let search = match std::mem::take(self) {
            Lifecycle::Uninitialized => return Err(ClassifierError::NotInitialized),
            Lifecycle::Initialized(search) => search,
            Lifecycle::Trained { search, .. } => search,
        };
        // Any failure below leaves the classifier initialized but untrained.
        let pooled = match pool_sources(train, validate) {
            Ok(dataset) => dataset,
            Err(e) => {
                *self = Lifecycle::Initialized(search);
                return Err(e);
            }
        };
        match search.fit(&pooled) {
            Ok(result) => {
                *self = Lifecycle::Trained { search, result };
                Ok(())
            }
            Err(e) => {
                *self = Lifecycle::Initialized(search);
                Err(e)
            }
        }
    }

    pub fn eval<I>(&self, test: I) -> Result<f64>
    where
        I: IntoIterator<Item = Batch>,
    {
        let result = self.result().ok_or(ClassifierError::NotTrained)?;
        let test = materialize(test)?;
        if test.ncols() != result.n_features {
            return Err(ClassifierError::shape(
                result.n_features,
                test.ncols(),
                "test feature columns",
            ));
        }
        let predicted = result.best_model.predict(test.x.view())?;
        let accuracy = accuracy_score(test.y.view(), predicted.view())?;
        log::info!(
            "[{}] Test accuracy with best model: {:.4} ({} samples)",
            result.estimator_name,
            accuracy,
            test.nrows()
        );
        Ok(accuracy)
    }

    pub fn result(&self) -> Option<&SearchResult<E::Fitted>> {
        match self {
            Lifecycle::Trained { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn search(&self) -> Option<&SearchCv<E>> {
        match self {
            Lifecycle::Uninitialized => None,
            Lifecycle::Initialized(search) => Some(search),
            Lifecycle::Trained { search, .. } => Some(search),
        }
    }
}

/// Materialize both sources and stack validation rows below training rows.
fn pool_sources<T, V>(train: T, validate: V) -> Result<Dataset>
where
    T: IntoIterator<Item = Batch>,
    V: IntoIterator<Item = Batch>,
{
    let train = materialize(train)?;
    let validate = materialize(validate)?;
    train.log_summary("train");
    validate.log_summary("validate");
    train.pool(validate)
}
