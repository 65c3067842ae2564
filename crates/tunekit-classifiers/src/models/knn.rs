use std::collections::BTreeMap;
use std::str::FromStr;

use linfa_nn::distance::{Distance, L1Dist, L2Dist};
use linfa_nn::{CommonNearestNeighbour, NearestNeighbour};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::config::KNNConfig;
use crate::data_handling::Batch;
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::{Lifecycle, TrainableClassifier};
use crate::search::{Estimator, ParameterSet, Predict, SearchCv, SearchResult, SearchStrategy};

/// How neighbour votes are weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weights {
    Uniform,
    /// Inverse distance; exact matches take the whole vote.
    Distance,
}

impl FromStr for Weights {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "uniform" => Ok(Weights::Uniform),
            "distance" => Ok(Weights::Distance),
            _ => Err(ClassifierError::param(
                "weights",
                format!("unknown weighting '{}'. Valid options are: uniform, distance", s),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Euclidean,
    Manhattan,
}

impl Metric {
    fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self {
            Metric::Euclidean => L2Dist.distance(a, b),
            Metric::Manhattan => L1Dist.distance(a, b),
        }
    }
}

impl FromStr for Metric {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "euclidean" | "l2" => Ok(Metric::Euclidean),
            "manhattan" | "l1" => Ok(Metric::Manhattan),
            _ => Err(ClassifierError::param(
                "metric",
                format!("unknown metric '{}'. Valid options are: euclidean, manhattan", s),
            )),
        }
    }
}

/// Concrete k-NN hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KNNParams {
    pub n_neighbors: usize,
    pub weights: Weights,
    pub metric: Metric,
}

impl TryFrom<&ParameterSet> for KNNParams {
    type Error = ClassifierError;

    fn try_from(params: &ParameterSet) -> Result<Self> {
        Ok(KNNParams {
            n_neighbors: params.get_usize("n_neighbors")?,
            weights: params.get_str("weights")?.parse()?,
            metric: params.get_str("metric")?.parse()?,
        })
    }
}

/// k-nearest-neighbour estimator backed by a `linfa-nn` k-d tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct KNNEstimator;

impl Estimator for KNNEstimator {
    type Fitted = KNNModel;

    fn name(&self) -> &str {
        "knn"
    }

    fn fit(&self, params: &ParameterSet, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<KNNModel> {
        let params = KNNParams::try_from(params)?;
        KNNModel::fit(params, x, y)
    }
}

/// A fitted k-NN model: the stored training samples plus its parameters.
#[derive(Debug, Clone)]
pub struct KNNModel {
    params: KNNParams,
    records: Array2<f64>,
    targets: Array1<usize>,
}

impl KNNModel {
    pub fn fit(params: KNNParams, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(ClassifierError::shape(x.nrows(), y.len(), "knn target count"));
        }
        if x.nrows() == 0 {
            return Err(ClassifierError::EmptyDataset(
                "knn needs at least one training sample".to_string(),
            ));
        }
        if params.n_neighbors == 0 || params.n_neighbors > x.nrows() {
            return Err(ClassifierError::param(
                "n_neighbors",
                format!(
                    "expected 1 <= n_neighbors <= n_samples, got n_neighbors={} with n_samples={}",
                    params.n_neighbors,
                    x.nrows()
                ),
            ));
        }
        Ok(KNNModel {
            params,
            records: x.to_owned(),
            targets: y.to_owned(),
        })
    }

    pub fn params(&self) -> &KNNParams {
        &self.params
    }

    fn vote(&self, query: ArrayView1<f64>, neighbours: &[(ArrayView1<f64>, usize)]) -> usize {
        let mut votes: BTreeMap<usize, f64> = BTreeMap::new();
        match self.params.weights {
            Weights::Uniform => {
                for (_, idx) in neighbours {
                    *votes.entry(self.targets[*idx]).or_insert(0.0) += 1.0;
                }
            }
            Weights::Distance => {
                let distances = neighbours
                    .iter()
                    .map(|(point, _)| self.params.metric.distance(query, point.view()))
                    .collect::<Vec<_>>();
                let exact = distances.iter().any(|&d| d == 0.0);
                for ((_, idx), d) in neighbours.iter().zip(distances) {
                    let weight = match (exact, d == 0.0) {
                        (true, true) => 1.0,
                        (true, false) => 0.0,
                        _ => 1.0 / d,
                    };
                    *votes.entry(self.targets[*idx]).or_insert(0.0) += weight;
                }
            }
        }

        // BTreeMap iterates labels ascending, so ties go to the smallest label
        let mut best = (self.targets[neighbours[0].1], f64::NEG_INFINITY);
        for (label, weight) in votes {
            if weight > best.1 {
                best = (label, weight);
            }
        }
        best.0
    }
}

impl Predict for KNNModel {
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>> {
        if x.ncols() != self.records.ncols() {
            return Err(ClassifierError::shape(
                self.records.ncols(),
                x.ncols(),
                "knn query feature columns",
            ));
        }
        let index = match self.params.metric {
            Metric::Euclidean => CommonNearestNeighbour::KdTree.from_batch(&self.records, L2Dist),
            Metric::Manhattan => CommonNearestNeighbour::KdTree.from_batch(&self.records, L1Dist),
        }
        .map_err(|e| ClassifierError::SearchFailure(format!("failed to build neighbour index: {}", e)))?;

        let mut labels = Vec::with_capacity(x.nrows());
        for row in x.rows() {
            let neighbours = index
                .k_nearest(row, self.params.n_neighbors)
                .map_err(|e| ClassifierError::SearchFailure(format!("neighbour query failed: {}", e)))?;
            if neighbours.is_empty() {
                return Err(ClassifierError::SearchFailure(
                    "neighbour query returned no points".to_string(),
                ));
            }
            labels.push(self.vote(row, &neighbours));
        }
        Ok(Array1::from_vec(labels))
    }
}

/// k-NN classifier tuned by exhaustive grid search.
pub struct KNNClassifier {
    config: KNNConfig,
    lifecycle: Lifecycle<KNNEstimator>,
}

impl KNNClassifier {
    pub fn new(config: KNNConfig) -> Self {
        KNNClassifier {
            config,
            lifecycle: Lifecycle::Uninitialized,
        }
    }

    pub fn config(&self) -> &KNNConfig {
        &self.config
    }
}

impl Default for KNNClassifier {
    fn default() -> Self {
        KNNClassifier::new(KNNConfig::default())
    }
}

impl TrainableClassifier for KNNClassifier {
    type Model = KNNModel;

    fn init(&mut self) -> Result<()> {
        let search = SearchCv::new(
            KNNEstimator,
            SearchStrategy::Grid(self.config.param_grid.clone()),
        )
        .folds(self.config.search.cv)
        .scoring(self.config.search.scoring)
        .n_jobs(self.config.search.n_jobs);
        self.lifecycle.initialize(search)
    }

    fn train<T, V>(&mut self, train: T, validate: V) -> Result<()>
    where
        T: IntoIterator<Item = Batch>,
        V: IntoIterator<Item = Batch>,
    {
        self.lifecycle.train(train, validate)
    }

    fn eval<I>(&self, test: I) -> Result<f64>
    where
        I: IntoIterator<Item = Batch>,
    {
        self.lifecycle.eval(test)
    }

    fn search_result(&self) -> Option<&SearchResult<KNNModel>> {
        self.lifecycle.result()
    }
}
