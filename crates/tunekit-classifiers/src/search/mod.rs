//! Cross-validated hyperparameter search.
//!
//! `SearchCv` enumerates (grid) or samples (randomized) candidate
//! configurations, scores each with stratified k-fold cross-validation, and
//! refits the best one on the full dataset. The estimator itself is reached
//! only through the `Estimator` and `Predict` traits.
pub mod cv;
pub mod params;

use std::time::Instant;

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use statrs::statistics::Statistics;

use crate::data_handling::Dataset;
use crate::error::{ClassifierError, Result};
use crate::metrics::Scoring;

pub use cv::{stratified_k_fold, Fold};
pub use params::{
    grid_candidates, sample_candidates, ParamDistributions, ParamGrid, ParamSpec, ParamValue,
    ParameterSet,
};

/// A fitted model able to label new samples.
pub trait Predict {
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>>;
}

/// A learning algorithm that can be fit under a given configuration.
pub trait Estimator: Sync {
    type Fitted: Predict + Send;

    /// Human readable name used in logs and reports.
    fn name(&self) -> &str;

    fn fit(&self, params: &ParameterSet, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<Self::Fitted>;
}

/// How candidate configurations are produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchStrategy {
    /// Every combination of the grid.
    Grid(ParamGrid),
    /// `n_iter` draws from the distributions, seeded by `seed`.
    Randomized {
        distributions: ParamDistributions,
        n_iter: usize,
        seed: u64,
    },
}

impl SearchStrategy {
    pub fn candidates(&self) -> Result<Vec<ParameterSet>> {
        match self {
            SearchStrategy::Grid(grid) => grid_candidates(grid),
            SearchStrategy::Randomized {
                distributions,
                n_iter,
                seed,
            } => sample_candidates(distributions, *n_iter, *seed),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SearchStrategy::Grid(_) => "grid",
            SearchStrategy::Randomized { .. } => "randomized",
        }
    }
}

/// Cross-validation score summary for one candidate.
#[derive(Debug, Clone)]
pub struct CandidateScore {
    pub params: ParameterSet,
    /// Per-fold scores; empty when the candidate failed to fit.
    pub fold_scores: Vec<f64>,
    /// Mean fold score, `NaN` when the candidate failed.
    pub mean_score: f64,
    pub std_score: f64,
    /// 1 is best. Failed candidates rank last.
    pub rank: usize,
    pub fit_seconds: f64,
    pub error: Option<String>,
}

/// Outcome of a search: the selected configuration and its refit model.
#[derive(Debug)]
pub struct SearchResult<M> {
    pub estimator_name: String,
    pub strategy: &'static str,
    pub scoring: Scoring,
    pub best_index: usize,
    pub best_params: ParameterSet,
    pub best_score: f64,
    pub best_model: M,
    pub candidates: Vec<CandidateScore>,
    pub n_samples: usize,
    pub n_features: usize,
    pub n_folds: usize,
}

/// A configured hyperparameter search over one estimator.
#[derive(Debug, Clone)]
pub struct SearchCv<E> {
    estimator: E,
    strategy: SearchStrategy,
    folds: usize,
    scoring: Scoring,
    n_jobs: usize,
}

impl<E: Estimator> SearchCv<E> {
    pub fn new(estimator: E, strategy: SearchStrategy) -> Self {
        SearchCv {
            estimator,
            strategy,
            folds: 5,
            scoring: Scoring::Accuracy,
            n_jobs: 1,
        }
    }

    pub fn folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    /// Evaluate up to `n_jobs` candidates concurrently.
    pub fn n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn strategy(&self) -> &SearchStrategy {
        &self.strategy
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    pub fn validate(&self) -> Result<()> {
        if self.folds < 2 {
            return Err(ClassifierError::InvalidConfig(format!(
                "cv must be at least 2, got {}",
                self.folds
            )));
        }
        if self.n_jobs == 0 {
            return Err(ClassifierError::InvalidConfig(
                "n_jobs must be at least 1".to_string(),
            ));
        }
        self.strategy.candidates().map(|_| ())
    }

    /// Score every candidate with cross-validation, then refit the best one
    /// on all of `dataset`.
    pub fn fit(&self, dataset: &Dataset) -> Result<SearchResult<E::Fitted>> {
        if dataset.is_empty() {
            return Err(ClassifierError::EmptyDataset(
                "search received zero samples".to_string(),
            ));
        }
        let candidates = self.strategy.candidates()?;
        let folds = stratified_k_fold(dataset.y.view(), self.folds)?;

        log::info!(
            "[{}] {} search: fitting {} folds for each of {} candidates, totalling {} fits",
            self.estimator.name(),
            self.strategy.kind(),
            folds.len(),
            candidates.len(),
            folds.len() * candidates.len()
        );

        let mut scores = if self.n_jobs > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.n_jobs)
                .build()
                .map_err(|e| ClassifierError::InvalidConfig(e.to_string()))?;
            pool.install(|| {
                candidates
                    .par_iter()
                    .map(|params| self.score_candidate(params, dataset, &folds))
                    .collect::<Vec<_>>()
            })
        } else {
            candidates
                .iter()
                .map(|params| self.score_candidate(params, dataset, &folds))
                .collect::<Vec<_>>()
        };

        let best_index = select_best(&scores).ok_or_else(|| {
            let reasons = scores
                .iter()
                .filter_map(|s| s.error.as_deref())
                .take(3)
                .collect::<Vec<_>>()
                .join("; ");
            ClassifierError::SearchFailure(format!(
                "all {} candidate configurations failed to fit ({})",
                scores.len(),
                reasons
            ))
        })?;
        assign_ranks(&mut scores);

        let best_params = scores[best_index].params.clone();
        let best_score = scores[best_index].mean_score;
        log::info!(
            "[{}] best configuration: {} (mean {} {:.4})",
            self.estimator.name(),
            best_params,
            self.scoring.name(),
            best_score
        );

        let best_model = self
            .estimator
            .fit(&best_params, dataset.x.view(), dataset.y.view())
            .map_err(|e| {
                ClassifierError::SearchFailure(format!(
                    "refit of best configuration ({}) failed: {}",
                    best_params, e
                ))
            })?;

        Ok(SearchResult {
            estimator_name: self.estimator.name().to_string(),
            strategy: self.strategy.kind(),
            scoring: self.scoring,
            best_index,
            best_params,
            best_score,
            best_model,
            candidates: scores,
            n_samples: dataset.nrows(),
            n_features: dataset.ncols(),
            n_folds: folds.len(),
        })
    }

    fn score_candidate(&self, params: &ParameterSet, dataset: &Dataset, folds: &[Fold]) -> CandidateScore {
        let start = Instant::now();
        let mut fold_scores = Vec::with_capacity(folds.len());
        let mut error = None;

        for (i, fold) in folds.iter().enumerate() {
            match self.score_fold(params, dataset, fold) {
                Ok(score) => {
                    log::debug!(
                        "[CV {}/{}] {}; {}={:.3}",
                        i + 1,
                        folds.len(),
                        params,
                        self.scoring.name(),
                        score
                    );
                    fold_scores.push(score);
                }
                Err(e) => {
                    log::warn!("[CV {}/{}] {} failed: {}", i + 1, folds.len(), params, e);
                    error = Some(e.to_string());
                    break;
                }
            }
        }

        let (fold_scores, mean_score, std_score) = if error.is_some() {
            (Vec::new(), f64::NAN, f64::NAN)
        } else {
            let mean = fold_scores.iter().mean();
            let std = fold_scores.iter().population_std_dev();
            (fold_scores, mean, std)
        };

        CandidateScore {
            params: params.clone(),
            fold_scores,
            mean_score,
            std_score,
            rank: 0,
            fit_seconds: start.elapsed().as_secs_f64(),
            error,
        }
    }

    fn score_fold(&self, params: &ParameterSet, dataset: &Dataset, fold: &Fold) -> Result<f64> {
        let x_train = dataset.x.select(Axis(0), &fold.train);
        let y_train = dataset.y.select(Axis(0), &fold.train);
        let x_test = dataset.x.select(Axis(0), &fold.test);
        let y_test = dataset.y.select(Axis(0), &fold.test);

        let model = self.estimator.fit(params, x_train.view(), y_train.view())?;
        let predicted = model.predict(x_test.view())?;
        self.scoring.score(y_test.view(), predicted.view())
    }
}

/// Index of the highest mean score; the earliest candidate wins ties.
fn select_best(scores: &[CandidateScore]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, s) in scores.iter().enumerate() {
        if s.mean_score.is_nan() {
            continue;
        }
        match best {
            Some(b) if scores[b].mean_score >= s.mean_score => {}
            _ => best = Some(i),
        }
    }
    best
}

fn assign_ranks(scores: &mut [CandidateScore]) {
    let mut order = (0..scores.len()).collect::<Vec<_>>();
    // stable sort keeps enumeration order among equal scores
    order.sort_by(|&a, &b| {
        let (sa, sb) = (scores[a].mean_score, scores[b].mean_score);
        match (sa.is_nan(), sb.is_nan()) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            (false, false) => sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal),
        }
    });
    for (rank, idx) in order.into_iter().enumerate() {
        scores[idx].rank = rank + 1;
    }
}
