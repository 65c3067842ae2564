use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::metrics::Scoring;
use crate::search::{ParamDistributions, ParamGrid, ParamSpec, ParamValue};

/// Cross-validation settings shared by both classifiers.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    /// Number of stratified folds.
    pub cv: usize,
    pub scoring: Scoring,
    /// Worker threads used to evaluate candidates.
    pub n_jobs: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            cv: 5,
            scoring: Scoring::Accuracy,
            n_jobs: 1,
        }
    }
}

/// Exhaustive grid over neighbour count, vote weighting and distance metric.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct KNNConfig {
    pub param_grid: ParamGrid,
    pub search: SearchSettings,
}

impl Default for KNNConfig {
    fn default() -> Self {
        let mut param_grid = ParamGrid::new();
        param_grid.insert(
            "n_neighbors".to_string(),
            vec![3i64.into(), 5i64.into(), 7i64.into(), 9i64.into()],
        );
        param_grid.insert(
            "weights".to_string(),
            vec!["uniform".into(), "distance".into()],
        );
        param_grid.insert(
            "metric".to_string(),
            vec!["euclidean".into(), "manhattan".into()],
        );
        Self {
            param_grid,
            search: SearchSettings::default(),
        }
    }
}

/// Randomized search over regularization strength, kernel coefficient and
/// kernel type.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SVMConfig {
    pub param_distributions: ParamDistributions,
    /// Number of sampled configurations.
    pub n_iter: usize,
    /// Seed of the sampler; identical seeds yield identical candidates.
    pub random_state: u64,
    pub search: SearchSettings,
}

impl Default for SVMConfig {
    fn default() -> Self {
        let mut param_distributions = ParamDistributions::new();
        param_distributions.insert(
            "C".to_string(),
            ParamSpec::Uniform {
                loc: 0.1,
                scale: 100.0,
            },
        );
        param_distributions.insert(
            "gamma".to_string(),
            ParamSpec::Uniform {
                loc: 0.01,
                scale: 1.0,
            },
        );
        param_distributions.insert(
            "kernel".to_string(),
            ParamSpec::Values(vec![
                ParamValue::from("linear"),
                ParamValue::from("rbf"),
                ParamValue::from("poly"),
            ]),
        );
        Self {
            param_distributions,
            n_iter: 10,
            random_state: 42,
            search: SearchSettings::default(),
        }
    }
}

/// Supported classifiers and their search configuration.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ModelConfig {
    #[serde(rename = "knn")]
    KNN(KNNConfig),
    #[serde(rename = "svm")]
    SVM(SVMConfig),
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig::KNN(KNNConfig::default())
    }
}

impl ModelConfig {
    pub fn name(&self) -> &'static str {
        match self {
            ModelConfig::KNN(_) => "knn",
            ModelConfig::SVM(_) => "svm",
        }
    }

    pub fn search_settings_mut(&mut self) -> &mut SearchSettings {
        match self {
            ModelConfig::KNN(cfg) => &mut cfg.search,
            ModelConfig::SVM(cfg) => &mut cfg.search,
        }
    }
}

impl FromStr for ModelConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "knn" => Ok(ModelConfig::KNN(KNNConfig::default())),
            "svm" => Ok(ModelConfig::SVM(SVMConfig::default())),
            _ => Err(format!(
                "Unknown model type: {}. Valid options are: knn, svm",
                s
            )),
        }
    }
}
