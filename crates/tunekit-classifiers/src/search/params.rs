//! Hyperparameter spaces and candidate generation.
//!
//! Keys are kept in sorted order (`BTreeMap`), which fixes the enumeration
//! order of grids and the draw order of randomized sampling.
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::Uniform;

use crate::error::{ClassifierError, Result};

/// A single hyperparameter value.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

/// Enumerated candidates per hyperparameter name.
pub type ParamGrid = BTreeMap<String, Vec<ParamValue>>;

/// Sampling specification per hyperparameter name.
pub type ParamDistributions = BTreeMap<String, ParamSpec>;

/// How one hyperparameter is drawn during randomized search.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ParamSpec {
    /// Pick uniformly from a fixed list.
    Values(Vec<ParamValue>),
    /// Continuous uniform on `[loc, loc + scale]`.
    Uniform { loc: f64, scale: f64 },
}

impl ParamSpec {
    fn validate(&self, name: &str) -> Result<()> {
        match self {
            ParamSpec::Values(values) if values.is_empty() => {
                Err(ClassifierError::param(name, "candidate list is empty"))
            }
            ParamSpec::Uniform { loc, scale } if !(loc.is_finite() && scale.is_finite() && *scale > 0.0) => {
                Err(ClassifierError::param(
                    name,
                    format!("uniform(loc={}, scale={}) needs a finite positive scale", loc, scale),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// One concrete configuration handed to an estimator.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct ParameterSet(BTreeMap<String, ParamValue>);

impl ParameterSet {
    pub fn new() -> Self {
        ParameterSet(BTreeMap::new())
    }

    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, name: &str, value: ParamValue) {
        self.0.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    fn require(&self, name: &str) -> Result<&ParamValue> {
        self.0
            .get(name)
            .ok_or_else(|| ClassifierError::param(name, "missing from parameter set"))
    }

    pub fn get_usize(&self, name: &str) -> Result<usize> {
        match self.require(name)? {
            ParamValue::Int(v) if *v > 0 => Ok(*v as usize),
            other => Err(ClassifierError::param(
                name,
                format!("expected a positive integer, got {}", other),
            )),
        }
    }

    pub fn get_f64(&self, name: &str) -> Result<f64> {
        match self.require(name)? {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            other => Err(ClassifierError::param(
                name,
                format!("expected a number, got '{}'", other),
            )),
        }
    }

    pub fn get_str(&self, name: &str) -> Result<&str> {
        match self.require(name)? {
            ParamValue::Str(v) => Ok(v.as_str()),
            other => Err(ClassifierError::param(
                name,
                format!("expected a string, got {}", other),
            )),
        }
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in &self.0 {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
            first = false;
        }
        Ok(())
    }
}

/// Every combination of the grid. The last key (in sorted order) varies
/// fastest.
pub fn grid_candidates(grid: &ParamGrid) -> Result<Vec<ParameterSet>> {
    if grid.is_empty() {
        return Err(ClassifierError::InvalidConfig(
            "parameter grid is empty".to_string(),
        ));
    }
    for (name, values) in grid {
        if values.is_empty() {
            return Err(ClassifierError::param(name, "candidate list is empty"));
        }
    }

    let mut candidates = vec![ParameterSet::new()];
    for (name, values) in grid {
        let mut next = Vec::with_capacity(candidates.len() * values.len());
        for partial in &candidates {
            for value in values {
                let mut set = partial.clone();
                set.insert(name, value.clone());
                next.push(set);
            }
        }
        candidates = next;
    }
    Ok(candidates)
}

/// Draw `n_iter` configurations from `space` with a generator seeded by `seed`.
///
/// When every entry is a plain value list the draws are distinct points of
/// the corresponding grid, capped at its size.
pub fn sample_candidates(space: &ParamDistributions, n_iter: usize, seed: u64) -> Result<Vec<ParameterSet>> {
    if space.is_empty() {
        return Err(ClassifierError::InvalidConfig(
            "parameter distributions are empty".to_string(),
        ));
    }
    if n_iter == 0 {
        return Err(ClassifierError::InvalidConfig(
            "n_iter must be greater than zero".to_string(),
        ));
    }
    for (name, spec) in space {
        spec.validate(name)?;
    }

    let mut rng = StdRng::seed_from_u64(seed);

    let all_lists = space.values().all(|spec| matches!(spec, ParamSpec::Values(_)));
    if all_lists {
        let grid: ParamGrid = space
            .iter()
            .filter_map(|(name, spec)| match spec {
                ParamSpec::Values(values) => Some((name.clone(), values.clone())),
                ParamSpec::Uniform { .. } => None,
            })
            .collect();
        let full = grid_candidates(&grid)?;
        let n = if n_iter > full.len() {
            log::warn!(
                "n_iter={} exceeds the {} distinct grid points; sampling all of them",
                n_iter,
                full.len()
            );
            full.len()
        } else {
            n_iter
        };
        let picked = sample(&mut rng, full.len(), n).into_vec();
        return Ok(picked.into_iter().map(|i| full[i].clone()).collect());
    }

    let mut samplers = BTreeMap::new();
    for (name, spec) in space {
        if let ParamSpec::Uniform { loc, scale } = spec {
            let dist = Uniform::new(*loc, loc + scale)
                .map_err(|e| ClassifierError::param(name, e.to_string()))?;
            samplers.insert(name.clone(), dist);
        }
    }

    let mut candidates = Vec::with_capacity(n_iter);
    for _ in 0..n_iter {
        let mut set = ParameterSet::new();
        for (name, spec) in space {
            let value = match spec {
                ParamSpec::Values(values) => values[rng.gen_range(0..values.len())].clone(),
                ParamSpec::Uniform { .. } => ParamValue::Float(samplers[name].sample(&mut rng)),
            };
            set.insert(name, value);
        }
        candidates.push(set);
    }

    let distinct = candidates.iter().map(|c| c.to_string()).collect::<HashSet<_>>();
    if distinct.len() < candidates.len() {
        log::debug!(
            "{} of {} sampled configurations are duplicates",
            candidates.len() - distinct.len(),
            candidates.len()
        );
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knn_grid() -> ParamGrid {
        let mut grid = ParamGrid::new();
        grid.insert("n_neighbors".into(), vec![3i64.into(), 5i64.into()]);
        grid.insert("weights".into(), vec!["uniform".into(), "distance".into()]);
        grid.insert("metric".into(), vec!["euclidean".into()]);
        grid
    }

    #[test]
    fn test_grid_enumeration_order() {
        let candidates = grid_candidates(&knn_grid()).unwrap();
        let rendered = candidates.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        assert_eq!(
            rendered,
            vec![
                "metric=euclidean, n_neighbors=3, weights=uniform",
                "metric=euclidean, n_neighbors=3, weights=distance",
                "metric=euclidean, n_neighbors=5, weights=uniform",
                "metric=euclidean, n_neighbors=5, weights=distance",
            ]
        );
    }

    #[test]
    fn test_grid_rejects_empty_list() {
        let mut grid = knn_grid();
        grid.insert("p".into(), vec![]);
        assert!(matches!(
            grid_candidates(&grid),
            Err(ClassifierError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_sampling_is_seeded() {
        let mut space = ParamDistributions::new();
        space.insert("C".into(), ParamSpec::Uniform { loc: 0.1, scale: 100.0 });
        space.insert(
            "kernel".into(),
            ParamSpec::Values(vec!["linear".into(), "rbf".into()]),
        );

        let a = sample_candidates(&space, 10, 42).unwrap();
        let b = sample_candidates(&space, 10, 42).unwrap();
        let c = sample_candidates(&space, 10, 43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        for set in &a {
            let v = set.get_f64("C").unwrap();
            assert!((0.1..=100.1).contains(&v));
        }
    }

    #[test]
    fn test_sampling_lists_without_replacement() {
        let space: ParamDistributions = knn_grid()
            .into_iter()
            .map(|(k, v)| (k, ParamSpec::Values(v)))
            .collect();
        let drawn = sample_candidates(&space, 10, 0).unwrap();
        assert_eq!(drawn.len(), 4);
        let distinct = drawn.iter().map(|c| c.to_string()).collect::<HashSet<_>>();
        assert_eq!(distinct.len(), 4);
    }

    #[test]
    fn test_typed_getters() {
        let set = ParameterSet::new()
            .with("n_neighbors", 5i64)
            .with("C", 2.5)
            .with("kernel", "rbf");
        assert_eq!(set.get_usize("n_neighbors").unwrap(), 5);
        assert_eq!(set.get_f64("C").unwrap(), 2.5);
        assert_eq!(set.get_str("kernel").unwrap(), "rbf");
        assert!(set.get_str("C").is_err());
        assert!(set.get_usize("missing").is_err());
    }
}
