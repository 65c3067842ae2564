use std::str::FromStr;

use linfa::dataset::Pr;
use linfa::traits::{Fit, Predict as _};
use linfa::Dataset;
use linfa_svm::{Svm, SvmParams};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::config::SVMConfig;
use crate::data_handling::Batch;
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::{Lifecycle, TrainableClassifier};
use crate::search::{Estimator, ParameterSet, Predict, SearchCv, SearchResult, SearchStrategy};

/// Additive constant of the polynomial kernel `(<x, y> + c)^d`. Inputs are
/// scaled by `sqrt(gamma)` first, giving `(gamma * <x, y>)^3`.
const POLY_KERNEL_CONSTANT: f64 = 0.0;
const POLY_KERNEL_DEGREE: f64 = 3.0;

/// Kernels linfa-svm can evaluate. There is no sigmoid kernel: linfa's
/// kernel methods are limited to linear, Gaussian and polynomial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    Linear,
    /// Gaussian kernel `exp(-gamma * |x - y|^2)`.
    Rbf,
    Poly,
}

impl FromStr for Kernel {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(Kernel::Linear),
            "rbf" | "gauss" => Ok(Kernel::Rbf),
            "poly" => Ok(Kernel::Poly),
            _ => Err(ClassifierError::param(
                "kernel",
                format!("Unsupported kernel type: {}. Valid options are: linear, rbf, poly", s),
            )),
        }
    }
}

/// Concrete SVM hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SVMParams {
    /// Regularization strength, applied to both classes.
    pub c: f64,
    /// Kernel coefficient. `None` picks `1 / (n_features * var(X))` at fit time.
    pub gamma: Option<f64>,
    pub kernel: Kernel,
}

impl TryFrom<&ParameterSet> for SVMParams {
    type Error = ClassifierError;

    fn try_from(params: &ParameterSet) -> Result<Self> {
        let c = params.get_f64("C")?;
        if !(c.is_finite() && c > 0.0) {
            return Err(ClassifierError::param("C", format!("must be positive, got {}", c)));
        }
        let gamma = match params.get("gamma") {
            Some(_) => {
                let gamma = params.get_f64("gamma")?;
                if !(gamma.is_finite() && gamma > 0.0) {
                    return Err(ClassifierError::param(
                        "gamma",
                        format!("must be positive, got {}", gamma),
                    ));
                }
                Some(gamma)
            }
            None => None,
        };
        Ok(SVMParams {
            c,
            gamma,
            kernel: params.get_str("kernel")?.parse()?,
        })
    }
}

/// Support vector estimator backed by `linfa-svm`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SVMEstimator;

impl Estimator for SVMEstimator {
    type Fitted = SVMModel;

    fn name(&self) -> &str {
        "svm"
    }

    fn fit(&self, params: &ParameterSet, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<SVMModel> {
        let params = SVMParams::try_from(params)?;
        SVMModel::fit(params, x, y)
    }
}

/// A fitted SVM. Two classes share one machine; more classes are handled
/// one-vs-rest, picking the class with the highest Platt probability.
pub struct SVMModel {
    params: SVMParams,
    classes: Vec<usize>,
    machines: Vec<Svm<f64, Pr>>,
    n_features: usize,
}

impl std::fmt::Debug for SVMModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SVMModel")
            .field("params", &self.params)
            .field("classes", &self.classes)
            .field("machines", &self.machines.len())
            .field("n_features", &self.n_features)
            .finish()
    }
}

impl SVMModel {
    pub fn fit(params: SVMParams, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(ClassifierError::shape(x.nrows(), y.len(), "svm target count"));
        }
        if x.nrows() == 0 {
            return Err(ClassifierError::EmptyDataset(
                "svm needs at least one training sample".to_string(),
            ));
        }
        let mut classes = y.to_vec();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() < 2 {
            return Err(ClassifierError::SearchFailure(format!(
                "svm needs at least two classes, got {}",
                classes.len()
            )));
        }

        let gamma = params.gamma.unwrap_or_else(|| scale_gamma(x));
        let records = kernel_input(params.kernel, gamma, x);
        // With two classes the machine for the larger label decides alone.
        let positives = if classes.len() == 2 { &classes[1..] } else { &classes[..] };

        let mut machines = Vec::with_capacity(positives.len());
        for &positive in positives {
            let targets = y.mapv(|label| label == positive);
            let dataset = Dataset::new(records.clone(), targets);

            let svm: SvmParams<f64, Pr> = Svm::<f64, Pr>::params().pos_neg_weights(params.c, params.c);
            let svm = match params.kernel {
                Kernel::Linear => svm.linear_kernel(),
                Kernel::Rbf => svm.gaussian_kernel(1.0 / gamma),
                Kernel::Poly => svm.polynomial_kernel(POLY_KERNEL_CONSTANT, POLY_KERNEL_DEGREE),
            };

            let machine = <SvmParams<f64, Pr> as Fit<_, _, _>>::fit(&svm, &dataset).map_err(|e| {
                ClassifierError::SearchFailure(format!(
                    "svm for class {} failed to fit: {}",
                    positive, e
                ))
            })?;
            machines.push(machine);
        }

        Ok(SVMModel {
            params: SVMParams {
                gamma: Some(gamma),
                ..params
            },
            classes,
            machines,
            n_features: x.ncols(),
        })
    }

    pub fn params(&self) -> &SVMParams {
        &self.params
    }

    pub fn classes(&self) -> &[usize] {
        &self.classes
    }
}

impl Predict for SVMModel {
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>> {
        if x.ncols() != self.n_features {
            return Err(ClassifierError::shape(
                self.n_features,
                x.ncols(),
                "svm query feature columns",
            ));
        }

        let gamma = self.params.gamma.unwrap_or(1.0);
        let x = kernel_input(self.params.kernel, gamma, x);
        let probabilities = self
            .machines
            .iter()
            .map(|machine| {
                let p: Array1<Pr> = machine.predict(&x);
                p.mapv(|v| *v)
            })
            .collect::<Vec<Array1<f32>>>();

        if self.machines.len() == 1 {
            return Ok(probabilities[0].mapv(|p| {
                if p > 0.5 {
                    self.classes[1]
                } else {
                    self.classes[0]
                }
            }));
        }

        let labels = (0..x.len_of(Axis(0)))
            .map(|row| {
                let mut best = 0;
                for (i, p) in probabilities.iter().enumerate().skip(1) {
                    if p[row] > probabilities[best][row] {
                        best = i;
                    }
                }
                self.classes[best]
            })
            .collect::<Vec<_>>();
        Ok(Array1::from_vec(labels))
    }
}

/// Rows as the kernel sees them: the polynomial kernel takes `sqrt(gamma) * x`.
fn kernel_input(kernel: Kernel, gamma: f64, x: ArrayView2<f64>) -> Array2<f64> {
    match kernel {
        Kernel::Poly => x.mapv(|v| v * gamma.sqrt()),
        Kernel::Linear | Kernel::Rbf => x.to_owned(),
    }
}

/// `1 / (n_features * var(X))` over all entries of `x`.
fn scale_gamma(x: ArrayView2<f64>) -> f64 {
    let var = x.var(0.0);
    if var > 0.0 {
        1.0 / (x.ncols() as f64 * var)
    } else {
        1.0
    }
}

/// SVM classifier tuned by seeded randomized search.
pub struct SVMClassifier {
    config: SVMConfig,
    lifecycle: Lifecycle<SVMEstimator>,
}

impl SVMClassifier {
    pub fn new(config: SVMConfig) -> Self {
        SVMClassifier {
            config,
            lifecycle: Lifecycle::Uninitialized,
        }
    }

    pub fn config(&self) -> &SVMConfig {
        &self.config
    }
}

impl Default for SVMClassifier {
    fn default() -> Self {
        SVMClassifier::new(SVMConfig::default())
    }
}

impl TrainableClassifier for SVMClassifier {
    type Model = SVMModel;

    fn init(&mut self) -> Result<()> {
        let search = SearchCv::new(
            SVMEstimator,
            SearchStrategy::Randomized {
                distributions: self.config.param_distributions.clone(),
                n_iter: self.config.n_iter,
                seed: self.config.random_state,
            },
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

    fn search_result(&self) -> Option<&SearchResult<SVMModel>> {
        self.lifecycle.result()
    }
}
