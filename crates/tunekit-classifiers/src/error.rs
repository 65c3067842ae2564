use thiserror::Error;

/// Errors raised while materializing data, searching hyperparameters or
/// evaluating a trained classifier.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Feature dimensionality (or row/label counts) disagree.
    #[error("shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        expected: usize,
        found: usize,
        context: String,
    },

    #[error("empty dataset: {0}")]
    EmptyDataset(String),

    #[error("classifier has not been trained; call train() before eval()")]
    NotTrained,

    #[error("classifier has not been initialized; call init() before train()")]
    NotInitialized,

    /// The delegated search procedure could not produce a model.
    #[error("hyperparameter search failed: {0}")]
    SearchFailure(String),

    #[error("invalid value for hyperparameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A field of an input file could not be parsed.
    #[error("{0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, ClassifierError>;

impl ClassifierError {
    pub(crate) fn shape(expected: usize, found: usize, context: impl Into<String>) -> Self {
        ClassifierError::ShapeMismatch {
            expected,
            found,
            context: context.into(),
        }
    }

    pub(crate) fn param(name: &str, reason: impl Into<String>) -> Self {
        ClassifierError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
