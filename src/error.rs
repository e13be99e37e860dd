//! Error type shared by every stage of the evidence pipeline.

use thiserror::Error;

/// Errors raised while configuring or running the samplers.
///
/// Configuration-class variants abort before any sampling starts. Numeric
/// problems inside a likelihood evaluation are not errors at all: they show
/// up as a `-inf` log-likelihood and are rejected by the MH step.
#[derive(Error, Debug)]
pub enum EvidenceError {
    #[error("Invalid {distribution} parameters: {reason}")]
    InvalidDistribution {
        distribution: &'static str,
        reason: String,
    },
    #[error("No prior given for model parameter '{0}'")]
    MissingPrior(String),
    #[error("Parameter vector has no observation-noise parameter")]
    MissingNoiseParameter,
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("Experiments in one likelihood batch must share times and measure expression: {0}")]
    IncompatibleExperiments(String),
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Invalid temperature ladder: {0}")]
    InvalidLadder(String),
    #[error("Covariance matrix is not positive-definite ({context}). Increase the size of the starting sample so the empirical covariance is well conditioned.")]
    CovarianceNotPositiveDefinite { context: String },
    #[error("Sample is empty; draw a starting state before sampling")]
    EmptySample,
    #[error("{0} is not implemented for this distribution")]
    NotImplemented(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "csv")]
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl EvidenceError {
    pub(crate) fn invalid(distribution: &'static str, reason: impl Into<String>) -> Self {
        EvidenceError::InvalidDistribution {
            distribution,
            reason: reason.into(),
        }
    }
}

/// Convenience type for `Result<T, EvidenceError>`.
pub type Result<T> = std::result::Result<T, EvidenceError>;
