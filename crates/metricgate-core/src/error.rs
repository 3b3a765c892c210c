//! Error types shared by the metricgate crates.

use thiserror::Error;

/// Result type alias for normalization and input conversion.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while interpreting caller-supplied metric data.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoreError {
    #[error("invalid metric name: {0:?}")]
    InvalidName(String),

    #[error("invalid sample: {0}")]
    InvalidSample(String),

    #[error("invalid config: {0}")]
    Config(String),
}
