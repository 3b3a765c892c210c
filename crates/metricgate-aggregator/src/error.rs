//! Error types for the catalogue actor.

use thiserror::Error;

use metricgate_core::CoreError;
use metricgate_state::StateError;

/// Result type alias for catalogue operations.
pub type AggregatorResult<T> = Result<T, AggregatorError>;

#[derive(Debug, Clone, Error)]
pub enum AggregatorError {
    /// The request named an invalid metric or label filter.
    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error("storage error: {0}")]
    State(#[from] StateError),

    /// The actor task has stopped.
    #[error("catalogue unavailable")]
    Unavailable,

    /// Loading the persisted catalogue failed; the actor serves no requests.
    #[error("catalogue failed to initialize: {0}")]
    Init(String),
}
