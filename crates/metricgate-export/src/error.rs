//! Error types for the export cycle.

use thiserror::Error;

use metricgate_aggregator::AggregatorError;

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("catalogue snapshot failed: {0}")]
    Snapshot(#[from] AggregatorError),

    /// The payload built from the catalogue is structurally invalid. Nothing
    /// was sent.
    #[error("invalid remote-write payload: {0}")]
    PayloadValidation(String),

    #[error("protobuf encoding failed: {0}")]
    Encode(String),

    #[error("snappy compression failed: {0}")]
    Compress(String),

    #[error("remote write transport error: {0}")]
    Transport(String),

    #[error("remote write rejected with status {status}: {body}")]
    Status { status: u16, body: String },
}
