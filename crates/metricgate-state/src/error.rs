//! Error types for the durable series store.

use thiserror::Error;

/// Result type alias for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Failures of the redb mirror. Every variant carries the backend's message.
#[derive(Debug, Clone, Error)]
pub enum StateError {
    /// The database file could not be created, locked or recovered.
    #[error("failed to open series database: {0}")]
    Open(String),

    /// Begin or commit failed; nothing from that transaction is durable.
    #[error("series transaction failed: {0}")]
    Transaction(String),

    /// The `series` table could not be opened inside a transaction.
    #[error("series table unavailable: {0}")]
    Table(String),

    /// Reading a record slot or iterating the table failed.
    #[error("failed to read series: {0}")]
    Read(String),

    /// Inserting into or removing from the table failed.
    #[error("failed to write series: {0}")]
    Write(String),

    /// A `MetricRecord` could not be encoded as JSON.
    #[error("failed to encode metric record: {0}")]
    Serialize(String),

    /// A stored slot did not decode to a `MetricRecord`.
    #[error("corrupt metric record: {0}")]
    Deserialize(String),
}
