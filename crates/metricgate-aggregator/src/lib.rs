//! metricgate-aggregator — the single writer of the metric catalogue.
//!
//! # Architecture
//!
//! ```text
//! API handlers ──┐
//! Exporter     ──┤──► CatalogueHandle ──► mpsc ──► CatalogueActor
//!                │                                   ├── engine::ingest()
//!                │                                   ├── engine::delete_metric()
//!                │                                   └── SeriesStore (memory + redb)
//! ```
//!
//! Exactly one actor owns the `SeriesStore`. Commands are handled one at a
//! time in arrival order and each mutation commits to redb before the next
//! command is received, so no request observes a half-applied write.

pub mod actor;
pub mod engine;
pub mod error;
pub mod series;

pub use actor::{CatalogueActor, CatalogueHandle};
pub use engine::DeleteOutcome;
pub use error::{AggregatorError, AggregatorResult};
pub use series::SeriesStore;
