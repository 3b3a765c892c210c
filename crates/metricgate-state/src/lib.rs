//! metricgate-state — durable mirror of the metric catalogue.
//!
//! Backed by [redb](https://docs.rs/redb). Every `MetricRecord` is
//! JSON-serialized into its own slot keyed by the normalized metric name;
//! there is no separate index, so the set of keys is the set of known
//! metrics.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`).
//! It does not serialize writers itself: the catalogue actor in
//! `metricgate-aggregator` is its only writer.

pub mod error;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use store::StateStore;
