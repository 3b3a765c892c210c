//! metricgate-core — shared types for the metricgate workspace.
//!
//! Holds the persisted domain model (`MetricRecord`, `Sample`), the loose
//! inbound wire shapes (`MetricInput`, `SampleInput`), the label normalizer
//! that gives every series a deterministic identity, and the `metricgate.toml`
//! configuration.

pub mod config;
pub mod error;
pub mod input;
pub mod normalize;
pub mod types;

pub use config::GatewayConfig;
pub use error::{CoreError, CoreResult};
pub use input::{MetricInput, SampleInput};
pub use types::*;
