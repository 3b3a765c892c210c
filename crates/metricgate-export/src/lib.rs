//! metricgate-export — pushes the catalogue to a Prometheus remote-write
//! endpoint.
//!
//! One export cycle snapshots the catalogue, turns every sample into a
//! time series stamped with the cycle's timestamp, validates the payload,
//! encodes it as a protobuf `WriteRequest`, compresses it with snappy and
//! POSTs it. Failures are returned to the caller; nothing is retried or
//! queued.

pub mod client;
pub mod error;
pub mod exporter;
pub mod payload;
pub mod proto;

#[cfg(test)]
mod testutil;

pub use client::RemoteWriteClient;
pub use error::{ExportError, ExportResult};
pub use exporter::{ExportReport, Exporter};
