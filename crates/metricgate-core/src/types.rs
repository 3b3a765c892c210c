//! Domain types for the metric catalogue.
//!
//! A `MetricRecord` is one named, typed metric plus its label-distinguished
//! samples. Records are JSON-serialized into the durable store, one slot per
//! normalized metric name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A normalized label set. The `BTreeMap` keeps keys sorted, so two label
/// sets are the same series member exactly when they compare equal.
pub type Labels = BTreeMap<String, String>;

/// Normalized metric name; the key of the catalogue and of the durable table.
pub type MetricName = String;

/// A point-in-time view of every record, ordered by name.
pub type Catalogue = BTreeMap<MetricName, MetricRecord>;

/// Reserved label that carries the metric name into the remote-write format.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Reserved metric name that addresses the whole catalogue on deletion.
pub const DELETE_ALL_TOKEN: &str = "__all";

/// Type given to a record created without an explicit type.
pub const DEFAULT_METRIC_TYPE: &str = "untyped";

/// One label-set + value pair within a metric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    #[serde(default)]
    pub labels: Labels,
    pub value: f64,
}

impl Sample {
    pub fn new(labels: Labels, value: f64) -> Self {
        Self { labels, value }
    }

    /// True when every filter key is present on this sample with the same
    /// value. Extra sample labels are ignored; an empty filter matches.
    pub fn matches(&self, filter: &Labels) -> bool {
        filter
            .iter()
            .all(|(key, value)| self.labels.get(key) == Some(value))
    }
}

/// A named metric and its current samples.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRecord {
    pub name: MetricName,
    /// Lower-cased type string: "counter", "gauge", "histogram", or whatever
    /// the caller sent.
    #[serde(rename = "type")]
    pub metric_type: String,
    #[serde(default)]
    pub help: String,
    /// No two samples share a label set.
    #[serde(default)]
    pub samples: Vec<Sample>,
}

impl MetricRecord {
    pub fn new(name: impl Into<String>, metric_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metric_type: metric_type.into(),
            help: String::new(),
            samples: Vec::new(),
        }
    }

    /// Build the key for the durable series table.
    pub fn table_key(&self) -> &str {
        &self.name
    }

    /// Look up the sample with exactly this label set.
    pub fn sample(&self, labels: &Labels) -> Option<&Sample> {
        self.samples.iter().find(|s| &s.labels == labels)
    }

    /// Add `sample` to the record: an existing sample with the same label set
    /// has the value added to it, otherwise the sample is appended.
    pub fn merge_sample(&mut self, sample: Sample) {
        match self.samples.iter_mut().find(|s| s.labels == sample.labels) {
            Some(existing) => existing.value += sample.value,
            None => self.samples.push(sample),
        }
    }

    /// Drop every sample matching `filter`. Returns how many were removed.
    pub fn remove_matching(&mut self, filter: &Labels) -> usize {
        let before = self.samples.len();
        self.samples.retain(|s| !s.matches(filter));
        before - self.samples.len()
    }
}

/// Outcome of applying one ingest batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IngestReport {
    /// Metrics whose record was written.
    pub metrics: usize,
    /// Samples merged or appended.
    pub samples: usize,
    /// Items rejected during normalization.
    pub rejected: Vec<Rejection>,
}

/// A metric or sample that was skipped, and why.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rejection {
    pub metric: String,
    pub reason: String,
}
