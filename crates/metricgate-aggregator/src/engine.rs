//! Aggregation rules applied by the catalogue actor.
//!
//! Ingest never replaces a sample: a value for a label set that already
//! exists is added to it. Type and help are overwritten only when the input
//! carries them.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use metricgate_core::normalize::{normalize_labels, normalize_metric_name, normalize_metric_type};
use metricgate_core::{
    DEFAULT_METRIC_TYPE, DELETE_ALL_TOKEN, IngestReport, MetricInput, MetricRecord, Rejection,
};

use crate::error::AggregatorResult;
use crate::series::SeriesStore;

/// What a delete request removed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// `__all`: every record was dropped.
    All { records: usize },
    /// No filter: the whole record was dropped.
    Record { existed: bool },
    /// Samples matching the filter were dropped; the record stays.
    Samples { removed: usize },
}

/// Merge a batch into the store.
///
/// Metrics with an unusable name and samples that fail normalization are
/// reported in `rejected` and skipped. A storage failure aborts the rest of
/// the batch; metrics already written stay written.
pub fn ingest(store: &mut SeriesStore, batch: Vec<MetricInput>) -> AggregatorResult<IngestReport> {
    let mut report = IngestReport::default();

    for input in batch {
        let name = match normalize_metric_name(&input.name) {
            Ok(name) => name,
            Err(e) => {
                warn!(metric = %input.name, error = %e, "metric rejected");
                report.rejected.push(Rejection {
                    metric: input.name,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let mut record = store
            .get(&name)
            .cloned()
            .unwrap_or_else(|| MetricRecord::new(name.clone(), DEFAULT_METRIC_TYPE));

        let mut applied = 0;
        for raw in &input.samples {
            match raw.normalize() {
                Ok(sample) => {
                    record.merge_sample(sample);
                    applied += 1;
                }
                Err(e) => {
                    warn!(metric = %name, error = %e, "sample rejected");
                    report.rejected.push(Rejection {
                        metric: name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if let Some(metric_type) = &input.metric_type {
            record.metric_type = normalize_metric_type(metric_type);
        }
        if let Some(help) = input.help {
            record.help = help;
        }

        store.put(record)?;
        debug!(metric = %name, samples = applied, "metric merged");
        report.metrics += 1;
        report.samples += applied;
    }

    debug!(
        metrics = report.metrics,
        samples = report.samples,
        rejected = report.rejected.len(),
        "batch ingested"
    );
    Ok(report)
}

/// Delete a record, part of a record, or the whole catalogue.
///
/// `raw_name` equal to `__all` after normalization wipes everything and the
/// filter is ignored. With an empty filter the named record is removed.
/// Otherwise samples matching every filter pair are removed and the record
/// is kept, even when no samples remain. Unknown names are a no-op.
pub fn delete_metric(
    store: &mut SeriesStore,
    raw_name: &str,
    raw_filter: &HashMap<String, String>,
) -> AggregatorResult<DeleteOutcome> {
    let name = normalize_metric_name(raw_name)?;

    if name == DELETE_ALL_TOKEN {
        let records = store.delete_all()?;
        debug!(records, "catalogue wiped");
        return Ok(DeleteOutcome::All { records });
    }

    if raw_filter.is_empty() {
        let existed = store.delete(&name)?;
        debug!(metric = %name, existed, "record deleted");
        return Ok(DeleteOutcome::Record { existed });
    }

    let filter = normalize_labels(raw_filter)?;
    let Some(existing) = store.get(&name) else {
        return Ok(DeleteOutcome::Samples { removed: 0 });
    };

    let mut record = existing.clone();
    let removed = record.remove_matching(&filter);
    store.put(record)?;
    debug!(metric = %name, removed, "samples deleted");
    Ok(DeleteOutcome::Samples { removed })
}
