//! Building, validating and encoding the remote-write payload.

use std::collections::BTreeMap;

use prost::Message;

use metricgate_core::normalize::{is_valid_label_name, is_valid_metric_name};
use metricgate_core::{Catalogue, METRIC_NAME_LABEL};

use crate::error::{ExportError, ExportResult};
use crate::proto;

/// Turn every sample of every record into one time series.
///
/// A series' labels are the sample's labels plus `__name__` set to the record
/// name, plus any `external_labels` the sample does not already carry. Labels
/// come out sorted by name. Every series gets the same `timestamp_ms`.
pub fn build_write_request(
    catalogue: &Catalogue,
    external_labels: &BTreeMap<String, String>,
    timestamp_ms: i64,
) -> proto::WriteRequest {
    let mut timeseries = Vec::new();

    for record in catalogue.values() {
        for sample in &record.samples {
            let mut labels = external_labels.clone();
            labels.extend(sample.labels.clone());
            labels.insert(METRIC_NAME_LABEL.to_string(), record.name.clone());

            timeseries.push(proto::TimeSeries {
                labels: labels
                    .into_iter()
                    .map(|(name, value)| proto::Label { name, value })
                    .collect(),
                samples: vec![proto::Sample {
                    value: sample.value,
                    timestamp: timestamp_ms,
                }],
            });
        }
    }

    proto::WriteRequest { timeseries }
}

/// Check the payload against what a remote-write receiver accepts.
pub fn validate(request: &proto::WriteRequest) -> ExportResult<()> {
    for (index, series) in request.timeseries.iter().enumerate() {
        validate_series(series).map_err(|reason| {
            ExportError::PayloadValidation(format!("series {index}: {reason}"))
        })?;
    }
    Ok(())
}

fn validate_series(series: &proto::TimeSeries) -> Result<(), String> {
    let names: Vec<&proto::Label> = series
        .labels
        .iter()
        .filter(|l| l.name == METRIC_NAME_LABEL)
        .collect();
    match names.as_slice() {
        [name] if is_valid_metric_name(&name.value) => {}
        [name] => return Err(format!("invalid metric name {:?}", name.value)),
        [] => return Err(format!("missing {METRIC_NAME_LABEL} label")),
        _ => return Err(format!("{METRIC_NAME_LABEL} label repeated")),
    }

    for label in &series.labels {
        if !is_valid_label_name(&label.name) {
            return Err(format!("invalid label name {:?}", label.name));
        }
    }
    for pair in series.labels.windows(2) {
        if pair[0].name == pair[1].name {
            return Err(format!("duplicate label {:?}", pair[0].name));
        }
        if pair[0].name > pair[1].name {
            return Err(format!(
                "labels out of order: {:?} before {:?}",
                pair[0].name, pair[1].name
            ));
        }
    }

    let [sample] = series.samples.as_slice() else {
        return Err(format!("expected 1 sample, found {}", series.samples.len()));
    };
    if !sample.value.is_finite() {
        return Err(format!("non-finite value {}", sample.value));
    }
    if sample.timestamp <= 0 {
        return Err(format!("non-positive timestamp {}", sample.timestamp));
    }
    Ok(())
}

/// Protobuf-encode the request, then snappy-compress it (raw block format).
pub fn encode(request: &proto::WriteRequest) -> ExportResult<Vec<u8>> {
    let mut bytes: Vec<u8> = Vec::with_capacity(request.encoded_len());
    request
        .encode(&mut bytes)
        .map_err(|e| ExportError::Encode(e.to_string()))?;

    snap::raw::Encoder::new()
        .compress_vec(&bytes)
        .map_err(|e| ExportError::Compress(e.to_string()))
}
