//! Label normalizer.
//!
//! Canonicalizes metric names and label keys so that differently-cased or
//! differently-punctuated inputs naming the same series collide on one
//! identity. Only characters that are legal in the Prometheus data model are
//! kept; everything else is dropped and the result is lower-cased.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CoreError, CoreResult};
use crate::types::Labels;

static METRIC_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z_:][a-zA-Z0-9_:]*").expect("metric name pattern"));

static LABEL_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z_][a-zA-Z0-9_]*").expect("label name pattern"));

fn extract(re: &Regex, raw: &str) -> String {
    re.find_iter(raw)
        .map(|m| m.as_str())
        .collect::<String>()
        .to_lowercase()
}

/// Normalize a metric name: keep the `[a-zA-Z_:][a-zA-Z0-9_:]*` runs of
/// `raw`, concatenate them, lower-case the result.
///
/// Fails with `InvalidName` when nothing survives.
pub fn normalize_metric_name(raw: &str) -> CoreResult<String> {
    let name = extract(&METRIC_NAME_RE, raw);
    if name.is_empty() {
        return Err(CoreError::InvalidName(raw.to_string()));
    }
    Ok(name)
}

/// Normalize a label key with the `[a-zA-Z_][a-zA-Z0-9_]*` alphabet.
///
/// Returns an empty string when nothing survives; callers decide whether that
/// is an error.
pub fn normalize_label_name(raw: &str) -> String {
    extract(&LABEL_NAME_RE, raw)
}

/// Normalize every key of `raw`, visiting keys in sorted order. Values pass
/// through unchanged. When two raw keys normalize to the same key, the one
/// that sorts later wins.
///
/// Fails with `InvalidSample` when a key normalizes to nothing.
pub fn normalize_labels(raw: &HashMap<String, String>) -> CoreResult<Labels> {
    let mut keys: Vec<&String> = raw.keys().collect();
    keys.sort();

    let mut labels = Labels::new();
    for key in keys {
        let normalized = normalize_label_name(key);
        if normalized.is_empty() {
            return Err(CoreError::InvalidSample(format!(
                "label name {key:?} has no valid characters"
            )));
        }
        labels.insert(normalized, raw[key].clone());
    }
    Ok(labels)
}

/// Lower-case a metric type. Unknown types are kept as-is.
pub fn normalize_metric_type(raw: &str) -> String {
    raw.to_lowercase()
}

/// True when `name` is already a valid Prometheus metric name.
pub fn is_valid_metric_name(name: &str) -> bool {
    METRIC_NAME_RE
        .find(name)
        .is_some_and(|m| m.start() == 0 && m.end() == name.len())
}

/// True when `name` is already a valid Prometheus label name.
pub fn is_valid_label_name(name: &str) -> bool {
    LABEL_NAME_RE
        .find(name)
        .is_some_and(|m| m.start() == 0 && m.end() == name.len())
}
