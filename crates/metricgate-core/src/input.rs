//! Inbound metric descriptions.
//!
//! Push items are converted from raw JSON one at a time, and sample values
//! and labels stay raw until normalization, so one malformed metric or
//! sample is rejected on its own instead of failing the whole request body.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::normalize::normalize_labels;
use crate::types::{Labels, Sample};

/// One metric in a push batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricInput {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub metric_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(default)]
    pub samples: Vec<SampleInput>,
}

impl MetricInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metric_type: None,
            help: None,
            samples: Vec::new(),
        }
    }

    /// A single counter sample with value 1: the increment convenience.
    pub fn increment(name: impl Into<String>, labels: HashMap<String, String>) -> Self {
        Self {
            name: name.into(),
            metric_type: Some("counter".to_string()),
            help: None,
            samples: vec![SampleInput::new(1.0, labels)],
        }
    }

    /// Convert one item of a JSON push body.
    ///
    /// A missing or non-string `name` is `InvalidName`; a `samples`, `type`
    /// or `help` of the wrong shape is `InvalidSample`. Individual samples
    /// stay raw and are checked later by `SampleInput::normalize`.
    pub fn from_json(item: &serde_json::Value) -> CoreResult<Self> {
        let Some(object) = item.as_object() else {
            return Err(CoreError::InvalidName(format!("metric must be an object, got {item}")));
        };

        let name = match object.get("name") {
            Some(serde_json::Value::String(name)) => name.clone(),
            Some(other) => return Err(CoreError::InvalidName(other.to_string())),
            None => return Err(CoreError::InvalidName(String::new())),
        };

        let samples = match object.get("samples") {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(serde_json::Value::Array(items)) => items.iter().map(SampleInput::from_json).collect(),
            Some(other) => {
                return Err(CoreError::InvalidSample(format!(
                    "samples must be an array, got {other}"
                )));
            }
        };

        Ok(Self {
            name,
            metric_type: optional_string(object, "type")?,
            help: optional_string(object, "help")?,
            samples,
        })
    }
}

fn optional_string(
    object: &serde_json::Map<String, serde_json::Value>,
    field: &str,
) -> CoreResult<Option<String>> {
    match object.get(field) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(CoreError::InvalidSample(format!(
            "{field} must be a string, got {other}"
        ))),
    }
}

/// One sample as received, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SampleInput {
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub labels: serde_json::Value,
}

impl SampleInput {
    pub fn new(value: f64, labels: HashMap<String, String>) -> Self {
        Self {
            value: serde_json::json!(value),
            labels: serde_json::json!(labels),
        }
    }

    /// Take one raw sample item. Anything but an object keeps a null value
    /// and fails normalization on its own.
    pub fn from_json(item: &serde_json::Value) -> Self {
        let field = |key: &str| item.get(key).cloned().unwrap_or_default();
        Self {
            value: field("value"),
            labels: field("labels"),
        }
    }

    /// Convert to a normalized `Sample`.
    ///
    /// The value must be a JSON number or a numeric string and must be
    /// finite. Labels must be absent, null, or an object of string values.
    pub fn normalize(&self) -> CoreResult<Sample> {
        let value = parse_value(&self.value)?;
        let labels = parse_labels(&self.labels)?;
        Ok(Sample::new(labels, value))
    }
}

fn parse_value(raw: &serde_json::Value) -> CoreResult<f64> {
    let value = match raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(CoreError::InvalidSample(format!("value {raw} is not a finite number"))),
    }
}

fn parse_labels(raw: &serde_json::Value) -> CoreResult<Labels> {
    let object = match raw {
        serde_json::Value::Null => return Ok(Labels::new()),
        serde_json::Value::Object(object) => object,
        other => {
            return Err(CoreError::InvalidSample(format!(
                "labels must be an object, got {other}"
            )));
        }
    };

    let mut labels = HashMap::with_capacity(object.len());
    for (key, value) in object {
        match value {
            serde_json::Value::String(s) => {
                labels.insert(key.clone(), s.clone());
            }
            other => {
                return Err(CoreError::InvalidSample(format!(
                    "label {key:?} has non-string value {other}"
                )));
            }
        }
    }
    normalize_labels(&labels)
}
