//! A parser for Prometheus's text exposition format.
//!
//! Produces one `MetricInput` per metric name, in the order names are first
//! seen. Names, label keys and values are passed through raw; the aggregator
//! normalizes them on ingest like any JSON push. Timestamps are ignored.

use std::collections::HashMap;
use std::iter::Peekable;
use std::str::CharIndices;

use tracing::debug;

use metricgate_core::{MetricInput, SampleInput};

type Cursor<'a> = Peekable<CharIndices<'a>>;

struct ParsedSample<'a> {
    name: &'a str,
    labels: Vec<(String, String)>,
    value: &'a str,
}

#[derive(Default)]
struct Declarations {
    types: HashMap<String, String>,
    help: HashMap<String, String>,
    /// Derived series name → family name, e.g. `x_bucket` → `x`.
    family: HashMap<String, String>,
}

impl Declarations {
    fn declare_type(&mut self, name: &str, metric_type: &str) {
        let metric_type = metric_type.to_lowercase();
        let suffixes: &[&str] = match metric_type.as_str() {
            "histogram" => &["_bucket", "_sum", "_count"],
            "summary" => &["_sum", "_count"],
            _ => &[],
        };
        for suffix in suffixes {
            self.family.insert(format!("{name}{suffix}"), name.to_string());
        }
        self.types.insert(name.to_string(), metric_type);
    }

    fn lookup<'m>(&self, map: &'m HashMap<String, String>, name: &str) -> Option<&'m String> {
        map.get(name)
            .or_else(|| self.family.get(name).and_then(|family| map.get(family)))
    }

    fn metric_type(&self, name: &str) -> Option<String> {
        self.lookup(&self.types, name).cloned()
    }

    fn help(&self, name: &str) -> Option<String> {
        self.lookup(&self.help, name).cloned()
    }
}

/// Parse an exposition body. Lines that cannot be parsed are skipped.
pub fn parse_exposition(input: &str) -> Vec<MetricInput> {
    let mut decls = Declarations::default();
    let mut order: Vec<String> = Vec::new();
    let mut samples: HashMap<String, Vec<SampleInput>> = HashMap::new();

    for line in input.lines() {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("# HELP ") {
            let (name, text) = rest.split_once(' ').unwrap_or((rest, ""));
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            decls.help.insert(name.to_string(), unescape_help(text.trim()));
            if !samples.contains_key(name) {
                samples.insert(name.to_string(), Vec::new());
                order.push(name.to_string());
            }
        } else if let Some(rest) = line.strip_prefix("# TYPE ") {
            let mut parts = rest.split_whitespace();
            let (Some(name), Some(metric_type)) = (parts.next(), parts.next()) else {
                continue;
            };
            decls.declare_type(name, metric_type);
            if !samples.contains_key(name) {
                samples.insert(name.to_string(), Vec::new());
                order.push(name.to_string());
            }
        } else if line.starts_with('#') || line.is_empty() {
            // comment or blank
        } else {
            let Some(parsed) = parse_sample_line(line) else {
                debug!(line, "skipping unparseable exposition line");
                continue;
            };
            let labels: serde_json::Map<String, serde_json::Value> = parsed
                .labels
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect();
            let sample = SampleInput {
                value: serde_json::Value::String(parsed.value.to_string()),
                labels: serde_json::Value::Object(labels),
            };
            match samples.get_mut(parsed.name) {
                Some(list) => list.push(sample),
                None => {
                    samples.insert(parsed.name.to_string(), vec![sample]);
                    order.push(parsed.name.to_string());
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|name| {
            let list = samples.remove(&name).unwrap_or_default();
            let metric_type = decls.metric_type(&name);
            // A histogram family name never carries samples of its own.
            if list.is_empty() && metric_type.as_deref() == Some("histogram") {
                return None;
            }
            Some(MetricInput {
                help: decls.help(&name),
                metric_type,
                samples: list,
                name,
            })
        })
        .collect()
}

/// Split `metric_name{labels} value [timestamp]` into parts.
fn parse_sample_line(line: &str) -> Option<ParsedSample<'_>> {
    let name_end = line
        .find(|c: char| c == '{' || c.is_whitespace())
        .unwrap_or(line.len());
    let name = &line[..name_end];
    if name.is_empty() {
        return None;
    }

    let mut rest = &line[name_end..];
    let mut labels = Vec::new();
    if let Some(body) = rest.strip_prefix('{') {
        let (parsed, consumed) = parse_label_set(body)?;
        labels = parsed;
        rest = &body[consumed..];
    }

    let mut fields = rest.split_whitespace();
    let value = fields.next()?;
    value.parse::<f64>().ok()?;
    if let Some(timestamp) = fields.next() {
        timestamp.parse::<i64>().ok()?;
    }
    if fields.next().is_some() {
        return None;
    }

    Some(ParsedSample {
        name,
        labels,
        value,
    })
}

/// Parse the text following `{`. Returns the labels and the number of bytes
/// consumed, including the closing `}`.
fn parse_label_set(body: &str) -> Option<(Vec<(String, String)>, usize)> {
    let mut labels = Vec::new();
    let mut chars = body.char_indices().peekable();

    loop {
        skip_whitespace(&mut chars);
        let (start, first) = chars.next()?;
        match first {
            '}' => return Some((labels, start + 1)),
            '=' | ',' | '"' => return None,
            _ => {}
        }

        let mut end = start + first.len_utf8();
        while let Some(&(i, c)) = chars.peek() {
            if c == '=' || c.is_whitespace() {
                break;
            }
            end = i + c.len_utf8();
            chars.next();
        }
        let key = body[start..end].to_string();

        skip_whitespace(&mut chars);
        if chars.next()?.1 != '=' {
            return None;
        }
        skip_whitespace(&mut chars);
        if chars.next()?.1 != '"' {
            return None;
        }

        let mut value = String::new();
        loop {
            match chars.next()?.1 {
                '\\' => match chars.next()?.1 {
                    'n' => value.push('\n'),
                    other => value.push(other),
                },
                '"' => break,
                c => value.push(c),
            }
        }
        labels.push((key, value));

        skip_whitespace(&mut chars);
        let (i, sep) = chars.next()?;
        match sep {
            ',' => continue,
            '}' => return Some((labels, i + 1)),
            _ => return None,
        }
    }
}

fn skip_whitespace(chars: &mut Cursor<'_>) {
    while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
}

fn unescape_help(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_exposition;
    use metricgate_core::{Catalogue, Labels, MetricRecord, Sample};

    const EXAMPLE: &str = r#"
# HELP http_requests_total The total number of HTTP requests.
# TYPE http_requests_total counter
http_requests_total{method="post",code="200"} 1027 1395066363000
http_requests_total{method="post",code="400"}    3 1395066363000
http_requests_total{method="post",code="2,00",content="text==true"}  24 1395066363000

# Escaping in label values:
# TYPE msdos_file_access_time_seconds gauge
msdos_file_access_time_seconds{path="C:\\DIR\\FILE.TXT",error="Cannot find file:\n\"FILE.TXT\""} 1.458255915e9

# Minimalistic line:
metric_without_timestamp_and_labels 12.47

something_weird{problem="missing closing quote} 1
not_a_number 12abc

# HELP http_request_duration_seconds A histogram of the request duration.
# TYPE http_request_duration_seconds histogram
http_request_duration_seconds_bucket{le="0.05"} 24054
http_request_duration_seconds_bucket{le="+Inf"} 144320
http_request_duration_seconds_sum 53423
http_request_duration_seconds_count 144320

# TYPE rpc_duration_seconds summary
rpc_duration_seconds{quantile="0.5"} 4773
rpc_duration_seconds_sum 1.7560473

# TYPE unusual_spacing counter
unusual_spacing{label="}"}     1     1395066363000
unusual_spacing     1     1395066363000
"#;

    fn find<'a>(inputs: &'a [MetricInput], name: &str) -> &'a MetricInput {
        inputs
            .iter()
            .find(|m| m.name == name)
            .unwrap_or_else(|| panic!("missing {name}"))
    }

    #[test]
    fn parses_text_format() {
        let inputs = parse_exposition(EXAMPLE);

        let names: Vec<&str> = inputs.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "http_requests_total",
                "msdos_file_access_time_seconds",
                "metric_without_timestamp_and_labels",
                "http_request_duration_seconds_bucket",
                "http_request_duration_seconds_sum",
                "http_request_duration_seconds_count",
                "rpc_duration_seconds",
                "rpc_duration_seconds_sum",
                "unusual_spacing",
            ]
        );

        let requests = find(&inputs, "http_requests_total");
        assert_eq!(requests.metric_type.as_deref(), Some("counter"));
        assert_eq!(
            requests.help.as_deref(),
            Some("The total number of HTTP requests.")
        );
        assert_eq!(requests.samples.len(), 3);
        assert_eq!(requests.samples[2].labels["code"], "2,00");
        assert_eq!(requests.samples[2].labels["content"], "text==true");
        assert_eq!(requests.samples[1].normalize().unwrap().value, 3.0);

        let untyped = find(&inputs, "metric_without_timestamp_and_labels");
        assert!(untyped.metric_type.is_none());
        assert_eq!(untyped.samples[0].normalize().unwrap().value, 12.47);
    }

    #[test]
    fn unescapes_label_values() {
        let inputs = parse_exposition(EXAMPLE);
        let sample = find(&inputs, "msdos_file_access_time_seconds").samples[0]
            .normalize()
            .unwrap();

        assert_eq!(sample.labels["path"], "C:\\DIR\\FILE.TXT");
        assert_eq!(sample.labels["error"], "Cannot find file:\n\"FILE.TXT\"");
        assert_eq!(sample.value, 1.458255915e9);
    }

    #[test]
    fn family_series_carry_family_type() {
        let inputs = parse_exposition(EXAMPLE);

        let bucket = find(&inputs, "http_request_duration_seconds_bucket");
        assert_eq!(bucket.metric_type.as_deref(), Some("histogram"));
        assert_eq!(
            bucket.help.as_deref(),
            Some("A histogram of the request duration.")
        );
        assert_eq!(bucket.samples.len(), 2);
        assert_eq!(
            find(&inputs, "rpc_duration_seconds_sum").metric_type.as_deref(),
            Some("summary")
        );
        assert!(!inputs.iter().any(|m| m.name == "http_request_duration_seconds"));
    }

    #[test]
    fn closing_brace_inside_quotes() {
        let inputs = parse_exposition(EXAMPLE);
        let spacing = find(&inputs, "unusual_spacing");
        assert_eq!(spacing.samples.len(), 2);
        assert_eq!(spacing.samples[0].labels["label"], "}");
    }

    #[test]
    fn skips_broken_lines() {
        let inputs = parse_exposition(EXAMPLE);
        assert!(!inputs.iter().any(|m| m.name == "something_weird"));
        assert!(!inputs.iter().any(|m| m.name == "not_a_number"));
    }

    #[test]
    fn non_finite_values_are_left_for_normalization() {
        let inputs = parse_exposition("up +Inf\n");
        assert_eq!(inputs.len(), 1);
        assert!(inputs[0].samples[0].normalize().is_err());
    }

    #[test]
    fn rendered_catalogue_parses_back() {
        let mut labels = Labels::new();
        labels.insert("path".to_string(), "/a \"b\"\\c".to_string());

        let mut requests = MetricRecord::new("http_requests", "counter");
        requests.help = "Requests\nserved.".to_string();
        requests.samples.push(Sample::new(labels, 5.0));
        requests.samples.push(Sample::new(Labels::new(), 0.25));
        let idle = MetricRecord::new("idle", "gauge");

        let mut catalogue = Catalogue::new();
        catalogue.insert(requests.name.clone(), requests.clone());
        catalogue.insert(idle.name.clone(), idle);

        let inputs = parse_exposition(&render_exposition(&catalogue));

        assert_eq!(inputs.len(), 2);
        let parsed = find(&inputs, "http_requests");
        assert_eq!(parsed.help.as_deref(), Some("Requests\nserved."));
        assert_eq!(parsed.metric_type.as_deref(), Some("counter"));
        let samples: Vec<Sample> = parsed
            .samples
            .iter()
            .map(|s| s.normalize().unwrap())
            .collect();
        assert_eq!(samples, requests.samples);
        assert!(find(&inputs, "idle").samples.is_empty());
    }
}
