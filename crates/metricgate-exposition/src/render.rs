//! Prometheus text exposition rendering.

use metricgate_core::{Catalogue, Labels};

/// Render the catalogue into Prometheus text format.
///
/// Records are emitted in name order with `# HELP` (when set) and `# TYPE`
/// declarations, followed by one line per sample.
pub fn render_exposition(catalogue: &Catalogue) -> String {
    let mut out = String::new();

    for record in catalogue.values() {
        if !record.help.is_empty() {
            out.push_str(&format!(
                "# HELP {} {}\n",
                record.name,
                escape_help(&record.help)
            ));
        }
        out.push_str(&format!("# TYPE {} {}\n", record.name, record.metric_type));

        for sample in &record.samples {
            out.push_str(&record.name);
            out.push_str(&render_labels(&sample.labels));
            out.push(' ');
            out.push_str(&format_value(sample.value));
            out.push('\n');
        }
    }

    out
}

fn render_labels(labels: &Labels) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{k}=\"{}\"", escape_label_value(v)))
        .collect();
    format!("{{{}}}", pairs.join(","))
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metricgate_core::{MetricRecord, Sample};

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn catalogue(records: Vec<MetricRecord>) -> Catalogue {
        records.into_iter().map(|r| (r.name.clone(), r)).collect()
    }

    #[test]
    fn render_empty() {
        assert_eq!(render_exposition(&Catalogue::new()), "");
    }

    #[test]
    fn render_counter_with_help() {
        let mut record = MetricRecord::new("http_requests", "counter");
        record.help = "Requests served.".to_string();
        record.samples.push(Sample::new(labels(&[("path", "/a"), ("code", "200")]), 5.0));
        record.samples.push(Sample::new(Labels::new(), 1.5));

        let output = render_exposition(&catalogue(vec![record]));

        assert_eq!(
            output,
            "# HELP http_requests Requests served.\n\
             # TYPE http_requests counter\n\
             http_requests{code=\"200\",path=\"/a\"} 5\n\
             http_requests 1.5\n"
        );
    }

    #[test]
    fn render_omits_empty_help_but_keeps_type() {
        let record = MetricRecord::new("idle", "untyped");
        let output = render_exposition(&catalogue(vec![record]));
        assert_eq!(output, "# TYPE idle untyped\n");
    }

    #[test]
    fn render_escapes_label_values_and_help() {
        let mut record = MetricRecord::new("files", "gauge");
        record.help = "Path like C:\\DIR\nsecond line".to_string();
        record.samples.push(Sample::new(
            labels(&[("path", "C:\\DIR\\FILE.TXT"), ("error", "Cannot find:\n\"FILE\"")]),
            1.0,
        ));

        let output = render_exposition(&catalogue(vec![record]));

        assert!(output.contains("# HELP files Path like C:\\\\DIR\\nsecond line\n"));
        assert!(output.contains(
            r#"files{error="Cannot find:\n\"FILE\"",path="C:\\DIR\\FILE.TXT"} 1"#
        ));
    }

    #[test]
    fn render_is_name_ordered() {
        let output = render_exposition(&catalogue(vec![
            MetricRecord::new("zeta", "gauge"),
            MetricRecord::new("alpha", "gauge"),
        ]));
        let alpha = output.find("alpha").unwrap();
        let zeta = output.find("zeta").unwrap();
        assert!(alpha < zeta);
    }

    #[test]
    fn render_format_is_prometheus_compatible() {
        let mut record = MetricRecord::new("jobs", "counter");
        record.samples.push(Sample::new(labels(&[("queue", "default")]), 42.0));
        let output = render_exposition(&catalogue(vec![record]));

        for line in output.lines() {
            if line.starts_with('#') {
                continue;
            }
            let (series, value) = line.rsplit_once(' ').unwrap();
            assert!(series.starts_with("jobs"), "line: {line}");
            assert!(value.parse::<f64>().is_ok(), "line: {line}");
        }
    }
}
