//! Prometheus text exposition format.
//!
//! Renders a snapshot of metric batches into the Prometheus text
//! exposition format. Series of the same metric name are grouped into one
//! family, resource labels and series labels become Prometheus labels, and
//! each series contributes its last point as the sample.

use std::collections::BTreeMap;

use clusterscope_core::{MetricBatch, MetricType, PointValue};
use tracing::warn;

struct Family<'a> {
    help: &'a str,
    metric_type: MetricType,
    samples: Vec<String>,
}

/// Render a snapshot into Prometheus text format.
///
/// Families are emitted in name order. Gauges are typed `gauge`,
/// cumulative metrics `counter`. Series without points are skipped.
/// Labels are written in name order; a series label overrides a resource
/// label of the same sanitized name. Metrics whose names collide after
/// sanitizing share one family, typed after the first one seen.
pub fn render_prometheus(batches: &[MetricBatch]) -> String {
    let mut families: BTreeMap<String, Family<'_>> = BTreeMap::new();

    for batch in batches {
        let resource_labels: BTreeMap<String, &str> = batch
            .resource
            .iter()
            .flat_map(|r| r.labels.iter())
            .map(|(k, v)| (sanitize_name(k), v.as_str()))
            .collect();

        for metric in &batch.metrics {
            let name = sanitize_name(&metric.descriptor.name);
            let family = families.entry(name.clone()).or_insert_with(|| Family {
                help: &metric.descriptor.description,
                metric_type: metric.descriptor.metric_type,
                samples: Vec::new(),
            });
            if family.metric_type != metric.descriptor.metric_type {
                warn!(
                    family = %name,
                    metric = %metric.descriptor.name,
                    expected = ?family.metric_type,
                    found = ?metric.descriptor.metric_type,
                    "metric type conflicts with its family, rendering under the family type"
                );
            }

            for series in &metric.timeseries {
                let Some(point) = series.last_point() else {
                    continue;
                };

                let mut labels = resource_labels.clone();
                for (key, value) in metric.descriptor.label_keys.iter().zip(&series.label_values) {
                    if let Some(value) = value {
                        labels.insert(sanitize_name(key), value.as_str());
                    }
                }

                let mut sample = name.clone();
                if !labels.is_empty() {
                    let rendered: Vec<String> = labels
                        .iter()
                        .map(|(k, v)| format!("{k}=\"{}\"", escape_label_value(v)))
                        .collect();
                    sample.push_str(&format!("{{{}}}", rendered.join(",")));
                }
                sample.push_str(&format!(" {}", format_value(point.value)));
                if let Some(ts) = point.timestamp {
                    sample.push_str(&format!(" {}", ts.as_millis()));
                }
                family.samples.push(sample);
            }
        }
    }

    let mut out = String::new();
    for (name, family) in &families {
        if family.samples.is_empty() {
            continue;
        }
        if !family.help.is_empty() {
            out.push_str(&format!("# HELP {name} {}\n", escape_help(family.help)));
        }
        let type_name = if family.metric_type.is_cumulative() {
            "counter"
        } else {
            "gauge"
        };
        out.push_str(&format!("# TYPE {name} {type_name}\n"));
        for sample in &family.samples {
            out.push_str(sample);
            out.push('\n');
        }
    }
    out
}

/// Map a dotted metric or label name onto `[a-zA-Z_:][a-zA-Z0-9_:]*`.
fn sanitize_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == ':' { c } else { '_' })
        .collect();
    if out.chars().next().is_none_or(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn format_value(value: PointValue) -> String {
    match value {
        PointValue::Int64(v) => v.to_string(),
        PointValue::Double(v) if v.is_nan() => "NaN".to_string(),
        PointValue::Double(v) if v == f64::INFINITY => "+Inf".to_string(),
        PointValue::Double(v) if v == f64::NEG_INFINITY => "-Inf".to_string(),
        PointValue::Double(v) => v.to_string(),
    }
}
