use std::collections::{HashMap, HashSet};

use cms_collector::{Observation, sanitize_label_name};
use tracing::debug;

use crate::metrics::types::{MetricFamily, MetricKind, MetricSample};

/// Groups observations into gauge families by metric name, keeping the order
/// in which names first appear. Label names are sanitised; when two of them
/// collapse into the same name the first one wins. Repeated series are
/// dropped.
pub fn families_from_observations(observations: &[Observation]) -> Vec<MetricFamily> {
    let mut families: Vec<MetricFamily> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut series: HashSet<(&str, Vec<(String, String)>)> = HashSet::new();

    for observation in observations {
        let name = observation.descriptor.name.as_str();
        let labels = exposed_labels(observation);

        if !series.insert((name, labels.clone())) {
            debug!(metric = name, "dropping duplicate series");
            continue;
        }

        let position = *positions.entry(name).or_insert_with(|| {
            families.push(MetricFamily::new(
                name,
                observation.descriptor.help.as_str(),
                MetricKind::Gauge,
            ));
            families.len() - 1
        });
        families[position].samples.push(MetricSample {
            labels,
            value: observation.value,
        });
    }

    families
}

fn exposed_labels(observation: &Observation) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    let mut labels = Vec::new();

    for (label, value) in observation.labels() {
        let name = sanitize_label_name(label);
        if seen.insert(name.clone()) {
            labels.push((name, value.to_string()));
        } else {
            debug!(
                metric = %observation.descriptor.name,
                label,
                "dropping label that collides after sanitising"
            );
        }
    }

    labels
}

/// Prometheus text exposition format, version 0.0.4.
pub fn render_prometheus(families: &[MetricFamily]) -> String {
    let mut output = String::new();

    for family in families {
        output.push_str("# HELP ");
        output.push_str(&family.name);
        output.push(' ');
        output.push_str(&escape_help(&family.help));
        output.push('\n');

        output.push_str("# TYPE ");
        output.push_str(&family.name);
        output.push(' ');
        output.push_str(family.kind.as_prometheus_type());
        output.push('\n');

        for sample in &family.samples {
            output.push_str(&render_sample_line(&family.name, &sample.labels, sample.value));
        }
    }

    output
}

fn render_sample_line(name: &str, labels: &[(String, String)], value: f64) -> String {
    let mut rendered = String::from(name);

    if !labels.is_empty() {
        rendered.push('{');
        for (index, (key, value)) in labels.iter().enumerate() {
            if index > 0 {
                rendered.push(',');
            }
            rendered.push_str(key);
            rendered.push_str("=\"");
            rendered.push_str(&escape_label_value(value));
            rendered.push('"');
        }
        rendered.push('}');
    }

    rendered.push(' ');
    rendered.push_str(&format_metric_value(value));
    rendered.push('\n');
    rendered
}

fn format_metric_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let sign = if value > 0.0 { '+' } else { '-' };
        format!("{sign}Inf")
    } else if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn escape_help(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('"', "\\\"")
}
