use cms_common::config::MetricDefinition;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationDescriptor {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
}

impl ObservationDescriptor {
    /// `<namespace>_<sub namespace>_<metric>_<measure>`, reduced to the
    /// characters allowed in a metric name.
    pub fn for_metric(
        namespace: &str,
        sub_namespace: &str,
        metric: &MetricDefinition,
        label_names: Vec<String>,
    ) -> Self {
        let name = [
            namespace.to_string(),
            sub_namespace.to_string(),
            snake_case(metric.display_name()),
            metric.measure.to_lowercase(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .map(|part| sanitize_metric_name(part))
        .collect::<Vec<_>>()
        .join("_");

        Self {
            name,
            help: metric.help().to_string(),
            label_names,
        }
    }
}

/// One labelled gauge sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub descriptor: ObservationDescriptor,
    pub value: f64,
    pub label_values: Vec<String>,
}

impl Observation {
    pub fn labels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.descriptor
            .label_names
            .iter()
            .zip(self.label_values.iter())
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels()
            .find(|(label, _)| *label == name)
            .map(|(_, value)| value)
    }
}

pub fn sanitize_metric_name(raw: &str) -> String {
    let mut sanitized = raw
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == ':' {
                ch
            } else {
                '_'
            }
        })
        .collect::<String>();

    if sanitized.starts_with(|ch: char| ch.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized
}

/// Label names allow `[a-zA-Z_][a-zA-Z0-9_]*`; colons are reserved for
/// metric names.
pub fn sanitize_label_name(raw: &str) -> String {
    let mut sanitized = raw
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect::<String>();

    if sanitized.is_empty() || sanitized.starts_with(|ch: char| ch.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized
}

/// `CPUUtilization` -> `cpu_utilization`, `InternetInRate` -> `internet_in_rate`.
pub fn snake_case(raw: &str) -> String {
    let chars = raw.chars().collect::<Vec<_>>();
    let mut out = String::with_capacity(raw.len() + 4);

    for (index, ch) in chars.iter().copied().enumerate() {
        if ch.is_ascii_uppercase() && index > 0 {
            let prev = chars[index - 1];
            let next_is_lower = chars
                .get(index + 1)
                .is_some_and(|next| next.is_ascii_lowercase());
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower);
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
        }
        out.push(ch.to_ascii_lowercase());
    }

    out
}

#[cfg(test)]
mod tests {
    use cms_common::config::MetricDefinition;

    use super::{
        ObservationDescriptor, Observation, sanitize_label_name, sanitize_metric_name, snake_case,
    };

    #[test]
    fn snake_case_splits_words_and_acronyms() {
        assert_eq!(snake_case("CPUUtilization"), "cpu_utilization");
        assert_eq!(snake_case("InternetInRate"), "internet_in_rate");
        assert_eq!(snake_case("memory_usedutilization"), "memory_usedutilization");
        assert_eq!(snake_case("Qps"), "qps");
    }

    #[test]
    fn descriptor_name_joins_all_parts() {
        let metric = MetricDefinition::new("CPUUtilization").with_measure("Maximum");
        let descriptor = ObservationDescriptor::for_metric(
            "aliyun",
            "acs_ecs_dashboard",
            &metric,
            vec!["instanceId".to_string()],
        );

        assert_eq!(descriptor.name, "aliyun_acs_ecs_dashboard_cpu_utilization_maximum");
        assert_eq!(descriptor.help, "CPUUtilization");
    }

    #[test]
    fn alias_replaces_metric_name() {
        let metric = MetricDefinition::new("InstanceTrafficRX").with_alias("traffic.rx");
        let descriptor =
            ObservationDescriptor::for_metric("aliyun", "acs_slb_dashboard", &metric, Vec::new());
        assert_eq!(descriptor.name, "aliyun_acs_slb_dashboard_traffic_rx_average");
    }

    #[test]
    fn invalid_characters_are_replaced() {
        assert_eq!(sanitize_metric_name("a-b.c"), "a_b_c");
        assert_eq!(sanitize_metric_name("9lives"), "_9lives");
        assert_eq!(sanitize_label_name("disk.name"), "disk_name");
        assert_eq!(sanitize_label_name("ns:device"), "ns_device");
        assert_eq!(sanitize_label_name("0port"), "_0port");
        assert_eq!(sanitize_label_name(""), "_");
        assert_eq!(sanitize_label_name("instanceId"), "instanceId");
    }

    #[test]
    fn labels_pair_names_with_values() {
        let observation = Observation {
            descriptor: ObservationDescriptor {
                name: "aliyun_acs_slb_dashboard_qps_average".to_string(),
                help: "Qps".to_string(),
                label_names: vec!["instanceId".to_string(), "loadbalancerName".to_string()],
            },
            value: 12.0,
            label_values: vec!["lb-1".to_string(), "prod-lb".to_string()],
        };

        assert_eq!(observation.label("loadbalancerName"), Some("prod-lb"));
        assert_eq!(observation.label("port"), None);
        assert_eq!(observation.labels().count(), 2);
    }
}
