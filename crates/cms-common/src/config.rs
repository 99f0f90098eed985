use std::{collections::BTreeMap, fmt, path::Path};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CmsError, Result};

pub const DEFAULT_MEASURE: &str = "Average";
pub const DEFAULT_PERIOD: &str = "60";
pub const DEFAULT_METRIC_NAMESPACE: &str = "aliyun";
pub const DEFAULT_RATE_LIMIT: u32 = 10;

/// One metric to poll, as written in the exporter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default = "default_measure")]
    pub measure: String,
    #[serde(default = "default_period", deserialize_with = "deserialize_period")]
    pub period: String,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MetricDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            measure: default_measure(),
            period: default_period(),
            dimensions: Vec::new(),
            description: None,
        }
    }

    pub fn with_measure(mut self, measure: impl Into<String>) -> Self {
        self.measure = measure.into();
        self
    }

    pub fn with_dimensions<I, S>(mut self, dimensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dimensions = dimensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Name used when deriving the exported metric name.
    pub fn display_name(&self) -> &str {
        self.alias
            .as_deref()
            .filter(|alias| !alias.is_empty())
            .unwrap_or(&self.name)
    }

    pub fn help(&self) -> &str {
        self.description
            .as_deref()
            .filter(|description| !description.is_empty())
            .unwrap_or(&self.name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CmsError::InvalidMetric(
                "metric name must be set".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for MetricDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} (period={})",
            self.display_name(),
            self.measure,
            self.period
        )
    }
}

/// Per-service endpoint overrides. Unset entries derive from the region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointOverrides {
    #[serde(default)]
    pub cms: Option<String>,
    #[serde(default)]
    pub slb: Option<String>,
    #[serde(default)]
    pub rds: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub cms: String,
    pub slb: String,
    pub rds: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    #[serde(default = "default_cloud_id")]
    pub cloud_id: String,
    pub region: String,
    /// Prefix of every exported metric name.
    #[serde(default = "default_metric_namespace")]
    pub namespace: String,
    /// Outbound requests per second, shared by every API client.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,
    #[serde(default)]
    pub endpoints: EndpointOverrides,
    /// Metric definitions keyed by monitoring namespace.
    #[serde(default)]
    pub metrics: BTreeMap<String, Vec<MetricDefinition>>,
}

impl ExporterConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw).map_err(|err| match err {
            CmsError::Config(reason) => {
                CmsError::Config(format!("{}: {reason}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(raw).map_err(|err| CmsError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            return Err(CmsError::Config("region must be set".to_string()));
        }
        if self.rate_limit == 0 {
            return Err(CmsError::Config(
                "rate_limit must be greater than zero".to_string(),
            ));
        }

        let endpoints = self.service_endpoints();
        for endpoint in [&endpoints.cms, &endpoints.slb, &endpoints.rds] {
            url::Url::parse(endpoint).map_err(|err| {
                CmsError::Config(format!("invalid endpoint {endpoint}: {err}"))
            })?;
        }

        Ok(())
    }

    pub fn service_endpoints(&self) -> ServiceEndpoints {
        let region = self.region.trim();
        ServiceEndpoints {
            cms: resolve_endpoint(
                self.endpoints.cms.as_deref(),
                || format!("https://metrics.{region}.aliyuncs.com"),
            ),
            slb: resolve_endpoint(
                self.endpoints.slb.as_deref(),
                || format!("https://slb.{region}.aliyuncs.com"),
            ),
            rds: resolve_endpoint(self.endpoints.rds.as_deref(), || {
                "https://rds.aliyuncs.com".to_string()
            }),
        }
    }

    /// Every configured `(namespace, metric)` pair. Namespaces come out sorted;
    /// metrics keep their order within a namespace.
    pub fn metric_definitions(&self) -> impl Iterator<Item = (&str, &MetricDefinition)> {
        self.metrics.iter().flat_map(|(namespace, metrics)| {
            metrics
                .iter()
                .map(move |metric| (namespace.as_str(), metric))
        })
    }
}

fn resolve_endpoint(configured: Option<&str>, fallback: impl FnOnce() -> String) -> String {
    configured
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| value.trim_end_matches('/').to_string())
        .unwrap_or_else(fallback)
}

fn default_cloud_id() -> String {
    "default".to_string()
}

fn default_metric_namespace() -> String {
    DEFAULT_METRIC_NAMESPACE.to_string()
}

fn default_rate_limit() -> u32 {
    DEFAULT_RATE_LIMIT
}

fn default_measure() -> String {
    DEFAULT_MEASURE.to_string()
}

fn default_period() -> String {
    DEFAULT_PERIOD.to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPeriod {
    Seconds(u64),
    Text(String),
}

fn deserialize_period<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let period = match RawPeriod::deserialize(deserializer)? {
        RawPeriod::Seconds(seconds) => seconds.to_string(),
        RawPeriod::Text(text) => text.trim().to_string(),
    };

    if period.is_empty() {
        return Ok(default_period());
    }
    Ok(period)
}
