use std::time::Duration;

use async_trait::async_trait;
use cms_common::error::Result;
use serde::{Deserialize, Serialize};

/// Largest page the listing APIs accept.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricLastRequest {
    pub namespace: String,
    pub metric_name: String,
    pub period: String,
    pub read_timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct MetricLastResponse {
    /// JSON array of datapoint objects, still encoded as text.
    pub datapoints: String,
    /// Raw response body, kept for diagnostics.
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricMetaListRequest {
    pub namespace: String,
    pub page_size: u32,
}

#[derive(Debug, Clone, Default)]
pub struct MetricMetaListResponse {
    pub resources: Vec<MetricMeta>,
    pub content: String,
}

/// Metadata of one metric available in a namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricMeta {
    #[serde(default)]
    pub metric_name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub dimensions: String,
    #[serde(default)]
    pub periods: String,
    #[serde(default)]
    pub statistics: String,
    #[serde(default)]
    pub labels: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_number: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn first(page_size: u32) -> Self {
        Self {
            page_number: 1,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancer {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbInstance {
    pub id: String,
    pub description: String,
}

#[async_trait]
pub trait MonitoringApi: Send + Sync {
    async fn describe_metric_last(&self, request: &MetricLastRequest) -> Result<MetricLastResponse>;

    async fn describe_metric_meta_list(
        &self,
        request: &MetricMetaListRequest,
    ) -> Result<MetricMetaListResponse>;
}

#[async_trait]
pub trait LoadBalancerApi: Send + Sync {
    async fn describe_load_balancers(&self, page: PageRequest) -> Result<Vec<LoadBalancer>>;
}

#[async_trait]
pub trait DatabaseApi: Send + Sync {
    async fn describe_db_instances(&self, page: PageRequest) -> Result<Vec<DbInstance>>;
}
