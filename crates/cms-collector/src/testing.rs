use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use cms_client::api::{
    MetricLastRequest, MetricLastResponse, MetricMeta, MetricMetaListRequest,
    MetricMetaListResponse, MonitoringApi,
};
use cms_common::error::{CmsError, Result};

/// In-memory monitoring API. Replies are keyed by metric name for
/// `describe_metric_last` and by namespace for `describe_metric_meta_list`.
#[derive(Default)]
pub struct FakeMonitoring {
    datapoints: HashMap<String, Option<String>>,
    metas: HashMap<String, Option<Vec<MetricMeta>>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<MetricLastRequest>>,
    meta_requests: Mutex<Vec<MetricMetaListRequest>>,
}

impl FakeMonitoring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, metric: &str, datapoints: &str) -> Self {
        self.datapoints
            .insert(metric.to_string(), Some(datapoints.to_string()));
        self
    }

    pub fn fail(mut self, metric: &str) -> Self {
        self.datapoints.insert(metric.to_string(), None);
        self
    }

    pub fn meta(mut self, namespace: &str, metrics: &[&str]) -> Self {
        let resources = metrics
            .iter()
            .map(|metric| MetricMeta {
                metric_name: metric.to_string(),
                namespace: namespace.to_string(),
                ..MetricMeta::default()
            })
            .collect();
        self.metas.insert(namespace.to_string(), Some(resources));
        self
    }

    pub fn fail_meta(mut self, namespace: &str) -> Self {
        self.metas.insert(namespace.to_string(), None);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<MetricLastRequest> {
        self.requests.lock().ok()?.last().cloned()
    }

    pub fn meta_requests(&self) -> Vec<MetricMetaListRequest> {
        self.meta_requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

fn unavailable(action: &str) -> CmsError {
    CmsError::Request {
        action: action.to_string(),
        reason: "operation timed out".to_string(),
    }
}

#[async_trait]
impl MonitoringApi for FakeMonitoring {
    async fn describe_metric_last(&self, request: &MetricLastRequest) -> Result<MetricLastResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        match self.datapoints.get(&request.metric_name) {
            Some(Some(datapoints)) => Ok(MetricLastResponse {
                datapoints: datapoints.clone(),
                content: format!("{{\"Datapoints\":{datapoints:?}}}"),
            }),
            _ => Err(unavailable("DescribeMetricLast")),
        }
    }

    async fn describe_metric_meta_list(
        &self,
        request: &MetricMetaListRequest,
    ) -> Result<MetricMetaListResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.meta_requests.lock() {
            requests.push(request.clone());
        }

        match self.metas.get(&request.namespace) {
            Some(Some(resources)) => Ok(MetricMetaListResponse {
                resources: resources.clone(),
                content: String::new(),
            }),
            Some(None) => Err(unavailable("DescribeMetricMetaList")),
            None => Ok(MetricMetaListResponse::default()),
        }
    }
}
