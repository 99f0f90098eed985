use async_trait::async_trait;
use cms_common::error::Result;
use serde::Deserialize;

use crate::{
    api::{
        MetricLastRequest, MetricLastResponse, MetricMeta, MetricMetaListRequest,
        MetricMetaListResponse, MonitoringApi,
    },
    transport::{ApiStatus, RpcCall, Transport, decode},
};

const CMS_API_VERSION: &str = "2019-01-01";
const DESCRIBE_METRIC_LAST: &str = "DescribeMetricLast";
const DESCRIBE_METRIC_META_LIST: &str = "DescribeMetricMetaList";

/// Client for the cloud monitor service.
#[derive(Clone)]
pub struct CmsClient {
    endpoint: String,
    transport: Transport,
}

impl CmsClient {
    pub fn new(endpoint: impl Into<String>, transport: Transport) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
        }
    }
}

#[async_trait]
impl MonitoringApi for CmsClient {
    async fn describe_metric_last(&self, request: &MetricLastRequest) -> Result<MetricLastResponse> {
        let content = self
            .transport
            .call(RpcCall {
                endpoint: &self.endpoint,
                action: DESCRIBE_METRIC_LAST,
                version: CMS_API_VERSION,
                params: vec![
                    ("Namespace", request.namespace.clone()),
                    ("MetricName", request.metric_name.clone()),
                    ("Period", request.period.clone()),
                ],
                timeout: Some(request.read_timeout),
            })
            .await?;

        let datapoints = decode_metric_last(&content)?;
        Ok(MetricLastResponse {
            datapoints,
            content,
        })
    }

    async fn describe_metric_meta_list(
        &self,
        request: &MetricMetaListRequest,
    ) -> Result<MetricMetaListResponse> {
        let content = self
            .transport
            .call(RpcCall {
                endpoint: &self.endpoint,
                action: DESCRIBE_METRIC_META_LIST,
                version: CMS_API_VERSION,
                params: vec![
                    ("Namespace", request.namespace.clone()),
                    ("PageSize", request.page_size.to_string()),
                ],
                timeout: None,
            })
            .await?;

        let resources = decode_metric_meta_list(&content)?;
        Ok(MetricMetaListResponse { resources, content })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MetricLastBody {
    #[serde(default)]
    datapoints: Option<String>,
    #[serde(flatten)]
    status: ApiStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MetricMetaListBody {
    #[serde(default)]
    resources: Option<ResourceList>,
    #[serde(flatten)]
    status: ApiStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResourceList {
    #[serde(default)]
    resource: Vec<MetricMeta>,
}

/// Returns the embedded datapoint array text. A response without datapoints
/// is an empty array.
fn decode_metric_last(content: &str) -> Result<String> {
    let body: MetricLastBody = decode(DESCRIBE_METRIC_LAST, content)?;
    body.status.into_result(DESCRIBE_METRIC_LAST)?;
    Ok(body
        .datapoints
        .filter(|datapoints| !datapoints.trim().is_empty())
        .unwrap_or_else(|| "[]".to_string()))
}

fn decode_metric_meta_list(content: &str) -> Result<Vec<MetricMeta>> {
    let body: MetricMetaListBody = decode(DESCRIBE_METRIC_META_LIST, content)?;
    body.status.into_result(DESCRIBE_METRIC_META_LIST)?;
    Ok(body.resources.unwrap_or_default().resource)
}
