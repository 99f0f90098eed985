use async_trait::async_trait;
use cms_common::error::Result;
use serde::Deserialize;

use crate::{
    api::{LoadBalancer, LoadBalancerApi, PageRequest},
    transport::{ApiStatus, RpcCall, Transport, decode},
};

const SLB_API_VERSION: &str = "2014-05-15";
const DESCRIBE_LOAD_BALANCERS: &str = "DescribeLoadBalancers";

/// Client for the server load balancer service.
#[derive(Clone)]
pub struct SlbClient {
    endpoint: String,
    transport: Transport,
}

impl SlbClient {
    pub fn new(endpoint: impl Into<String>, transport: Transport) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
        }
    }
}

#[async_trait]
impl LoadBalancerApi for SlbClient {
    async fn describe_load_balancers(&self, page: PageRequest) -> Result<Vec<LoadBalancer>> {
        let content = self
            .transport
            .call(RpcCall {
                endpoint: &self.endpoint,
                action: DESCRIBE_LOAD_BALANCERS,
                version: SLB_API_VERSION,
                params: vec![
                    ("PageNumber", page.page_number.to_string()),
                    ("PageSize", page.page_size.to_string()),
                ],
                timeout: None,
            })
            .await?;

        decode_load_balancers(&content)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoadBalancersBody {
    #[serde(default)]
    load_balancers: Option<LoadBalancerList>,
    #[serde(flatten)]
    status: ApiStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoadBalancerList {
    #[serde(default)]
    load_balancer: Vec<LoadBalancerItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoadBalancerItem {
    load_balancer_id: String,
    #[serde(default)]
    load_balancer_name: String,
}

fn decode_load_balancers(content: &str) -> Result<Vec<LoadBalancer>> {
    let body: LoadBalancersBody = decode(DESCRIBE_LOAD_BALANCERS, content)?;
    body.status.into_result(DESCRIBE_LOAD_BALANCERS)?;
    Ok(body
        .load_balancers
        .unwrap_or_default()
        .load_balancer
        .into_iter()
        .map(|item| LoadBalancer {
            id: item.load_balancer_id,
            name: item.load_balancer_name,
        })
        .collect())
}
