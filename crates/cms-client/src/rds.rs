use async_trait::async_trait;
use cms_common::error::Result;
use serde::Deserialize;

use crate::{
    api::{DatabaseApi, DbInstance, PageRequest},
    transport::{ApiStatus, RpcCall, Transport, decode},
};

const RDS_API_VERSION: &str = "2014-08-15";
const DESCRIBE_DB_INSTANCES: &str = "DescribeDBInstances";

/// Client for the relational database service.
#[derive(Clone)]
pub struct RdsClient {
    endpoint: String,
    transport: Transport,
}

impl RdsClient {
    pub fn new(endpoint: impl Into<String>, transport: Transport) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
        }
    }
}

#[async_trait]
impl DatabaseApi for RdsClient {
    async fn describe_db_instances(&self, page: PageRequest) -> Result<Vec<DbInstance>> {
        let content = self
            .transport
            .call(RpcCall {
                endpoint: &self.endpoint,
                action: DESCRIBE_DB_INSTANCES,
                version: RDS_API_VERSION,
                params: vec![
                    ("PageNumber", page.page_number.to_string()),
                    ("PageSize", page.page_size.to_string()),
                ],
                timeout: None,
            })
            .await?;

        decode_db_instances(&content)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DbInstancesBody {
    #[serde(default)]
    items: Option<DbInstanceList>,
    #[serde(flatten)]
    status: ApiStatus,
}

#[derive(Debug, Default, Deserialize)]
struct DbInstanceList {
    #[serde(rename = "DBInstance", default)]
    db_instance: Vec<DbInstanceItem>,
}

#[derive(Debug, Deserialize)]
struct DbInstanceItem {
    #[serde(rename = "DBInstanceId")]
    db_instance_id: String,
    #[serde(rename = "DBInstanceDescription", default)]
    db_instance_description: String,
}

fn decode_db_instances(content: &str) -> Result<Vec<DbInstance>> {
    let body: DbInstancesBody = decode(DESCRIBE_DB_INSTANCES, content)?;
    body.status.into_result(DESCRIBE_DB_INSTANCES)?;
    Ok(body
        .items
        .unwrap_or_default()
        .db_instance
        .into_iter()
        .map(|item| DbInstance {
            id: item.db_instance_id,
            description: item.db_instance_description,
        })
        .collect())
}
