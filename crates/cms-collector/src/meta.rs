use std::{collections::BTreeMap, sync::Arc};

use cms_client::api::{MAX_PAGE_SIZE, MetricMeta, MetricMetaListRequest, MonitoringApi};
use cms_common::error::{CmsError, Result};
use tracing::debug;

use crate::namespace::NamespaceCatalog;

/// Lists the metrics available per namespace. Used for discovery and
/// documentation, not for polling.
pub struct MetaListFetcher {
    monitoring: Arc<dyn MonitoringApi>,
    catalog: Arc<NamespaceCatalog>,
}

impl MetaListFetcher {
    pub fn new(monitoring: Arc<dyn MonitoringApi>, catalog: Arc<NamespaceCatalog>) -> Self {
        Self {
            monitoring,
            catalog,
        }
    }

    /// Describes every requested namespace known to the catalog. The first
    /// failing namespace aborts the whole call.
    pub async fn describe_metrics<S: AsRef<str>>(
        &self,
        namespaces: &[S],
    ) -> Result<BTreeMap<String, Vec<MetricMeta>>> {
        let mut described = BTreeMap::new();

        for namespace in self.catalog.filter(namespaces) {
            let request = MetricMetaListRequest {
                namespace: namespace.clone(),
                page_size: MAX_PAGE_SIZE,
            };
            let response = self
                .monitoring
                .describe_metric_meta_list(&request)
                .await
                .map_err(|source| CmsError::Discovery {
                    namespace: namespace.clone(),
                    source: Box::new(source),
                })?;

            debug!(namespace = %namespace, content = %response.content, "metric meta list");
            described.insert(namespace, response.resources);
        }

        Ok(described)
    }
}
