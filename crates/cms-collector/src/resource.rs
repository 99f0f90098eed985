use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use cms_client::api::{DatabaseApi, LoadBalancerApi, MAX_PAGE_SIZE, PageRequest};
use cms_common::error::Result;

pub const SLB_NAMESPACE: &str = "acs_slb_dashboard";
pub const RDS_NAMESPACE: &str = "acs_rds_dashboard";

pub const LOAD_BALANCER_NAME_LABEL: &str = "loadbalancerName";
pub const DB_INSTANCE_DESCRIPTION_LABEL: &str = "DBInstanceDescription";

/// Display attributes of resources, keyed by resource id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceIndex {
    resources: HashMap<String, HashMap<String, String>>,
}

impl ResourceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        resource_id: impl Into<String>,
        label: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.resources
            .entry(resource_id.into())
            .or_default()
            .insert(label.into(), value.into());
    }

    pub fn attribute(&self, resource_id: &str, label: &str) -> Option<&str> {
        self.resources
            .get(resource_id)?
            .get(label)
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Builds a fresh [`ResourceIndex`] from an auxiliary listing API.
#[async_trait]
pub trait ResourceIndexBuilder: Send + Sync {
    async fn build(&self) -> Result<ResourceIndex>;
}

pub struct LoadBalancerIndexBuilder {
    api: Arc<dyn LoadBalancerApi>,
}

impl LoadBalancerIndexBuilder {
    pub fn new(api: Arc<dyn LoadBalancerApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ResourceIndexBuilder for LoadBalancerIndexBuilder {
    async fn build(&self) -> Result<ResourceIndex> {
        let balancers = self
            .api
            .describe_load_balancers(PageRequest::first(MAX_PAGE_SIZE))
            .await?;

        let mut index = ResourceIndex::new();
        for balancer in balancers {
            let name = display_or_id(&balancer.name, &balancer.id);
            index.insert(balancer.id.clone(), LOAD_BALANCER_NAME_LABEL, name);
        }
        Ok(index)
    }
}

pub struct DatabaseIndexBuilder {
    api: Arc<dyn DatabaseApi>,
}

impl DatabaseIndexBuilder {
    pub fn new(api: Arc<dyn DatabaseApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ResourceIndexBuilder for DatabaseIndexBuilder {
    async fn build(&self) -> Result<ResourceIndex> {
        let instances = self
            .api
            .describe_db_instances(PageRequest::first(MAX_PAGE_SIZE))
            .await?;

        let mut index = ResourceIndex::new();
        for instance in instances {
            let description = display_or_id(&instance.description, &instance.id);
            index.insert(
                instance.id.clone(),
                DB_INSTANCE_DESCRIPTION_LABEL,
                description,
            );
        }
        Ok(index)
    }
}

fn display_or_id(display: &str, id: &str) -> String {
    if display.trim().is_empty() {
        id.to_string()
    } else {
        display.to_string()
    }
}

/// Namespaces whose datapoints need resource-name enrichment, and the
/// builder for each.
#[derive(Clone, Default)]
pub struct EnrichmentTable {
    builders: HashMap<String, Arc<dyn ResourceIndexBuilder>>,
}

impl EnrichmentTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn standard(
        load_balancers: Arc<dyn LoadBalancerApi>,
        databases: Arc<dyn DatabaseApi>,
    ) -> Self {
        Self::empty()
            .with(
                SLB_NAMESPACE,
                Arc::new(LoadBalancerIndexBuilder::new(load_balancers)),
            )
            .with(RDS_NAMESPACE, Arc::new(DatabaseIndexBuilder::new(databases)))
    }

    pub fn with(
        mut self,
        namespace: impl Into<String>,
        builder: Arc<dyn ResourceIndexBuilder>,
    ) -> Self {
        self.builders.insert(namespace.into(), builder);
        self
    }

    pub fn builder_for(&self, namespace: &str) -> Option<&Arc<dyn ResourceIndexBuilder>> {
        self.builders.get(namespace)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }
}
