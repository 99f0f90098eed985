use std::{sync::Arc, time::Duration};

use cms_client::api::{MetricLastRequest, MonitoringApi};
use cms_common::{
    config::MetricDefinition,
    error::{CmsError, Result},
};
use tracing::{debug, error, warn};

use crate::{
    datapoint::{Datapoint, parse_datapoints},
    observation::{Observation, ObservationDescriptor},
    resource::{EnrichmentTable, ResourceIndex},
};

/// Read timeout applied to every monitoring query.
pub const READ_TIMEOUT: Duration = Duration::from_secs(50);

/// Runs collection passes for individual metric definitions. Cloning is cheap
/// and concurrent passes share the underlying API clients.
#[derive(Clone)]
pub struct MetricCollector {
    cloud_id: String,
    monitoring: Arc<dyn MonitoringApi>,
    enrichments: EnrichmentTable,
}

impl MetricCollector {
    pub fn new(
        cloud_id: impl Into<String>,
        monitoring: Arc<dyn MonitoringApi>,
        enrichments: EnrichmentTable,
    ) -> Self {
        Self {
            cloud_id: cloud_id.into(),
            monitoring,
            enrichments,
        }
    }

    /// One collection pass: query the latest datapoints of `metric` in
    /// `sub_namespace` and turn each of them into an observation. Failures are
    /// logged here and returned; they never affect other passes.
    pub async fn collect(
        &self,
        namespace: &str,
        sub_namespace: &str,
        metric: &MetricDefinition,
    ) -> Result<Vec<Observation>> {
        if let Err(err) = metric.validate() {
            warn!(
                cloud_id = %self.cloud_id,
                namespace = sub_namespace,
                "metric name must be set"
            );
            return Err(err);
        }

        let datapoints = match self.retrieve(sub_namespace, metric).await {
            Ok(datapoints) => datapoints,
            Err(err) => {
                error!(
                    cloud_id = %self.cloud_id,
                    namespace = sub_namespace,
                    metric = %metric,
                    error = %err,
                    "failed to retrieve datapoints"
                );
                return Err(err);
            }
        };

        let index = self.resource_index(sub_namespace).await;

        let observations = datapoints
            .iter()
            .map(|datapoint| {
                let value = datapoint.measure(&metric.measure);
                let label_names = datapoint.label_names(metric.dimensions.as_slice());
                let label_values = datapoint.label_values(label_names.as_slice(), &index);
                Observation {
                    descriptor: ObservationDescriptor::for_metric(
                        namespace,
                        sub_namespace,
                        metric,
                        label_names,
                    ),
                    value,
                    label_values,
                }
            })
            .collect::<Vec<_>>();

        debug!(
            namespace = sub_namespace,
            metric = %metric,
            observations = observations.len(),
            "metric collected"
        );
        Ok(observations)
    }

    async fn retrieve(
        &self,
        sub_namespace: &str,
        metric: &MetricDefinition,
    ) -> Result<Vec<Datapoint>> {
        let request = MetricLastRequest {
            namespace: sub_namespace.to_string(),
            metric_name: metric.name.clone(),
            period: metric.period.clone(),
            read_timeout: READ_TIMEOUT,
        };

        let response = self
            .monitoring
            .describe_metric_last(&request)
            .await
            .map_err(|source| CmsError::Retrieval {
                namespace: sub_namespace.to_string(),
                metric: metric.name.clone(),
                source: Box::new(source),
            })?;

        parse_datapoints(&response.datapoints).map_err(|source| {
            debug!(content = %response.content, error = %source, "unexpected datapoints payload");
            CmsError::Parse {
                namespace: sub_namespace.to_string(),
                metric: metric.name.clone(),
                source,
            }
        })
    }

    /// Fresh index for enrichable namespaces; empty for every other namespace
    /// and whenever the listing call fails.
    async fn resource_index(&self, sub_namespace: &str) -> ResourceIndex {
        let Some(builder) = self.enrichments.builder_for(sub_namespace) else {
            return ResourceIndex::new();
        };

        match builder.build().await {
            Ok(index) => index,
            Err(source) => {
                let err = CmsError::Enrichment {
                    namespace: sub_namespace.to_string(),
                    source: Box::new(source),
                };
                warn!(
                    cloud_id = %self.cloud_id,
                    namespace = sub_namespace,
                    error = %err,
                    "resource enrichment unavailable"
                );
                ResourceIndex::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use cms_client::api::{
        DatabaseApi, DbInstance, LoadBalancer, LoadBalancerApi, PageRequest,
    };
    use cms_common::{
        config::MetricDefinition,
        error::{CmsError, Result},
    };

    use super::{MetricCollector, READ_TIMEOUT};
    use crate::{resource::EnrichmentTable, testing::FakeMonitoring};

    const ECS_DATAPOINTS: &str = r#"[
        {"timestamp": 1548777660000, "userId": "1208", "instanceId": "i-1", "Maximum": 20.5, "Minimum": 1.0, "Average": 9.5},
        {"timestamp": 1548777660000, "userId": "1208", "instanceId": "i-2", "Maximum": 80.0, "Minimum": 2.0, "Average": 40.0}
    ]"#;

    const SLB_DATAPOINTS: &str =
        r#"[{"instanceId": "lb-1", "timestamp": 1548777660000, "Average": 42}]"#;

    struct Balancers;

    #[async_trait]
    impl LoadBalancerApi for Balancers {
        async fn describe_load_balancers(&self, _page: PageRequest) -> Result<Vec<LoadBalancer>> {
            Ok(vec![LoadBalancer {
                id: "lb-1".to_string(),
                name: "prod-lb".to_string(),
            }])
        }
    }

    struct BrokenBalancers;

    #[async_trait]
    impl LoadBalancerApi for BrokenBalancers {
        async fn describe_load_balancers(&self, _page: PageRequest) -> Result<Vec<LoadBalancer>> {
            Err(CmsError::Api {
                action: "DescribeLoadBalancers".to_string(),
                code: "Throttling".to_string(),
                message: "request was denied due to flow control".to_string(),
            })
        }
    }

    struct NoDatabases;

    #[async_trait]
    impl DatabaseApi for NoDatabases {
        async fn describe_db_instances(&self, _page: PageRequest) -> Result<Vec<DbInstance>> {
            Ok(Vec::new())
        }
    }

    fn collector(monitoring: Arc<FakeMonitoring>, balancers: Arc<dyn LoadBalancerApi>) -> MetricCollector {
        MetricCollector::new(
            "test",
            monitoring,
            EnrichmentTable::standard(balancers, Arc::new(NoDatabases)),
        )
    }

    #[tokio::test]
    async fn empty_metric_name_is_a_configuration_error() {
        let monitoring = Arc::new(FakeMonitoring::new());
        let collector = collector(Arc::clone(&monitoring), Arc::new(Balancers));

        let result = collector
            .collect("aliyun", "acs_ecs_dashboard", &MetricDefinition::new(""))
            .await;

        assert!(matches!(result, Err(CmsError::InvalidMetric(_))));
        assert_eq!(monitoring.calls(), 0);
    }

    #[tokio::test]
    async fn emits_one_observation_per_datapoint_in_order() {
        let monitoring = Arc::new(FakeMonitoring::new().reply("CPUUtilization", ECS_DATAPOINTS));
        let collector = collector(Arc::clone(&monitoring), Arc::new(Balancers));
        let metric = MetricDefinition::new("CPUUtilization")
            .with_measure("Maximum")
            .with_dimensions(["instanceId"]);

        let observations = collector
            .collect("aliyun", "acs_ecs_dashboard", &metric)
            .await
            .unwrap();

        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].value, 20.5);
        assert_eq!(observations[1].value, 80.0);
        assert_eq!(observations[0].label_values, vec!["i-1"]);
        assert_eq!(observations[1].label_values, vec!["i-2"]);
        assert_eq!(observations[0].descriptor.label_names, vec!["instanceId"]);
        assert_eq!(
            observations[0].descriptor.name,
            "aliyun_acs_ecs_dashboard_cpu_utilization_maximum"
        );
    }

    #[tokio::test]
    async fn request_carries_period_and_read_timeout() {
        let monitoring = Arc::new(FakeMonitoring::new().reply("CPUUtilization", "[]"));
        let collector = collector(Arc::clone(&monitoring), Arc::new(Balancers));
        let mut metric = MetricDefinition::new("CPUUtilization");
        metric.period = "300".to_string();

        let observations = collector
            .collect("aliyun", "acs_ecs_dashboard", &metric)
            .await
            .unwrap();
        assert!(observations.is_empty());

        let request = monitoring.last_request().unwrap();
        assert_eq!(request.namespace, "acs_ecs_dashboard");
        assert_eq!(request.period, "300");
        assert_eq!(request.read_timeout, READ_TIMEOUT);
    }

    #[tokio::test]
    async fn failed_query_does_not_affect_concurrent_pass() {
        let monitoring = Arc::new(
            FakeMonitoring::new()
                .reply("CPUUtilization", ECS_DATAPOINTS)
                .fail("memory_usedutilization"),
        );
        let collector = collector(Arc::clone(&monitoring), Arc::new(Balancers));
        let healthy = MetricDefinition::new("CPUUtilization");
        let broken = MetricDefinition::new("memory_usedutilization");

        let (failed, succeeded) = futures::join!(
            collector.collect("aliyun", "acs_ecs_dashboard", &broken),
            collector.collect("aliyun", "acs_ecs_dashboard", &healthy),
        );

        match failed {
            Err(err @ CmsError::Retrieval { .. }) => {
                assert!(err.to_string().contains("memory_usedutilization"));
            }
            other => panic!("expected retrieval error, got {other:?}"),
        }
        assert_eq!(succeeded.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn malformed_payload_is_a_parse_error() {
        let monitoring = Arc::new(FakeMonitoring::new().reply("CPUUtilization", "{\"oops\""));
        let collector = collector(monitoring, Arc::new(Balancers));

        let result = collector
            .collect("aliyun", "acs_ecs_dashboard", &MetricDefinition::new("CPUUtilization"))
            .await;

        match result {
            Err(err) => {
                assert!(matches!(err, CmsError::Parse { .. }));
                assert!(err.is_retrieval());
            }
            Ok(observations) => panic!("unexpected observations: {observations:?}"),
        }
    }

    #[tokio::test]
    async fn load_balancer_names_are_enriched() {
        let monitoring = Arc::new(FakeMonitoring::new().reply("Qps", SLB_DATAPOINTS));
        let collector = collector(monitoring, Arc::new(Balancers));
        let metric = MetricDefinition::new("Qps")
            .with_measure("Average")
            .with_dimensions(["loadbalancerName"]);

        let observations = collector
            .collect("aliyun", "acs_slb_dashboard", &metric)
            .await
            .unwrap();

        assert_eq!(observations.len(), 1);
        let observation = &observations[0];
        assert_eq!(observation.value, 42.0);
        assert_eq!(observation.label("instanceId"), Some("lb-1"));
        assert_eq!(observation.label("loadbalancerName"), Some("prod-lb"));
    }

    #[tokio::test]
    async fn other_measure_of_enriched_datapoint_is_zero() {
        let monitoring = Arc::new(FakeMonitoring::new().reply("Qps", SLB_DATAPOINTS));
        let collector = collector(monitoring, Arc::new(Balancers));
        let metric = MetricDefinition::new("Qps")
            .with_measure("Value")
            .with_dimensions(["loadbalancerName"]);

        let observations = collector
            .collect("aliyun", "acs_slb_dashboard", &metric)
            .await
            .unwrap();
        assert_eq!(observations[0].value, 0.0);
    }

    #[tokio::test]
    async fn listing_failure_leaves_enriched_labels_empty() {
        let monitoring = Arc::new(FakeMonitoring::new().reply("Qps", SLB_DATAPOINTS));
        let collector = collector(monitoring, Arc::new(BrokenBalancers));
        let metric = MetricDefinition::new("Qps").with_dimensions(["loadbalancerName"]);

        let observations = collector
            .collect("aliyun", "acs_slb_dashboard", &metric)
            .await
            .unwrap();

        assert_eq!(observations.len(), 1);
        assert_eq!(
            observations[0].descriptor.label_names,
            vec!["instanceId", "loadbalancerName"]
        );
        assert_eq!(observations[0].label_values, vec!["lb-1", ""]);
    }
}
