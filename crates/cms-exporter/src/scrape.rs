use std::{sync::Arc, time::Instant};

use cms_collector::{MetricCollector, NamespaceCatalog, Observation};
use cms_common::config::{ExporterConfig, MetricDefinition};
use futures::future::join_all;
use tracing::{info, warn};

use crate::metrics::{ScrapeMetrics, families_from_observations, render_prometheus};

/// One configured metric in one monitoring namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeTarget {
    pub sub_namespace: String,
    pub metric: MetricDefinition,
}

/// Runs one collection pass per target on every scrape.
pub struct Scraper {
    collector: MetricCollector,
    namespace: String,
    targets: Vec<ScrapeTarget>,
    metrics: Arc<ScrapeMetrics>,
}

impl Scraper {
    pub fn new(collector: MetricCollector, namespace: impl Into<String>, targets: Vec<ScrapeTarget>) -> Self {
        Self {
            collector,
            namespace: namespace.into(),
            targets,
            metrics: Arc::new(ScrapeMetrics::default()),
        }
    }

    /// Targets come from the configured metrics. Namespaces unknown to the
    /// catalog are skipped.
    pub fn from_config(
        config: &ExporterConfig,
        catalog: &NamespaceCatalog,
        collector: MetricCollector,
    ) -> Self {
        let configured = config.metrics.keys().collect::<Vec<_>>();
        let known = catalog.filter(configured.as_slice());
        for namespace in &configured {
            if !known.contains(*namespace) {
                warn!(namespace = %namespace, "skipping metrics of unknown namespace");
            }
        }

        let targets = known
            .iter()
            .flat_map(|namespace| {
                config.metrics[namespace].iter().map(|metric| ScrapeTarget {
                    sub_namespace: namespace.clone(),
                    metric: metric.clone(),
                })
            })
            .collect::<Vec<_>>();
        info!(targets = targets.len(), namespaces = known.len(), "scrape targets loaded");

        Self::new(collector, config.namespace.clone(), targets)
    }

    pub fn targets(&self) -> &[ScrapeTarget] {
        &self.targets
    }

    pub fn metrics(&self) -> Arc<ScrapeMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Collects every target concurrently. Failed targets are counted and
    /// contribute no observations.
    pub async fn scrape(&self) -> Vec<Observation> {
        let started_at = Instant::now();

        let passes = self.targets.iter().map(|target| async move {
            let result = self
                .collector
                .collect(&self.namespace, &target.sub_namespace, &target.metric)
                .await;
            (target, result)
        });

        let mut observations = Vec::new();
        for (target, result) in join_all(passes).await {
            match result {
                Ok(mut collected) => observations.append(&mut collected),
                Err(err) => self.metrics.record_error(&target.sub_namespace, err.kind()),
            }
        }

        self.metrics
            .record_scrape(started_at.elapsed(), observations.len());
        observations
    }

    /// Scrapes and renders the result together with the self metrics.
    pub async fn render(&self) -> String {
        let observations = self.scrape().await;
        let mut families = families_from_observations(&observations);
        families.extend(self.metrics.families());
        render_prometheus(&families)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use cms_client::api::{
        MetricLastRequest, MetricLastResponse, MetricMetaListRequest, MetricMetaListResponse,
        MonitoringApi,
    };
    use cms_collector::{EnrichmentTable, MetricCollector, NamespaceCatalog};
    use cms_common::{
        config::ExporterConfig,
        error::{CmsError, Result},
    };

    use super::Scraper;

    struct CannedMonitoring;

    #[async_trait]
    impl MonitoringApi for CannedMonitoring {
        async fn describe_metric_last(
            &self,
            request: &MetricLastRequest,
        ) -> Result<MetricLastResponse> {
            match request.metric_name.as_str() {
                "CPUUtilization" => Ok(MetricLastResponse {
                    datapoints: r#"[{"instanceId":"i-1","Average":12.5},{"instanceId":"i-2","Average":3}]"#
                        .to_string(),
                    content: String::new(),
                }),
                "BrokenPayload" => Ok(MetricLastResponse {
                    datapoints: "not json".to_string(),
                    content: "not json".to_string(),
                }),
                _ => Err(CmsError::Request {
                    action: "DescribeMetricLast".to_string(),
                    reason: "operation timed out".to_string(),
                }),
            }
        }

        async fn describe_metric_meta_list(
            &self,
            _request: &MetricMetaListRequest,
        ) -> Result<MetricMetaListResponse> {
            Ok(MetricMetaListResponse::default())
        }
    }

    const CONFIG: &str = r#"
region: cn-hangzhou
metrics:
  acs_ecs_dashboard:
    - name: CPUUtilization
      dimensions: [instanceId]
    - name: DiskReadBPS
    - name: BrokenPayload
    - name: ""
  acs_unknown_namespace:
    - name: Anything
"#;

    fn scraper() -> Scraper {
        let config = ExporterConfig::from_yaml_str(CONFIG).unwrap();
        let collector =
            MetricCollector::new("test", Arc::new(CannedMonitoring), EnrichmentTable::empty());
        Scraper::from_config(&config, &NamespaceCatalog::standard(), collector)
    }

    #[test]
    fn unknown_namespaces_are_not_scraped() {
        let scraper = scraper();
        assert_eq!(scraper.targets().len(), 4);
        assert!(
            scraper
                .targets()
                .iter()
                .all(|target| target.sub_namespace == "acs_ecs_dashboard")
        );
    }

    #[tokio::test]
    async fn failing_targets_do_not_hide_healthy_ones() {
        let scraper = scraper();
        let observations = scraper.scrape().await;

        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].label("instanceId"), Some("i-1"));
        assert_eq!(observations[1].value, 3.0);

        let metrics = scraper.metrics();
        assert_eq!(metrics.scrapes(), 1);
        assert_eq!(metrics.errors("acs_ecs_dashboard", "retrieval"), 1);
        assert_eq!(metrics.errors("acs_ecs_dashboard", "parse"), 1);
        assert_eq!(metrics.errors("acs_ecs_dashboard", "configuration"), 1);
    }

    #[tokio::test]
    async fn render_includes_observations_and_self_metrics() {
        let rendered = scraper().render().await;

        assert!(rendered.contains("# TYPE aliyun_acs_ecs_dashboard_cpu_utilization_average gauge\n"));
        assert!(rendered.contains(
            "aliyun_acs_ecs_dashboard_cpu_utilization_average{instanceId=\"i-1\"} 12.5\n"
        ));
        assert!(rendered.contains("cms_exporter_scrapes_total 1\n"));
        assert!(rendered.contains(
            "cms_exporter_collect_errors_total{sub_namespace=\"acs_ecs_dashboard\",kind=\"retrieval\"} 1\n"
        ));
    }
}
