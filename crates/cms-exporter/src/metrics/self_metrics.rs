use std::{
    collections::HashMap,
    sync::{
        Arc, RwLock,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use crate::metrics::types::{MetricFamily, MetricKind};

type LabelValues = Vec<String>;

/// Exporter self metrics, updated by every scrape.
pub struct ScrapeMetrics {
    prefix: String,
    scrapes_total: AtomicU64,
    collect_errors_total: RwLock<HashMap<LabelValues, Arc<AtomicU64>>>,
    last_duration_bits: AtomicU64,
    last_observations: AtomicU64,
}

impl ScrapeMetrics {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            scrapes_total: AtomicU64::new(0),
            collect_errors_total: RwLock::new(HashMap::new()),
            last_duration_bits: AtomicU64::new(0f64.to_bits()),
            last_observations: AtomicU64::new(0),
        }
    }

    pub fn record_scrape(&self, duration: Duration, observations: usize) {
        self.scrapes_total.fetch_add(1, Ordering::Relaxed);
        self.last_duration_bits
            .store(duration.as_secs_f64().to_bits(), Ordering::Relaxed);
        self.last_observations
            .store(observations as u64, Ordering::Relaxed);
    }

    pub fn record_error(&self, sub_namespace: &str, kind: &str) {
        let labels = vec![sub_namespace.to_string(), kind.to_string()];
        if let Ok(guard) = self.collect_errors_total.read()
            && let Some(existing) = guard.get(&labels)
        {
            existing.fetch_add(1, Ordering::Relaxed);
            return;
        }

        if let Ok(mut guard) = self.collect_errors_total.write() {
            guard
                .entry(labels)
                .or_insert_with(|| Arc::new(AtomicU64::new(0)))
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn scrapes(&self) -> u64 {
        self.scrapes_total.load(Ordering::Relaxed)
    }

    pub fn errors(&self, sub_namespace: &str, kind: &str) -> u64 {
        let labels = vec![sub_namespace.to_string(), kind.to_string()];
        self.collect_errors_total
            .read()
            .ok()
            .and_then(|guard| guard.get(&labels).map(|count| count.load(Ordering::Relaxed)))
            .unwrap_or(0)
    }

    pub fn families(&self) -> Vec<MetricFamily> {
        let mut errors = MetricFamily::new(
            self.name("collect_errors_total"),
            "Metric collection passes that failed, by namespace and error kind",
            MetricKind::Counter,
        );
        if let Ok(guard) = self.collect_errors_total.read() {
            let mut series = guard
                .iter()
                .map(|(labels, count)| (labels.clone(), count.load(Ordering::Relaxed)))
                .collect::<Vec<_>>();
            series.sort();
            for (labels, count) in series {
                let pairs = ["sub_namespace", "kind"]
                    .iter()
                    .map(|name| name.to_string())
                    .zip(labels)
                    .collect();
                errors = errors.with_sample(pairs, count as f64);
            }
        }

        vec![
            MetricFamily::new(
                self.name("scrapes_total"),
                "Scrapes served by the exporter",
                MetricKind::Counter,
            )
            .with_sample(Vec::new(), self.scrapes() as f64),
            errors,
            MetricFamily::new(
                self.name("last_scrape_duration_seconds"),
                "Duration of the most recent scrape in seconds",
                MetricKind::Gauge,
            )
            .with_sample(
                Vec::new(),
                f64::from_bits(self.last_duration_bits.load(Ordering::Relaxed)),
            ),
            MetricFamily::new(
                self.name("last_scrape_observations"),
                "Observations emitted by the most recent scrape",
                MetricKind::Gauge,
            )
            .with_sample(
                Vec::new(),
                self.last_observations.load(Ordering::Relaxed) as f64,
            ),
        ]
    }

    fn name(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.prefix)
    }
}

impl Default for ScrapeMetrics {
    fn default() -> Self {
        Self::new("cms_exporter")
    }
}
