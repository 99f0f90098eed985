pub mod exposition;
pub mod self_metrics;
pub mod types;

pub use exposition::{families_from_observations, render_prometheus};
pub use self_metrics::ScrapeMetrics;
pub use types::{MetricFamily, MetricKind, MetricSample};
